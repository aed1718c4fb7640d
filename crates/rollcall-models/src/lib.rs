//! # Rollcall Models
//!
//! Database entities and request/response DTOs for the Rollcall API.
//!
//! - [`auth`]: Signup, login, token and password reset payloads
//! - [`attendance`]: Sessions, punches and summaries
//! - [`imports`]: Stored import drafts and their views
//! - [`institutions`]: The tenant record
//! - [`invites`]: Invite codes
//! - [`sections`]: Sections, enrollments and faculty assignments
//! - [`users`]: Users and role profiles
//!
//! # Example
//!
//! ```ignore
//! use rollcall_models::sections::{CreateSectionDto, SectionShape};
//! use rollcall_models::institutions::InstitutionKind;
//!
//! dto.shape().check(InstitutionKind::School)?;
//! ```

pub mod attendance;
pub mod auth;
pub mod imports;
pub mod institutions;
pub mod invites;
pub mod sections;
pub mod users;

pub use auth::{AuthResponse, LoginRequest, MessageResponse, OtpPurpose};
pub use institutions::{Institution, InstitutionKind};
pub use users::{User, UserWithProfile};
