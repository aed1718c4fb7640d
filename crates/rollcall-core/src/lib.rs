//! # Rollcall Core
//!
//! Core types, errors, and utilities for the Rollcall API.
//!
//! This crate provides foundational types used throughout the Rollcall application:
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`institution`]: Institution kinds (`school`, `college`)
//! - [`pagination`]: Pagination utilities for API responses
//! - [`password`]: Password hashing and verification
//! - [`roles`]: The account roles (`student`, `faculty`, `parent`, `admin`)
//! - [`serde`]: Custom serde deserialization helpers for query strings
//!
//! # Example
//!
//! ```ignore
//! use rollcall_core::errors::AppError;
//! use rollcall_core::pagination::PaginationParams;
//! use rollcall_core::password::{hash_password, verify_password};
//!
//! let error = AppError::not_found(anyhow::anyhow!("Section not found"));
//! let hash = hash_password("secure_password")?;
//! let limit = PaginationParams::default().limit();
//! ```

pub mod errors;
pub mod institution;
pub mod pagination;
pub mod password;
pub mod roles;
pub mod serde;

pub use errors::AppError;
pub use institution::InstitutionKind;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
pub use roles::UserRole;
