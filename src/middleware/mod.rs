//! Authentication and role checks.
//!
//! - [`auth`]: the [`auth::AuthUser`] extractor that validates bearer tokens
//! - [`role`]: route middleware and helpers that restrict access by role
//!
//! Every token carries the caller's role and institution, so handlers scope
//! queries with `auth_user.institution_id()` without a database lookup.

pub mod auth;
pub mod role;
