//! Feature modules.
//!
//! Each module holds a `controller` (HTTP handlers), a `service` (queries and
//! business rules) and a `router`. Request and response types live in the
//! `rollcall-models` crate so the CLI can share them.

pub mod attendance;
pub mod auth;
pub mod imports;
pub mod institutions;
pub mod invites;
pub mod sections;
pub mod users;
