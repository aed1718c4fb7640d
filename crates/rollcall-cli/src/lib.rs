//! # Rollcall CLI
//!
//! Administration and seeding utilities used by the `rollcall-cli` binary.
//!
//! - [`admin`]: create an institution with its first admin, create invites
//! - [`seeder`]: fill a development database with fake data

pub mod admin;
pub mod seeder;
