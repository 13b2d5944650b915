//! Test helpers for barstar-seeding integration tests.
//!
//! This module provides throwaway on-disk databases and a one-call seeding
//! run over them.

#[path = "helpers/database.rs"]
pub mod database;
