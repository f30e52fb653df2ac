//! Shared helpers.

pub mod uuid;
