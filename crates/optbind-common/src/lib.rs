//! # optbind-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the optbind workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and performs no privileged operation itself.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
