//! Common types and utilities shared across maxmem.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`EvictionConfig`]
//! - Error types
//! - Identifiers ([`DbId`])

pub mod config;
pub mod error;
mod db_id;

pub use config::{EvictionConfig, EvictionPolicy};
pub use db_id::DbId;
pub use error::{Error, Result};
