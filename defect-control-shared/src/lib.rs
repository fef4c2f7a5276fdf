//! # Defect Control Shared Library
//!
//! This crate contains the data model and pure helpers shared by the
//! Defect Control client library and the navigation shell.
//!
//! ## Module Organization
//!
//! - `models`: API records and form payloads
//! - `envelope`: The single decoding boundary for API responses
//! - `auth`: Client-side role capabilities (presentation gating only)
//! - `validation`: Flattening of form validation failures

pub mod auth;
pub mod envelope;
pub mod models;
pub mod validation;

/// Current version of the Defect Control shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
