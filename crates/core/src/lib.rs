//! Fastprint Core - Shared domain types.
//!
//! This crate provides the value types used across all Fastprint components:
//! - `server` - The HTTP API (profiles, cart, book projects and orders)
//! - `cli` - Command-line tools for migrations and staff management
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. The order workflow lives here so that both the API and the
//! CLI agree on which status changes are legal.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, money checks, statuses, validation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
