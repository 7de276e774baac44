//! Core types for Fastprint.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod status;
pub mod validation;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{AmountError, check_amount};
pub use status::*;
pub use validation::ValidationErrors;
