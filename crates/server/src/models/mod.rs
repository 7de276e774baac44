//! Domain models for the Fastprint API.
//!
//! Each entity comes in a few shapes:
//!
//! - the stored record (`Profile`, `CartItem`, `BookProject`)
//! - a `*Payload` deserialized from the request, distinguishing missing,
//!   null and present fields
//! - a validated `*Patch` with `Option<Option<T>>` for nullable columns, so
//!   `PATCH` can clear a value
//! - a `*View` that adds derived fields for serialization

pub mod book;
pub mod cart;
pub mod fields;
pub mod profile;
pub mod quote;
pub mod session;
