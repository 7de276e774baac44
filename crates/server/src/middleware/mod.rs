//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span from [`request_span`])
//! 3. Request ID (record on the span, echo in the response)
//! 4. Session layer (tower-sessions)
//!
//! Authentication is not a layer: handlers opt in with the
//! [`RequireAuth`], [`RequireStaff`] and [`MaybeUser`] extractors.

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{MaybeUser, RequireAuth, RequireStaff, clear_current_user, set_current_user};
pub use request_id::{request_id_middleware, request_span};
pub use session::create_session_layer;
