//! The status envelope used by the cart and book endpoints.
//!
//! ```json
//! {"status": "success", "message": "Cart item added successfully", "data": {...}}
//! {"status": "success", "results": 2, "data": [...]}
//! ```
//!
//! Error bodies are produced by [`EnvelopeError`](crate::error::EnvelopeError).

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// A successful response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T> Envelope<T> {
    /// Wrap a single record.
    #[must_use]
    pub const fn data(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            results: None,
            data: Some(data),
        }
    }

    #[must_use]
    pub const fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

impl<T> Envelope<Vec<T>> {
    /// Wrap a listing, with its length in `results`.
    #[must_use]
    pub fn list(items: Vec<T>) -> Self {
        let results = items.len();
        Self {
            results: Some(results),
            ..Self::data(items)
        }
    }
}

impl Envelope<()> {
    /// A body carrying only a message.
    #[must_use]
    pub const fn message(message: &'static str) -> Self {
        Self {
            status: "success",
            message: Some(message),
            results: None,
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_counts_results() {
        let body = serde_json::to_value(Envelope::list(vec![1, 2])).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "success", "results": 2, "data": [1, 2]})
        );
    }

    #[test]
    fn test_message_only() {
        let body = serde_json::to_value(Envelope::message("Cart item deleted successfully")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "success", "message": "Cart item deleted successfully"})
        );
    }
}
