//! Request extractors.
//!
//! [`JsonBody`] rejects with [`AppError::BadRequest`] so malformed bodies get
//! the same `{"detail": ...}` shape as every other client error. The cart
//! and book endpoints use [`EnvelopeJson`], [`EnvelopePath`] and
//! [`BookMultipart`] instead, which reject inside the status envelope.

use axum::{
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request, rejection::JsonRejection},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use fastprint_core::ValidationErrors;

use crate::error::{AppError, EnvelopeError};
use crate::media::Upload;
use crate::models::book::BookForm;

/// Envelope message for a request that could not be read at all.
const UNREADABLE: &str = "Failed to read request";

/// `Json<T>` with an [`AppError`] rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `Json<T>` rejected inside the status envelope.
///
/// A value of the wrong type is reported against its field:
/// `{"status": "error", "errors": {"product_quantity": [...]}}`.
#[derive(Debug)]
pub struct EnvelopeJson<T>(pub T);

impl<T, S> FromRequest<S> for EnvelopeJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = EnvelopeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(EnvelopeError::new(json_error(rejection), UNREADABLE)),
        }
    }
}

fn json_error(rejection: JsonRejection) -> AppError {
    match field_error(&rejection) {
        Some(errors) => AppError::Validation(errors),
        None => rejection.into(),
    }
}

/// Field-keyed error for a body whose JSON is valid but holds a value of the
/// wrong type, e.g. `"product_quantity": "x"`.
///
/// The rejection text reads `<summary>: <path>: <message> at line L column C`.
fn field_error(rejection: &JsonRejection) -> Option<ValidationErrors> {
    let JsonRejection::JsonDataError(e) = rejection else {
        return None;
    };
    let text = e.body_text();
    let (_, detail) = text.split_once(": ")?;
    let (path, message) = detail.split_once(": ")?;

    let field = path.split(['.', '[']).next()?;
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let message = message.split(" at line ").next().unwrap_or(message);
    Some(ValidationErrors::single(field, message))
}

/// `Path<T>` rejected inside the status envelope.
#[derive(Debug)]
pub struct EnvelopePath<T>(pub T);

impl<T, S> FromRequestParts<S> for EnvelopePath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = EnvelopeError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                let error = if rejection.status().is_server_error() {
                    AppError::Internal(rejection.body_text())
                } else {
                    AppError::BadRequest(rejection.body_text())
                };
                Err(EnvelopeError::new(error, UNREADABLE))
            }
        }
    }
}

/// Multipart body of the book upload, update and save-order endpoints.
///
/// Text parts become [`BookForm::fields`]; `pdf_file` and `cover_file`
/// parts with a filename become uploads. An empty file part counts as
/// absent.
pub struct BookMultipart(pub BookForm);

impl<S> FromRequest<S> for BookMultipart
where
    S: Send + Sync,
{
    type Rejection = EnvelopeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        read_book_form(req, state)
            .await
            .map(Self)
            .map_err(|e| EnvelopeError::new(e, UNREADABLE))
    }
}

async fn read_book_form<S: Send + Sync>(req: Request, state: &S) -> Result<BookForm, AppError> {
    let mut multipart = Multipart::from_request(req, state)
        .await
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let mut form = BookForm::default();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if let Some(file_name) = field.file_name().map(str::to_owned) {
            let bytes = field.bytes().await?;
            if bytes.is_empty() {
                continue;
            }
            let upload = Upload { file_name, bytes };
            match name.as_str() {
                "pdf_file" => form.pdf_file = Some(upload),
                "cover_file" => form.cover_file = Some(upload),
                other => tracing::debug!(field = other, "Ignoring unexpected file part"),
            }
        } else {
            let value = field.text().await?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{body::Body, http::header::CONTENT_TYPE, response::IntoResponse};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Quantity {
        product_quantity: i32,
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn rejection_body(body: &'static str) -> (axum::http::StatusCode, serde_json::Value) {
        let rejection = EnvelopeJson::<Quantity>::from_request(json_request(body), &())
            .await
            .unwrap_err();
        let response = rejection.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_wrong_type_is_a_field_error() {
        let (status, body) = rejection_body(r#"{"product_quantity": "x"}"#).await;
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["errors"]["product_quantity"][0].is_string());
    }

    #[tokio::test]
    async fn test_malformed_json_is_an_envelope_message() {
        let (status, body) = rejection_body("{not json").await;
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["message"].is_string());
        assert!(body.get("detail").is_none());
    }

    #[tokio::test]
    async fn test_valid_body_is_extracted() {
        let EnvelopeJson(value) =
            EnvelopeJson::<Quantity>::from_request(json_request(r#"{"product_quantity": 2}"#), &())
                .await
                .unwrap();
        assert_eq!(value.product_quantity, 2);
    }
}
