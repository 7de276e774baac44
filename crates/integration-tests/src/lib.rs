//! End-to-end tests for the Fastprint server.
//!
//! Each test starts the real router on an ephemeral port, backed by
//! in-memory storage, an in-memory session store and a temporary media
//! directory, then drives it over HTTP with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p fastprint-integration-tests
//! ```
//!
//! No database is needed.

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::net::{Ipv4Addr, SocketAddr};

use reqwest::{Client, StatusCode, multipart};
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tower_sessions::MemoryStore;

use fastprint_core::ProfileId;
use fastprint_server::config::{FastprintConfig, SentryConfig};
use fastprint_server::db::Storage;
use fastprint_server::middleware::create_session_layer;
use fastprint_server::state::AppState;

/// Password given to every profile created through [`TestContext::signed_in`].
pub const PASSWORD: &str = "correct horse battery staple";

/// A running server and the handles tests need to inspect it.
pub struct TestContext {
    pub base_url: String,
    pub state: AppState,
    server: JoinHandle<()>,
    _media: TempDir,
}

impl TestContext {
    /// Start a fresh server with empty storage.
    pub async fn start() -> Self {
        let media = tempfile::tempdir().expect("Failed to create media dir");
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("Failed to bind test listener");
        let addr: SocketAddr = listener.local_addr().expect("Failed to read local address");

        let config = FastprintConfig {
            database_url: SecretString::from("postgres://unused"),
            host: addr.ip(),
            port: addr.port(),
            base_url: url::Url::parse(&format!("http://{addr}")).expect("Invalid base URL"),
            media_root: media.path().to_path_buf(),
            max_upload_mb: 5,
            sentry: SentryConfig::default(),
        };

        let state = AppState::new(config, Storage::in_memory());
        let session_layer = create_session_layer(MemoryStore::default(), false);
        let app = fastprint_server::app(state.clone(), session_layer);

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            server,
            _media: media,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A client with its own cookie jar, so each one is a separate session.
    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Create a profile through the API and return its JSON.
    pub async fn create_profile(&self, body: Value) -> Value {
        let resp = Self::client()
            .post(self.url("/api/userprofiles/"))
            .json(&body)
            .send()
            .await
            .expect("Failed to create profile");
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json().await.expect("Invalid profile JSON")
    }

    /// Log `client` in.
    pub async fn login(&self, client: &Client, email: &str, password: &str) -> reqwest::Response {
        client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to log in")
    }

    /// A logged-in client for a new profile with [`PASSWORD`].
    pub async fn signed_in(&self, email: &str) -> Client {
        self.create_profile(json!({ "email": email, "password": PASSWORD }))
            .await;
        let client = Self::client();
        let resp = self.login(&client, email, PASSWORD).await;
        assert_eq!(resp.status(), StatusCode::OK);
        client
    }

    /// A logged-in client for a new staff profile.
    ///
    /// The staff flag is not writable over HTTP, so it is set in storage
    /// before logging in.
    pub async fn staff(&self, email: &str) -> Client {
        let profile = self
            .create_profile(json!({ "email": email, "password": PASSWORD }))
            .await;
        let id = profile["id"].as_i64().expect("profile id");
        self.set_staff(id, true).await;

        let client = Self::client();
        let resp = self.login(&client, email, PASSWORD).await;
        assert_eq!(resp.status(), StatusCode::OK);
        client
    }

    /// Set or clear a profile's staff flag directly in storage.
    pub async fn set_staff(&self, id: i64, is_staff: bool) {
        let profiles = &self.state.storage().profiles;
        let mut stored = profiles
            .find(ProfileId::new(id))
            .await
            .expect("Failed to load profile")
            .expect("profile exists");
        stored.is_staff = is_staff;
        profiles.save(&stored).await.expect("Failed to save profile");
    }

    /// Add [`cart_item`] to the caller's cart and return the stored item.
    pub async fn add_to_cart(&self, client: &Client) -> Value {
        let resp = client
            .post(self.url("/api/cart/items/"))
            .json(&cart_item())
            .send()
            .await
            .expect("Failed to add cart item");
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.expect("Invalid cart JSON");
        body["data"].clone()
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A complete, valid cart item body.
#[must_use]
pub fn cart_item() -> Value {
    json!({
        "preview_form": "{\"binding_id\": 3, \"page_count\": 120}",
        "preview_project": "{\"projectTitle\": \"Field Notes\"}",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "company": "Analytical Engines Ltd",
        "address": "12 St James's Square",
        "country": "GB",
        "state": "London",
        "city": "London",
        "postal_code": "SW1Y 4JH",
        "phone_number": "+44 20 7946 0000",
        "shipping_rate": "9.99",
        "tax": "2.00",
        "tax_rate": "20%",
        "courier_name": "Royal Mail",
        "estimated_delivery": "3-5 business days",
        "selected_service": {"id": "rm-tracked-48", "price": "9.99"},
        "product_quantity": 2,
        "product_price": "22.50",
        "subtotal": "45.00",
        "display_total_cost": "56.99"
    })
}

/// Multipart body for a new project with a small PDF.
#[must_use]
pub fn book_form(title: &str) -> multipart::Form {
    let pdf = multipart::Part::bytes(b"%PDF-1.4\n%%EOF\n".to_vec())
        .file_name("interior.pdf")
        .mime_str("application/pdf")
        .expect("valid mime type");

    multipart::Form::new()
        .text("title", title.to_owned())
        .text("category", "Paperback")
        .text("binding_type", "Perfect Bound")
        .text("page_count", "120")
        .part("pdf_file", pdf)
}
