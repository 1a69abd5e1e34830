//! # Tollgate Test
//!
//! In-memory testing for Tollgate services: requests are dispatched straight
//! into a [`Gateway`](tollgate_server::Gateway) without binding a port, and
//! still pass through routing, validation, deadlines and response shaping.
//!
//! - [`TestClient`] / [`TestRequestBuilder`] - build and send requests
//! - [`TestResponse`] - collected responses with JSON and envelope helpers
//! - [`TokenMinter`] - HS256 credentials plus the built-in verifier that
//!   accepts them
//! - [`MultipartBody`] - upload bodies delivered in chunks
//! - [`RecordingLogger`] and [`CountingVerifier`] - capability doubles
//!
//! ## Example
//!
//! ```rust,ignore
//! use tollgate_test::{TestClient, TokenMinter};
//!
//! #[tokio::test]
//! async fn test_scores_require_a_token() {
//!     let minter = TokenMinter::new("secret");
//!     let mut config = TollgateConfig::development();
//!     config.auth.require_auth = true;
//!     config.auth.expected_audience = minter.audience().to_string();
//!
//!     let client = TestClient::with_config(
//!         Gateway::builder()
//!             .route(Method::GET, "/scores", Scores)
//!             .builtin_verifier(minter.builtin_verifier()),
//!         config,
//!     )?;
//!
//!     client
//!         .get("/scores")
//!         .correlation_id("cid-1")
//!         .send()
//!         .await?
//!         .assert_failure(401, "No Authorization Header provided");
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/tollgate-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod multipart;
mod recording;
mod response;
mod token;

pub use client::{TestBody, TestClient, TestRequestBuilder};
pub use error::TestError;
pub use multipart::MultipartBody;
pub use recording::{CountingVerifier, LogEntry, RecordingLogger};
pub use response::TestResponse;
pub use token::{TokenMinter, TEST_AUDIENCE};
