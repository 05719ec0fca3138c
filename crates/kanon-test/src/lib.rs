//! # Kanon Test
//!
//! In-memory testing for Kanon pipelines. Requests are built in the test,
//! sent through a [`Pipeline`](kanon_middleware::Pipeline) and a handler
//! closure, and the response body is read to the end so response capture
//! and background response validation complete as they would in a server.
//!
//! ## Example
//!
//! ```ignore
//! use kanon_test::TestClient;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn rejects_bad_body() {
//!     let client = TestClient::for_contract(contract, ValidationConfig::default(), handler);
//!
//!     client
//!         .post("/people")
//!         .json(&json!({"age": "old"}))
//!         .send()
//!         .await
//!         .assert_failure(StatusCode::BAD_REQUEST, "body:age value must be an integer");
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/kanon-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest, TestHandler};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
