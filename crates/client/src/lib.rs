//! scanlens Client
//!
//! Transport to the scanning service: the `ScanBackend` trait, its HTTP
//! implementation, and the server-push decoder behind summary streams.
//!
//! ## Module Organization
//!
//! - `backend` - `ScanBackend` trait and HTTP error mapping
//! - `http` - `HttpScanBackend`
//! - `http_client` - `reqwest::Client` construction with proxy support
//! - `sse` - incremental Server-Sent Events decoder
//! - `types` - request/response shapes

pub mod backend;
pub mod http;
pub mod http_client;
pub mod sse;
pub mod types;

pub use backend::{network_error, parse_http_error, ScanBackend};
pub use http::HttpScanBackend;
pub use http_client::{build_http_client, ClientOptions};
pub use sse::SseDecoder;
pub use types::{
    ApiEnvelope, FileUpload, FramePayloadStream, FullScanSubmission, HashLookupOutcome,
    HashLookupReport,
};
