//! Device-management API access
//!
//! # Submodules
//!
//! - `traits` - Transport abstraction for testability
//! - `http` - Blocking HTTP transport with basic auth
//! - `models` - Wire types for devices and locations
//! - `client` - Typed endpoint calls
//!
//! # Architecture
//!
//! `ApiClient` is generic over `Transport`. The HTTP transport is used in
//! production; `testdb::MockApi` implements the same trait over an in-memory
//! fleet so the directory and notes logic can be exercised without a server.

pub mod client;
pub mod http;
pub mod models;
pub mod traits;

pub use client::ApiClient;
pub use http::HttpTransport;
pub use models::{DeviceRecord, DeviceSummary, Location, NotesField};
pub use traits::{ApiRequest, ApiResponse, Method, Transport, TransportError};
