//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all route)
//!     → request.rs (request ID, target rewrite)
//!     → pool picks the next healthy backend
//!     → hyper-util client forwards the request
//!     → response.rs (maps dispatch failures to status codes)
//!     → backend response streamed to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{rewrite_target, X_REQUEST_ID};
pub use response::{DispatchError, NO_HEALTHY_SERVERS};
pub use server::HttpServer;
