//! Request preparation for forwarding.
//!
//! # Responsibilities
//! - Request ID layers (generate when absent, echo on the response)
//! - Rewrite the request target onto a backend address

use axum::http::{HeaderName, Uri};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use url::Url;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Point `uri` at `backend`, keeping the request path and query.
///
/// A path on the backend address acts as a prefix.
pub fn rewrite_target(uri: &Uri, backend: &Url) -> Result<Uri, axum::http::uri::InvalidUri> {
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let base = backend.as_str().trim_end_matches('/');
    format!("{}{}", base, path_and_query).parse()
}
