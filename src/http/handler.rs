//! The request handler abstraction.

use async_trait::async_trait;
use axum::{body::Body, http::Request};

use super::ResponseWriter;

/// Something that answers a request by writing into a [`ResponseWriter`].
///
/// Handlers may panic; the recovery middleware turns that into an error
/// response.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn serve(&self, request: Request<Body>, writer: &mut dyn ResponseWriter);
}
