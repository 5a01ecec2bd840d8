//! Static asset serving from the current asset tree.
//!
//! # Responsibilities
//! - Resolve request paths inside one `AssetTree` snapshot
//! - Negotiate gzip/brotli when compression is enabled
//! - Pin content types for build outputs
//!
//! # Design Decisions
//! - `ServeDir` handles decoding, traversal protection, `index.html`
//!   and conditional requests
//! - Missing files are a plain 404; nothing falls back to another tree

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::response::Response;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

use crate::assets::{mime, AssetTree};

/// Serve `request` out of `tree`.
pub async fn serve(tree: Arc<AssetTree>, compress: bool, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();
    let serve_dir = ServeDir::new(tree.root());

    let response = if compress {
        let service = ServiceBuilder::new()
            .layer(CompressionLayer::new())
            .service(serve_dir);
        match service.oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        }
    } else {
        match serve_dir.oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        }
    };

    pin_content_type(response, &path)
}

fn pin_content_type(mut response: Response, path: &str) -> Response {
    if response.status().is_success() {
        if let Some(ty) = mime::from_path(path) {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(ty));
        }
    }
    response
}
