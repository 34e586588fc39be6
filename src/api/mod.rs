//! API module
//!
//! Contains HTTP request handlers for the namespace-scoped contact and file
//! endpoints, and the router wiring them together.

pub mod contacts;
pub mod files;
pub mod pagination;

use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, routing::get, Router};

/// Room for multipart boundaries and part headers on top of the payload
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the `/n/:namespace_id/...` routes
pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.limits.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/n/:namespace_id/contacts", get(contacts::list_contacts))
        .route(
            "/n/:namespace_id/contacts/:contact_id",
            get(contacts::get_contact),
        )
        .route(
            "/n/:namespace_id/files",
            get(files::list_files)
                .post(files::upload_file)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/n/:namespace_id/files/:file_id", get(files::get_file))
        .route(
            "/n/:namespace_id/files/:file_id/download",
            get(files::download_file),
        )
        .with_state(state)
}
