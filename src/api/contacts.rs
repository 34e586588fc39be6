//! Contacts API handlers
//!
//! Contacts are read-only through the API; they are written by the sync side.

use crate::api::pagination::{ListResponse, ListView, PageParams};
use crate::error::AppError;
use crate::models::Contact;
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use tracing::debug;

/// Query parameters for `GET /n/:namespace_id/contacts`
#[derive(Debug, Default, Deserialize)]
pub struct ContactListParams {
    /// Substring matched against name or email
    pub filter: Option<String>,
    /// Pagination
    #[serde(flatten)]
    pub page: PageParams,
}

/// GET /n/:namespace_id/contacts - List contacts
pub async fn list_contacts(
    State(state): State<AppState>,
    Path(namespace_id): Path<String>,
    params: Result<Query<ContactListParams>, QueryRejection>,
) -> Result<ListResponse<Contact>, AppError> {
    let Query(params) = params?;
    let request = params.page.resolve(&state.limits)?;
    let filter = params.filter.as_deref();

    debug!(
        namespace_id = %namespace_id,
        filter = ?filter,
        limit = request.page.limit,
        offset = request.page.offset,
        "Listing contacts"
    );

    match request.view {
        ListView::Count => Ok(ListResponse::Count(
            state.db.count_contacts(&namespace_id, filter).await?,
        )),
        ListView::Objects => Ok(ListResponse::Objects(
            state
                .db
                .list_contacts(&namespace_id, filter, request.page)
                .await?,
        )),
        ListView::Ids => {
            let contacts = state
                .db
                .list_contacts(&namespace_id, filter, request.page)
                .await?;
            Ok(ListResponse::Ids(
                contacts.into_iter().map(|contact| contact.id).collect(),
            ))
        }
    }
}

/// GET /n/:namespace_id/contacts/:contact_id - Get a specific contact
pub async fn get_contact(
    State(state): State<AppState>,
    Path((namespace_id, contact_id)): Path<(String, String)>,
) -> Result<Json<Contact>, AppError> {
    let contact = state
        .db
        .get_contact(&namespace_id, &contact_id)
        .await?
        .ok_or(AppError::ContactNotFound(contact_id))?;

    Ok(Json(contact))
}
