//! List parameters shared by the collection endpoints
//!
//! Parses `limit`, `offset` and `view`, enforces the configured page cap
//! and renders the three list views. Validation happens before any store
//! access so an oversized `limit` never reaches the database.

use crate::config::{ApiConfig, DEFAULT_PAGE_LIMIT};
use crate::error::AppError;
use crate::store::Page;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Raw pagination parameters
///
/// Kept as strings so they can be flattened into per-endpoint parameter
/// structs and validated with our own error messages.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageParams {
    /// Maximum number of results (default 100)
    pub limit: Option<String>,
    /// Number of results to skip (default 0)
    pub offset: Option<String>,
    /// `objects` (default), `count` or `ids`
    pub view: Option<String>,
}

/// Shape of a list response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListView {
    /// Full JSON objects
    Objects,
    /// `{"count": N}` over all matches
    Count,
    /// Ids of the requested page
    Ids,
}

/// A validated list request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRequest {
    /// Page window
    pub page: Page,
    /// Response shape
    pub view: ListView,
}

impl PageParams {
    /// Validate against the configured limits
    pub fn resolve(&self, limits: &ApiConfig) -> Result<ListRequest, AppError> {
        let limit = parse_non_negative("limit", self.limit.as_deref(), DEFAULT_PAGE_LIMIT.into())?;
        if limit > u64::from(limits.max_limit) {
            return Err(AppError::BadRequest(format!(
                "limit {} exceeds the maximum of {}",
                limit, limits.max_limit
            )));
        }
        let offset = parse_non_negative("offset", self.offset.as_deref(), 0)?;

        let view = match self.view.as_deref().map(str::trim) {
            None | Some("") | Some("objects") => ListView::Objects,
            Some("count") => ListView::Count,
            Some("ids") => ListView::Ids,
            Some(other) => {
                return Err(AppError::BadRequest(format!(
                    "Unknown view '{}', expected objects, count or ids",
                    other
                )))
            }
        };

        Ok(ListRequest {
            page: Page {
                // Bounded by max_limit above
                limit: limit as u32,
                offset,
            },
            view,
        })
    }
}

fn parse_non_negative(name: &str, raw: Option<&str>, default: u64) -> Result<u64, AppError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(default),
        Some(raw) => raw,
    };
    if raw.starts_with('-') && raw[1..].parse::<u64>().is_ok() {
        return Err(AppError::BadRequest(format!(
            "{} must be non-negative, got {}",
            name, raw
        )));
    }
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be an integer, got '{}'", name, raw)))
}

/// Values an exact-match filter should be compared against
///
/// The query string is already decoded once by the extractor. Clients that
/// encode values before building the URL send them encoded twice, so the
/// value is matched both as given and decoded once more.
pub fn filter_value_candidates(value: &str) -> Vec<String> {
    let mut candidates = vec![value.to_string()];
    if let Ok(decoded) = percent_decode_str(value).decode_utf8() {
        if decoded != value {
            candidates.push(decoded.into_owned());
        }
    }
    candidates
}

/// A list response in one of the three views
#[derive(Debug)]
pub enum ListResponse<T> {
    /// Full objects
    Objects(Vec<T>),
    /// Total number of matches
    Count(u64),
    /// Ids of the page
    Ids(Vec<String>),
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ListResponse::Objects(items) => Json(items).into_response(),
            ListResponse::Count(count) => Json(json!({ "count": count })).into_response(),
            ListResponse::Ids(ids) => Json(ids).into_response(),
        }
    }
}
