//! Files API handlers
//!
//! Metadata listing and lookup, multipart upload and streamed download.
//! Uses the file service layer for storage.

use crate::api::pagination::{filter_value_candidates, ListResponse, ListView, PageParams};
use crate::error::AppError;
use crate::models::file::DEFAULT_CONTENT_TYPE;
use crate::models::File;
use crate::services::files::FileService;
use crate::state::AppState;
use crate::store::FileFilter;
use axum::{
    body::Body,
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::QueryRejection,
        Path, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{Json, Response},
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// Name of the multipart field carrying the upload
pub const UPLOAD_FIELD: &str = "file";

/// Query parameters for `GET /n/:namespace_id/files`
#[derive(Debug, Default, Deserialize)]
pub struct FileListParams {
    /// Only files attached to this message
    pub message_id: Option<String>,
    /// Only files with exactly this name
    pub filename: Option<String>,
    /// Only files with exactly this content type, optionally percent-encoded
    pub content_type: Option<String>,
    /// Pagination
    #[serde(flatten)]
    pub page: PageParams,
}

impl FileListParams {
    fn filter(&self) -> FileFilter {
        FileFilter {
            message_id: self.message_id.clone(),
            filename: self.filename.clone(),
            content_types: self
                .content_type
                .as_deref()
                .map(filter_value_candidates)
                .unwrap_or_default(),
        }
    }
}

/// GET /n/:namespace_id/files - List files, excluding inline attachments
pub async fn list_files(
    State(state): State<AppState>,
    Path(namespace_id): Path<String>,
    params: Result<Query<FileListParams>, QueryRejection>,
) -> Result<ListResponse<File>, AppError> {
    let Query(params) = params?;
    let request = params.page.resolve(&state.limits)?;
    let filter = params.filter();

    debug!(
        namespace_id = %namespace_id,
        filter = ?filter,
        limit = request.page.limit,
        offset = request.page.offset,
        "Listing files"
    );

    match request.view {
        ListView::Count => Ok(ListResponse::Count(
            state.db.count_files(&namespace_id, &filter).await?,
        )),
        ListView::Objects => Ok(ListResponse::Objects(
            state
                .db
                .list_files(&namespace_id, &filter, request.page)
                .await?,
        )),
        ListView::Ids => {
            let files = state
                .db
                .list_files(&namespace_id, &filter, request.page)
                .await?;
            Ok(ListResponse::Ids(files.into_iter().map(|file| file.id).collect()))
        }
    }
}

/// GET /n/:namespace_id/files/:file_id - Get file metadata
pub async fn get_file(
    State(state): State<AppState>,
    Path((namespace_id, file_id)): Path<(String, String)>,
) -> Result<Json<File>, AppError> {
    let stored = state
        .db
        .get_file(&namespace_id, &file_id)
        .await?
        .ok_or(AppError::FileNotFound(file_id))?;

    Ok(Json(stored.file))
}

/// GET /n/:namespace_id/files/:file_id/download - Stream the raw payload
pub async fn download_file(
    State(state): State<AppState>,
    Path((namespace_id, file_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let (file, handle) = FileService::open(&state, &namespace_id, &file_id).await?;

    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let disposition = content_disposition(file.filename.as_deref().unwrap_or(&file.id));

    debug!(file_id = %file.id, size = file.size, "Streaming file download");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, file.size)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(handle)))
        .map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to build download response: {}", e))
        })
}

/// POST /n/:namespace_id/files - Upload a file
///
/// Accepts multipart form data with a single `file` field and responds with
/// a one-element array holding the new file.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(namespace_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<File>>, AppError> {
    let mut multipart = multipart?;
    let mut received = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != UPLOAD_FIELD {
            warn!("Unknown multipart field: {}", field_name);
            continue;
        }
        if received.is_some() {
            return Err(AppError::BadRequest(
                "Only one file may be uploaded per request".to_string(),
            ));
        }
        received = Some(FileService::receive(&state, field).await?);
    }

    // The staged payload is only committed once the whole body parsed cleanly
    let upload = received.ok_or_else(|| {
        AppError::BadRequest(format!("Missing multipart field '{}'", UPLOAD_FIELD))
    })?;
    let file = FileService::store(&state, &namespace_id, upload).await?;

    Ok(Json(vec![file]))
}

/// Build a `Content-Disposition: attachment` value for `filename`
///
/// Quotes and control characters are replaced in the plain `filename`
/// parameter; names that are not printable ASCII also get an RFC 5987
/// `filename*` parameter carrying the exact UTF-8 name.
fn content_disposition(filename: &str) -> HeaderValue {
    let ascii_safe = filename
        .chars()
        .all(|c| c.is_ascii_graphic() || c == ' ')
        && !filename.contains(['"', '\\']);

    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    let value = if ascii_safe {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            utf8_percent_encode(filename, NON_ALPHANUMERIC)
        )
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
