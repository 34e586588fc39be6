//! Record store
//!
//! Handles all database interactions for contacts and file metadata.

use crate::error::AppError;
use crate::models::file::FILE_OBJECT;
use crate::models::{generate_public_id, Contact, File, NewFile};
use crate::store::query::{ListQuery, Page};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const CONTACT_COLUMNS: &str =
    "SELECT id, namespace_id, name, email, 'contact' AS object FROM contacts";
const CONTACT_COUNT: &str = "SELECT COUNT(*) FROM contacts";

const FILE_COLUMNS: &str = "SELECT f.id, f.namespace_id, f.filename, f.size, f.content_type, \
     f.content_id, f.data_sha256 FROM files f";
const FILE_COUNT: &str = "SELECT COUNT(*) FROM files f";

/// Inline attachments are never exposed through file listings
const NOT_INLINE: &str = "(f.content_disposition IS NULL OR f.content_disposition <> 'inline')";

/// Exact-match filters accepted by the file listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    /// Only files attached to this message
    pub message_id: Option<String>,
    /// Only files with exactly this name
    pub filename: Option<String>,
    /// Only files whose content type is one of these (any type when empty)
    pub content_types: Vec<String>,
}

/// A file record together with its block store key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// API view of the record
    pub file: File,
    /// Key of the payload in the block store
    pub data_sha256: String,
}

#[derive(Debug, FromRow)]
struct FileRow {
    id: String,
    namespace_id: String,
    filename: Option<String>,
    size: i64,
    content_type: String,
    content_id: Option<String>,
    data_sha256: String,
}

impl FileRow {
    fn into_stored(self, message_ids: Vec<String>) -> StoredFile {
        StoredFile {
            file: File {
                id: self.id,
                namespace_id: self.namespace_id,
                filename: self.filename,
                size: u64::try_from(self.size).unwrap_or_default(),
                content_type: self.content_type,
                message_ids,
                content_id: self.content_id,
                object: FILE_OBJECT.to_string(),
            },
            data_sha256: self.data_sha256,
        }
    }
}

fn db_error(context: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| AppError::Internal(anyhow::anyhow!("{}: {}", context, e))
}

/// Database connection pool for contacts and files
pub struct InboxDb {
    pool: SqlitePool,
}

impl InboxDb {
    /// Initialize database connection pool
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    ///
    /// # Returns
    /// * `Ok(InboxDb)` if successful
    /// * `Err(AppError)` if connection failed
    pub async fn new(db_path: &Path) -> Result<Self, AppError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to create db directory: {}", e))
            })?;
        }

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid database path: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        info!("Connected to SQLite database at: {}", db_path.display());

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");

        let migration_sql = include_str!("../../migrations/001_create_inbox.sql");

        // Remove comments and normalize whitespace
        let mut cleaned_sql = String::new();
        for line in migration_sql.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            }
            let without_comments = match trimmed.find("--") {
                Some(comment_pos) => &trimmed[..comment_pos],
                None => trimmed,
            };
            cleaned_sql.push_str(without_comments.trim());
            cleaned_sql.push(' ');
        }

        let statements = cleaned_sql
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty());

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::Internal(anyhow::anyhow!(
                        "Migration failed: {} - Statement: {}",
                        e,
                        statement.chars().take(100).collect::<String>()
                    ))
                })?;
        }

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Insert or update a contact (used by the sync side, never by the API)
    pub async fn upsert_contact(&self, contact: &Contact) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO contacts (id, namespace_id, name, email) VALUES (?, ?, ?, ?) \
             ON CONFLICT(namespace_id, id) DO UPDATE \
             SET name = excluded.name, email = excluded.email",
        )
        .bind(&contact.id)
        .bind(&contact.namespace_id)
        .bind(&contact.name)
        .bind(&contact.email)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to upsert contact"))?;

        debug!(
            contact_id = %contact.id,
            namespace_id = %contact.namespace_id,
            "Upserted contact"
        );
        Ok(())
    }

    /// Get a contact by ID within a namespace
    pub async fn get_contact(
        &self,
        namespace_id: &str,
        id: &str,
    ) -> Result<Option<Contact>, AppError> {
        let sql = format!("{} WHERE namespace_id = ? AND id = ?", CONTACT_COLUMNS);
        sqlx::query_as::<_, Contact>(&sql)
            .bind(namespace_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to fetch contact"))
    }

    fn contact_query<'a>(head: &str, namespace_id: &str, filter: Option<&str>) -> ListQuery<'a> {
        let mut query = ListQuery::new(head);
        query
            .filter_eq("namespace_id", Some(namespace_id.to_string()))
            .filter_contains_any(&["name", "email"], filter);
        query
    }

    /// List contacts in insertion order, optionally filtered by a
    /// substring of name or email
    pub async fn list_contacts(
        &self,
        namespace_id: &str,
        filter: Option<&str>,
        page: Page,
    ) -> Result<Vec<Contact>, AppError> {
        let mut query = Self::contact_query(CONTACT_COLUMNS, namespace_id, filter);
        query.paginate("rowid", page);
        query
            .builder()
            .build_query_as::<Contact>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list contacts"))
    }

    /// Count contacts matching the same filter as `list_contacts`
    pub async fn count_contacts(
        &self,
        namespace_id: &str,
        filter: Option<&str>,
    ) -> Result<u64, AppError> {
        let mut query = Self::contact_query(CONTACT_COUNT, namespace_id, filter);
        let count: i64 = query
            .builder()
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count contacts"))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Insert a new file record and its message associations
    pub async fn insert_file(&self, new_file: &NewFile) -> Result<File, AppError> {
        let id = generate_public_id();
        let size = i64::try_from(new_file.size)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("File size out of range")))?;

        let mut message_ids: Vec<String> = Vec::with_capacity(new_file.message_ids.len());
        for message_id in &new_file.message_ids {
            if !message_ids.contains(message_id) {
                message_ids.push(message_id.clone());
            }
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        sqlx::query(
            "INSERT INTO files (id, namespace_id, filename, size, content_type, content_id, \
             content_disposition, data_sha256, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new_file.namespace_id)
        .bind(new_file.filename.as_deref())
        .bind(size)
        .bind(&new_file.content_type)
        .bind(new_file.content_id.as_deref())
        .bind(new_file.disposition.map(|d| d.as_str()))
        .bind(&new_file.data_sha256)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to insert file"))?;

        for message_id in &message_ids {
            sqlx::query("INSERT INTO file_messages (file_id, message_id) VALUES (?, ?)")
                .bind(&id)
                .bind(message_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to link file to message"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit file insert"))?;

        debug!(
            file_id = %id,
            namespace_id = %new_file.namespace_id,
            size = new_file.size,
            "Inserted file"
        );

        Ok(File {
            id,
            namespace_id: new_file.namespace_id.clone(),
            filename: new_file.filename.clone(),
            size: new_file.size,
            content_type: new_file.content_type.clone(),
            message_ids,
            content_id: new_file.content_id.clone(),
            object: FILE_OBJECT.to_string(),
        })
    }

    /// Get a file by ID within a namespace
    ///
    /// Inline attachments are addressable by id even though listings hide them.
    pub async fn get_file(
        &self,
        namespace_id: &str,
        id: &str,
    ) -> Result<Option<StoredFile>, AppError> {
        let sql = format!("{} WHERE f.namespace_id = ? AND f.id = ?", FILE_COLUMNS);
        let row = sqlx::query_as::<_, FileRow>(&sql)
            .bind(namespace_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to fetch file"))?;

        match row {
            Some(row) => Ok(self.with_message_ids(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    fn file_query<'a>(head: &str, namespace_id: &str, filter: &FileFilter) -> ListQuery<'a> {
        let mut query = ListQuery::new(head);
        query
            .filter_eq("f.namespace_id", Some(namespace_id.to_string()))
            .filter_raw(NOT_INLINE)
            .filter_eq("f.filename", filter.filename.clone())
            .filter_in("f.content_type", &filter.content_types)
            .filter_in_subquery(
                "f.id",
                "SELECT file_id FROM file_messages WHERE message_id = ",
                filter.message_id.clone(),
            );
        query
    }

    /// List non-inline files in insertion order
    pub async fn list_files(
        &self,
        namespace_id: &str,
        filter: &FileFilter,
        page: Page,
    ) -> Result<Vec<File>, AppError> {
        let mut query = Self::file_query(FILE_COLUMNS, namespace_id, filter);
        query.paginate("f.rowid", page);
        let rows = query
            .builder()
            .build_query_as::<FileRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list files"))?;

        Ok(self
            .with_message_ids(rows)
            .await?
            .into_iter()
            .map(|stored| stored.file)
            .collect())
    }

    /// Count files matching the same filter as `list_files`
    pub async fn count_files(
        &self,
        namespace_id: &str,
        filter: &FileFilter,
    ) -> Result<u64, AppError> {
        let mut query = Self::file_query(FILE_COUNT, namespace_id, filter);
        let count: i64 = query
            .builder()
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count files"))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Whether any file record, in any namespace, points at this blob
    pub async fn blob_in_use(&self, data_sha256: &str) -> Result<bool, AppError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM files WHERE data_sha256 = ? LIMIT 1")
                .bind(data_sha256)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to check block references"))?;
        Ok(found.is_some())
    }

    /// Load message associations for a batch of file rows in one query
    async fn with_message_ids(&self, rows: Vec<FileRow>) -> Result<Vec<StoredFile>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "SELECT file_id, message_id FROM file_messages WHERE file_id IN (",
        );
        let mut ids = builder.separated(", ");
        for row in &rows {
            ids.push_bind(row.id.clone());
        }
        builder.push(") ORDER BY rowid");

        let links = builder
            .build_query_as::<(String, String)>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to fetch file messages"))?;

        let mut by_file: HashMap<String, Vec<String>> = HashMap::new();
        for (file_id, message_id) in links {
            by_file.entry(file_id).or_default().push(message_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let message_ids = by_file.remove(&row.id).unwrap_or_default();
                row.into_stored(message_ids)
            })
            .collect())
    }
}
