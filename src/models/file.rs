//! File (attachment) model

use serde::Serialize;
use tracing::warn;

/// Value of the `object` field on every file
pub const FILE_OBJECT: &str = "file";

/// Longest filename kept on a file record, in characters
pub const MAX_FILENAME_LEN: usize = 64;

/// Trailing characters preserved when a filename is trimmed
const KEPT_SUFFIX_LEN: usize = 8;

/// Fallback content type for parts that do not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// File metadata as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    /// Public identifier, unique within the namespace
    pub id: String,
    /// Namespace the file belongs to
    pub namespace_id: String,
    /// Original filename, if the uploader or sender supplied one
    pub filename: Option<String>,
    /// Payload size in bytes
    pub size: u64,
    /// Declared content type, stored verbatim
    pub content_type: String,
    /// Messages this file is attached to
    pub message_ids: Vec<String>,
    /// Content-ID of the MIME part, without angle brackets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    /// Always `"file"`
    pub object: String,
}

/// How a file is presented inside its message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Standalone attachment
    Attachment,
    /// Rendered inside the message body (e.g. an embedded image)
    Inline,
}

impl Disposition {
    /// Convert the disposition to its stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        }
    }
}

/// A file record about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    /// Owning namespace
    pub namespace_id: String,
    /// Filename, already trimmed
    pub filename: Option<String>,
    /// Payload size in bytes
    pub size: u64,
    /// Declared content type
    pub content_type: String,
    /// Block store key of the payload
    pub data_sha256: String,
    /// Content-ID without angle brackets
    pub content_id: Option<String>,
    /// Content disposition, if the part declared one
    pub disposition: Option<Disposition>,
    /// Messages the file is attached to
    pub message_ids: Vec<String>,
}

impl NewFile {
    /// Describe a file received through the upload endpoint
    pub fn uploaded(
        namespace_id: &str,
        filename: Option<&str>,
        content_type: Option<&str>,
        data_sha256: String,
        size: u64,
    ) -> Self {
        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        Self {
            namespace_id: namespace_id.to_string(),
            filename: filename
                .filter(|name| !name.is_empty())
                .map(trim_filename),
            size,
            content_type: content_type.to_string(),
            data_sha256,
            content_id: None,
            disposition: Some(Disposition::Attachment),
            message_ids: Vec::new(),
        }
    }

    /// Attach a Content-ID, stripping surrounding angle brackets
    pub fn with_content_id(mut self, content_id: &str) -> Self {
        let trimmed = content_id
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
            .unwrap_or(content_id);
        self.content_id = Some(trimmed.to_string()).filter(|id| !id.is_empty());
        self
    }
}

/// Trim an overlong filename, keeping its last characters so the
/// extension survives
pub fn trim_filename(name: &str) -> String {
    let len = name.chars().count();
    if len <= MAX_FILENAME_LEN {
        return name.to_string();
    }

    warn!(max_len = MAX_FILENAME_LEN, filename = %name, "Filename is too long, truncating");
    let head: String = name.chars().take(MAX_FILENAME_LEN - KEPT_SUFFIX_LEN).collect();
    let tail: String = name.chars().skip(len - KEPT_SUFFIX_LEN).collect();
    head + &tail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_filename_short_is_untouched() {
        assert_eq!(trim_filename("report.pdf"), "report.pdf");
        let exact = "a".repeat(MAX_FILENAME_LEN);
        assert_eq!(trim_filename(&exact), exact);
    }

    #[test]
    fn test_trim_filename_keeps_extension() {
        let long = format!("{}.tar.gz", "x".repeat(100));
        let trimmed = trim_filename(&long);
        assert_eq!(trimmed.chars().count(), MAX_FILENAME_LEN);
        assert!(trimmed.ends_with("x.tar.gz"));
        assert!(trimmed.starts_with(&"x".repeat(56)));
    }

    #[test]
    fn test_trim_filename_multibyte() {
        let long = "é".repeat(70);
        let trimmed = trim_filename(&long);
        assert_eq!(trimmed.chars().count(), MAX_FILENAME_LEN);
    }

    #[test]
    fn test_uploaded_defaults() {
        let file = NewFile::uploaded("ns", Some(""), None, "ab".repeat(32), 3);
        assert_eq!(file.filename, None);
        assert_eq!(file.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(file.disposition, Some(Disposition::Attachment));
        assert!(file.message_ids.is_empty());
    }

    #[test]
    fn test_with_content_id_strips_brackets() {
        let file = NewFile::uploaded("ns", Some("a.png"), Some("image/png"), "00".into(), 1)
            .with_content_id("<img1@example.com>");
        assert_eq!(file.content_id.as_deref(), Some("img1@example.com"));

        let file = NewFile::uploaded("ns", None, None, "00".into(), 1).with_content_id("plain");
        assert_eq!(file.content_id.as_deref(), Some("plain"));
    }

    #[test]
    fn test_disposition_as_str() {
        assert_eq!(Disposition::Inline.as_str(), "inline");
        assert_eq!(Disposition::Attachment.as_str(), "attachment");
    }

    #[test]
    fn test_file_json_omits_missing_content_id() {
        let file = File {
            id: "f1".into(),
            namespace_id: "ns".into(),
            filename: None,
            size: 0,
            content_type: "text/plain".into(),
            message_ids: vec![],
            content_id: None,
            object: FILE_OBJECT.into(),
        };
        let value = serde_json::to_value(&file).unwrap();
        assert!(value.get("content_id").is_none());
        assert_eq!(value["filename"], serde_json::Value::Null);
        assert_eq!(value["object"], "file");
        assert_eq!(value["message_ids"], serde_json::json!([]));
    }
}
