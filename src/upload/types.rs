use bytes::Bytes;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Client-generated identifier of a staged item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId(String);

impl ItemId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub enum FileSource {
    Path(PathBuf),
    Memory(#[derivative(Debug = "ignore")] Arc<[u8]>),
}

/// A file picked or dropped by the user, before validation.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub source: FileSource,
}

impl RawFile {
    /// Stats a file on disk and guesses its MIME type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            mime_type: guess_mime(&name),
            name,
            size_bytes: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: Arc<[u8]>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    /// In-memory file whose MIME type is guessed from its name.
    pub fn from_named_bytes(name: impl Into<String>, bytes: Arc<[u8]>) -> Self {
        let name = name.into();
        let mime_type = guess_mime(&name);
        Self::from_bytes(name, mime_type, bytes)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.to_ascii_lowercase().starts_with("image/")
    }

    pub async fn read(&self) -> std::io::Result<Bytes> {
        match &self.source {
            FileSource::Path(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
            FileSource::Memory(bytes) => Ok(Bytes::copy_from_slice(bytes)),
        }
    }
}

fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Thumbnail resource registered with the UI image cache under `uri`.
/// Memory-backed files carry their bytes so the UI can register them.
#[derive(Derivative, Clone, PartialEq)]
#[derivative(Debug)]
pub struct PreviewHandle {
    pub uri: String,
    #[derivative(Debug = "ignore")]
    pub bytes: Option<Arc<[u8]>>,
}

impl PreviewHandle {
    pub(crate) fn for_file(id: &ItemId, file: &RawFile) -> Option<Self> {
        if !file.is_image() {
            return None;
        }
        Some(match &file.source {
            FileSource::Path(path) => Self {
                uri: format!("file://{}", path.display()),
                bytes: None,
            },
            FileSource::Memory(bytes) => Self {
                uri: format!("bytes://preview/{}/{}", id, file.name),
                bytes: Some(bytes.clone()),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Uploading,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct StagedUploadItem {
    pub id: ItemId,
    pub file: RawFile,
    pub assigned_type_id: Option<i64>,
    pub description: String,
    pub preview: Option<PreviewHandle>,
    pub state: ItemState,
}

impl StagedUploadItem {
    pub(crate) fn new(file: RawFile) -> Self {
        let id = ItemId::generate();
        let preview = PreviewHandle::for_file(&id, &file);
        Self {
            id,
            file,
            assigned_type_id: None,
            description: String::new(),
            preview,
            state: ItemState::Pending,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.state {
            ItemState::Failed(detail) => Some(detail),
            _ => None,
        }
    }

    /// Description sent to the server; blank descriptions fall back to the
    /// file name.
    pub fn effective_description(&self) -> &str {
        if self.description.trim().is_empty() {
            &self.file.name
        } else {
            &self.description
        }
    }
}

/// The only user-editable fields of a staged item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemEdit {
    AssignType(Option<i64>),
    Description(String),
}

/// One entry of the `metadata` form field, aligned with `archivos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(rename = "tipo_archivo_id")]
    pub type_id: i64,
    #[serde(rename = "descripcion")]
    pub description: String,
}

/// Body of the bulk upload response.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkUploadResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub persona_id: i64,
    pub file_count: usize,
    pub total_bytes: u64,
    pub message: Option<String>,
    pub data: Option<serde_json::Value>,
}
