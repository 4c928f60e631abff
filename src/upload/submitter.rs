use async_trait::async_trait;
use std::sync::Arc;

use crate::catalog::FileTypeCatalog;
use crate::error::{SubmissionError, TransportError, ValidationError};
use crate::upload::progress::{ProgressCallback, ProgressReporter};
use crate::upload::requirements::RequiredTypes;
use crate::upload::types::{
    BulkUploadResponse, FileMetadata, RawFile, StagedUploadItem, SubmissionReceipt,
};

/// Everything sent in one bulk submission. `files` and `metadata` are
/// aligned by position.
#[derive(Debug, Clone)]
pub struct BulkUploadRequest {
    pub persona_id: i64,
    pub files: Vec<RawFile>,
    pub metadata: Vec<FileMetadata>,
}

impl BulkUploadRequest {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }

    pub fn metadata_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.metadata)
    }
}

/// Raw HTTP outcome of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Carries a bulk request to the server. Implementations report bytes
/// handed to the wire through `progress`.
#[async_trait]
pub trait BulkTransport: Send + Sync {
    async fn send_bulk(
        &self,
        request: BulkUploadRequest,
        token: &str,
        progress: ProgressReporter,
    ) -> Result<TransportResponse, TransportError>;
}

/// Gates and performs bulk submissions. Never touches the store it was
/// given items from.
pub struct BulkSubmitter {
    max_files: usize,
    required: RequiredTypes,
    catalog: Arc<FileTypeCatalog>,
    transport: Arc<dyn BulkTransport>,
}

impl BulkSubmitter {
    pub fn new(
        max_files: usize,
        required: RequiredTypes,
        catalog: Arc<FileTypeCatalog>,
        transport: Arc<dyn BulkTransport>,
    ) -> Self {
        Self {
            max_files,
            required,
            catalog,
            transport,
        }
    }

    /// All local problems that block a submission. Empty means the items may
    /// be sent.
    pub fn check_preconditions(&self, items: &[StagedUploadItem]) -> Vec<ValidationError> {
        if items.is_empty() {
            return vec![ValidationError::NoFilesSelected];
        }

        let mut errors = Vec::new();
        if items.len() > self.max_files {
            errors.push(ValidationError::TooManyFiles {
                max_files: self.max_files,
                dropped: None,
            });
        }

        let unassigned = items.iter().filter(|i| i.assigned_type_id.is_none()).count();
        if unassigned > 0 {
            errors.push(ValidationError::MissingTypeAssignment { count: unassigned });
        }

        let missing = self.required.missing(items);
        if !missing.is_empty() {
            errors.push(ValidationError::MissingRequiredTypes {
                names: missing.iter().map(|id| self.catalog.name_of(*id)).collect(),
            });
        }

        errors
    }

    fn build_request(persona_id: i64, items: &[StagedUploadItem]) -> BulkUploadRequest {
        let metadata = items
            .iter()
            .filter_map(|item| {
                item.assigned_type_id.map(|type_id| FileMetadata {
                    type_id,
                    description: item.effective_description().to_string(),
                })
            })
            .collect();
        BulkUploadRequest {
            persona_id,
            files: items.iter().map(|i| i.file.clone()).collect(),
            metadata,
        }
    }

    pub async fn submit(
        &self,
        persona_id: i64,
        items: &[StagedUploadItem],
        token: Option<String>,
        on_progress: ProgressCallback,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let errors = self.check_preconditions(items);
        if !errors.is_empty() {
            return Err(SubmissionError::ValidationFailed(errors));
        }
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(SubmissionError::Unauthenticated)?;

        let request = Self::build_request(persona_id, items);
        let total_bytes = request.total_bytes();
        let file_count = request.files.len();
        let progress = ProgressReporter::new(total_bytes, on_progress);
        progress.start();

        tracing::info!(
            "submitting {} file(s), {} bytes, for persona {}",
            file_count,
            total_bytes,
            persona_id
        );

        let response = self
            .transport
            .send_bulk(request, &token, progress.clone())
            .await
            .map_err(|e| {
                tracing::error!("bulk upload transport failure: {}", e);
                SubmissionError::from(e)
            })?;

        let receipt = interpret_response(response, persona_id, file_count, total_bytes)?;
        progress.complete();
        tracing::info!("bulk upload accepted for persona {}", persona_id);
        Ok(receipt)
    }
}

fn interpret_response(
    response: TransportResponse,
    persona_id: i64,
    file_count: usize,
    total_bytes: u64,
) -> Result<SubmissionReceipt, SubmissionError> {
    let parsed: Option<BulkUploadResponse> = serde_json::from_str(&response.body).ok();
    let status = response.status;

    if !(200..300).contains(&status) {
        let message = parsed
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("upload failed with status {}", status));
        tracing::warn!("bulk upload rejected ({}): {}", status, message);
        return Err(SubmissionError::ServerRejected { status, message });
    }

    match parsed {
        Some(body) if body.success => Ok(SubmissionReceipt {
            persona_id,
            file_count,
            total_bytes,
            message: body.message,
            data: body.data,
        }),
        // Stricter than a plain status check: a 2xx that reports
        // `success: false` is a rejection, not a completed upload.
        Some(body) => Err(SubmissionError::ServerRejected {
            status,
            message: body
                .message
                .unwrap_or_else(|| "server reported failure".to_string()),
        }),
        None => Err(SubmissionError::ServerRejected {
            status,
            message: "unreadable response body".to_string(),
        }),
    }
}
