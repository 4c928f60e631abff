//! HTTP client for the SIGAP REST API.
//!
//! Covers the two endpoints the uploader needs: the paginated file type
//! catalog and the bulk multipart upload.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::time::Duration;

use crate::catalog::{ApiFileType, FileTypeCatalog, FileTypeDescriptor, PaginatedResponse};
use crate::error::TransportError;
use crate::upload::{BulkTransport, BulkUploadRequest, ProgressReporter, TransportResponse};
use crate::{Result, UploaderError};

pub const FILE_TYPES_PATH: &str = "/tipos-archivos/getAll";
pub const BULK_UPLOAD_PATH: &str = "/archivos/bulkCreate";

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Slowest sustained upload rate a bulk transfer is allowed before it is
/// treated as stalled.
const MIN_UPLOAD_BYTES_PER_SEC: u64 = 32 * 1024;

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    chunk_size: usize,
}

impl ApiClient {
    /// `timeout` bounds connecting and each catalog request. Bulk uploads
    /// get a deadline scaled to their size, see [`ApiClient::upload_timeout`].
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| UploaderError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Deadline for a bulk upload of `total_bytes`: the base timeout plus
    /// the time the body needs at the minimum acceptable rate.
    pub fn upload_timeout(&self, total_bytes: u64) -> Duration {
        let secs = (total_bytes + MIN_UPLOAD_BYTES_PER_SEC - 1) / MIN_UPLOAD_BYTES_PER_SEC;
        self.timeout + Duration::from_secs(secs)
    }

    /// Size of the chunks file contents are streamed in. Smaller chunks give
    /// finer progress.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetches every page of the file type catalog.
    pub async fn fetch_file_types(
        &self,
        token: Option<&str>,
        page_size: u32,
    ) -> Result<FileTypeCatalog> {
        let page_size = page_size.max(1);
        let url = self.build_url(FILE_TYPES_PATH);
        let mut types: Vec<FileTypeDescriptor> = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let mut request = self
                .client
                .get(&url)
                .timeout(self.timeout)
                .query(&[("limit", page_size as u64), ("offset", offset)]);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(UploaderError::Catalog(format!(
                    "request failed with status {}: {}",
                    status, error_text
                )));
            }

            let page: PaginatedResponse<ApiFileType> = response
                .json()
                .await
                .map_err(|e| UploaderError::Catalog(format!("invalid response: {e}")))?;
            let received = page.data.len() as u64;
            types.extend(page.data.into_iter().map(FileTypeDescriptor::from));
            tracing::debug!("fetched {} file type(s) at offset {}", received, offset);

            offset += received;
            let total = page.pagination.map(|p| p.total).unwrap_or(offset);
            if received == 0 || offset >= total {
                break;
            }
        }

        tracing::info!("file type catalog loaded: {} type(s)", types.len());
        FileTypeCatalog::from_descriptors(types)
    }

    fn chunked_part(&self, data: Bytes, progress: ProgressReporter) -> Part {
        let len = data.len() as u64;
        let chunk_size = self.chunk_size;
        let chunks: Vec<Bytes> = (0..data.len())
            .step_by(chunk_size)
            .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
            .collect();
        let body = stream::iter(chunks.into_iter().map(move |chunk| {
            progress.advance(chunk.len() as u64);
            Ok::<Bytes, std::io::Error>(chunk)
        }));
        Part::stream_with_length(Body::wrap_stream(body), len)
    }

    async fn build_form(
        &self,
        request: &BulkUploadRequest,
        progress: &ProgressReporter,
    ) -> std::result::Result<Form, TransportError> {
        let metadata = request
            .metadata_json()
            .map_err(|e| TransportError::Network(format!("failed to encode metadata: {e}")))?;

        let mut form = Form::new().text("persona_id", request.persona_id.to_string());
        for file in &request.files {
            let data = file.read().await.map_err(|e| TransportError::FileRead {
                name: file.name.clone(),
                reason: e.to_string(),
            })?;
            let part = self
                .chunked_part(data, progress.clone())
                .file_name(file.name.clone())
                .mime_str(&file.mime_type)
                .map_err(|e| TransportError::FileRead {
                    name: file.name.clone(),
                    reason: format!("invalid MIME type {}: {}", file.mime_type, e),
                })?;
            form = form.part("archivos", part);
        }
        Ok(form.text("metadata", metadata))
    }
}

#[async_trait]
impl BulkTransport for ApiClient {
    async fn send_bulk(
        &self,
        request: BulkUploadRequest,
        token: &str,
        progress: ProgressReporter,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let deadline = self.upload_timeout(request.total_bytes());
        let form = self.build_form(&request, &progress).await?;
        let url = self.build_url(BULK_UPLOAD_PATH);
        tracing::debug!("bulk upload deadline {:?}", deadline);

        let response = self
            .client
            .post(&url)
            .timeout(deadline)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(format!("failed to send request: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(format!("failed to read response: {e}")))?;

        Ok(TransportResponse { status, body })
    }
}
