//! Configuration for the uploader.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::upload::FileConstraints;
use crate::utils::file_size::FileSizeUtils;
use crate::{Result, UploaderError};

/// REST API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API, including the `/api` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Connect and catalog request timeout in seconds. Bulk uploads extend
    /// it in proportion to their size.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Page size used when fetching the file type catalog.
    #[serde(default = "default_catalog_page_size")]
    pub catalog_page_size: u32,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_catalog_page_size() -> u32 {
    100
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            catalog_page_size: default_catalog_page_size(),
        }
    }
}

/// Which kind of uploader the window hosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploaderPreset {
    /// Any number of documents up to `max_files`, typed by the user.
    #[default]
    Documents,
    /// One profile photo. A new pick replaces the staged one and is typed
    /// automatically with `photo_type_id`.
    ProfilePhoto,
}

/// Description sent with profile photos.
pub const PROFILE_PHOTO_DESCRIPTION: &str = "Foto de perfil";

/// Limits and requirements for one uploader session.
#[derive(Debug, Clone, Deserialize)]
pub struct UploaderSettings {
    #[serde(default)]
    pub preset: UploaderPreset,
    /// File type assigned to profile photos. Required by the
    /// `profile_photo` preset.
    #[serde(default)]
    pub photo_type_id: Option<i64>,
    /// Person the uploaded files are attached to.
    #[serde(default)]
    pub persona_id: Option<i64>,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
    /// File type ids that must be present before submitting.
    #[serde(default)]
    pub required_type_ids: Vec<i64>,
    /// Size of the chunks files are streamed in; drives progress granularity.
    #[serde(default = "default_chunk_size_kb")]
    pub chunk_size_kb: usize,
}

fn default_max_files() -> usize {
    20
}

fn default_max_file_size_mb() -> u64 {
    10
}

fn default_allowed_mime_types() -> Vec<String> {
    [
        "application/pdf",
        "image/jpeg",
        "image/jpg",
        "image/png",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_chunk_size_kb() -> usize {
    64
}

impl Default for UploaderSettings {
    fn default() -> Self {
        Self {
            preset: UploaderPreset::Documents,
            photo_type_id: None,
            persona_id: None,
            max_files: default_max_files(),
            max_file_size_mb: default_max_file_size_mb(),
            allowed_mime_types: default_allowed_mime_types(),
            required_type_ids: Vec::new(),
            chunk_size_kb: default_chunk_size_kb(),
        }
    }
}

impl UploaderSettings {
    /// Settings for a single profile photo of the given file type.
    pub fn profile_photo(persona_id: i64, photo_type_id: i64) -> Self {
        Self {
            preset: UploaderPreset::ProfilePhoto,
            photo_type_id: Some(photo_type_id),
            persona_id: Some(persona_id),
            max_files: 1,
            max_file_size_mb: 5,
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            required_type_ids: vec![photo_type_id],
            chunk_size_kb: default_chunk_size_kb(),
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        FileSizeUtils::mb_to_bytes(self.max_file_size_mb)
    }

    pub fn chunk_size_bytes(&self) -> usize {
        self.chunk_size_kb.max(1) * 1024
    }

    /// Expands the configured preset. Documents settings are returned as
    /// they are; the profile photo preset replaces the limits with its own.
    pub fn resolved(&self) -> Result<Self> {
        match self.preset {
            UploaderPreset::Documents => Ok(self.clone()),
            UploaderPreset::ProfilePhoto => {
                let photo_type_id = self.photo_type_id.ok_or_else(|| {
                    UploaderError::Config(
                        "uploader.photo_type_id is required by the profile_photo preset"
                            .to_string(),
                    )
                })?;
                Ok(Self {
                    persona_id: self.persona_id,
                    chunk_size_kb: self.chunk_size_kb,
                    ..Self::profile_photo(0, photo_type_id)
                })
            }
        }
    }

    /// Whether a new pick replaces the staged file instead of adding to it.
    pub fn replaces_staged(&self) -> bool {
        self.preset == UploaderPreset::ProfilePhoto
    }

    /// Type and description given to every staged file, if any.
    pub fn default_assignment(&self) -> Option<(i64, String)> {
        match self.preset {
            UploaderPreset::Documents => None,
            UploaderPreset::ProfilePhoto => self
                .photo_type_id
                .map(|id| (id, PROFILE_PHOTO_DESCRIPTION.to_string())),
        }
    }

    pub fn constraints(&self) -> FileConstraints {
        let constraints =
            FileConstraints::new(self.max_file_size_bytes(), self.allowed_mime_types.clone());
        match self.preset {
            UploaderPreset::Documents => constraints,
            UploaderPreset::ProfilePhoto => constraints.type_first(),
        }
    }
}

/// Where the bearer token is read from.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Persisted token file written by the login flow.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    /// Environment variable consulted when the file has no token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "SIGAP_TOKEN".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_file: None,
            token_env: default_token_env(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub uploader: UploaderSettings,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file, or the defaults if it does not
    /// exist, and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| UploaderError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - `SIGAP_API_URL`: API base URL
    /// - `SIGAP_PERSONA_ID`: person the files are attached to
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SIGAP_API_URL") {
            if !url.is_empty() {
                self.api.base_url = url;
            }
        }
        if let Ok(id) = std::env::var("SIGAP_PERSONA_ID") {
            match id.trim().parse() {
                Ok(id) => self.uploader.persona_id = Some(id),
                Err(_) => tracing::warn!("ignoring invalid SIGAP_PERSONA_ID: {id}"),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.api.base_url)
            .map_err(|e| UploaderError::Config(format!("invalid api.base_url: {e}")))?;
        if self.uploader.max_files == 0 {
            return Err(UploaderError::Config(
                "uploader.max_files must be at least 1".to_string(),
            ));
        }
        if self.uploader.max_file_size_mb == 0 {
            return Err(UploaderError::Config(
                "uploader.max_file_size_mb must be at least 1".to_string(),
            ));
        }
        if self.uploader.allowed_mime_types.is_empty() {
            return Err(UploaderError::Config(
                "uploader.allowed_mime_types must not be empty".to_string(),
            ));
        }
        self.uploader.resolved()?;
        Ok(())
    }

    /// Validates and expands the uploader preset, ready to run.
    pub fn into_resolved(mut self) -> Result<Self> {
        self.validate()?;
        self.uploader = self.uploader.resolved()?;
        Ok(self)
    }
}
