//! SIGAP document uploader.
//!
//! Stages files for a person record, validates them locally, and sends them
//! to the SIGAP REST API in one multipart request with byte-level progress.
//! The engine lives in [`upload`]; [`app`] is the egui front-end.

pub mod api;
pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod upload;
pub mod utils;

pub use api::ApiClient;
pub use auth::TokenProvider;
pub use catalog::{FileTypeCatalog, FileTypeDescriptor};
pub use config::Config;
pub use error::{Result, SubmissionError, TransportError, UploaderError, ValidationError};
pub use upload::{UploadItemStore, UploadSession};
