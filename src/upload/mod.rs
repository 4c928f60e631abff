//! File upload staging and submission engine.
//!
//! Files enter through [`UploadItemStore::add`] after passing the
//! [`validator`], get a type and description assigned by the user, and leave
//! in a single multipart request sent by the [`BulkSubmitter`].
//! [`UploadSession`] ties the pieces together for one uploader.

mod progress;
pub mod requirements;
mod session;
mod store;
mod submitter;
mod types;
pub mod validator;

pub use progress::{ProgressCallback, ProgressReporter};
pub use requirements::{missing, RequiredTypes};
pub use session::{SubmissionJob, SubmissionOutcome, UploadSession};
pub use store::{AddOutcome, UploadItemStore};
pub use submitter::{BulkSubmitter, BulkTransport, BulkUploadRequest, TransportResponse};
pub use types::{
    BulkUploadResponse, FileMetadata, FileSource, ItemEdit, ItemId, ItemState, PreviewHandle,
    RawFile, StagedUploadItem, SubmissionReceipt,
};
pub use validator::{validate, FileConstraints};
