use std::sync::Arc;

use crate::auth::TokenProvider;
use crate::catalog::FileTypeCatalog;
use crate::config::UploaderSettings;
use crate::error::{SubmissionError, UploaderError, ValidationError};
use crate::upload::progress::ProgressCallback;
use crate::upload::requirements::RequiredTypes;
use crate::upload::store::{AddOutcome, UploadItemStore};
use crate::upload::submitter::{BulkSubmitter, BulkTransport};
use crate::upload::types::{ItemEdit, ItemId, ItemState, RawFile, StagedUploadItem, SubmissionReceipt};

/// A submission detached from the session so it can run elsewhere (a worker
/// thread in the desktop app). Hand the outcome back through
/// [`UploadSession::complete`].
pub struct SubmissionJob {
    ticket: u64,
    persona_id: i64,
    items: Vec<StagedUploadItem>,
    token: Option<String>,
    submitter: Arc<BulkSubmitter>,
}

impl SubmissionJob {
    pub fn file_count(&self) -> usize {
        self.items.len()
    }

    pub async fn run(self, on_progress: ProgressCallback) -> SubmissionOutcome {
        let result = self
            .submitter
            .submit(self.persona_id, &self.items, self.token, on_progress)
            .await;
        SubmissionOutcome {
            ticket: self.ticket,
            result,
        }
    }
}

#[derive(Debug)]
pub struct SubmissionOutcome {
    ticket: u64,
    pub result: Result<SubmissionReceipt, SubmissionError>,
}

/// One uploader: staged files for a single person plus at most one
/// submission in flight.
pub struct UploadSession {
    persona_id: i64,
    store: UploadItemStore,
    submitter: Arc<BulkSubmitter>,
    catalog: Arc<FileTypeCatalog>,
    tokens: Arc<dyn TokenProvider>,
    in_flight: Option<u64>,
    next_ticket: u64,
    alive: bool,
    messages: Vec<String>,
}

impl UploadSession {
    /// Builds a session for `settings.persona_id`, which must be set.
    pub fn new(
        settings: &UploaderSettings,
        catalog: Arc<FileTypeCatalog>,
        transport: Arc<dyn BulkTransport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> crate::Result<Self> {
        let persona_id = settings.persona_id.ok_or_else(|| {
            UploaderError::Config("uploader.persona_id is not set".to_string())
        })?;
        let required: RequiredTypes = settings.required_type_ids.iter().copied().collect();
        let mut store = UploadItemStore::new(settings.max_files, settings.constraints())
            .with_assignable_types(catalog.active_ids());
        if settings.replaces_staged() {
            store = store.replacing_staged();
        }
        if let Some((type_id, description)) = settings.default_assignment() {
            store = store.with_default_assignment(type_id, description);
        }
        let submitter = Arc::new(BulkSubmitter::new(
            settings.max_files,
            required,
            catalog.clone(),
            transport,
        ));
        Ok(Self {
            persona_id,
            store,
            submitter,
            catalog,
            tokens,
            in_flight: None,
            next_ticket: 0,
            alive: true,
            messages: Vec::new(),
        })
    }

    pub fn persona_id(&self) -> i64 {
        self.persona_id
    }

    pub fn catalog(&self) -> &FileTypeCatalog {
        &self.catalog
    }

    pub fn items(&self) -> &[StagedUploadItem] {
        self.store.items()
    }

    pub fn max_files(&self) -> usize {
        self.store.max_files()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Dismissible user-facing messages from the last action.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn dismiss_messages(&mut self) {
        self.messages.clear();
    }

    pub fn take_released_previews(&mut self) -> Vec<String> {
        self.store.take_released_previews()
    }

    fn ensure_idle(&self) -> Result<(), SubmissionError> {
        if !self.alive {
            return Err(SubmissionError::SessionClosed);
        }
        if self.in_flight.is_some() {
            return Err(SubmissionError::AlreadyInFlight);
        }
        Ok(())
    }

    fn show_validation(&mut self, errors: &[ValidationError]) {
        self.messages = errors.iter().map(ToString::to_string).collect();
    }

    pub fn add_files(&mut self, files: Vec<RawFile>) -> Result<AddOutcome, SubmissionError> {
        self.ensure_idle()?;
        let outcome = self.store.add(files);
        self.show_validation(&outcome.rejected);
        Ok(outcome)
    }

    pub fn remove(&mut self, id: &ItemId) -> Result<(), SubmissionError> {
        self.ensure_idle()?;
        self.store.remove(id);
        self.messages.clear();
        Ok(())
    }

    pub fn update(&mut self, id: &ItemId, edit: ItemEdit) -> Result<(), SubmissionError> {
        self.ensure_idle()?;
        match self.store.update(id, edit) {
            Ok(()) => self.messages.clear(),
            Err(e) => self.show_validation(&[e]),
        }
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<(), SubmissionError> {
        self.ensure_idle()?;
        self.store.clear();
        self.messages.clear();
        Ok(())
    }

    /// Checks preconditions and the token, marks every item `Uploading` and
    /// returns the job to run. Nothing is sent when this fails.
    pub fn begin_submit(&mut self) -> Result<SubmissionJob, SubmissionError> {
        self.ensure_idle()?;

        let errors = self.submitter.check_preconditions(self.store.items());
        if !errors.is_empty() {
            self.show_validation(&errors);
            return Err(SubmissionError::ValidationFailed(errors));
        }
        let token = self.tokens.bearer_token();
        if token.is_none() {
            let err = SubmissionError::Unauthenticated;
            self.messages = err.messages();
            return Err(err);
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.in_flight = Some(ticket);
        self.messages.clear();
        self.store.set_all_states(ItemState::Uploading);
        tracing::debug!("submission {} started", ticket);

        Ok(SubmissionJob {
            ticket,
            persona_id: self.persona_id,
            items: self.store.items().to_vec(),
            token,
            submitter: self.submitter.clone(),
        })
    }

    /// Applies a finished submission. Returns `false` when the outcome was
    /// discarded because the session was torn down or the ticket is stale.
    pub fn complete(&mut self, outcome: &SubmissionOutcome) -> bool {
        if !self.alive || self.in_flight != Some(outcome.ticket) {
            tracing::debug!("discarding late result of submission {}", outcome.ticket);
            return false;
        }
        self.in_flight = None;

        match &outcome.result {
            Ok(receipt) => {
                tracing::info!("{} file(s) uploaded", receipt.file_count);
                self.store.set_all_states(ItemState::Succeeded);
                self.store.clear();
            }
            Err(e) => {
                tracing::warn!("submission {} failed: {}", outcome.ticket, e);
                self.store.set_all_states(ItemState::Failed(e.to_string()));
                self.messages = e.messages();
            }
        }
        true
    }

    /// begin, run and complete in one call.
    pub async fn submit(
        &mut self,
        on_progress: ProgressCallback,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let job = self.begin_submit()?;
        let outcome = job.run(on_progress).await;
        self.complete(&outcome);
        outcome.result
    }

    /// Marks the session dead and releases every staged item. Results that
    /// arrive afterwards are ignored.
    pub fn teardown(&mut self) {
        self.alive = false;
        self.in_flight = None;
        self.store.clear();
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::error::TransportError;
    use crate::upload::submitter::tests::{catalog, MockTransport};
    use std::sync::Mutex;

    const KB: usize = 1024;

    fn settings(max_files: usize, required: Vec<i64>) -> UploaderSettings {
        UploaderSettings {
            persona_id: Some(10),
            max_files,
            max_file_size_mb: 1,
            required_type_ids: required,
            ..UploaderSettings::default()
        }
    }

    fn session(settings: &UploaderSettings, transport: Arc<MockTransport>) -> UploadSession {
        UploadSession::new(settings, catalog(), transport, Arc::new(StaticToken::new("tok"))).unwrap()
    }

    fn pdf(name: &str, size: usize) -> RawFile {
        RawFile::from_bytes(name, "application/pdf", Arc::from(vec![1u8; size]))
    }

    fn assign_all(session: &mut UploadSession, type_id: i64) {
        let ids: Vec<_> = session.items().iter().map(|i| i.id.clone()).collect();
        for id in ids {
            session.update(&id, ItemEdit::AssignType(Some(type_id))).unwrap();
        }
    }

    #[tokio::test]
    async fn test_three_drops_two_slots() {
        let transport = MockTransport::responding(200, r#"{"success":true}"#);
        let mut session = session(&settings(2, vec![]), transport);

        let outcome = session
            .add_files(vec![pdf("a.pdf", 512 * KB), pdf("b.pdf", 512 * KB), pdf("c.pdf", 512 * KB)])
            .unwrap();

        assert_eq!(session.items().len(), 2);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_unassigned_blocks_without_network() {
        let transport = MockTransport::responding(200, r#"{"success":true}"#);
        let mut session = session(&settings(5, vec![]), transport.clone());
        session.add_files(vec![pdf("a.pdf", 10)]).unwrap();

        let err = session.submit(Arc::new(|_: u8| {})).await.unwrap_err();

        assert_eq!(
            err,
            SubmissionError::ValidationFailed(vec![ValidationError::MissingTypeAssignment {
                count: 1
            }])
        );
        assert_eq!(transport.call_count(), 0);
        assert!(!session.is_submitting());
        assert_eq!(session.items()[0].state, ItemState::Pending);
    }

    #[tokio::test]
    async fn test_empty_session_submit() {
        let transport = MockTransport::responding(200, r#"{"success":true}"#);
        let mut session = session(&settings(5, vec![]), transport.clone());

        let err = session.submit(Arc::new(|_: u8| {})).await.unwrap_err();

        assert_eq!(
            err,
            SubmissionError::ValidationFailed(vec![ValidationError::NoFilesSelected])
        );
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_submit_clears_store() {
        let transport = MockTransport::responding(200, r#"{"success":true,"message":"ok"}"#);
        let mut session = session(&settings(5, vec![2]), transport.clone());
        session
            .add_files(vec![pdf("a.pdf", 40 * KB), pdf("b.pdf", 40 * KB), pdf("c.pdf", 40 * KB)])
            .unwrap();
        assign_all(&mut session, 2);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let receipt = session
            .submit(Arc::new(move |p: u8| sink.lock().unwrap().push(p)))
            .await
            .unwrap();

        assert_eq!(receipt.file_count, 3);
        assert!(session.items().is_empty());
        assert_eq!(transport.call_count(), 1);
        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&100));
    }

    #[tokio::test]
    async fn test_server_failure_preserves_items() {
        let transport = MockTransport::responding(500, r#"{"message":"disk full"}"#);
        let mut session = session(&settings(5, vec![]), transport.clone());
        session.add_files(vec![pdf("a.pdf", 10), pdf("b.pdf", 10)]).unwrap();
        assign_all(&mut session, 1);

        let err = session.submit(Arc::new(|_: u8| {})).await.unwrap_err();

        assert_eq!(
            err,
            SubmissionError::ServerRejected {
                status: 500,
                message: "disk full".to_string()
            }
        );
        assert_eq!(session.items().len(), 2);
        assert!(session
            .items()
            .iter()
            .all(|i| i.error_detail().is_some_and(|d| d.contains("disk full"))));
        assert!(!session.is_submitting());

        // Failed items stay editable and the whole batch can be retried.
        let id = session.items()[0].id.clone();
        session
            .update(&id, ItemEdit::Description("retry".to_string()))
            .unwrap();
        session.submit(Arc::new(|_: u8| {})).await.unwrap_err();
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_single_flight() {
        let transport = MockTransport::responding(200, r#"{"success":true}"#);
        let mut session = session(&settings(5, vec![]), transport);
        session.add_files(vec![pdf("a.pdf", 10)]).unwrap();
        assign_all(&mut session, 1);

        let job = session.begin_submit().unwrap();
        assert!(session.is_submitting());
        assert_eq!(session.items()[0].state, ItemState::Uploading);
        assert!(matches!(session.begin_submit(), Err(SubmissionError::AlreadyInFlight)));
        assert!(matches!(
            session.add_files(vec![pdf("b.pdf", 10)]),
            Err(SubmissionError::AlreadyInFlight)
        ));
        assert!(matches!(session.clear_all(), Err(SubmissionError::AlreadyInFlight)));

        let outcome = job.run(Arc::new(|_: u8| {})).await;
        assert!(session.complete(&outcome));
        assert!(!session.is_submitting());
        assert!(session.items().is_empty());
    }

    #[tokio::test]
    async fn test_late_result_after_teardown_ignored() {
        let transport = MockTransport::failing(TransportError::Network("offline".to_string()));
        let mut session = session(&settings(5, vec![]), transport);
        session.add_files(vec![pdf("a.pdf", 10)]).unwrap();
        assign_all(&mut session, 1);

        let job = session.begin_submit().unwrap();
        session.teardown();
        let outcome = job.run(Arc::new(|_: u8| {})).await;

        assert!(!session.complete(&outcome));
        assert!(session.items().is_empty());
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_blocks_submission() {
        let transport = MockTransport::responding(200, r#"{"success":true}"#);
        let mut session = UploadSession::new(
            &settings(5, vec![]),
            catalog(),
            transport.clone(),
            Arc::new(StaticToken::none()),
        )
        .unwrap();
        session.add_files(vec![pdf("a.pdf", 10)]).unwrap();
        assign_all(&mut session, 1);

        let err = session.submit(Arc::new(|_: u8| {})).await.unwrap_err();
        assert_eq!(err, SubmissionError::Unauthenticated);
        assert_eq!(transport.call_count(), 0);
        assert_eq!(session.items()[0].state, ItemState::Pending);
    }

    #[test]
    fn test_update_rejects_inactive_type_with_message() {
        let transport = MockTransport::responding(200, r#"{"success":true}"#);
        let mut session = session(&settings(5, vec![]), transport);
        session.add_files(vec![pdf("a.pdf", 10)]).unwrap();
        let id = session.items()[0].id.clone();

        session.update(&id, ItemEdit::AssignType(Some(42))).unwrap();
        assert_eq!(session.items()[0].assigned_type_id, None);
        assert_eq!(session.messages(), ["file type 42 is not available"]);
    }

    #[test]
    fn test_teardown_releases_previews() {
        let transport = MockTransport::responding(200, r#"{"success":true}"#);
        let mut session = session(&settings(5, vec![]), transport);
        session
            .add_files(vec![RawFile::from_bytes("foto.png", "image/png", Arc::from(vec![0u8; 8]))])
            .unwrap();

        session.teardown();
        assert!(!session.is_alive());
        assert_eq!(session.take_released_previews().len(), 1);
    }

    #[test]
    fn test_closed_session_refuses_changes() {
        let transport = MockTransport::responding(200, r#"{"success":true}"#);
        let mut session = session(&settings(5, vec![]), transport.clone());
        session.add_files(vec![pdf("a.pdf", 10)]).unwrap();
        let id = session.items()[0].id.clone();

        session.teardown();

        assert!(matches!(
            session.add_files(vec![pdf("b.pdf", 10)]),
            Err(SubmissionError::SessionClosed)
        ));
        assert!(matches!(
            session.update(&id, ItemEdit::Description("x".to_string())),
            Err(SubmissionError::SessionClosed)
        ));
        assert!(matches!(session.begin_submit(), Err(SubmissionError::SessionClosed)));
        assert!(session.items().is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_persona_comes_from_settings() {
        let transport = MockTransport::responding(200, r#"{"success":true}"#);
        let session = session(&settings(5, vec![]), transport.clone());
        assert_eq!(session.persona_id(), 10);

        let unset = UploaderSettings::default();
        let result = UploadSession::new(&unset, catalog(), transport, Arc::new(StaticToken::new("tok")));
        assert!(matches!(result, Err(UploaderError::Config(_))));
    }

    #[tokio::test]
    async fn test_profile_photo_session_replaces_and_submits() {
        let transport = MockTransport::responding(201, r#"{"success":true}"#);
        let settings = UploaderSettings::profile_photo(10, 1);
        let mut session = session(&settings, transport.clone());

        let png = |name: &str| RawFile::from_bytes(name, "image/png", Arc::from(vec![0u8; 64]));
        session.add_files(vec![png("first.png")]).unwrap();
        let outcome = session.add_files(vec![png("second.png")]).unwrap();

        assert!(outcome.rejected.is_empty());
        assert_eq!(session.items().len(), 1);
        assert_eq!(session.items()[0].file.name, "second.png");
        assert!(session.messages().is_empty());

        let rejected = session
            .add_files(vec![RawFile::from_bytes("cv.pdf", "application/pdf", Arc::from(vec![0u8; 8]))])
            .unwrap();
        assert!(matches!(rejected.rejected[0], ValidationError::UnsupportedType { .. }));
        assert_eq!(session.items()[0].file.name, "second.png");

        session.submit(Arc::new(|_: u8| {})).await.unwrap();
        let (request, _) = transport.last_request.lock().unwrap().take().unwrap();
        assert_eq!(request.files.len(), 1);
        assert_eq!(request.metadata[0].type_id, 1);
        assert_eq!(request.metadata[0].description, "Foto de perfil");
    }
}
