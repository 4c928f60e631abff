mod drop_surface;
mod state;
mod ui;

use crate::api::ApiClient;
use crate::auth::TokenProvider;
use crate::catalog::FileTypeCatalog;
use crate::config::Config;
use crate::upload::{RawFile, SubmissionOutcome, UploadSession};
use eframe::{egui, App};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;

pub use drop_surface::{raw_files_from_drop, raw_files_from_paths, DragDropSurface};
pub use state::{ActionProgress, UploadState};

/// Messages from worker threads back to the UI thread.
pub enum AppEvent {
    CatalogLoaded(Result<FileTypeCatalog, String>),
    Progress(u8),
    Submitted(SubmissionOutcome),
}

pub struct SigapUploader {
    config: Config,
    client: ApiClient,
    tokens: Arc<dyn TokenProvider>,
    session: Option<UploadSession>,
    state: UploadState,
    drop_surface: DragDropSurface,
    sender: std_mpsc::Sender<AppEvent>,
    receiver: std_mpsc::Receiver<AppEvent>,
}

impl SigapUploader {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: Config,
        client: ApiClient,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        tracing::info!(
            "initializing {:?} uploader for persona {:?}",
            config.uploader.preset,
            config.uploader.persona_id
        );
        egui_extras::install_image_loaders(&cc.egui_ctx);

        let (sender, receiver) = std_mpsc::channel();
        let drop_surface = DragDropSurface::new(&config.uploader.allowed_mime_types);
        let mut app = Self {
            config,
            client,
            tokens,
            session: None,
            state: UploadState::default(),
            drop_surface,
            sender,
            receiver,
        };
        app.load_catalog(cc.egui_ctx.clone());
        app
    }

    pub fn load_catalog(&mut self, ctx: egui::Context) {
        self.state.loading_catalog = true;
        self.state.catalog_error = None;

        let client = self.client.clone();
        let token = self.tokens.bearer_token();
        let page_size = self.config.api.catalog_page_size;
        let sender = self.sender.clone();

        std::thread::spawn(move || {
            let result = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt
                    .block_on(client.fetch_file_types(token.as_deref(), page_size))
                    .map_err(|e| e.to_string()),
                Err(e) => Err(format!("failed to start runtime: {e}")),
            };
            let _ = sender.send(AppEvent::CatalogLoaded(result));
            ctx.request_repaint();
        });
    }

    pub fn add_files(&mut self, files: Vec<RawFile>) {
        if files.is_empty() {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.add_files(files) {
            Ok(outcome) => {
                tracing::debug!(
                    "{} file(s) staged, {} rejected",
                    outcome.accepted.len(),
                    outcome.rejected.len()
                );
                self.state.progress = ActionProgress::NotStarted;
                self.state.server_message = None;
            }
            Err(e) => tracing::debug!("files not added: {}", e),
        }
    }

    pub fn clear_all(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.clear_all() {
                tracing::debug!("clear refused: {}", e);
            }
        }
        self.state.progress = ActionProgress::NotStarted;
        self.state.server_message = None;
    }

    pub fn start_upload(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("failed to start runtime: {}", e);
                self.state.server_message = Some(format!("Cannot start upload: {e}"));
                return;
            }
        };

        let job = match session.begin_submit() {
            Ok(job) => job,
            Err(e) => {
                tracing::info!("upload not started: {}", e);
                return;
            }
        };

        let files = job.file_count();
        tracing::info!("starting upload of {} file(s)", files);
        self.state.progress = ActionProgress::Uploading { files, percent: 0 };
        self.state.server_message = None;

        let sender = self.sender.clone();
        let progress_sender = self.sender.clone();
        let progress_ctx = ctx.clone();
        let ctx = ctx.clone();

        std::thread::spawn(move || {
            let on_progress = Arc::new(move |percent: u8| {
                let _ = progress_sender.send(AppEvent::Progress(percent));
                progress_ctx.request_repaint();
            });
            let outcome = rt.block_on(job.run(on_progress));
            let _ = sender.send(AppEvent::Submitted(outcome));
            ctx.request_repaint();
        });
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.receiver.try_recv() {
            match event {
                AppEvent::CatalogLoaded(Ok(catalog)) => {
                    self.state.loading_catalog = false;
                    match UploadSession::new(
                        &self.config.uploader,
                        Arc::new(catalog),
                        Arc::new(self.client.clone()),
                        self.tokens.clone(),
                    ) {
                        Ok(session) => self.session = Some(session),
                        Err(e) => {
                            tracing::error!("cannot start uploader: {}", e);
                            self.state.catalog_error = Some(e.to_string());
                        }
                    }
                }
                AppEvent::CatalogLoaded(Err(e)) => {
                    tracing::error!("failed to load file types: {}", e);
                    self.state.loading_catalog = false;
                    self.state.catalog_error = Some(e);
                }
                AppEvent::Progress(percent) => self.state.set_percent(percent),
                AppEvent::Submitted(outcome) => self.apply_outcome(outcome),
            }
        }

        if let Some(session) = self.session.as_mut() {
            for uri in session.take_released_previews() {
                self.state.registered_previews.remove(&uri);
                ctx.forget_image(&uri);
            }
            self.drop_surface.set_enabled(!session.is_submitting());
        } else {
            self.drop_surface.set_enabled(false);
        }

        let dropped = self.drop_surface.poll(ctx);
        self.add_files(dropped);
    }

    fn apply_outcome(&mut self, outcome: SubmissionOutcome) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.complete(&outcome) {
            return;
        }
        let files = match &self.state.progress {
            ActionProgress::Uploading { files, .. } => *files,
            _ => 0,
        };
        match &outcome.result {
            Ok(receipt) => {
                self.state.progress = ActionProgress::Completed {
                    files: receipt.file_count,
                };
                self.state.server_message = receipt.message.clone();
            }
            Err(_) => self.state.progress = ActionProgress::Failed { files },
        }
    }
}

impl App for SigapUploader {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}

impl Drop for SigapUploader {
    fn drop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.teardown();
        }
    }
}
