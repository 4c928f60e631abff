use derivative::Derivative;
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionProgress {
    NotStarted,
    Uploading { files: usize, percent: u8 },
    Completed { files: usize },
    Failed { files: usize },
}

impl Default for ActionProgress {
    fn default() -> Self {
        Self::NotStarted
    }
}

#[derive(Derivative)]
#[derivative(Default)]
pub struct UploadState {
    pub progress: ActionProgress,
    #[derivative(Default(value = "true"))]
    pub loading_catalog: bool,
    pub catalog_error: Option<String>,
    pub server_message: Option<String>,
    /// Preview URIs whose bytes were handed to the image cache.
    pub registered_previews: HashSet<String>,
}

impl UploadState {
    pub fn get_progress_percentage(&self) -> f32 {
        match &self.progress {
            ActionProgress::NotStarted => 0.0,
            ActionProgress::Uploading { percent, .. } => f32::from(*percent) / 100.0,
            ActionProgress::Completed { .. } => 1.0,
            ActionProgress::Failed { .. } => 0.0,
        }
    }

    pub fn get_status_text(&self) -> String {
        match &self.progress {
            ActionProgress::NotStarted => String::new(),
            ActionProgress::Uploading { files, percent } => {
                format!("📤 Uploading {} file(s)... {}%", files, percent)
            }
            ActionProgress::Completed { files } => {
                format!("✅ {} file(s) uploaded", files)
            }
            ActionProgress::Failed { files } => {
                format!("❌ Upload of {} file(s) failed, files kept for retry", files)
            }
        }
    }

    pub fn set_percent(&mut self, value: u8) {
        if let ActionProgress::Uploading { percent, .. } = &mut self.progress {
            *percent = (*percent).max(value);
        }
    }
}
