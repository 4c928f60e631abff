use eframe::egui;
use std::path::PathBuf;

use crate::upload::RawFile;

/// Turns dropped files and file picker selections into [`RawFile`]s for the
/// session. Disabled while a submission is in flight: drops are swallowed
/// and the picker is not opened.
pub struct DragDropSurface {
    enabled: bool,
    hovering: bool,
    extensions: Vec<String>,
}

impl DragDropSurface {
    pub fn new(allowed_mime_types: &[String]) -> Self {
        let mut extensions: Vec<String> = allowed_mime_types
            .iter()
            .filter_map(|mime| mime_guess::get_mime_extensions_str(mime))
            .flat_map(|exts| exts.iter().map(|e| e.to_string()))
            .collect();
        extensions.sort();
        extensions.dedup();
        Self {
            enabled: true,
            hovering: false,
            extensions,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.hovering = false;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Reads this frame's drag state and returns any files dropped on the
    /// window.
    pub fn poll(&mut self, ctx: &egui::Context) -> Vec<RawFile> {
        let (hovered, dropped) = ctx.input(|i| {
            (
                !i.raw.hovered_files.is_empty(),
                i.raw.dropped_files.clone(),
            )
        });
        self.hovering = self.enabled && hovered;
        self.accept_dropped(&dropped)
    }

    pub fn accept_dropped(&self, dropped: &[egui::DroppedFile]) -> Vec<RawFile> {
        if dropped.is_empty() {
            return Vec::new();
        }
        if !self.enabled {
            tracing::debug!("ignoring {} dropped file(s) during upload", dropped.len());
            return Vec::new();
        }
        raw_files_from_drop(dropped)
    }

    /// Opens the native picker filtered to the allowed extensions.
    pub fn pick_files(&self) -> Vec<RawFile> {
        if !self.enabled {
            return Vec::new();
        }
        let mut dialog = rfd::FileDialog::new();
        if !self.extensions.is_empty() {
            dialog = dialog.add_filter("Documents", &self.extensions);
        }
        dialog
            .pick_files()
            .map(|paths| raw_files_from_paths(&paths))
            .unwrap_or_default()
    }
}

/// Path-backed drops (native) are stat-ed; byte-backed drops (web) keep
/// their bytes. Entries with neither are skipped.
pub fn raw_files_from_drop(dropped: &[egui::DroppedFile]) -> Vec<RawFile> {
    let mut files = Vec::new();
    for file in dropped {
        if let Some(path) = &file.path {
            match RawFile::from_path(path) {
                Ok(raw) => files.push(raw),
                Err(e) => tracing::warn!("cannot read dropped file {}: {}", path.display(), e),
            }
        } else if let Some(bytes) = &file.bytes {
            files.push(RawFile::from_named_bytes(file.name.clone(), bytes.clone()));
        } else {
            tracing::warn!("dropped file {} has no path or contents", file.name);
        }
    }
    files
}

pub fn raw_files_from_paths(paths: &[PathBuf]) -> Vec<RawFile> {
    paths
        .iter()
        .filter_map(|path| match RawFile::from_path(path) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!("cannot read {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}
