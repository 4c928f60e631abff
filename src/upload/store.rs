use std::collections::HashSet;

use crate::error::ValidationError;
use crate::upload::types::{ItemEdit, ItemId, ItemState, RawFile, StagedUploadItem};
use crate::upload::validator::FileConstraints;

/// Result of staging a batch of files.
#[derive(Debug, Default)]
pub struct AddOutcome {
    pub accepted: Vec<StagedUploadItem>,
    pub rejected: Vec<ValidationError>,
}

/// Ordered set of staged files for one uploader.
///
/// The store never holds more than `max_files` items. Preview URIs of
/// discarded items are queued until the UI drains them with
/// [`UploadItemStore::take_released_previews`] and evicts them from its
/// image cache.
#[derive(Debug)]
pub struct UploadItemStore {
    items: Vec<StagedUploadItem>,
    max_files: usize,
    constraints: FileConstraints,
    assignable_types: Option<HashSet<i64>>,
    replace_staged: bool,
    default_assignment: Option<(i64, String)>,
    released_previews: Vec<String>,
}

impl UploadItemStore {
    pub fn new(max_files: usize, constraints: FileConstraints) -> Self {
        Self {
            items: Vec::new(),
            max_files,
            constraints,
            assignable_types: None,
            replace_staged: false,
            default_assignment: None,
            released_previews: Vec::new(),
        }
    }

    /// Restricts type assignments to the given ids (the active catalog
    /// subset). Without it any id is accepted.
    pub fn with_assignable_types(mut self, ids: HashSet<i64>) -> Self {
        self.assignable_types = Some(ids);
        self
    }

    /// Single-slot mode: the first file of each batch replaces whatever is
    /// staged and the rest of the batch is ignored.
    pub fn replacing_staged(mut self) -> Self {
        self.replace_staged = true;
        self
    }

    /// Type and description given to every newly staged item.
    pub fn with_default_assignment(mut self, type_id: i64, description: impl Into<String>) -> Self {
        self.default_assignment = Some((type_id, description.into()));
        self
    }

    pub fn add(&mut self, files: Vec<RawFile>) -> AddOutcome {
        if self.replace_staged {
            return self.replace(files);
        }
        let mut outcome = AddOutcome::default();

        let mut valid = Vec::new();
        for file in files {
            match self.constraints.check(&file) {
                Ok(()) => valid.push(file),
                Err(e) => {
                    tracing::debug!("rejected {}: {}", file.name, e);
                    outcome.rejected.push(e);
                }
            }
        }

        let room = self.max_files.saturating_sub(self.items.len());
        if valid.len() > room {
            let dropped = valid.len() - room;
            valid.truncate(room);
            tracing::warn!(
                "store full ({} max), dropping {} file(s)",
                self.max_files,
                dropped
            );
            outcome.rejected.push(ValidationError::TooManyFiles {
                max_files: self.max_files,
                dropped: Some(dropped),
            });
        }

        for file in valid {
            let item = self.stage(file);
            outcome.accepted.push(item.clone());
            self.items.push(item);
        }

        outcome
    }

    fn replace(&mut self, files: Vec<RawFile>) -> AddOutcome {
        let mut outcome = AddOutcome::default();
        let Some(file) = files.into_iter().next() else {
            return outcome;
        };
        if let Err(e) = self.constraints.check(&file) {
            tracing::debug!("rejected {}: {}", file.name, e);
            outcome.rejected.push(e);
            return outcome;
        }

        self.clear();
        let item = self.stage(file);
        outcome.accepted.push(item.clone());
        self.items.push(item);
        outcome
    }

    fn stage(&self, file: RawFile) -> StagedUploadItem {
        let mut item = StagedUploadItem::new(file);
        if let Some((type_id, description)) = &self.default_assignment {
            item.assigned_type_id = Some(*type_id);
            item.description = description.clone();
        }
        tracing::debug!("staged {} as {}", item.file.name, item.id);
        item
    }

    /// Removes an item and releases its preview. Unknown ids are ignored.
    pub fn remove(&mut self, id: &ItemId) {
        if let Some(pos) = self.items.iter().position(|i| &i.id == id) {
            let item = self.items.remove(pos);
            self.release(item);
        }
    }

    /// Applies a user edit. Unknown ids are ignored; assigning a type that is
    /// not assignable is rejected and leaves the item unchanged.
    pub fn update(&mut self, id: &ItemId, edit: ItemEdit) -> Result<(), ValidationError> {
        if let ItemEdit::AssignType(Some(type_id)) = &edit {
            if let Some(assignable) = &self.assignable_types {
                if !assignable.contains(type_id) {
                    return Err(ValidationError::UnknownFileType { type_id: *type_id });
                }
            }
        }

        let Some(item) = self.items.iter_mut().find(|i| &i.id == id) else {
            return Ok(());
        };
        match edit {
            ItemEdit::AssignType(type_id) => item.assigned_type_id = type_id,
            ItemEdit::Description(description) => item.description = description,
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        for item in std::mem::take(&mut self.items) {
            self.release(item);
        }
    }

    fn release(&mut self, item: StagedUploadItem) {
        if let Some(preview) = item.preview {
            self.released_previews.push(preview.uri);
        }
    }

    pub fn take_released_previews(&mut self) -> Vec<String> {
        std::mem::take(&mut self.released_previews)
    }

    pub(crate) fn set_all_states(&mut self, state: ItemState) {
        for item in &mut self.items {
            item.state = state.clone();
        }
    }

    pub fn items(&self) -> &[StagedUploadItem] {
        &self.items
    }

    pub fn get(&self, id: &ItemId) -> Option<&StagedUploadItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const MB: usize = 1024 * 1024;

    fn constraints(max_mb: u64) -> FileConstraints {
        FileConstraints::new(
            max_mb * MB as u64,
            vec!["application/pdf".to_string(), "image/png".to_string()],
        )
    }

    fn pdf(name: &str, size: usize) -> RawFile {
        RawFile::from_bytes(name, "application/pdf", Arc::from(vec![0u8; size]))
    }

    fn png(name: &str) -> RawFile {
        RawFile::from_bytes(name, "image/png", Arc::from(vec![0u8; 16]))
    }

    #[test]
    fn test_add_stages_pending_items() {
        let mut store = UploadItemStore::new(5, constraints(1));
        let outcome = store.add(vec![pdf("a.pdf", 10), pdf("b.pdf", 10)]);

        assert_eq!(outcome.accepted.len(), 2);
        assert!(outcome.rejected.is_empty());
        assert_eq!(store.len(), 2);
        assert!(store.items().iter().all(|i| i.state == ItemState::Pending));
        assert!(store.items().iter().all(|i| i.assigned_type_id.is_none()));
        assert_eq!(store.items()[0].file.name, "a.pdf");
    }

    #[test]
    fn test_oversize_never_staged() {
        let mut store = UploadItemStore::new(5, constraints(1));
        let outcome = store.add(vec![pdf("big.pdf", 2 * MB), pdf("ok.pdf", 10)]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.items()[0].file.name, "ok.pdf");
        assert!(matches!(
            outcome.rejected[0],
            ValidationError::SizeExceeded { .. }
        ));
    }

    #[test]
    fn test_overflow_in_one_call() {
        let max_files = 3;
        for k in 1..4 {
            let mut store = UploadItemStore::new(max_files, constraints(1));
            let files = (0..max_files + k).map(|n| pdf(&format!("{n}.pdf"), 10)).collect();
            let outcome = store.add(files);

            assert_eq!(store.len(), max_files);
            assert_eq!(
                outcome.rejected,
                vec![ValidationError::TooManyFiles {
                    max_files,
                    dropped: Some(k)
                }]
            );
        }
    }

    #[test]
    fn test_overflow_across_calls_keeps_first() {
        let mut store = UploadItemStore::new(2, constraints(1));
        store.add(vec![pdf("first.pdf", 10)]);
        let outcome = store.add(vec![pdf("second.pdf", 10), pdf("third.pdf", 10)]);

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].file.name, "second.pdf");
        assert_eq!(store.len(), 2);

        let outcome = store.add(vec![pdf("fourth.pdf", 10)]);
        assert!(outcome.accepted.is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_three_half_megabyte_files_with_two_slots() {
        let mut store = UploadItemStore::new(2, constraints(1));
        let outcome = store.add(vec![
            pdf("a.pdf", MB / 2),
            pdf("b.pdf", MB / 2),
            pdf("c.pdf", MB / 2),
        ]);

        assert_eq!(store.len(), 2);
        assert_eq!(outcome.rejected.len(), 1);
        assert!(matches!(
            outcome.rejected[0],
            ValidationError::TooManyFiles { dropped: Some(1), .. }
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = UploadItemStore::new(5, constraints(1));
        store.add(vec![pdf("a.pdf", 10), pdf("b.pdf", 10)]);
        let id = store.items()[0].id.clone();

        store.remove(&id);
        assert_eq!(store.len(), 1);
        store.remove(&id);
        assert_eq!(store.len(), 1);
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_remove_releases_preview() {
        let mut store = UploadItemStore::new(5, constraints(1));
        store.add(vec![png("foto.png"), pdf("a.pdf", 10)]);
        let photo = store.items()[0].clone();
        let uri = photo.preview.unwrap().uri;

        store.remove(&photo.id);
        store.remove(&photo.id);
        assert_eq!(store.take_released_previews(), vec![uri]);
        assert!(store.take_released_previews().is_empty());
    }

    #[test]
    fn test_clear_releases_all_previews() {
        let mut store = UploadItemStore::new(5, constraints(1));
        store.add(vec![png("a.png"), png("b.png"), pdf("c.pdf", 10)]);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.take_released_previews().len(), 2);
    }

    #[test]
    fn test_update_editable_fields() {
        let mut store = UploadItemStore::new(5, constraints(1));
        store.add(vec![pdf("a.pdf", 10)]);
        let id = store.items()[0].id.clone();

        store.update(&id, ItemEdit::AssignType(Some(3))).unwrap();
        store
            .update(&id, ItemEdit::Description("Certificado".to_string()))
            .unwrap();
        let item = store.get(&id).unwrap();
        assert_eq!(item.assigned_type_id, Some(3));
        assert_eq!(item.description, "Certificado");
        assert_eq!(item.state, ItemState::Pending);

        store.update(&id, ItemEdit::AssignType(None)).unwrap();
        assert_eq!(store.get(&id).unwrap().assigned_type_id, None);
    }

    #[test]
    fn test_update_rejects_inactive_type() {
        let mut store =
            UploadItemStore::new(5, constraints(1)).with_assignable_types(HashSet::from([1, 2]));
        store.add(vec![pdf("a.pdf", 10)]);
        let id = store.items()[0].id.clone();

        let err = store.update(&id, ItemEdit::AssignType(Some(4))).unwrap_err();
        assert_eq!(err, ValidationError::UnknownFileType { type_id: 4 });
        assert_eq!(store.get(&id).unwrap().assigned_type_id, None);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut store = UploadItemStore::new(5, constraints(1));
        assert!(store
            .update(&ItemId::generate(), ItemEdit::AssignType(Some(1)))
            .is_ok());
    }

    #[test]
    fn test_replacing_store_swaps_staged_photo() {
        let mut store = UploadItemStore::new(1, constraints(1))
            .replacing_staged()
            .with_default_assignment(1, "Foto de perfil");
        store.add(vec![png("old.png")]);
        let outcome = store.add(vec![png("new.png"), png("ignored.png")]);

        assert!(outcome.rejected.is_empty());
        assert_eq!(store.len(), 1);
        let item = &store.items()[0];
        assert_eq!(item.file.name, "new.png");
        assert_eq!(item.assigned_type_id, Some(1));
        assert_eq!(item.description, "Foto de perfil");
        assert_eq!(store.take_released_previews().len(), 1);
    }

    #[test]
    fn test_replacing_store_keeps_photo_when_pick_invalid() {
        let mut store = UploadItemStore::new(1, constraints(1)).replacing_staged();
        store.add(vec![png("keep.png")]);
        let outcome = store.add(vec![pdf("huge.pdf", 2 * MB)]);

        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(store.items()[0].file.name, "keep.png");
        assert!(store.take_released_previews().is_empty());
    }
}
