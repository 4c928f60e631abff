use std::collections::{BTreeSet, HashSet};

use crate::upload::types::StagedUploadItem;

/// Required type ids with no staged item assigned to them.
pub fn missing(required: &BTreeSet<i64>, items: &[StagedUploadItem]) -> BTreeSet<i64> {
    let present: HashSet<i64> = items.iter().filter_map(|i| i.assigned_type_id).collect();
    required
        .iter()
        .copied()
        .filter(|id| !present.contains(id))
        .collect()
}

/// File type ids that must be represented before a submission is allowed.
/// Fixed for the lifetime of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredTypes(BTreeSet<i64>);

impl RequiredTypes {
    pub fn ids(&self) -> &BTreeSet<i64> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn missing(&self, items: &[StagedUploadItem]) -> BTreeSet<i64> {
        missing(&self.0, items)
    }
}

impl FromIterator<i64> for RequiredTypes {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::types::RawFile;
    use std::sync::Arc;

    fn item(type_id: Option<i64>) -> StagedUploadItem {
        let file = RawFile::from_bytes("a.pdf", "application/pdf", Arc::from(vec![0u8]));
        let mut item = StagedUploadItem::new(file);
        item.assigned_type_id = type_id;
        item
    }

    #[test]
    fn test_duplicates_satisfy_once() {
        let required = BTreeSet::from([1, 2, 3]);
        let items = vec![item(Some(1)), item(Some(1)), item(Some(2))];
        assert_eq!(missing(&required, &items), BTreeSet::from([3]));
    }

    #[test]
    fn test_order_independent() {
        let required: RequiredTypes = [1, 2].into_iter().collect();
        let forward = vec![item(Some(2)), item(None), item(Some(1))];
        let mut backward = forward.clone();
        backward.reverse();
        assert!(required.missing(&forward).is_empty());
        assert!(required.missing(&backward).is_empty());
    }

    #[test]
    fn test_unassigned_items_satisfy_nothing() {
        let required: RequiredTypes = [5].into_iter().collect();
        assert_eq!(required.missing(&[item(None)]), BTreeSet::from([5]));
    }

    #[test]
    fn test_no_requirements() {
        assert!(missing(&BTreeSet::new(), &[]).is_empty());
    }
}
