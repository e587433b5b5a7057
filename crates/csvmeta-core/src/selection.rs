//! Ordered selection of the fields to export

use crate::catalog::FieldCatalog;
use crate::error::{Error, Result};
use crate::field::{FieldDescriptor, FieldId};
use crate::prefs::PreferenceStore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Fields selected on first use
pub const DEFAULT_FIELDS: &[&str] = &["id", "authors", "series", "series_index", "title"];

/// Rank of a field with no stored rank
pub const DEFAULT_RANK: i64 = 1000;

/// Preference key holding the selected field ids
pub const SELECTED_KEY: &str = "selected_fields";

/// Preference key holding the field rank map
pub const RANKS_KEY: &str = "field_ranks";

/// Chosen fields plus the rank map used to order them
///
/// The rank map is independent of the selection: a field keeps its rank
/// while it is deselected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    selected: Vec<FieldId>,
    ranks: BTreeMap<FieldId, i64>,
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self {
            selected: DEFAULT_FIELDS.iter().map(|f| FieldId::new(*f)).collect(),
            ranks: BTreeMap::new(),
        }
    }
}

impl FieldSelection {
    /// Restore the selection from preferences, defaults for anything missing
    pub fn load(prefs: &dyn PreferenceStore) -> Self {
        let mut selection = Self::default();

        if let Some(value) = prefs.get(SELECTED_KEY) {
            match serde_json::from_value::<Vec<FieldId>>(value) {
                Ok(fields) => {
                    selection.selected.clear();
                    for field in fields {
                        selection.toggle(field, true);
                    }
                }
                Err(e) => debug!(error = %e, "ignoring stored field selection"),
            }
        }

        if let Some(value) = prefs.get(RANKS_KEY) {
            match serde_json::from_value::<BTreeMap<FieldId, i64>>(value) {
                Ok(ranks) => selection.ranks = ranks,
                Err(e) => debug!(error = %e, "ignoring stored field ranks"),
            }
        }

        selection
    }

    /// Store the selection and the rank map
    pub fn save(&self, prefs: &mut dyn PreferenceStore) -> Result<()> {
        prefs.set(SELECTED_KEY, serde_json::to_value(&self.selected)?);
        prefs.set(RANKS_KEY, serde_json::to_value(&self.ranks)?);
        Ok(())
    }

    /// Selected field ids in insertion order, including unknown ones
    pub fn selected(&self) -> &[FieldId] {
        &self.selected
    }

    pub fn is_selected(&self, field: &FieldId) -> bool {
        self.selected.contains(field)
    }

    pub fn rank(&self, field: &FieldId) -> i64 {
        self.ranks.get(field).copied().unwrap_or(DEFAULT_RANK)
    }

    /// Selected fields known to the catalog, in display order
    pub fn ordered_fields(&self, catalog: &FieldCatalog) -> Vec<FieldId> {
        let mut fields: Vec<&FieldDescriptor> = self
            .selected
            .iter()
            .filter_map(|f| catalog.get(f))
            .collect();
        fields.sort_by(|a, b| self.compare(a, b));
        fields.into_iter().map(|f| f.id.clone()).collect()
    }

    /// Every catalog field in display order, with its inclusion flag
    pub fn ordered_catalog<'c>(&self, catalog: &'c FieldCatalog) -> Vec<(&'c FieldDescriptor, bool)> {
        let mut fields: Vec<&FieldDescriptor> = catalog.list_fields().collect();
        fields.sort_by(|a, b| self.compare(a, b));
        fields
            .into_iter()
            .map(|f| (f, self.is_selected(&f.id)))
            .collect()
    }

    fn compare(&self, a: &FieldDescriptor, b: &FieldDescriptor) -> Ordering {
        self.rank(&a.id)
            .cmp(&self.rank(&b.id))
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Include or exclude a field
    pub fn toggle(&mut self, field: FieldId, included: bool) {
        let present = self.is_selected(&field);
        if included && !present {
            self.selected.push(field);
        } else if !included && present {
            self.selected.retain(|f| *f != field);
        }
    }

    /// Rank fields by their position in `new_order`; other ranks are kept
    pub fn reorder(&mut self, new_order: &[FieldId]) {
        for (rank, field) in new_order.iter().enumerate() {
            self.ranks.insert(field.clone(), rank as i64);
        }
    }

    /// Select every catalog field that is not hidden
    pub fn select_visible(&mut self, catalog: &FieldCatalog, currently_hidden: &HashSet<FieldId>) {
        self.selected = catalog
            .list_fields()
            .map(|f| f.id.clone())
            .filter(|id| !currently_hidden.contains(id))
            .collect();
    }

    /// Validate and persist the selection, returning the fields to export
    ///
    /// Nothing is persisted when the selection is empty.
    pub fn confirm(
        &self,
        catalog: &FieldCatalog,
        prefs: &mut dyn PreferenceStore,
    ) -> Result<Vec<FieldId>> {
        let fields = self.ordered_fields(catalog);
        if fields.is_empty() {
            return Err(Error::EmptySelection);
        }
        self.save(prefs)?;
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::DataType;
    use crate::prefs::MemoryPrefs;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn catalog() -> FieldCatalog {
        let store = MemoryStore::with_standard_fields("Books")
            .with_field("#genre", "Genre", DataType::Text)
            .with_field("#alias", "Title", DataType::Text);
        FieldCatalog::from_store(&store)
    }

    fn ids(items: &[&str]) -> Vec<FieldId> {
        items.iter().map(|s| FieldId::new(*s)).collect()
    }

    #[test]
    fn test_defaults_sorted_by_name() {
        let selection = FieldSelection::default();
        assert_eq!(
            selection.ordered_fields(&catalog()),
            ids(&["authors", "id", "series", "series_index", "title"])
        );
    }

    #[test]
    fn test_rank_then_name_then_id() {
        let mut selection = FieldSelection::default();
        selection.toggle(FieldId::new("#alias"), true);
        selection.reorder(&ids(&["title", "id"]));

        // "#alias" and "title" share a label; "#alias" is unranked and sorts after
        assert_eq!(
            selection.ordered_fields(&catalog()),
            ids(&["title", "id", "authors", "series", "series_index", "#alias"])
        );
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let mut selection = FieldSelection::default();
        selection.toggle(FieldId::new("#alias"), true);
        let catalog = catalog();
        assert_eq!(
            selection.ordered_fields(&catalog),
            selection.ordered_fields(&catalog)
        );
    }

    #[test]
    fn test_toggle_has_no_duplicates() {
        let mut selection = FieldSelection::default();
        selection.toggle(FieldId::new("title"), true);
        selection.toggle(FieldId::new("#genre"), true);
        selection.toggle(FieldId::new("#genre"), true);
        assert_eq!(selection.selected().len(), 6);

        selection.toggle(FieldId::new("series"), false);
        assert!(!selection.is_selected(&FieldId::new("series")));
    }

    #[test]
    fn test_unknown_fields_dropped() {
        let mut selection = FieldSelection::default();
        selection.toggle(FieldId::new("#gone"), true);
        assert!(!selection.ordered_fields(&catalog()).contains(&FieldId::new("#gone")));
    }

    #[test]
    fn test_select_visible() {
        let catalog = catalog();
        let mut selection = FieldSelection::default();
        let hidden: HashSet<FieldId> = catalog
            .list_fields()
            .map(|f| f.id.clone())
            .filter(|id| id.as_str() != "title" && id.as_str() != "#genre")
            .collect();
        selection.select_visible(&catalog, &hidden);
        assert_eq!(selection.ordered_fields(&catalog), ids(&["#genre", "title"]));
    }

    #[test]
    fn test_ordered_catalog_marks_selection() {
        let catalog = catalog();
        let selection = FieldSelection::default();
        let listed = selection.ordered_catalog(&catalog);
        assert_eq!(listed.len(), catalog.len());
        let title = listed.iter().find(|(f, _)| f.id.as_str() == "title").unwrap();
        assert!(title.1);
        let genre = listed.iter().find(|(f, _)| f.id.as_str() == "#genre").unwrap();
        assert!(!genre.1);
    }

    #[test]
    fn test_confirm_empty_selection_fails() {
        let catalog = catalog();
        let mut prefs = MemoryPrefs::new();
        let mut selection = FieldSelection::default();
        for field in DEFAULT_FIELDS {
            selection.toggle(FieldId::new(*field), false);
        }

        let err = selection.confirm(&catalog, &mut prefs).unwrap_err();
        assert!(matches!(err, Error::EmptySelection));
        assert!(prefs.get(SELECTED_KEY).is_none());
    }

    #[test]
    fn test_confirm_persists_and_reloads() {
        let catalog = catalog();
        let mut prefs = MemoryPrefs::new();
        let mut selection = FieldSelection::default();
        selection.toggle(FieldId::new("#genre"), true);
        selection.reorder(&ids(&["#genre"]));

        let fields = selection.confirm(&catalog, &mut prefs).unwrap();
        assert_eq!(fields[0].as_str(), "#genre");

        let reloaded = FieldSelection::load(&prefs);
        assert_eq!(reloaded, selection);
    }

    #[test]
    fn test_load_ignores_bad_values() {
        let mut prefs = MemoryPrefs::new();
        prefs.set(SELECTED_KEY, json!("not a list"));
        prefs.set(RANKS_KEY, json!({"title": 3}));

        let selection = FieldSelection::load(&prefs);
        assert_eq!(selection.selected(), ids(DEFAULT_FIELDS).as_slice());
        assert_eq!(selection.rank(&FieldId::new("title")), 3);
        assert_eq!(selection.rank(&FieldId::new("id")), DEFAULT_RANK);
    }
}
