//! Material catalog: list, add and delete over the `materials` collection.
//!
//! The catalog owns the single in-memory [`Document`] for the process. Every mutation runs
//! load-mutate-save under one lock, so two concurrent adds never observe the same length.

use crate::store::{Document, Store};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Mutex, MutexGuard};

/// Creation timestamp format, local time.
pub const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// One study note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub date: String,
    /// Fields this version does not know about; written back as found.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A `materials` entry as stored. Entries that do not have the full material shape
/// are kept verbatim so a save never drops them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialRecord {
    Typed(Material),
    Raw(Value),
}

impl MaterialRecord {
    /// Parses one stored entry, falling back to the raw JSON.
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<Material>(value.clone()) {
            Ok(material) => MaterialRecord::Typed(material),
            Err(e) => {
                tracing::warn!("[CATALOG] Keeping unrecognised material entry as-is: {}", e);
                MaterialRecord::Raw(value)
            }
        }
    }

    /// The integer id, if the entry carries one.
    pub fn id(&self) -> Option<i64> {
        match self {
            MaterialRecord::Typed(m) => Some(m.id),
            MaterialRecord::Raw(v) => v.get("id").and_then(Value::as_i64),
        }
    }

    pub fn as_material(&self) -> Option<&Material> {
        match self {
            MaterialRecord::Typed(m) => Some(m),
            MaterialRecord::Raw(_) => None,
        }
    }
}

impl From<Material> for MaterialRecord {
    fn from(material: Material) -> Self {
        MaterialRecord::Typed(material)
    }
}

/// Incoming fields for a new material. Every field must be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl MaterialDraft {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        subject: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
            subject: Some(subject.into()),
            kind: Some(kind.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// How a new material's id is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdAssignment {
    /// `len(materials) + 1`. Ids can repeat after deletions.
    #[default]
    Count,
    /// One past the larger of the current length and the highest id; never reuses an id.
    Monotonic,
}

impl IdAssignment {
    fn next_id(self, materials: &[MaterialRecord]) -> i64 {
        let len = materials.len() as i64;
        match self {
            IdAssignment::Count => len + 1,
            IdAssignment::Monotonic => {
                let max_id = materials.iter().filter_map(MaterialRecord::id).max().unwrap_or(0);
                len.max(max_id) + 1
            }
        }
    }
}

/// Snapshot returned by [`Catalog::list`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub materials: Vec<MaterialRecord>,
    pub subjects: Vec<String>,
}

pub struct Catalog {
    store: Store,
    ids: IdAssignment,
    doc: Mutex<Document>,
}

impl Catalog {
    /// Loads the document from `store` once; later reads are served from memory.
    pub fn open(store: Store, ids: IdAssignment) -> Self {
        let doc = store.load();
        tracing::info!(
            "[CATALOG] Loaded {} materials and {} subjects from {}.",
            doc.materials.len(),
            doc.subjects.len(),
            store.path().display()
        );
        Self::with_document(store, ids, doc)
    }

    pub fn with_document(store: Store, ids: IdAssignment, doc: Document) -> Self {
        Self {
            store,
            ids,
            doc: Mutex::new(doc),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        // A panic while holding the lock cannot leave the document half-written:
        // each mutation is a single push or retain.
        self.doc.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn list(&self) -> Listing {
        let doc = self.lock();
        Listing {
            materials: doc.materials.clone(),
            subjects: doc.subjects.clone(),
        }
    }

    /// Appends a new material stamped with the current local time and persists the document.
    pub fn add(&self, draft: MaterialDraft) -> Result<Material, CatalogError> {
        let title = draft.title.ok_or(CatalogError::MissingField("title"))?;
        let content = draft.content.ok_or(CatalogError::MissingField("content"))?;
        let subject = draft.subject.ok_or(CatalogError::MissingField("subject"))?;
        let kind = draft.kind.ok_or(CatalogError::MissingField("type"))?;

        let mut doc = self.lock();
        let material = Material {
            id: self.ids.next_id(&doc.materials),
            title,
            content,
            subject,
            kind,
            date: chrono::Local::now().format(DATE_FORMAT).to_string(),
            extra: Map::new(),
        };
        doc.materials.push(material.clone().into());
        self.store.persist(&doc);
        tracing::info!(
            "[CATALOG] Added material {} ({}).",
            material.id,
            material.subject
        );
        Ok(material)
    }

    /// Removes every material with `id` and persists. Succeeds even when nothing matched.
    pub fn delete(&self, id: i64) {
        let mut doc = self.lock();
        let before = doc.materials.len();
        doc.materials.retain(|m| m.id() != Some(id));
        let removed = before - doc.materials.len();
        self.store.persist(&doc);
        tracing::info!("[CATALOG] Delete id {}: removed {}.", id, removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn material(id: i64) -> Material {
        Material {
            id,
            title: format!("Note {}", id),
            content: "c".to_string(),
            subject: "Physics".to_string(),
            kind: "note".to_string(),
            date: "01.09.2024 10:00".to_string(),
            extra: Map::new(),
        }
    }

    fn records(materials: Vec<Material>) -> Vec<MaterialRecord> {
        materials.into_iter().map(MaterialRecord::from).collect()
    }

    fn catalog_with(materials: Vec<Material>, ids: IdAssignment) -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("data.json"));
        let doc = Document {
            materials: records(materials),
            ..Document::default()
        };
        (dir, Catalog::with_document(store, ids, doc))
    }

    #[test]
    fn add_assigns_count_plus_one_and_appends() {
        let (_dir, catalog) = catalog_with(vec![material(1), material(2)], IdAssignment::Count);
        let added = catalog
            .add(MaterialDraft::new("T", "C", "S", "X"))
            .unwrap();
        assert_eq!(added.id, 3);
        assert_eq!(added.kind, "X");
        let listing = catalog.list();
        assert_eq!(listing.materials.last(), Some(&MaterialRecord::from(added)));
    }

    #[test]
    fn add_stamps_date_in_day_month_year_format() {
        let (_dir, catalog) = catalog_with(Vec::new(), IdAssignment::Count);
        let added = catalog.add(MaterialDraft::new("T", "C", "S", "X")).unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(&added.date, DATE_FORMAT).is_ok());
    }

    #[test]
    fn add_reports_first_missing_field() {
        let (_dir, catalog) = catalog_with(Vec::new(), IdAssignment::Count);
        let mut draft = MaterialDraft::new("T", "C", "S", "X");
        draft.subject = None;
        assert_eq!(
            catalog.add(draft),
            Err(CatalogError::MissingField("subject"))
        );
        assert!(catalog.list().materials.is_empty());
    }

    #[test]
    fn empty_strings_count_as_present() {
        let (_dir, catalog) = catalog_with(Vec::new(), IdAssignment::Count);
        assert!(catalog.add(MaterialDraft::new("", "", "", "")).is_ok());
    }

    #[test]
    fn delete_removes_all_duplicates() {
        let (_dir, catalog) = catalog_with(
            vec![material(2), material(1), material(2)],
            IdAssignment::Count,
        );
        catalog.delete(2);
        assert_eq!(catalog.list().materials, records(vec![material(1)]));
    }

    #[test]
    fn delete_unknown_id_is_a_no_op() {
        let (_dir, catalog) = catalog_with(vec![material(1)], IdAssignment::Count);
        catalog.delete(42);
        assert_eq!(catalog.list().materials, records(vec![material(1)]));
    }

    #[test]
    fn count_ids_can_repeat_after_delete() {
        let (_dir, catalog) = catalog_with(vec![material(1), material(2)], IdAssignment::Count);
        catalog.delete(1);
        let added = catalog.add(MaterialDraft::new("T", "C", "S", "X")).unwrap();
        assert_eq!(added.id, 2);
    }

    #[test]
    fn monotonic_ids_skip_past_highest() {
        let (_dir, catalog) =
            catalog_with(vec![material(1), material(2)], IdAssignment::Monotonic);
        catalog.delete(1);
        let added = catalog.add(MaterialDraft::new("T", "C", "S", "X")).unwrap();
        assert_eq!(added.id, 3);
    }

    #[test]
    fn mutations_are_written_through() {
        let (dir, catalog) = catalog_with(Vec::new(), IdAssignment::Count);
        catalog.add(MaterialDraft::new("T", "C", "S", "X")).unwrap();
        let on_disk = Store::new(dir.path().join("data.json")).load();
        assert_eq!(on_disk.materials.len(), 1);
    }

    #[test]
    fn persistence_failure_keeps_in_memory_change() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::with_document(
            Store::new(dir.path()),
            IdAssignment::Count,
            Document::default(),
        );
        let added = catalog.add(MaterialDraft::new("T", "C", "S", "X")).unwrap();
        assert_eq!(catalog.list().materials, records(vec![added]));
    }

    #[test]
    fn material_serializes_kind_as_type() {
        let json = serde_json::to_value(material(1)).unwrap();
        assert_eq!(json["type"], "note");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn incomplete_entry_is_kept_raw() {
        let raw = json!({ "id": "7", "title": "No date" });
        let record = MaterialRecord::from_value(raw.clone());
        assert_eq!(record, MaterialRecord::Raw(raw));
        assert_eq!(record.id(), None);
        assert!(record.as_material().is_none());
    }

    #[test]
    fn unknown_material_fields_survive_serialization() {
        let raw = json!({
            "id": 1, "title": "T", "content": "C", "subject": "S", "type": "note",
            "date": "01.09.2024 10:00", "pinned": true
        });
        let record = MaterialRecord::from_value(raw.clone());
        assert_eq!(record.as_material().map(|m| m.id), Some(1));
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }

    #[test]
    fn delete_and_monotonic_ids_see_raw_entries() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document {
            materials: vec![
                MaterialRecord::from(material(1)),
                MaterialRecord::Raw(json!({ "id": 9, "title": "partial" })),
            ],
            ..Document::default()
        };
        let catalog = Catalog::with_document(
            Store::new(dir.path().join("data.json")),
            IdAssignment::Monotonic,
            doc,
        );
        let added = catalog.add(MaterialDraft::new("T", "C", "S", "X")).unwrap();
        assert_eq!(added.id, 10);

        catalog.delete(9);
        let ids: Vec<Option<i64>> = catalog.list().materials.iter().map(MaterialRecord::id).collect();
        assert_eq!(ids, vec![Some(1), Some(10)]);
    }
}
