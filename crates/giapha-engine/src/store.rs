//! Document storage for trees and events.
//!
//! Trees are stored as one document, written back whole (last write wins).
//! Events are stored as individual rows in the backend's snake_case shape,
//! see [`EventRecord`].
//!
//! Two implementations ship here: [`MemoryStore`] for tests and embedding, and
//! [`JsonFileStore`], which keeps `{ "trees": [...], "events": [...] }` in a
//! single JSON file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GiaphaError, Result};
use crate::model::{FamilyEvent, FamilyTree, Repeat};

pub const DEFAULT_TREE_ID: &str = "1";
pub const DEFAULT_TREE_NAME: &str = "Gia Phả";

// ── Traits ──────────────────────────────────────────────────────────────────

pub trait TreeStore {
    fn read_all(&self) -> Result<Vec<FamilyTree>>;

    /// Replace the whole tree document.
    fn upsert_all(&mut self, trees: &[FamilyTree]) -> Result<()>;
}

pub trait EventStore {
    /// Events of one tree, by solar date ascending; undated events last.
    fn list_for_tree(&self, tree_id: &str) -> Result<Vec<FamilyEvent>>;

    /// Insert, or replace the event with the same id.
    fn save(&mut self, event: FamilyEvent) -> Result<()>;

    fn delete(&mut self, id: &str) -> Result<()>;

    fn set_notify(&mut self, id: &str, enabled: bool) -> Result<()>;
}

/// Read all trees, seeding a single empty default tree if there are none.
pub fn load_or_seed<S: TreeStore + ?Sized>(store: &mut S) -> Result<Vec<FamilyTree>> {
    let trees = store.read_all()?;
    if !trees.is_empty() {
        return Ok(trees);
    }
    debug!("store is empty, seeding default tree");
    let seeded = vec![FamilyTree::new(DEFAULT_TREE_ID, DEFAULT_TREE_NAME)];
    store.upsert_all(&seeded)?;
    Ok(seeded)
}

/// The tree with `id`, or the first tree when no id is given.
pub fn select_tree<'a>(trees: &'a [FamilyTree], id: Option<&str>) -> Result<&'a FamilyTree> {
    match id {
        Some(id) => trees
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| GiaphaError::TreeNotFound(id.to_string())),
        None => trees
            .first()
            .ok_or_else(|| GiaphaError::TreeNotFound("(no trees)".to_string())),
    }
}

// ── EventRecord ─────────────────────────────────────────────────────────────

/// An event as stored in the events table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub tree_id: String,
    pub name: String,
    #[serde(default)]
    pub solar_date: Option<String>,
    #[serde(default)]
    pub lunar_day: Option<u32>,
    #[serde(default)]
    pub lunar_month: Option<u32>,
    #[serde(default)]
    pub notify_enabled: bool,
    #[serde(default)]
    pub repeat_yearly: bool,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<EventRecord> for FamilyEvent {
    fn from(r: EventRecord) -> Self {
        FamilyEvent {
            id: r.id,
            tree_id: r.tree_id,
            name: r.name,
            solar_date: r.solar_date.filter(|s| !s.trim().is_empty()),
            lunar_day: r.lunar_day,
            lunar_month: r.lunar_month,
            notify_enabled: r.notify_enabled,
            repeat: if r.repeat_yearly {
                Repeat::Yearly
            } else {
                Repeat::Once
            },
            note: r.note,
            created_at: r.created_at,
        }
    }
}

impl From<FamilyEvent> for EventRecord {
    fn from(e: FamilyEvent) -> Self {
        EventRecord {
            id: e.id,
            tree_id: e.tree_id,
            name: e.name,
            solar_date: e.solar_date,
            lunar_day: e.lunar_day,
            lunar_month: e.lunar_month,
            notify_enabled: e.notify_enabled,
            repeat_yearly: e.repeat == Repeat::Yearly,
            note: e.note,
            created_at: e.created_at,
        }
    }
}

// ── Shared event operations ─────────────────────────────────────────────────

fn list_events(events: &[FamilyEvent], tree_id: &str) -> Vec<FamilyEvent> {
    let mut listed: Vec<FamilyEvent> = events
        .iter()
        .filter(|e| e.tree_id == tree_id)
        .cloned()
        .collect();
    listed.sort_by(|a, b| {
        let key = |e: &FamilyEvent| (e.solar_date.is_none(), e.solar_date.clone());
        key(a).cmp(&key(b))
    });
    listed
}

fn save_event(events: &mut Vec<FamilyEvent>, mut event: FamilyEvent) {
    match events.iter_mut().find(|e| e.id == event.id) {
        Some(existing) => {
            if event.created_at.is_none() {
                event.created_at = existing.created_at.take();
            }
            *existing = event;
        }
        None => {
            if event.created_at.is_none() {
                event.created_at = Some(Utc::now().to_rfc3339());
            }
            events.push(event);
        }
    }
}

fn delete_event(events: &mut Vec<FamilyEvent>, id: &str) -> Result<()> {
    let pos = events
        .iter()
        .position(|e| e.id == id)
        .ok_or_else(|| GiaphaError::EventNotFound(id.to_string()))?;
    events.remove(pos);
    Ok(())
}

fn set_event_notify(events: &mut [FamilyEvent], id: &str, enabled: bool) -> Result<()> {
    let event = events
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| GiaphaError::EventNotFound(id.to_string()))?;
    event.notify_enabled = enabled;
    Ok(())
}

// ── MemoryStore ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    trees: Vec<FamilyTree>,
    events: Vec<FamilyEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trees(mut self, trees: Vec<FamilyTree>) -> Self {
        self.trees = trees;
        self
    }

    pub fn with_events(mut self, events: Vec<FamilyEvent>) -> Self {
        self.events = events;
        self
    }
}

impl TreeStore for MemoryStore {
    fn read_all(&self) -> Result<Vec<FamilyTree>> {
        Ok(self.trees.clone())
    }

    fn upsert_all(&mut self, trees: &[FamilyTree]) -> Result<()> {
        self.trees = trees.to_vec();
        Ok(())
    }
}

impl EventStore for MemoryStore {
    fn list_for_tree(&self, tree_id: &str) -> Result<Vec<FamilyEvent>> {
        Ok(list_events(&self.events, tree_id))
    }

    fn save(&mut self, event: FamilyEvent) -> Result<()> {
        save_event(&mut self.events, event);
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        delete_event(&mut self.events, id)
    }

    fn set_notify(&mut self, id: &str, enabled: bool) -> Result<()> {
        set_event_notify(&mut self.events, id, enabled)
    }
}

// ── JsonFileStore ───────────────────────────────────────────────────────────

/// On-disk layout of [`JsonFileStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub trees: Vec<FamilyTree>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

/// Trees and events in a single JSON file. A missing file reads as empty;
/// every write rewrites the whole file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<StoreDocument> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "store file missing, reading as empty");
                return Ok(StoreDocument::default());
            }
            Err(e) => return Err(e.into()),
        };
        let doc: StoreDocument = serde_json::from_str(&content)?;
        debug!(
            path = %self.path.display(),
            trees = doc.trees.len(),
            events = doc.events.len(),
            "loaded store"
        );
        Ok(doc)
    }

    fn persist(&self, doc: &StoreDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(doc)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "wrote store");
        Ok(())
    }

    fn update_events<T>(
        &mut self,
        apply: impl FnOnce(&mut Vec<FamilyEvent>) -> Result<T>,
    ) -> Result<T> {
        let mut doc = self.load()?;
        let mut events: Vec<FamilyEvent> = doc.events.into_iter().map(Into::into).collect();
        let out = apply(&mut events)?;
        doc.events = events.into_iter().map(Into::into).collect();
        self.persist(&doc)?;
        Ok(out)
    }
}

impl TreeStore for JsonFileStore {
    fn read_all(&self) -> Result<Vec<FamilyTree>> {
        Ok(self.load()?.trees)
    }

    fn upsert_all(&mut self, trees: &[FamilyTree]) -> Result<()> {
        let mut doc = self.load()?;
        doc.trees = trees.to_vec();
        self.persist(&doc)
    }
}

impl EventStore for JsonFileStore {
    fn list_for_tree(&self, tree_id: &str) -> Result<Vec<FamilyEvent>> {
        let events: Vec<FamilyEvent> = self.load()?.events.into_iter().map(Into::into).collect();
        Ok(list_events(&events, tree_id))
    }

    fn save(&mut self, event: FamilyEvent) -> Result<()> {
        self.update_events(|events| {
            save_event(events, event);
            Ok(())
        })
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.update_events(|events| delete_event(events, id))
    }

    fn set_notify(&mut self, id: &str, enabled: bool) -> Result<()> {
        self.update_events(|events| set_event_notify(events, id, enabled))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Person;
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ids(events: &[FamilyEvent]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_load_or_seed_empty_store() {
        let mut store = MemoryStore::new();
        let trees = load_or_seed(&mut store).unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].name, "Gia Phả");
        assert_eq!(store.read_all().unwrap(), trees);
    }

    #[test]
    fn test_load_or_seed_keeps_existing() {
        let mut store = MemoryStore::new().with_trees(vec![FamilyTree::new("x", "Họ Cao")]);
        let trees = load_or_seed(&mut store).unwrap();
        assert_eq!(trees[0].id, "x");
    }

    #[test]
    fn test_select_tree() {
        let trees = vec![FamilyTree::new("a", "A"), FamilyTree::new("b", "B")];
        assert_eq!(select_tree(&trees, None).unwrap().id, "a");
        assert_eq!(select_tree(&trees, Some("b")).unwrap().id, "b");
        let err = select_tree(&trees, Some("z")).unwrap_err().to_string();
        assert!(err.contains("Family tree not found"), "got: {err}");
        assert!(select_tree(&[], None).is_err());
    }

    #[test]
    fn test_list_orders_by_solar_date_undated_last() {
        let store = MemoryStore::new().with_events(vec![
            FamilyEvent::new("undated", "t", "Giỗ").with_lunar(3, 3),
            FamilyEvent::new("late", "t", "B").with_solar_date(ymd(2001, 12, 1)),
            FamilyEvent::new("other-tree", "u", "C").with_solar_date(ymd(1990, 1, 1)),
            FamilyEvent::new("early", "t", "A").with_solar_date(ymd(1999, 5, 5)),
        ]);
        let listed = store.list_for_tree("t").unwrap();
        assert_eq!(ids(&listed), vec!["early", "late", "undated"]);
    }

    #[test]
    fn test_save_replaces_by_id_and_stamps_created_at() {
        let mut store = MemoryStore::new();
        store.save(FamilyEvent::new("e", "t", "First")).unwrap();
        let created = store.list_for_tree("t").unwrap()[0].created_at.clone();
        assert!(created.is_some());

        store.save(FamilyEvent::new("e", "t", "Renamed")).unwrap();
        let listed = store.list_for_tree("t").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Renamed");
        assert_eq!(listed[0].created_at, created);
    }

    #[test]
    fn test_delete_and_set_notify_unknown_id() {
        let mut store = MemoryStore::new().with_events(vec![FamilyEvent::new("e", "t", "A")]);
        store.set_notify("e", false).unwrap();
        assert!(!store.list_for_tree("t").unwrap()[0].notify_enabled);

        let err = store.delete("nope").unwrap_err().to_string();
        assert!(err.contains("Event not found"), "got: {err}");
        assert!(store.set_notify("nope", true).is_err());

        store.delete("e").unwrap();
        assert!(store.list_for_tree("t").unwrap().is_empty());
    }

    #[test]
    fn test_event_record_conversion() {
        let record: EventRecord = serde_json::from_str(
            r#"{"id":"e","tree_id":"t","name":"Giỗ cụ","solar_date":null,
                "lunar_day":10,"lunar_month":3,"notify_enabled":true,
                "repeat_yearly":false,"note":null,"created_at":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let event = FamilyEvent::from(record.clone());
        assert_eq!(event.repeat, Repeat::Once);
        assert_eq!(event.lunar_day, Some(10));
        assert_eq!(EventRecord::from(event), record);
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("giapha.json");
        let mut store = JsonFileStore::new(&path);

        assert!(store.read_all().unwrap().is_empty());
        let mut trees = load_or_seed(&mut store).unwrap();
        trees[0].upsert_member(Person::new("1", "Cao Văn Nam"));
        store.upsert_all(&trees).unwrap();
        store
            .save(FamilyEvent::new("e", DEFAULT_TREE_ID, "Giỗ").with_lunar(9, 9))
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        let trees = reopened.read_all().unwrap();
        assert_eq!(trees[0].members[0].full_name, "Cao Văn Nam");
        assert_eq!(reopened.list_for_tree(DEFAULT_TREE_ID).unwrap().len(), 1);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["events"][0]["repeat_yearly"], true);
        assert_eq!(raw["trees"][0]["members"][0]["fullName"], "Cao Văn Nam");
    }

    #[test]
    fn test_json_file_store_rejects_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::new(&path).read_all().unwrap_err().to_string();
        assert!(err.contains("Document error"), "got: {err}");
    }
}
