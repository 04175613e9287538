//! Persistent dashboard state: events, favorite places and settings, kept as
//! a single JSON document.

use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{calendar::CalendarEvent, error::StoreError, model::Coordinates};

pub type Settings = BTreeMap<String, String>;

fn default_settings() -> Settings {
    [("units", "metric"), ("language", "en"), ("theme", "light")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub coordinates: Coordinates,
    pub added_at: DateTime<Utc>,
}

impl Favorite {
    pub fn new(name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self { id: String::new(), name: name.into(), coordinates, added_at: Utc::now() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub events: Vec<CalendarEvent>,
    pub favorites: Vec<Favorite>,
    pub settings: Settings,
}

impl Default for Document {
    fn default() -> Self {
        Self { events: Vec::new(), favorites: Vec::new(), settings: default_settings() }
    }
}

impl Document {
    /// Decode a stored or imported document entry by entry. Only a value that
    /// is not a JSON object is an error; entries that do not parse are dropped.
    fn decode(value: Value) -> Result<Self, serde_json::Error> {
        let mut sections: serde_json::Map<String, Value> = serde_json::from_value(value)?;

        let settings = match sections.remove("settings") {
            Some(Value::Object(entries)) => entries
                .into_iter()
                .filter_map(|(key, value)| match value {
                    Value::String(s) => Some((key, s)),
                    other => {
                        tracing::warn!("skipping setting {key} with non-text value {other}");
                        None
                    }
                })
                .collect(),
            Some(Value::Null) | None => default_settings(),
            Some(other) => {
                tracing::warn!("ignoring malformed settings section: {other}");
                default_settings()
            }
        };

        Ok(Self {
            events: lenient_entries(sections.remove("events"), "event"),
            favorites: lenient_entries(sections.remove("favorites"), "favorite"),
            settings,
        })
    }
}

fn lenient_entries<T: DeserializeOwned>(section: Option<Value>, what: &str) -> Vec<T> {
    let items = match section {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Vec::new(),
        Some(other) => {
            tracing::warn!("ignoring malformed {what} list: {other}");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("skipping unreadable {what}: {err}");
                None
            }
        })
        .collect()
}

/// `dashboard.json` -> `dashboard.json.bak`
fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

fn write_document(path: &Path, document: &Document) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json).map_err(|e| StoreError::io(path, e))
}

#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    data: Document,
}

impl Store {
    /// Open the store at `path`. A missing file starts empty. Entries that do
    /// not parse are skipped; a file that is not a JSON object is copied to
    /// `<path>.bak` and the store starts from defaults.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(contents) => {
                match serde_json::from_str::<Value>(&contents).and_then(Document::decode) {
                    Ok(data) => data,
                    Err(err) => {
                        let backup = backup_path(&path);
                        fs::copy(&path, &backup).map_err(|e| StoreError::io(&backup, e))?;
                        tracing::warn!(
                            "unreadable dashboard data at {} ({err}), kept a copy at {}",
                            path.display(),
                            backup.display()
                        );
                        Document::default()
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Document::default(),
            Err(err) => return Err(StoreError::io(&path, err)),
        };

        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `next` and adopt it only once it is on disk.
    fn commit(&mut self, next: Document) -> Result<(), StoreError> {
        write_document(&self.path, &next)?;
        self.data = next;
        Ok(())
    }

    fn next_id(&self) -> String {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let id = millis.to_string();
            let taken = self.data.events.iter().any(|e| e.id == id)
                || self.data.favorites.iter().any(|f| f.id == id);
            if !taken {
                return id;
            }
            millis += 1;
        }
    }

    // Events

    /// Store a new event and return its id. An empty id is replaced by a
    /// timestamp-based one.
    pub fn add_event(&mut self, mut event: CalendarEvent) -> Result<String, StoreError> {
        event.validate()?;
        if event.id.is_empty() {
            event.id = self.next_id();
        }
        let id = event.id.clone();

        let mut next = self.data.clone();
        next.events.push(event);
        self.commit(next)?;
        Ok(id)
    }

    /// Replace the event with `id`, keeping its id and creation time.
    pub fn update_event(&mut self, id: &str, mut event: CalendarEvent) -> Result<(), StoreError> {
        event.validate()?;
        let mut next = self.data.clone();
        let slot = next
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::EventNotFound(id.to_string()))?;

        event.id = slot.id.clone();
        event.created = slot.created;
        *slot = event;
        self.commit(next)
    }

    pub fn delete_event(&mut self, id: &str) -> Result<CalendarEvent, StoreError> {
        let index = self
            .data
            .events
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StoreError::EventNotFound(id.to_string()))?;

        let mut next = self.data.clone();
        let removed = next.events.remove(index);
        self.commit(next)?;
        Ok(removed)
    }

    pub fn event(&self, id: &str) -> Option<&CalendarEvent> {
        self.data.events.iter().find(|e| e.id == id)
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.data.events
    }

    pub fn events_on(&self, date: NaiveDate) -> Vec<&CalendarEvent> {
        self.data.events.iter().filter(|e| e.date == date).collect()
    }

    // Favorites

    /// Returns `false` when a favorite with the same coordinates exists.
    pub fn add_favorite(&mut self, mut favorite: Favorite) -> Result<bool, StoreError> {
        if self.data.favorites.iter().any(|f| f.coordinates == favorite.coordinates) {
            return Ok(false);
        }
        if favorite.id.is_empty() {
            favorite.id = self.next_id();
        }

        let mut next = self.data.clone();
        next.favorites.push(favorite);
        self.commit(next)?;
        Ok(true)
    }

    pub fn remove_favorite(&mut self, id: &str) -> Result<Favorite, StoreError> {
        let index = self
            .data
            .favorites
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| StoreError::FavoriteNotFound(id.to_string()))?;

        let mut next = self.data.clone();
        let removed = next.favorites.remove(index);
        self.commit(next)?;
        Ok(removed)
    }

    pub fn favorites(&self) -> &[Favorite] {
        &self.data.favorites
    }

    // Settings

    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut next = self.data.clone();
        next.settings.insert(key.to_string(), value.to_string());
        self.commit(next)
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.data.settings.get(key).map(String::as_str)
    }

    pub fn settings(&self) -> &Settings {
        &self.data.settings
    }

    // Whole document

    pub fn export_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    /// Merge an exported document: each top-level section present in `json`
    /// replaces the current one. Entries that do not parse are skipped.
    pub fn import_json(&mut self, json: &str) -> Result<(), StoreError> {
        let incoming: serde_json::Map<String, Value> = serde_json::from_str(json)?;
        let mut current = match serde_json::to_value(&self.data)? {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        current.extend(incoming);

        let next = Document::decode(Value::Object(current))?;
        self.commit(next)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.commit(Document::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open_temp() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("data").join("dashboard.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn fresh_store_has_default_settings() {
        let (_dir, store) = open_temp();

        assert!(store.events().is_empty());
        assert_eq!(store.setting("units"), Some("metric"));
        assert_eq!(store.setting("theme"), Some("light"));
    }

    #[test]
    fn events_persist_across_reopen() {
        let (_dir, mut store) = open_temp();
        let id = store.add_event(CalendarEvent::new("Hike", date(2024, 6, 10))).unwrap();
        assert!(!id.is_empty());

        let reopened = Store::open(store.path()).unwrap();
        assert_eq!(reopened.events().len(), 1);
        assert_eq!(reopened.event(&id).unwrap().title, "Hike");
        assert_eq!(reopened.events_on(date(2024, 6, 10)).len(), 1);
        assert!(reopened.events_on(date(2024, 6, 11)).is_empty());
    }

    #[test]
    fn generated_ids_are_unique() {
        let (_dir, mut store) = open_temp();
        let a = store.add_event(CalendarEvent::new("A", date(2024, 6, 10))).unwrap();
        let b = store.add_event(CalendarEvent::new("B", date(2024, 6, 10))).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn invalid_event_is_rejected() {
        let (_dir, mut store) = open_temp();
        let err = store.add_event(CalendarEvent::new("", date(2024, 6, 10))).unwrap_err();

        assert!(matches!(err, StoreError::InvalidEvent(_)));
        assert!(store.events().is_empty());
    }

    #[test]
    fn update_keeps_identity() {
        let (_dir, mut store) = open_temp();
        let id = store.add_event(CalendarEvent::new("Hike", date(2024, 6, 10))).unwrap();
        let created = store.event(&id).unwrap().created;

        let mut edited = CalendarEvent::new("Long hike", date(2024, 6, 12));
        edited.id = "other".into();
        store.update_event(&id, edited).unwrap();

        let event = store.event(&id).unwrap();
        assert_eq!(event.title, "Long hike");
        assert_eq!(event.created, created);
    }

    #[test]
    fn delete_missing_event_errors() {
        let (_dir, mut store) = open_temp();
        let err = store.delete_event("nope").unwrap_err();

        assert!(err.to_string().contains("Event not found: nope"));
    }

    #[test]
    fn favorites_dedupe_by_coordinates() {
        let (_dir, mut store) = open_temp();
        let warsaw = Coordinates::new(52.2297, 21.0122);

        assert!(store.add_favorite(Favorite::new("Warsaw", warsaw)).unwrap());
        assert!(!store.add_favorite(Favorite::new("Home", warsaw)).unwrap());
        assert_eq!(store.favorites().len(), 1);

        let id = store.favorites()[0].id.clone();
        store.remove_favorite(&id).unwrap();
        assert!(store.favorites().is_empty());
        assert!(matches!(store.remove_favorite(&id), Err(StoreError::FavoriteNotFound(_))));
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        fs::write(&path, "{ not json").unwrap();

        let store = Store::open(&path).unwrap();
        assert!(store.events().is_empty());
        assert_eq!(store.setting("language"), Some("en"));
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "{ not json");
    }

    #[test]
    fn unreadable_event_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");

        let mut good = CalendarEvent::new("Keep me", date(2024, 6, 10));
        good.id = "1".into();
        let good = serde_json::to_value(&good).unwrap();
        let mut broken = good.clone();
        broken["id"] = "2".into();
        broken.as_object_mut().unwrap().remove("created");

        let stored = serde_json::json!({
            "events": [good, broken],
            "favorites": [{ "name": "no coordinates" }],
            "settings": { "theme": "dark", "zoom": 3 }
        });
        fs::write(&path, stored.to_string()).unwrap();

        let mut store = Store::open(&path).unwrap();
        assert_eq!(store.events().len(), 1);
        assert_eq!(store.events()[0].title, "Keep me");
        assert!(store.favorites().is_empty());
        assert_eq!(store.setting("theme"), Some("dark"));
        assert_eq!(store.setting("zoom"), None);
        assert!(!backup_path(&path).exists());

        store.add_favorite(Favorite::new("Warsaw", Coordinates::new(52.2297, 21.0122))).unwrap();

        let reopened = Store::open(&path).unwrap();
        assert!(reopened.event("1").is_some());
        assert_eq!(reopened.favorites().len(), 1);
        assert_eq!(reopened.setting("theme"), Some("dark"));
    }

    #[test]
    fn failed_write_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("data");
        let mut store = Store::open(parent.join("dashboard.json")).unwrap();

        // A file where the data directory should be makes every write fail.
        fs::write(&parent, "blocked").unwrap();

        let err = store.add_event(CalendarEvent::new("Hike", date(2024, 6, 10))).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(store.events().is_empty());

        assert!(store.set_setting("theme", "dark").is_err());
        assert_eq!(store.setting("theme"), Some("light"));

        let warsaw = Favorite::new("Warsaw", Coordinates::new(52.2297, 21.0122));
        assert!(store.add_favorite(warsaw).is_err());
        assert!(store.favorites().is_empty());
    }

    #[test]
    fn failed_delete_keeps_event() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("data");
        let mut store = Store::open(parent.join("dashboard.json")).unwrap();
        let id = store.add_event(CalendarEvent::new("Hike", date(2024, 6, 10))).unwrap();

        fs::remove_dir_all(&parent).unwrap();
        fs::write(&parent, "blocked").unwrap();

        assert!(store.delete_event(&id).is_err());
        assert!(store.event(&id).is_some());
    }

    #[test]
    fn import_skips_unreadable_entries() {
        let (_dir, mut store) = open_temp();

        store
            .import_json(r#"{ "events": [{ "title": "no date" }], "favorites": [] }"#)
            .unwrap();

        assert!(store.events().is_empty());
        assert_eq!(store.setting("theme"), Some("light"));
    }

    #[test]
    fn import_replaces_only_given_sections() {
        let (_dir, mut store) = open_temp();
        store.add_event(CalendarEvent::new("Keep", date(2024, 6, 10))).unwrap();

        store.import_json(r#"{ "settings": { "theme": "dark" } }"#).unwrap();

        assert_eq!(store.events().len(), 1);
        assert_eq!(store.setting("theme"), Some("dark"));
        assert_eq!(store.setting("units"), None);
    }

    #[test]
    fn import_rejects_invalid_json() {
        let (_dir, mut store) = open_temp();
        assert!(matches!(store.import_json("[1, 2"), Err(StoreError::Parse(_))));
    }

    #[test]
    fn export_then_clear() {
        let (_dir, mut store) = open_temp();
        store.set_setting("theme", "dark").unwrap();

        let exported = store.export_json().unwrap();
        assert!(exported.contains("\"theme\": \"dark\""));

        store.clear().unwrap();
        assert_eq!(store.setting("theme"), Some("light"));
    }
}
