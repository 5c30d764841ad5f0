//! Persistent locator memory.
//!
//! Maps a logical element name to the last locator that worked for it. The
//! store is flushed to disk on every [`LocatorStore::set`] by writing a
//! sibling temp file and renaming it over the target, so a crash mid-run
//! loses at most the resolution in flight. Persistence never fails a
//! resolution: unreadable files load as an empty store and write failures
//! are logged.
//!
//! On-disk format is a JSON object keyed by logical name:
//!
//! ```json
//! {
//!   "login_button": {
//!     "by": "id",
//!     "value": "login-btn-primary",
//!     "healed": true,
//!     "heal_reason": "Levenshtein (dist=1)",
//!     "last_success_ts": 1760600000.25,
//!     "attributes": { "id": "login-btn-primary", "tag": "button", "text": "Login" }
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::driver::Element;
use crate::locator::Locator;
use crate::result::HealResult;

/// Maximum number of characters of element text kept in a snapshot
pub const MAX_TEXT_CHARS: usize = 50;

/// Attributes captured from an element, keyed by attribute name
pub type AttributeSnapshot = BTreeMap<String, String>;

/// Reason stored when a healed record arrives without one
const RESTORED_HEAL_REASON: &str = "healed in an earlier run";

/// Last known-good locator for one logical name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatorRecord {
    /// Locator that last resolved
    #[serde(flatten)]
    pub locator: Locator,
    /// Whether the locator came from a fallback rather than the call site
    #[serde(default)]
    pub healed: bool,
    /// Provenance of a healed locator
    #[serde(default)]
    pub heal_reason: Option<String>,
    /// Unix time of the last successful resolution, in seconds
    #[serde(default)]
    pub last_success_ts: Option<f64>,
    /// Attributes captured at the last successful resolution
    #[serde(default)]
    pub attributes: Option<AttributeSnapshot>,
}

impl LocatorRecord {
    /// Record for a locator that resolved as given
    #[must_use]
    pub fn observed(locator: Locator) -> Self {
        Self {
            locator,
            healed: false,
            heal_reason: None,
            last_success_ts: Some(now_ts()),
            attributes: None,
        }
    }

    /// Record for a locator produced by healing
    #[must_use]
    pub fn healed(locator: Locator, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let reason = if reason.trim().is_empty() {
            RESTORED_HEAL_REASON.to_string()
        } else {
            reason
        };
        Self {
            locator,
            healed: true,
            heal_reason: Some(reason),
            last_success_ts: Some(now_ts()),
            attributes: None,
        }
    }

    /// Fresh record for `locator` that keeps the heal provenance of
    /// `previous`, if there was one
    #[must_use]
    pub fn carried_over(locator: Locator, previous: Option<&Self>) -> Self {
        match previous {
            Some(prev) if prev.healed => {
                Self::healed(locator, prev.heal_reason.clone().unwrap_or_default())
            }
            _ => Self::observed(locator),
        }
    }

    /// Attach an attribute snapshot
    #[must_use]
    pub fn with_attributes(mut self, attributes: Option<AttributeSnapshot>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Override the success timestamp
    #[must_use]
    pub const fn with_timestamp(mut self, ts: Option<f64>) -> Self {
        self.last_success_ts = ts;
        self
    }

    /// Last success as a date-time
    #[must_use]
    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        let ts = self.last_success_ts?;
        let secs = ts.floor();
        let nanos = ((ts - secs) * 1_000_000_000.0).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
    }

    /// Captured attribute by name
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .as_ref()
            .and_then(|attrs| attrs.get(name))
            .map(String::as_str)
    }

    /// Restore the healed-implies-reason invariant on data read from disk
    fn normalized(mut self) -> Self {
        let missing = self
            .heal_reason
            .as_deref()
            .map_or(true, |r| r.trim().is_empty());
        if self.healed && missing {
            self.heal_reason = Some(RESTORED_HEAL_REASON.to_string());
        }
        self
    }
}

/// Current Unix time in fractional seconds
#[must_use]
pub fn now_ts() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Capture `{id, name, class, type, tag, text}` from an element.
///
/// Best effort: attributes that cannot be read are left out. Returns `None`
/// when nothing could be captured.
pub fn capture_attributes<E: Element>(element: &E) -> Option<AttributeSnapshot> {
    let mut snapshot = AttributeSnapshot::new();

    for name in ["id", "name", "class", "type"] {
        match element.attribute(name) {
            Ok(Some(value)) if !value.is_empty() => {
                snapshot.insert(name.to_string(), value);
            }
            Ok(_) => {}
            Err(e) => debug!(attribute = name, error = %e, "Attribute capture skipped"),
        }
    }

    match element.tag_name() {
        Ok(tag) if !tag.is_empty() => {
            snapshot.insert("tag".to_string(), tag);
        }
        Ok(_) => {}
        Err(e) => debug!(error = %e, "Tag capture skipped"),
    }

    match element.text() {
        Ok(text) => {
            let text: String = text.trim().chars().take(MAX_TEXT_CHARS).collect();
            if !text.is_empty() {
                snapshot.insert("text".to_string(), text);
            }
        }
        Err(e) => debug!(error = %e, "Text capture skipped"),
    }

    (!snapshot.is_empty()).then_some(snapshot)
}

/// Durable mapping from logical name to [`LocatorRecord`]
#[derive(Debug)]
pub struct LocatorStore {
    path: PathBuf,
    records: BTreeMap<String, LocatorRecord>,
}

impl LocatorStore {
    /// Open the store backed by `path`, loading whatever it holds.
    ///
    /// A missing, unreadable or malformed file yields an empty store.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = Self::load(&path);
        Self { path, records }
    }

    fn load(path: &Path) -> BTreeMap<String, LocatorRecord> {
        if !path.exists() {
            debug!(path = %path.display(), "No locator store yet");
            return BTreeMap::new();
        }

        match Self::read_records(path) {
            Ok(records) => {
                debug!(path = %path.display(), count = records.len(), "Loaded locator store");
                records
                    .into_iter()
                    .map(|(name, record)| (name, record.normalized()))
                    .collect()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load locator store, starting empty");
                BTreeMap::new()
            }
        }
    }

    fn read_records(path: &Path) -> HealResult<BTreeMap<String, LocatorRecord>> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Record for a logical name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LocatorRecord> {
        self.records.get(name)
    }

    /// Insert or replace the record for `name`, then persist the store.
    ///
    /// A failed write is logged and otherwise ignored.
    pub fn set(&mut self, name: impl Into<String>, record: LocatorRecord) {
        let record = record.normalized();
        self.records.insert(name.into(), record);
        if let Err(e) = self.save() {
            warn!(path = %self.path.display(), error = %e, "Failed to save locator store");
        }
    }

    /// Write the whole mapping to the backing file
    pub fn save(&self) -> HealResult<()> {
        let json = serde_json::to_string_pretty(&self.records)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = self.temp_path();
        let mut file = fs::File::create(&temp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    /// Sibling file a save is staged in before it replaces the store
    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of remembered names
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is remembered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remembered logical names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}
