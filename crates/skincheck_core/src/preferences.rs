//! crates/skincheck_core/src/preferences.rs
//!
//! Small persisted flags the client keeps between visits: whether the photo
//! tips were shown, the active check-up reminder, and dismissed tooltips.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{ReminderInterval, ReminderSchedule};
use crate::ports::{PortError, PortResult, SlotStore};

pub const PHOTO_TIPS_KEY: &str = "hasSeenPhotoTips";
pub const REMINDER_KEY: &str = "skinCheckReminder";
pub const TUTORIALS_KEY: &str = "seenTutorials";

#[derive(Serialize, Deserialize)]
struct StoredReminder {
    date: DateTime<Utc>,
    interval: String,
}

#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn SlotStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    pub fn has_seen_photo_tips(&self) -> PortResult<bool> {
        Ok(self.store.get(PHOTO_TIPS_KEY)?.as_deref() == Some("true"))
    }

    pub fn mark_photo_tips_seen(&self) -> PortResult<()> {
        self.store.set(PHOTO_TIPS_KEY, "true")
    }

    /// Replaces any existing reminder with a new one starting now.
    pub fn set_reminder(&self, interval: ReminderInterval) -> PortResult<ReminderSchedule> {
        let schedule = ReminderSchedule {
            interval,
            created_at: Utc::now(),
        };
        let record = StoredReminder {
            date: schedule.created_at,
            interval: interval.tag().to_string(),
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.store.set(REMINDER_KEY, &json)?;
        info!("Reminder set for every {}", interval.label());
        Ok(schedule)
    }

    /// The active reminder. An unreadable record counts as no reminder.
    pub fn active_reminder(&self) -> PortResult<Option<ReminderSchedule>> {
        let Some(raw) = self.store.get(REMINDER_KEY)? else {
            return Ok(None);
        };
        let parsed = serde_json::from_str::<StoredReminder>(&raw)
            .map_err(|e| e.to_string())
            .and_then(|stored| {
                let interval = stored.interval.parse::<ReminderInterval>()?;
                Ok(ReminderSchedule {
                    interval,
                    created_at: stored.date,
                })
            });
        match parsed {
            Ok(schedule) => Ok(Some(schedule)),
            Err(e) => {
                warn!("Ignoring unreadable reminder record: {}", e);
                Ok(None)
            }
        }
    }

    pub fn clear_reminder(&self) -> PortResult<()> {
        self.store.remove(REMINDER_KEY)
    }

    pub fn has_seen_tooltip(&self, id: &str) -> PortResult<bool> {
        Ok(self.seen_tooltips()?.get(id).copied().unwrap_or(false))
    }

    pub fn mark_tooltip_seen(&self, id: &str) -> PortResult<()> {
        let mut seen = self.seen_tooltips()?;
        seen.insert(id.to_string(), true);
        let json = serde_json::to_string(&seen)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.store.set(TUTORIALS_KEY, &json)
    }

    /// Every tooltip id recorded so far. An unreadable map is treated as empty.
    pub fn seen_tooltips(&self) -> PortResult<BTreeMap<String, bool>> {
        let Some(raw) = self.store.get(TUTORIALS_KEY)? else {
            return Ok(BTreeMap::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring unreadable tooltip map: {}", e);
            BTreeMap::new()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn prefs() -> (Preferences, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Preferences::new(store.clone()), store)
    }

    #[test]
    fn photo_tips_flag_is_permanent() {
        let (prefs, _) = prefs();
        assert!(!prefs.has_seen_photo_tips().unwrap());
        prefs.mark_photo_tips_seen().unwrap();
        assert!(prefs.has_seen_photo_tips().unwrap());
        assert!(prefs.has_seen_photo_tips().unwrap());
    }

    #[test]
    fn new_reminder_overwrites_the_previous_one() {
        let (prefs, store) = prefs();
        prefs.set_reminder(ReminderInterval::OneWeek).unwrap();
        let latest = prefs.set_reminder(ReminderInterval::ThreeMonths).unwrap();

        let active = prefs.active_reminder().unwrap().unwrap();
        assert_eq!(active, latest);
        assert!(store.get(REMINDER_KEY).unwrap().unwrap().contains("\"3months\""));
        assert!(active.next_due() > active.created_at);

        prefs.clear_reminder().unwrap();
        assert_eq!(prefs.active_reminder().unwrap(), None);
    }

    #[test]
    fn unreadable_reminder_is_ignored() {
        let (prefs, store) = prefs();
        store
            .set(REMINDER_KEY, r#"{"date":"2024-01-01T00:00:00Z","interval":"fortnight"}"#)
            .unwrap();
        assert_eq!(prefs.active_reminder().unwrap(), None);
    }

    #[test]
    fn tooltips_are_tracked_by_id() {
        let (prefs, store) = prefs();
        prefs.mark_tooltip_seen("scan-button").unwrap();

        assert!(prefs.has_seen_tooltip("scan-button").unwrap());
        assert!(!prefs.has_seen_tooltip("upload-button").unwrap());
        assert_eq!(
            store.get(TUTORIALS_KEY).unwrap().as_deref(),
            Some(r#"{"scan-button":true}"#)
        );

        store.set(TUTORIALS_KEY, "[broken").unwrap();
        assert!(!prefs.has_seen_tooltip("scan-button").unwrap());
        prefs.mark_tooltip_seen("upload-button").unwrap();
        assert_eq!(prefs.seen_tooltips().unwrap().len(), 1);
    }
}
