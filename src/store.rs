//! The single owner of the document and its storage.
//!
//! Load once on open, write the whole document after every accepted command.
//! Storage trouble never blocks the user: read errors fall back to defaults
//! and write errors are logged and dropped.

use crate::command::{apply, Command, Outcome};
use crate::error::{DashboardError, Result};
use crate::migrate::guard;
use crate::model::{Document, Location};
use crate::storage::DocumentStorage;
use chrono::NaiveDate;
use serde::Serialize;

pub struct Store<S: DocumentStorage> {
    storage: S,
    document: Document,
}

/// Derived values for the dashboard header. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub location_id: String,
    pub location_name: String,
    pub overall_progress: Option<i64>,
    pub inventory_count: usize,
    pub pending_requests: usize,
    pub fund_totals: Vec<FundTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundTotal {
    pub id: String,
    pub number: String,
    pub total: f64,
}

impl<S: DocumentStorage> Store<S> {
    pub fn open(storage: S) -> Self {
        let mut keep_stored = false;
        let raw = match storage.read() {
            Ok(raw) => raw,
            Err(err) => {
                log::error!("Error reading saved document, using defaults: {err}");
                if let Err(err) = storage.backup_unreadable() {
                    log::error!("Error backing up saved document, leaving it in place: {err}");
                    keep_stored = true;
                }
                None
            }
        };
        let guarded = guard(raw.as_deref());
        if let Some(reason) = &guarded.fallback {
            log::warn!("Starting from defaults: {reason}");
            if let Some(raw) = raw.as_deref().filter(|text| !text.trim().is_empty()) {
                if let Err(err) = storage.backup(raw) {
                    log::error!("Error backing up saved document: {err}");
                }
            }
        } else if let Some(version) = guarded.from_version {
            log::info!("Loaded document (schema v{version})");
        }
        let store = Store {
            storage,
            document: guarded.document,
        };
        if guarded.repaired && !keep_stored {
            store.persist();
        }
        store
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn current_location(&self) -> Result<&Location> {
        self.document
            .current_location()
            .ok_or_else(|| DashboardError::UnknownLocation(self.document.current_location_id.clone()))
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        self.dispatch_at(command, chrono::Local::now().date_naive())
    }

    /// `apply` validates before it mutates, so a rejected command leaves the
    /// document as it was and nothing is written.
    pub fn dispatch_at(&mut self, command: Command, today: NaiveDate) -> Result<Outcome> {
        let outcome = apply(&mut self.document, command, today)?;
        if outcome.changed {
            self.persist();
        }
        Ok(outcome)
    }

    /// Wipes storage and starts over from defaults.
    pub fn reset(&mut self) -> &Document {
        if let Err(err) = self.storage.clear() {
            log::error!("Error clearing saved document: {err}");
        }
        self.document = Document::default();
        log::info!("Dashboard reset to defaults");
        &self.document
    }

    pub fn summary(&self) -> Result<Summary> {
        let location = self.current_location()?;
        Ok(Summary {
            location_id: location.id.clone(),
            location_name: location.name.clone(),
            overall_progress: location.project_progress.overall(),
            inventory_count: location.inventory.len(),
            pending_requests: location.requests.len(),
            fund_totals: location
                .funds
                .iter()
                .map(|fund| FundTotal {
                    id: fund.id.clone(),
                    number: fund.number.clone(),
                    total: fund.grand_total(),
                })
                .collect(),
        })
    }

    fn persist(&self) {
        let text = match serde_json::to_string(&self.document) {
            Ok(text) => text,
            Err(err) => {
                log::error!("Error serializing document: {err}");
                return;
            }
        };
        if let Err(err) = self.storage.write(text.as_str()) {
            log::error!("Error saving document: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Unit;
    use crate::storage::MemoryStorage;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn first_open_persists_defaults() {
        let store = Store::open(MemoryStorage::new());
        assert_eq!(store.document(), &Document::default());
        let saved = store.storage().snapshot().unwrap();
        assert!(saved.contains("\"schemaVersion\":2"));
        assert!(store.storage().backups().is_empty());
    }

    #[test]
    fn garbage_is_backed_up_then_replaced() {
        let store = Store::open(MemoryStorage::with_text("{not json"));
        assert_eq!(store.storage().backups(), vec!["{not json".to_string()]);
        assert_eq!(store.document(), &Document::default());
    }

    #[test]
    fn dispatch_persists_changes() {
        let mut store = Store::open(MemoryStorage::new());
        store
            .dispatch_at(
                Command::AddQuickNote {
                    text: "Beli paku".to_string(),
                },
                today(),
            )
            .unwrap();
        let reopened = Store::open(MemoryStorage::with_text(
            store.storage().snapshot().unwrap(),
        ));
        assert_eq!(reopened.document().quick_notes, vec!["Beli paku"]);
    }

    #[test]
    fn rejected_command_leaves_document_untouched() {
        let mut store = Store::open(MemoryStorage::new());
        let before = store.storage().snapshot();
        let result = store.dispatch_at(
            Command::AddRequest {
                name: "  ".to_string(),
                qty: 3.0,
                unit: Unit::Zak,
            },
            today(),
        );
        assert!(matches!(result, Err(DashboardError::Required(_))));
        assert_eq!(store.document(), &Document::default());
        assert_eq!(store.storage().snapshot(), before);
    }

    #[test]
    fn rejected_location_command_is_not_applied() {
        let mut store = Store::open(MemoryStorage::new());
        let before = store.storage().snapshot();
        let result = store.dispatch_at(
            Command::UpdateExpenseItem {
                fund_id: "f1".to_string(),
                item_id: "missing".to_string(),
                patch: crate::command::ExpensePatch {
                    qty: Some(4.0),
                    ..Default::default()
                },
            },
            today(),
        );
        assert!(matches!(result, Err(DashboardError::NotFound { .. })));
        assert_eq!(store.document(), &Document::default());
        assert_eq!(store.storage().snapshot(), before);
    }

    #[test]
    fn write_failures_do_not_block() {
        let mut store = Store::open(MemoryStorage::failing());
        let outcome = store
            .dispatch_at(
                Command::SetWeather {
                    text: "Hujan".to_string(),
                },
                today(),
            )
            .unwrap();
        assert!(outcome.changed);
        assert_eq!(
            store.current_location().unwrap().project_progress.weather,
            "Hujan"
        );
        assert_eq!(store.storage().snapshot(), None);
    }

    #[test]
    fn reset_clears_storage() {
        let mut store = Store::open(MemoryStorage::new());
        store
            .dispatch_at(
                Command::SetUserName {
                    name: "Budi".to_string(),
                },
                today(),
            )
            .unwrap();
        assert_eq!(store.reset(), &Document::default());
        assert_eq!(store.storage().snapshot(), None);
    }

    #[test]
    fn summary_reflects_current_location() {
        let mut store = Store::open(MemoryStorage::new());
        let summary = store.summary().unwrap();
        assert_eq!(summary.location_name, "Lokasi 1");
        assert_eq!(summary.inventory_count, 2);
        assert_eq!(summary.pending_requests, 0);
        assert_eq!(summary.overall_progress, Some(0));
        assert_eq!(summary.fund_totals[0].number, "001");

        store
            .dispatch_at(
                Command::SwitchLocation {
                    id: "loc2".to_string(),
                },
                today(),
            )
            .unwrap();
        assert_eq!(store.summary().unwrap().location_id, "loc2");
    }
}
