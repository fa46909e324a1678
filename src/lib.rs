//! Site dashboard for small renovation projects: one persisted document per
//! user, edited through [`Command`]s, shared to WhatsApp and mirrored to a
//! spreadsheet.

pub mod command;
pub mod config;
pub mod error;
pub mod format;
pub mod migrate;
pub mod model;
pub mod photo;
pub mod share;
pub mod sheet;
pub mod storage;
pub mod store;

#[cfg(feature = "desktop")]
pub mod desktop;

pub use command::{apply, Command, Outcome};
pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use model::Document;
pub use storage::{DocumentStorage, FileStorage, MemoryStorage};
pub use store::Store;
