//! Tauri shell: IPC commands, plugins and the desktop share target.

use crate::command::{Command, Outcome};
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::format::{stock_report, wa_contact_link, work_report};
use crate::model::{now_millis, Document, Section, Unit};
use crate::photo::{encode_data_url, mime_for_path, PhotoFile};
use crate::share::{
    fund_plan, request_plan, share_or_link, work_item_plan, ShareOutcome, SharePlan, ShareTarget,
};
use crate::sheet::SheetClient;
use crate::storage::{sanitize_filename, write_bytes_file, FileStorage};
use crate::store::{Store, Summary};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tauri::{AppHandle, Emitter, Manager, State};
use tauri_plugin_clipboard_manager::ClipboardExt;
use tauri_plugin_opener::OpenerExt;

pub const SHEET_SYNC_FAILED_EVENT: &str = "sheet-sync-failed";
const SHARES_DIR: &str = "shares";

pub struct AppState {
    store: Mutex<Store<FileStorage>>,
    config: DashboardConfig,
    root: PathBuf,
}

type Locked<'a> = MutexGuard<'a, Store<FileStorage>>;

impl AppState {
    fn store(&self) -> Result<Locked<'_>, String> {
        self.store
            .lock()
            .map_err(|_| "Dashboard state is unavailable.".to_string())
    }
}

/// Shares by dropping the files into `shares/<stamp>/`, copying the caption
/// and opening the folder, so the user can attach them in WhatsApp Desktop.
struct DesktopShare<'a> {
    app: &'a AppHandle,
    root: PathBuf,
    native: bool,
}

impl ShareTarget for DesktopShare<'_> {
    fn can_share_files(&self, files: &[PhotoFile]) -> bool {
        self.native && !files.is_empty()
    }

    fn share_files(&self, files: &[PhotoFile], title: &str, text: &str) -> crate::Result<()> {
        let dir = self
            .root
            .join(SHARES_DIR)
            .join(format!("{}-{}", now_millis(), sanitize_filename(title)));
        for file in files {
            write_bytes_file(dir.join(sanitize_filename(&file.name)), &file.bytes)?;
        }
        self.app
            .clipboard()
            .write_text(text.to_string())
            .map_err(|err| DashboardError::Share(err.to_string()))?;
        self.app
            .opener()
            .open_path(dir.to_string_lossy().to_string(), Option::<String>::None)
            .map_err(|err: tauri_plugin_opener::Error| DashboardError::Share(err.to_string()))?;
        log::info!("Shared {} file(s) via {}", files.len(), dir.display());
        Ok(())
    }

    fn open_url(&self, url: &str) -> crate::Result<()> {
        self.app
            .opener()
            .open_url(url, Option::<String>::None)
            .map_err(|err: tauri_plugin_opener::Error| DashboardError::Share(err.to_string()))
    }
}

fn share_target<'a>(app: &'a AppHandle, state: &AppState) -> DesktopShare<'a> {
    DesktopShare {
        app,
        root: state.root.clone(),
        native: state.config.native_share,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShareRequestRequest {
    name: String,
    qty: f64,
    unit: Unit,
}

#[derive(Deserialize)]
struct SectionRequest {
    section: Section,
}

#[derive(Deserialize)]
struct WorkItemRequest {
    section: Section,
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundRequest {
    fund_id: String,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum PhotoTarget {
    WorkItem { section: Section, id: String },
    Receipt { fund_id: String },
}

#[derive(Deserialize)]
struct PickPhotoRequest {
    target: Option<PhotoTarget>,
}

#[derive(Deserialize)]
struct ClipboardWriteRequest {
    text: String,
}

#[derive(Deserialize)]
struct OpenExternalRequest {
    url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DispatchResult {
    outcome: Outcome,
    document: Document,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PickPhotoResult {
    canceled: bool,
    photo: Option<String>,
    outcome: Option<Outcome>,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SheetSyncFailed {
    fund_number: String,
    message: String,
}

#[tauri::command]
fn dashboard_get(state: State<'_, AppState>) -> Result<Document, String> {
    Ok(state.store()?.document().clone())
}

#[tauri::command]
fn dashboard_dispatch(
    state: State<'_, AppState>,
    payload: Command,
) -> Result<DispatchResult, String> {
    let mut store = state.store()?;
    let outcome = store.dispatch(payload).map_err(|err| err.to_string())?;
    Ok(DispatchResult {
        outcome,
        document: store.document().clone(),
    })
}

#[tauri::command]
fn dashboard_reset(state: State<'_, AppState>) -> Result<Document, String> {
    let mut store = state.store()?;
    Ok(store.reset().clone())
}

#[tauri::command]
fn dashboard_summary(state: State<'_, AppState>) -> Result<Summary, String> {
    state.store()?.summary().map_err(|err| err.to_string())
}

#[tauri::command]
fn share_stock_report(
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<Option<ShareOutcome>, String> {
    let caption = {
        let store = state.store()?;
        let location = store.current_location().map_err(|err| err.to_string())?;
        stock_report(location)
    };
    let Some(caption) = caption else {
        return Ok(None);
    };
    share_or_link(&share_target(&app, &state), &SharePlan::text_only(caption))
        .map(Some)
        .map_err(|err| err.to_string())
}

/// Records the request and sends it to the group in one step.
#[tauri::command]
fn share_request(
    app: AppHandle,
    state: State<'_, AppState>,
    payload: ShareRequestRequest,
) -> Result<ShareOutcome, String> {
    let plan = {
        let mut store = state.store()?;
        let outcome = store
            .dispatch(Command::AddRequest {
                name: payload.name,
                qty: payload.qty,
                unit: payload.unit,
            })
            .map_err(|err| err.to_string())?;
        let request_id = outcome
            .created_id
            .ok_or_else(|| "Request was not recorded.".to_string())?;
        let location = store.current_location().map_err(|err| err.to_string())?;
        request_plan(location, request_id.as_str()).map_err(|err| err.to_string())?
    };
    share_or_link(&share_target(&app, &state), &plan).map_err(|err| err.to_string())
}

#[tauri::command]
fn share_work_report(
    app: AppHandle,
    state: State<'_, AppState>,
    payload: SectionRequest,
) -> Result<ShareOutcome, String> {
    let caption = {
        let store = state.store()?;
        let location = store.current_location().map_err(|err| err.to_string())?;
        work_report(location, payload.section, chrono::Local::now().date_naive())
    };
    share_or_link(&share_target(&app, &state), &SharePlan::text_only(caption))
        .map_err(|err| err.to_string())
}

#[tauri::command]
fn share_work_item(
    app: AppHandle,
    state: State<'_, AppState>,
    payload: WorkItemRequest,
) -> Result<ShareOutcome, String> {
    let plan = {
        let store = state.store()?;
        let location = store.current_location().map_err(|err| err.to_string())?;
        work_item_plan(
            location,
            payload.section,
            payload.id.as_str(),
            chrono::Local::now().date_naive(),
        )
        .map_err(|err| err.to_string())?
    };
    share_or_link(&share_target(&app, &state), &plan).map_err(|err| err.to_string())
}

/// Starts the sheet sync in the background, then shares. The share never
/// waits on the sync.
#[tauri::command]
fn share_fund(
    app: AppHandle,
    state: State<'_, AppState>,
    payload: FundRequest,
) -> Result<ShareOutcome, String> {
    let (plan, fund) = {
        let store = state.store()?;
        let location = store.current_location().map_err(|err| err.to_string())?;
        let plan = fund_plan(location, payload.fund_id.as_str()).map_err(|err| err.to_string())?;
        let fund = location
            .fund(payload.fund_id.as_str())
            .cloned()
            .ok_or_else(|| DashboardError::not_found("fund", &payload.fund_id).to_string())?;
        (plan, fund)
    };

    match SheetClient::new(&state.config.webhook_url, state.config.http_timeout()) {
        Some(client) => {
            let handle = app.clone();
            let fund_number = fund.number.clone();
            tauri::async_runtime::spawn(client.sync_task(&fund, move |err| {
                let event = SheetSyncFailed {
                    fund_number,
                    message: err.to_string(),
                };
                if let Err(err) = handle.emit(SHEET_SYNC_FAILED_EVENT, event) {
                    log::error!("Failed to emit {SHEET_SYNC_FAILED_EVENT}: {err}");
                }
            }));
        }
        None => log::info!("Sheet web-hook disabled, skipping sync"),
    }

    share_or_link(&share_target(&app, &state), &plan).map_err(|err| err.to_string())
}

/// Lets the user pick an image and, when a target is given, attaches it.
#[tauri::command]
fn pick_photo(
    state: State<'_, AppState>,
    payload: PickPhotoRequest,
) -> Result<PickPhotoResult, String> {
    let path = rfd::FileDialog::new()
        .add_filter("Foto", &["jpg", "jpeg", "png", "webp", "gif", "heic"])
        .pick_file();
    let Some(path) = path else {
        return Ok(PickPhotoResult {
            canceled: true,
            photo: None,
            outcome: None,
        });
    };

    let bytes = fs::read(&path).map_err(|err| err.to_string())?;
    let photo = encode_data_url(mime_for_path(&path), &bytes);
    let outcome = match payload.target {
        None => None,
        Some(target) => {
            let command = match target {
                PhotoTarget::WorkItem { section, id } => Command::AddWorkItemPhoto {
                    section,
                    id,
                    photo: photo.clone(),
                },
                PhotoTarget::Receipt { fund_id } => Command::SetReceiptPhoto {
                    fund_id,
                    photo: photo.clone(),
                },
            };
            let mut store = state.store()?;
            Some(store.dispatch(command).map_err(|err| err.to_string())?)
        }
    };
    Ok(PickPhotoResult {
        canceled: false,
        photo: Some(photo),
        outcome,
    })
}

#[tauri::command]
fn contact_support(app: AppHandle, state: State<'_, AppState>) -> Result<bool, String> {
    app.opener()
        .open_url(
            wa_contact_link(&state.config.support_phone),
            Option::<String>::None,
        )
        .map_err(|err: tauri_plugin_opener::Error| err.to_string())?;
    Ok(true)
}

#[tauri::command]
fn clipboard_write(app: AppHandle, payload: ClipboardWriteRequest) -> Result<bool, String> {
    app.clipboard()
        .write_text(payload.text)
        .map_err(|err| err.to_string())?;
    Ok(true)
}

#[tauri::command]
fn open_external(app: AppHandle, payload: OpenExternalRequest) -> Result<bool, String> {
    app.opener()
        .open_url(payload.url, Option::<String>::None)
        .map_err(|err: tauri_plugin_opener::Error| err.to_string())?;
    Ok(true)
}

#[tauri::command]
fn app_version(app: AppHandle) -> String {
    app.package_info().version.to_string()
}

#[tauri::command]
fn platform_name() -> String {
    match std::env::consts::OS {
        "windows" => "win32",
        "macos" => "darwin",
        "android" => "android",
        "ios" => "ios",
        _ => "linux",
    }
    .to_string()
}

fn storage_root_dir(app: &AppHandle) -> Result<PathBuf, String> {
    let root = app.path().app_data_dir().map_err(|err| err.to_string())?;
    fs::create_dir_all(root.as_path()).map_err(|err| err.to_string())?;
    Ok(root)
}

fn load_state(app: &AppHandle) -> Result<AppState, String> {
    let root = storage_root_dir(app)?;
    let config = DashboardConfig::load(root.as_path()).unwrap_or_else(|err| {
        log::error!("Error reading settings, using defaults: {err}");
        DashboardConfig::default()
    });
    if !DashboardConfig::path(root.as_path()).exists() {
        if let Err(err) = config.save(root.as_path()) {
            log::warn!("Could not write default settings: {err}");
        }
    }
    let store = Store::open(FileStorage::new(root.clone()));
    log::info!("Dashboard storage at {}", root.display());
    Ok(AppState {
        store: Mutex::new(store),
        config,
        root,
    })
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(
            tauri_plugin_log::Builder::default()
                .level(log::LevelFilter::Info)
                .build(),
        )
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .setup(|app| {
            let state = load_state(app.handle())?;
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            dashboard_get,
            dashboard_dispatch,
            dashboard_reset,
            dashboard_summary,
            share_stock_report,
            share_request,
            share_work_report,
            share_work_item,
            share_fund,
            pick_photo,
            contact_support,
            clipboard_write,
            open_external,
            app_version,
            platform_name
        ])
        .run(tauri::generate_context!())
        .expect("failed to run Renovki Dashboard");
}
