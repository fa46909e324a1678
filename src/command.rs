//! Every mutation the dashboard can make, as data.
//!
//! A [`Command`] is applied to the document in place. Validation happens
//! before anything is touched, so a rejected command leaves the document as it
//! was. Location-scoped commands always act on the active location.

use crate::error::{DashboardError, Result};
use crate::format::{iso_date, request_date};
use crate::model::{
    new_id, Document, ExpenseItem, FundLog, Location, MaterialItem, QuickLink, RequestItem,
    RequestStatus, Section, Unit, WorkItem, DEFAULT_ICON, MAX_WORK_ITEM_PHOTOS,
};
use crate::photo::DataUrl;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    SwitchLocation { id: String },
    AddLocation { name: String },
    RenameLocation { id: String, name: String },
    AddQuickNote { text: String },
    RemoveQuickNote { index: usize },
    AddQuickLink { name: String, url: String },
    RemoveQuickLink { id: String },
    SetUserName { name: String },
    SetUserAvatar { url: String },
    SetManagedProjectsCount { count: i64 },

    AddInventoryItem,
    UpdateInventoryItem { id: String, patch: InventoryPatch },
    StepInventoryQty { id: String, delta: f64 },
    RemoveInventoryItem { id: String },

    AddRequest { name: String, qty: f64, unit: Unit },
    CompleteRequest { id: String },
    DeleteRequest { id: String },

    UpdateWorkItem { section: Section, id: String, text: String },
    AppendWorkItem { section: Section },
    DeleteWorkItem { section: Section, id: String },
    AddWorkItemPhoto { section: Section, id: String, photo: String },
    RemoveWorkItemPhoto { section: Section, id: String, index: usize },

    SetManpower { value: i64 },
    SetWeather { text: String },
    SetCategoryPercentage { id: String, percentage: f64 },

    AddFund { number: String },
    AddExpenseItem { fund_id: String },
    UpdateExpenseItem { fund_id: String, item_id: String, patch: ExpensePatch },
    DeleteExpenseItem { fund_id: String, item_id: String },
    SetReceiptPhoto { fund_id: String, photo: String },
    RemoveReceiptPhoto { fund_id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub qty: Option<f64>,
    #[serde(default)]
    pub unit: Option<Unit>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// There is deliberately no `total` here; it is always derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub unit: Option<Unit>,
    #[serde(default)]
    pub qty: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub changed: bool,
    pub created_id: Option<String>,
}

impl Outcome {
    fn changed() -> Self {
        Outcome {
            changed: true,
            created_id: None,
        }
    }

    fn unchanged() -> Self {
        Outcome::default()
    }

    fn created(id: String) -> Self {
        Outcome {
            changed: true,
            created_id: Some(id),
        }
    }
}

pub fn apply(document: &mut Document, command: Command, today: NaiveDate) -> Result<Outcome> {
    match command {
        Command::SwitchLocation { .. }
        | Command::AddLocation { .. }
        | Command::RenameLocation { .. }
        | Command::AddQuickNote { .. }
        | Command::RemoveQuickNote { .. }
        | Command::AddQuickLink { .. }
        | Command::RemoveQuickLink { .. }
        | Command::SetUserName { .. }
        | Command::SetUserAvatar { .. }
        | Command::SetManagedProjectsCount { .. } => apply_to_root(document, command),
        location_command => {
            let location = current_location_mut(document)?;
            apply_to_location(location, location_command, today)
        }
    }
}

fn current_location_mut(document: &mut Document) -> Result<&mut Location> {
    document.heal_current_location();
    let id = document.current_location_id.clone();
    document
        .locations
        .get_mut(id.as_str())
        .ok_or(DashboardError::UnknownLocation(id))
}

fn apply_to_root(document: &mut Document, command: Command) -> Result<Outcome> {
    match command {
        Command::SwitchLocation { id } => {
            if !document.locations.contains_key(id.as_str()) {
                return Err(DashboardError::UnknownLocation(id));
            }
            if document.current_location_id == id {
                return Ok(Outcome::unchanged());
            }
            document.current_location_id = id;
            Ok(Outcome::changed())
        }
        Command::AddLocation { name } => {
            let name = required(name, "Location name")?;
            let id = new_id();
            document
                .locations
                .insert(id.clone(), Location::new(id.as_str(), name.as_str()));
            document.current_location_id = id.clone();
            Ok(Outcome::created(id))
        }
        Command::RenameLocation { id, name } => {
            let location = document
                .locations
                .get_mut(id.as_str())
                .ok_or(DashboardError::UnknownLocation(id))?;
            location.name = name;
            Ok(Outcome::changed())
        }
        Command::AddQuickNote { text } => {
            if text.trim().is_empty() {
                return Ok(Outcome::unchanged());
            }
            document.quick_notes.insert(0, text);
            Ok(Outcome::changed())
        }
        Command::RemoveQuickNote { index } => {
            if index >= document.quick_notes.len() {
                return Ok(Outcome::unchanged());
            }
            document.quick_notes.remove(index);
            Ok(Outcome::changed())
        }
        Command::AddQuickLink { name, url } => {
            let name = required(name, "Link name")?;
            let url = required(url, "Link URL")?;
            let url = if url.starts_with("http") {
                url
            } else {
                format!("https://{url}")
            };
            let id = new_id();
            document.quick_links.push(QuickLink {
                id: id.clone(),
                name,
                url,
            });
            Ok(Outcome::created(id))
        }
        Command::RemoveQuickLink { id } => {
            let before = document.quick_links.len();
            document.quick_links.retain(|link| link.id != id);
            if document.quick_links.len() == before {
                return Err(DashboardError::not_found("quick link", id.as_str()));
            }
            Ok(Outcome::changed())
        }
        Command::SetUserName { name } => {
            if name.trim().is_empty() {
                return Ok(Outcome::unchanged());
            }
            document.user_name = name;
            Ok(Outcome::changed())
        }
        Command::SetUserAvatar { url } => {
            document.user_avatar = url;
            Ok(Outcome::changed())
        }
        Command::SetManagedProjectsCount { count } => {
            document.managed_projects_count = count;
            Ok(Outcome::changed())
        }
        // Location commands are routed by `apply`.
        _ => Ok(Outcome::unchanged()),
    }
}

fn apply_to_location(
    location: &mut Location,
    command: Command,
    today: NaiveDate,
) -> Result<Outcome> {
    match command {
        Command::AddInventoryItem => {
            let item = MaterialItem::blank();
            let id = item.id.clone();
            location.inventory.push(item);
            Ok(Outcome::created(id))
        }
        Command::UpdateInventoryItem { id, patch } => {
            let item = inventory_item_mut(location, id.as_str())?;
            if let Some(name) = patch.name {
                item.name = name;
            }
            if let Some(qty) = patch.qty {
                item.qty = qty;
            }
            if let Some(unit) = patch.unit {
                item.unit = unit;
            }
            if let Some(icon) = patch.icon {
                item.icon = Some(icon);
            }
            Ok(Outcome::changed())
        }
        Command::StepInventoryQty { id, delta } => {
            let item = inventory_item_mut(location, id.as_str())?;
            let next = item.qty + delta;
            item.qty = if delta < 0.0 { next.max(0.0) } else { next };
            Ok(Outcome::changed())
        }
        Command::RemoveInventoryItem { id } => {
            let before = location.inventory.len();
            location.inventory.retain(|item| item.id != id);
            if location.inventory.len() == before {
                return Err(DashboardError::not_found("material", id.as_str()));
            }
            Ok(Outcome::changed())
        }
        Command::AddRequest { name, qty, unit } => {
            let name = required(name, "Material name")?;
            let id = new_id();
            location.requests.push(RequestItem {
                id: id.clone(),
                name: name.trim().to_string(),
                qty,
                unit,
                date: request_date(today),
                status: RequestStatus::Pending,
            });
            Ok(Outcome::created(id))
        }
        Command::CompleteRequest { id } => complete_request(location, id.as_str()),
        Command::DeleteRequest { id } => {
            let before = location.requests.len();
            location.requests.retain(|request| request.id != id);
            if location.requests.len() == before {
                return Err(DashboardError::not_found("request", id.as_str()));
            }
            Ok(Outcome::changed())
        }
        Command::UpdateWorkItem { section, id, text } => {
            work_item_mut(location, section, id.as_str())?.text = text;
            Ok(Outcome::changed())
        }
        Command::AppendWorkItem { section } => {
            let item = WorkItem::blank();
            let id = item.id.clone();
            location.report.section_mut(section).push(item);
            Ok(Outcome::created(id))
        }
        Command::DeleteWorkItem { section, id } => {
            let items = location.report.section_mut(section);
            let before = items.len();
            items.retain(|item| item.id != id);
            if items.len() == before {
                return Err(DashboardError::not_found("work item", id.as_str()));
            }
            if items.is_empty() {
                items.push(WorkItem::blank());
            }
            Ok(Outcome::changed())
        }
        Command::AddWorkItemPhoto { section, id, photo } => {
            DataUrl::parse(photo.as_str())?;
            let item = work_item_mut(location, section, id.as_str())?;
            if item.photos.len() >= MAX_WORK_ITEM_PHOTOS {
                return Err(DashboardError::PhotoLimit {
                    section,
                    max: MAX_WORK_ITEM_PHOTOS,
                });
            }
            item.photos.push(photo);
            Ok(Outcome::changed())
        }
        Command::RemoveWorkItemPhoto { section, id, index } => {
            let item = work_item_mut(location, section, id.as_str())?;
            if index >= item.photos.len() {
                return Ok(Outcome::unchanged());
            }
            item.photos.remove(index);
            Ok(Outcome::changed())
        }
        Command::SetManpower { value } => {
            location.project_progress.manpower = value;
            Ok(Outcome::changed())
        }
        Command::SetWeather { text } => {
            location.project_progress.weather = text;
            Ok(Outcome::changed())
        }
        Command::SetCategoryPercentage { id, percentage } => {
            let category = location
                .project_progress
                .categories
                .iter_mut()
                .find(|category| category.id == id)
                .ok_or_else(|| DashboardError::not_found("category", id.as_str()))?;
            category.percentage = percentage.clamp(0.0, 100.0);
            Ok(Outcome::changed())
        }
        Command::AddFund { number } => {
            let number = required(number, "Fund number")?;
            let id = new_id();
            location.funds.push(FundLog {
                id: id.clone(),
                number: number.trim().to_string(),
                receipt_photo: None,
                items: Vec::new(),
            });
            Ok(Outcome::created(id))
        }
        Command::AddExpenseItem { fund_id } => {
            let item = ExpenseItem::new(iso_date(today));
            let id = item.id.clone();
            fund_mut(location, fund_id.as_str())?.items.push(item);
            Ok(Outcome::created(id))
        }
        Command::UpdateExpenseItem {
            fund_id,
            item_id,
            patch,
        } => {
            let item = fund_mut(location, fund_id.as_str())?
                .items
                .iter_mut()
                .find(|item| item.id == item_id)
                .ok_or_else(|| DashboardError::not_found("expense item", item_id.as_str()))?;
            if let Some(date) = patch.date {
                item.date = date;
            }
            if let Some(name) = patch.item {
                item.item = name;
            }
            if let Some(unit) = patch.unit {
                item.unit = unit;
            }
            if let Some(qty) = patch.qty {
                item.set_qty(qty);
            }
            if let Some(price) = patch.price {
                item.set_price(price);
            }
            Ok(Outcome::changed())
        }
        Command::DeleteExpenseItem { fund_id, item_id } => {
            let fund = fund_mut(location, fund_id.as_str())?;
            let before = fund.items.len();
            fund.items.retain(|item| item.id != item_id);
            if fund.items.len() == before {
                return Err(DashboardError::not_found("expense item", item_id.as_str()));
            }
            Ok(Outcome::changed())
        }
        Command::SetReceiptPhoto { fund_id, photo } => {
            DataUrl::parse(photo.as_str())?;
            fund_mut(location, fund_id.as_str())?.receipt_photo = Some(photo);
            Ok(Outcome::changed())
        }
        Command::RemoveReceiptPhoto { fund_id } => {
            let fund = fund_mut(location, fund_id.as_str())?;
            if fund.receipt_photo.take().is_none() {
                return Ok(Outcome::unchanged());
            }
            Ok(Outcome::changed())
        }
        // Document-level commands are routed by `apply`.
        _ => Ok(Outcome::unchanged()),
    }
}

/// Folds a fulfilled request into the inventory and drops it from the
/// pending list in one step.
fn complete_request(location: &mut Location, id: &str) -> Result<Outcome> {
    let index = location
        .requests
        .iter()
        .position(|request| request.id == id)
        .ok_or_else(|| DashboardError::not_found("request", id))?;
    let request = location.requests.remove(index);

    match location
        .inventory
        .iter_mut()
        .find(|item| item.matches(request.name.as_str(), request.unit))
    {
        Some(existing) => {
            existing.qty += request.qty;
            log::debug!(
                "Request {} added {} {} to {}",
                request.id,
                request.qty,
                request.unit,
                existing.name
            );
        }
        None => {
            location.inventory.push(MaterialItem {
                id: new_id(),
                name: request.name,
                qty: request.qty,
                unit: request.unit,
                icon: Some(DEFAULT_ICON.to_string()),
            });
        }
    }
    Ok(Outcome::changed())
}

fn required(value: String, field: &'static str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(DashboardError::Required(field));
    }
    Ok(value)
}

fn inventory_item_mut<'a>(location: &'a mut Location, id: &str) -> Result<&'a mut MaterialItem> {
    location
        .inventory
        .iter_mut()
        .find(|item| item.id == id)
        .ok_or_else(|| DashboardError::not_found("material", id))
}

fn work_item_mut<'a>(
    location: &'a mut Location,
    section: Section,
    id: &str,
) -> Result<&'a mut WorkItem> {
    location
        .report
        .section_mut(section)
        .iter_mut()
        .find(|item| item.id == id)
        .ok_or_else(|| DashboardError::not_found("work item", id))
}

fn fund_mut<'a>(location: &'a mut Location, id: &str) -> Result<&'a mut FundLog> {
    location
        .funds
        .iter_mut()
        .find(|fund| fund.id == id)
        .ok_or_else(|| DashboardError::not_found("fund", id))
}
