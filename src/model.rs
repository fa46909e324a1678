//! The persisted dashboard document.
//!
//! One [`Document`] holds every location the site manager tracks plus the
//! profile scalars. It is serialized wholesale with camelCase keys, so the
//! JSON written here stays readable by the browser build.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SCHEMA_VERSION: u32 = 2;
pub const DEFAULT_USER_NAME: &str = "Febrian Renovki";
pub const DEFAULT_WEATHER: &str = "Cerah";
pub const DEFAULT_ICON: &str = "package";
pub const MAX_WORK_ITEM_PHOTOS: usize = 4;
const REPORT_SEED_LINES: usize = 5;
const DEFAULT_MANAGED_PROJECTS: i64 = 2;

pub const DEFAULT_AVATARS: [&str; 10] = [
    "https://api.dicebear.com/9.x/micah/svg?seed=Felix",
    "https://api.dicebear.com/9.x/micah/svg?seed=Aneka",
    "https://api.dicebear.com/9.x/micah/svg?seed=Willow",
    "https://api.dicebear.com/9.x/micah/svg?seed=Casper",
    "https://api.dicebear.com/9.x/micah/svg?seed=Sasha",
    "https://api.dicebear.com/9.x/micah/svg?seed=Oliver",
    "https://api.dicebear.com/9.x/micah/svg?seed=Milo",
    "https://api.dicebear.com/9.x/micah/svg?seed=Leo",
    "https://api.dicebear.com/9.x/micah/svg?seed=Nora",
    "https://api.dicebear.com/9.x/micah/svg?seed=Luna",
];

const INITIAL_CATEGORIES: [(&str, &str); 6] = [
    ("c1", "Persiapan"),
    ("c2", "Struktur Bawah"),
    ("c3", "Struktur Atas"),
    ("c4", "Arsitektur"),
    ("c5", "MEP"),
    ("c6", "Finishing"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Unit {
    #[default]
    Pcs,
    Dos,
    Kg,
    Zak,
    M,
    M2,
    M3,
    Lbr,
    Btg,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Pcs => "Pcs",
            Unit::Dos => "Dos",
            Unit::Kg => "Kg",
            Unit::Zak => "Zak",
            Unit::M => "M",
            Unit::M2 => "M2",
            Unit::M3 => "M3",
            Unit::Lbr => "Lbr",
            Unit::Btg => "Btg",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub qty: f64,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl MaterialItem {
    pub fn blank() -> Self {
        MaterialItem {
            id: new_id(),
            name: String::new(),
            qty: 0.0,
            unit: Unit::Pcs,
            icon: Some(DEFAULT_ICON.to_string()),
        }
    }

    /// Case-insensitive on the name, exact on the unit.
    pub fn matches(&self, name: &str, unit: Unit) -> bool {
        self.unit == unit && self.name.to_lowercase() == name.to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub qty: f64,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl WorkItem {
    pub fn blank() -> Self {
        Self::with_id(new_id())
    }

    fn with_id(id: String) -> Self {
        WorkItem {
            id,
            text: String::new(),
            photos: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Plan,
    Progress,
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Section::Plan => "Rencana Kerja",
            Section::Progress => "Progress Kerja",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Plan => f.write_str("plan"),
            Section::Progress => f.write_str("progress"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    #[serde(default)]
    pub plan: Vec<WorkItem>,
    #[serde(default)]
    pub progress: Vec<WorkItem>,
    /// Legacy global photo list. Nothing reads it any more.
    #[serde(default)]
    pub photos: Vec<String>,
}

impl Default for DailyReport {
    fn default() -> Self {
        DailyReport {
            plan: (0..REPORT_SEED_LINES)
                .map(|i| WorkItem::with_id(format!("p{i}")))
                .collect(),
            progress: (0..REPORT_SEED_LINES)
                .map(|i| WorkItem::with_id(format!("pg{i}")))
                .collect(),
            photos: Vec::new(),
        }
    }
}

impl DailyReport {
    pub fn section(&self, section: Section) -> &Vec<WorkItem> {
        match section {
            Section::Plan => &self.plan,
            Section::Progress => &self.progress,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut Vec<WorkItem> {
        match section {
            Section::Plan => &mut self.plan,
            Section::Progress => &mut self.progress,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProgress {
    #[serde(default)]
    pub manpower: i64,
    #[serde(default)]
    pub weather: String,
    #[serde(default)]
    pub categories: Vec<ProgressCategory>,
}

impl Default for ProjectProgress {
    fn default() -> Self {
        ProjectProgress {
            manpower: 0,
            weather: DEFAULT_WEATHER.to_string(),
            categories: INITIAL_CATEGORIES
                .iter()
                .map(|(id, name)| ProgressCategory {
                    id: id.to_string(),
                    name: name.to_string(),
                    percentage: 0.0,
                })
                .collect(),
        }
    }
}

impl ProjectProgress {
    /// Mean of the category percentages, rounded. `None` without categories.
    pub fn overall(&self) -> Option<i64> {
        if self.categories.is_empty() {
            return None;
        }
        let sum: f64 = self.categories.iter().map(|c| c.percentage).sum();
        Some((sum / self.categories.len() as f64).round() as i64)
    }
}

fn default_expense_qty() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItem {
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub item: String,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default = "default_expense_qty")]
    pub qty: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub total: f64,
}

impl ExpenseItem {
    pub fn new(date: String) -> Self {
        ExpenseItem {
            id: new_id(),
            date,
            item: String::new(),
            unit: Unit::Pcs,
            qty: default_expense_qty(),
            price: 0.0,
            total: 0.0,
        }
    }

    pub fn set_qty(&mut self, qty: f64) {
        self.qty = qty;
        self.recompute_total();
    }

    pub fn set_price(&mut self, price: f64) {
        self.price = price;
        self.recompute_total();
    }

    pub fn recompute_total(&mut self) {
        self.total = self.qty * self.price;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundLog {
    pub id: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_photo: Option<String>,
    #[serde(default)]
    pub items: Vec<ExpenseItem>,
}

impl FundLog {
    /// The slot every location starts with (and gets back if it has none).
    pub fn first_slot() -> Self {
        FundLog {
            id: "f1".to_string(),
            number: "001".to_string(),
            receipt_photo: None,
            items: Vec::new(),
        }
    }

    pub fn grand_total(&self) -> f64 {
        self.items.iter().map(|item| item.total).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickLink {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub inventory: Vec<MaterialItem>,
    #[serde(default)]
    pub requests: Vec<RequestItem>,
    #[serde(default)]
    pub report: DailyReport,
    #[serde(default)]
    pub project_progress: ProjectProgress,
    #[serde(default)]
    pub funds: Vec<FundLog>,
}

impl Location {
    /// A freshly opened site, seeded the way the first run seeds every site.
    pub fn new(id: &str, name: &str) -> Self {
        Location {
            id: id.to_string(),
            name: name.to_string(),
            inventory: vec![
                MaterialItem {
                    id: "1".to_string(),
                    name: "Semen".to_string(),
                    qty: 50.0,
                    unit: Unit::Zak,
                    icon: Some(DEFAULT_ICON.to_string()),
                },
                MaterialItem {
                    id: "2".to_string(),
                    name: "Pasir".to_string(),
                    qty: 2.0,
                    unit: Unit::M3,
                    icon: Some("shovel".to_string()),
                },
            ],
            requests: Vec::new(),
            report: DailyReport::default(),
            project_progress: ProjectProgress::default(),
            funds: vec![FundLog::first_slot()],
        }
    }

    /// Restores the non-empty plan/progress/funds invariants. Returns whether
    /// anything had to be inserted.
    pub fn ensure_invariants(&mut self) -> bool {
        let mut changed = false;
        for section in [Section::Plan, Section::Progress] {
            let items = self.report.section_mut(section);
            if items.is_empty() {
                items.push(WorkItem::blank());
                changed = true;
            }
        }
        if self.funds.is_empty() {
            self.funds.push(FundLog::first_slot());
            changed = true;
        }
        changed
    }

    pub fn fund(&self, fund_id: &str) -> Option<&FundLog> {
        self.funds.iter().find(|fund| fund.id == fund_id)
    }

    pub fn work_item(&self, section: Section, item_id: &str) -> Option<&WorkItem> {
        self.report
            .section(section)
            .iter()
            .find(|item| item.id == item_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub schema_version: u32,
    pub current_location_id: String,
    pub locations: BTreeMap<String, Location>,
    #[serde(default)]
    pub user_avatar: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub quick_notes: Vec<String>,
    #[serde(default)]
    pub quick_links: Vec<QuickLink>,
    #[serde(default)]
    pub managed_projects_count: i64,
}

impl Default for Document {
    fn default() -> Self {
        let mut locations = BTreeMap::new();
        locations.insert("loc1".to_string(), Location::new("loc1", "Lokasi 1"));
        locations.insert("loc2".to_string(), Location::new("loc2", "Lokasi 2"));
        Document {
            schema_version: SCHEMA_VERSION,
            current_location_id: "loc1".to_string(),
            locations,
            user_avatar: DEFAULT_AVATARS[0].to_string(),
            user_name: DEFAULT_USER_NAME.to_string(),
            quick_notes: Vec::new(),
            quick_links: Vec::new(),
            managed_projects_count: DEFAULT_MANAGED_PROJECTS,
        }
    }
}

impl Document {
    pub fn current_location(&self) -> Option<&Location> {
        self.locations.get(self.current_location_id.as_str())
    }

    /// Points `currentLocationId` back at the first location when it dangles.
    /// Returns whether it moved.
    pub fn heal_current_location(&mut self) -> bool {
        if self
            .locations
            .contains_key(self.current_location_id.as_str())
        {
            return false;
        }
        match self.locations.keys().next() {
            Some(first) => {
                log::warn!(
                    "Active location {} is missing, switching to {}",
                    self.current_location_id,
                    first
                );
                self.current_location_id = first.clone();
                true
            }
            None => false,
        }
    }

    /// Checks every invariant the guard promises.
    pub fn is_consistent(&self) -> bool {
        self.locations
            .contains_key(self.current_location_id.as_str())
            && self.locations.values().all(|location| {
                !location.report.plan.is_empty()
                    && !location.report.progress.is_empty()
                    && !location.funds.is_empty()
                    && location
                        .funds
                        .iter()
                        .flat_map(|fund| fund.items.iter())
                        .all(|item| item.total == item.qty * item.price)
            })
    }
}

pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

pub fn new_id() -> String {
    let mut bytes = [0_u8; 10];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut hex = String::new();
    for b in bytes {
        hex.push_str(format!("{:02x}", b).as_str());
    }
    format!("id-{}-{hex}", now_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document_is_consistent() {
        let doc = Document::default();
        assert!(doc.is_consistent());
        assert_eq!(doc.current_location_id, "loc1");
        assert_eq!(doc.locations.len(), 2);
        let loc = doc.current_location().unwrap();
        assert_eq!(loc.report.plan.len(), 5);
        assert_eq!(loc.report.progress[4].id, "pg4");
        assert_eq!(loc.funds, vec![FundLog::first_slot()]);
    }

    #[test]
    fn overall_progress_is_rounded_mean() {
        let mut progress = ProjectProgress::default();
        let values = [100.0, 50.0, 25.0, 0.0, 0.0, 0.0];
        for (category, value) in progress.categories.iter_mut().zip(values) {
            category.percentage = value;
        }
        // 175 / 6 = 29.17
        assert_eq!(progress.overall(), Some(29));

        progress.categories.truncate(2);
        assert_eq!(progress.overall(), Some(75));

        progress.categories[1].percentage = 51.0;
        // 75.5 rounds up
        assert_eq!(progress.overall(), Some(76));
    }

    #[test]
    fn overall_progress_without_categories_is_none() {
        let progress = ProjectProgress {
            categories: Vec::new(),
            ..ProjectProgress::default()
        };
        assert_eq!(progress.overall(), None);
    }

    #[test]
    fn expense_total_follows_factors() {
        let mut item = ExpenseItem::new("2026-10-18".to_string());
        item.set_qty(3.0);
        item.set_price(1000.0);
        assert_eq!(item.total, 3000.0);
        item.set_price(2000.0);
        assert_eq!(item.qty, 3.0);
        assert_eq!(item.total, 6000.0);
    }

    #[test]
    fn material_match_ignores_name_case_only() {
        let item = MaterialItem {
            id: "1".to_string(),
            name: "Semen".to_string(),
            qty: 50.0,
            unit: Unit::Zak,
            icon: None,
        };
        assert!(item.matches("sEmEn", Unit::Zak));
        assert!(!item.matches("semen", Unit::Kg));
    }

    #[test]
    fn heal_points_at_first_location() {
        let mut doc = Document::default();
        doc.current_location_id = "gone".to_string();
        assert!(doc.heal_current_location());
        assert_eq!(doc.current_location_id, "loc1");
        assert!(!doc.heal_current_location());
    }

    #[test]
    fn document_round_trips_with_camel_case_keys() {
        let doc = Document::default();
        let text = serde_json::to_string(&doc).unwrap();
        assert!(text.contains("\"currentLocationId\":\"loc1\""));
        assert!(text.contains("\"projectProgress\""));
        assert!(text.contains("\"schemaVersion\":2"));
        let back: Document = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn ids_are_unique() {
        let a = new_id();
        let b = new_id();
        assert!(a.starts_with("id-"));
        assert_ne!(a, b);
    }
}
