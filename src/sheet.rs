//! Pushes a fund batch to the spreadsheet web-hook.

use crate::error::{DashboardError, Result};
use crate::format::format_qty;
use crate::model::FundLog;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

pub const MATERIAL_CATEGORY: &str = "Bahan";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetPayload {
    pub data: Vec<Vec<String>>,
}

/// `[fundNumber, date, item, "", item, "Bahan", "", qty]` per expense line.
pub fn rows_for_fund(fund: &FundLog) -> Vec<Vec<String>> {
    fund.items
        .iter()
        .map(|item| {
            vec![
                fund.number.clone(),
                item.date.clone(),
                item.item.clone(),
                String::new(),
                item.item.clone(),
                MATERIAL_CATEGORY.to_string(),
                String::new(),
                format_qty(item.qty),
            ]
        })
        .collect()
}

#[derive(Clone)]
pub struct SheetClient {
    http: reqwest::Client,
    url: String,
}

impl SheetClient {
    /// `None` when the web-hook is disabled (blank URL).
    pub fn new(url: &str, timeout: Duration) -> Option<Self> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("renovki-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Some(SheetClient {
            http,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Only a request that fails to go through counts as an error. The
    /// response status and body are not inspected.
    pub async fn post_rows(&self, rows: Vec<Vec<String>>) -> Result<()> {
        let response = self
            .http
            .post(&self.url)
            .json(&SheetPayload { data: rows })
            .send()
            .await?;
        log::debug!("Sheet web-hook answered {}", response.status());
        Ok(())
    }

    /// The sync task for one fund. Nobody awaits its result; failures go to
    /// `on_failure` once.
    pub fn sync_task<F>(&self, fund: &FundLog, on_failure: F) -> impl Future<Output = ()> + Send
    where
        F: FnOnce(DashboardError) + Send + 'static,
    {
        let client = self.clone();
        let rows = rows_for_fund(fund);
        let number = fund.number.clone();
        async move {
            if rows.is_empty() {
                log::info!("Fund {number} has no items, skipping sheet sync");
                return;
            }
            let count = rows.len();
            match client.post_rows(rows).await {
                Ok(()) => log::info!("Synced {count} row(s) of fund {number} to sheet"),
                Err(err) => {
                    log::error!("Error syncing to sheet: {err}");
                    on_failure(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExpenseItem, Unit};

    #[test]
    fn projects_expense_lines() {
        let mut fund = FundLog::first_slot();
        let mut item = ExpenseItem::new("2026-10-18".to_string());
        item.item = "Pasir".to_string();
        item.unit = Unit::M3;
        item.set_qty(2.5);
        fund.items.push(item);
        assert_eq!(
            rows_for_fund(&fund),
            vec![vec![
                "001", "2026-10-18", "Pasir", "", "Pasir", "Bahan", "", "2.5"
            ]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()]
        );
    }

    #[test]
    fn blank_url_disables_client() {
        assert!(SheetClient::new("  ", Duration::from_secs(5)).is_none());
        let client = SheetClient::new(" https://example.com/hook ", Duration::from_secs(5)).unwrap();
        assert_eq!(client.url(), "https://example.com/hook");
    }

    #[test]
    fn payload_shape() {
        let payload = SheetPayload {
            data: vec![vec!["a".to_string()]],
        };
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"data":[["a"]]}"#
        );
    }
}
