//! Handing captions and photos to WhatsApp.
//!
//! A platform either shares a set of files natively or it does not. When it
//! does not, the caption goes out as a `wa.me` link and the photos stay behind.

use crate::error::{DashboardError, Result};
use crate::format::{
    fund_report, receipt_photo_name, request_message, wa_link, work_item_caption,
    work_item_photo_name,
};
use crate::model::{Location, Section};
use crate::photo::{photo_file, PhotoFile};
use chrono::NaiveDate;
use serde::Serialize;

pub trait ShareTarget {
    fn can_share_files(&self, files: &[PhotoFile]) -> bool;
    fn share_files(&self, files: &[PhotoFile], title: &str, text: &str) -> Result<()>;
    fn open_url(&self, url: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ShareOutcome {
    SharedFiles { count: usize },
    OpenedLink { url: String, dropped_photos: usize },
}

/// Caption plus photo files for one share action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePlan {
    pub title: String,
    pub caption: String,
    pub files: Vec<PhotoFile>,
}

impl SharePlan {
    pub fn text_only(caption: String) -> Self {
        SharePlan {
            title: String::new(),
            caption,
            files: Vec::new(),
        }
    }
}

pub fn share_or_link(target: &dyn ShareTarget, plan: &SharePlan) -> Result<ShareOutcome> {
    if !plan.files.is_empty() && target.can_share_files(&plan.files) {
        if let Err(err) = target.share_files(&plan.files, &plan.title, &plan.caption) {
            log::error!("Error sharing: {err}");
        }
        return Ok(ShareOutcome::SharedFiles {
            count: plan.files.len(),
        });
    }
    if !plan.files.is_empty() {
        log::warn!(
            "File sharing unavailable, sending caption without {} photo(s)",
            plan.files.len()
        );
    }
    let url = wa_link(&plan.caption);
    target.open_url(&url)?;
    Ok(ShareOutcome::OpenedLink {
        url,
        dropped_photos: plan.files.len(),
    })
}

/// Caption for a recorded material request, taken from the stored entry.
pub fn request_plan(location: &Location, request_id: &str) -> Result<SharePlan> {
    let request = location
        .requests
        .iter()
        .find(|request| request.id == request_id)
        .ok_or_else(|| DashboardError::not_found("request", request_id))?;
    Ok(SharePlan::text_only(request_message(
        &location.name,
        &request.name,
        request.qty,
        request.unit,
    )))
}

/// Documentation photos of one work line. Needs at least one photo.
pub fn work_item_plan(
    location: &Location,
    section: Section,
    item_id: &str,
    today: NaiveDate,
) -> Result<SharePlan> {
    let item = location
        .work_item(section, item_id)
        .ok_or_else(|| DashboardError::not_found("work item", item_id))?;
    if item.photos.is_empty() {
        return Err(DashboardError::MissingPhoto);
    }
    let files = item
        .photos
        .iter()
        .enumerate()
        .map(|(idx, photo)| photo_file(photo, work_item_photo_name(&item.id, idx + 1)))
        .collect::<Result<Vec<_>>>()?;
    Ok(SharePlan {
        title: "Dokumentasi Renovki".to_string(),
        caption: work_item_caption(&location.name, item, today),
        files,
    })
}

/// Expense batch with its receipt. Needs the receipt photo.
pub fn fund_plan(location: &Location, fund_id: &str) -> Result<SharePlan> {
    let fund = location
        .fund(fund_id)
        .ok_or_else(|| DashboardError::not_found("fund", fund_id))?;
    let receipt = fund
        .receipt_photo
        .as_deref()
        .ok_or(DashboardError::MissingPhoto)?;
    Ok(SharePlan {
        title: format!("Dana Lapangan {}", fund.number),
        caption: fund_report(&location.name, fund),
        files: vec![photo_file(receipt, receipt_photo_name(&fund.number))?],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::encode_data_url;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingTarget {
        native: bool,
        fail_native: bool,
        shared: RefCell<Vec<(usize, String)>>,
        opened: RefCell<Vec<String>>,
    }

    impl ShareTarget for RecordingTarget {
        fn can_share_files(&self, _files: &[PhotoFile]) -> bool {
            self.native
        }

        fn share_files(&self, files: &[PhotoFile], _title: &str, text: &str) -> Result<()> {
            if self.fail_native {
                return Err(DashboardError::Share("cancelled".to_string()));
            }
            self.shared.borrow_mut().push((files.len(), text.to_string()));
            Ok(())
        }

        fn open_url(&self, url: &str) -> Result<()> {
            self.opened.borrow_mut().push(url.to_string());
            Ok(())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn location_with_photos() -> Location {
        let mut location = Location::new("loc1", "Lokasi 1");
        location.report.progress[0].text = "Cor dak".to_string();
        location.report.progress[0].photos = vec![
            encode_data_url("image/jpeg", b"one"),
            encode_data_url("image/jpeg", b"two"),
        ];
        location.funds[0].receipt_photo = Some(encode_data_url("image/jpeg", b"nota"));
        location
    }

    #[test]
    fn native_share_when_supported() {
        let target = RecordingTarget {
            native: true,
            ..RecordingTarget::default()
        };
        let plan = work_item_plan(&location_with_photos(), Section::Progress, "pg0", today())
            .unwrap();
        assert_eq!(plan.files[1].name, "dokumentasi-pg0-2.jpg");
        let outcome = share_or_link(&target, &plan).unwrap();
        assert_eq!(outcome, ShareOutcome::SharedFiles { count: 2 });
        assert!(target.opened.borrow().is_empty());
        assert!(target.shared.borrow()[0].1.contains("Item: Cor dak"));
    }

    #[test]
    fn falls_back_to_link_and_drops_photos() {
        let target = RecordingTarget::default();
        let plan = fund_plan(&location_with_photos(), "f1").unwrap();
        let outcome = share_or_link(&target, &plan).unwrap();
        match outcome {
            ShareOutcome::OpenedLink {
                url,
                dropped_photos,
            } => {
                assert!(url.starts_with("https://wa.me/?text=%2ADANA%20LAPANGAN%20NO%20001%2A"));
                assert_eq!(dropped_photos, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(target.shared.borrow().is_empty());
    }

    #[test]
    fn native_failure_is_not_fatal() {
        let target = RecordingTarget {
            native: true,
            fail_native: true,
            ..RecordingTarget::default()
        };
        let plan = fund_plan(&location_with_photos(), "f1").unwrap();
        assert!(share_or_link(&target, &plan).is_ok());
        assert!(target.opened.borrow().is_empty());
    }

    #[test]
    fn text_only_always_uses_link() {
        let target = RecordingTarget {
            native: true,
            ..RecordingTarget::default()
        };
        let outcome = share_or_link(&target, &SharePlan::text_only("Halo".to_string())).unwrap();
        assert_eq!(
            outcome,
            ShareOutcome::OpenedLink {
                url: "https://wa.me/?text=Halo".to_string(),
                dropped_photos: 0
            }
        );
    }

    #[test]
    fn request_caption_uses_stored_name() {
        let mut location = Location::new("loc1", "Lokasi 1");
        location.requests.push(crate::model::RequestItem {
            id: "r1".to_string(),
            name: "Besi 10".to_string(),
            qty: 12.0,
            unit: crate::model::Unit::Btg,
            date: "18/10/2026".to_string(),
            status: crate::model::RequestStatus::Pending,
        });
        let plan = request_plan(&location, "r1").unwrap();
        assert_eq!(
            plan.caption,
            "*REQUEST MATERIAL*\nLokasi: Lokasi 1\n\n• Besi 10 : 12 Btg"
        );
        assert!(plan.files.is_empty());
        assert!(matches!(
            request_plan(&location, "r2"),
            Err(DashboardError::NotFound { .. })
        ));
    }

    #[test]
    fn sharing_requires_photos() {
        let location = Location::new("loc1", "Lokasi 1");
        assert!(matches!(
            work_item_plan(&location, Section::Plan, "p0", today()),
            Err(DashboardError::MissingPhoto)
        ));
        assert!(matches!(
            fund_plan(&location, "f1"),
            Err(DashboardError::MissingPhoto)
        ));
        assert!(matches!(
            fund_plan(&location, "nope"),
            Err(DashboardError::NotFound { .. })
        ));
    }
}
