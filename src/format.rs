//! WhatsApp captions, `wa.me` links and the Indonesian number/date formats
//! they use. Everything here is pure.

use crate::model::{FundLog, Location, Section, Unit, WorkItem};
use chrono::{Datelike, NaiveDate};

pub const WA_BASE_URL: &str = "https://wa.me/";

const WEEKDAYS: [&str; 7] = [
    "Minggu", "Senin", "Selasa", "Rabu", "Kamis", "Jumat", "Sabtu",
];

const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// `Sabtu | 17 Oktober | 2026`
pub fn caption_date(date: NaiveDate) -> String {
    let weekday = WEEKDAYS[date.weekday().num_days_from_sunday() as usize];
    let month = MONTHS[date.month0() as usize];
    format!("{weekday} | {} {month} | {}", date.day(), date.year())
}

/// `d/m/yyyy`, the date stamped on material requests.
pub fn request_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Plain number as the browser prints it: `50`, `2.5`.
pub fn format_qty(value: f64) -> String {
    format!("{value}")
}

/// Indonesian grouping: `.` for thousands, `,` for decimals, at most three
/// fraction digits.
pub fn format_rupiah(value: f64) -> String {
    let negative = value < 0.0;
    let scaled = (value.abs() * 1000.0).round() as u128;
    let whole = scaled / 1000;
    let fraction = scaled % 1000;

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if fraction > 0 {
        let text = format!("{fraction:03}");
        grouped.push(',');
        grouped.push_str(text.trim_end_matches('0'));
    }
    if negative && scaled > 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn wa_link(text: &str) -> String {
    format!("{WA_BASE_URL}?text={}", urlencoding::encode(text))
}

pub fn wa_contact_link(phone: &str) -> String {
    let digits: String = phone.chars().filter(|ch| ch.is_ascii_digit()).collect();
    format!("{WA_BASE_URL}{digits}")
}

/// Inventory snapshot for the site group. `None` when there is nothing listed.
pub fn stock_report(location: &Location) -> Option<String> {
    if location.inventory.is_empty() {
        return None;
    }
    let lines = location
        .inventory
        .iter()
        .filter(|item| !item.name.trim().is_empty())
        .map(|item| format!("{} {} {}", item.name, format_qty(item.qty), item.unit))
        .collect::<Vec<_>>()
        .join("\n");
    Some(format!(
        "*LAPORAN STOK MATERIAL*\nLokasi: {}\n\n{lines}",
        location.name
    ))
}

pub fn request_message(location_name: &str, item: &str, qty: f64, unit: Unit) -> String {
    format!(
        "*REQUEST MATERIAL*\nLokasi: {location_name}\n\n• {item} : {} {unit}",
        format_qty(qty)
    )
}

pub fn work_report(location: &Location, section: Section, date: NaiveDate) -> String {
    let content = location
        .report
        .section(section)
        .iter()
        .filter(|item| !item.text.trim().is_empty())
        .map(|item| format!("• Pek. {}", item.text))
        .collect::<Vec<_>>()
        .join("\n");
    let content = if content.is_empty() {
        "-".to_string()
    } else {
        content
    };
    format!(
        "Bismillah, Assalamualaikum\n{} Project {}\n⬇\n{}\n\n{content}",
        section.title(),
        location.name,
        caption_date(date)
    )
}

pub fn work_item_caption(location_name: &str, item: &WorkItem, date: NaiveDate) -> String {
    let text = if item.text.is_empty() {
        "Tanpa Keterangan"
    } else {
        item.text.as_str()
    };
    format!(
        "*DOKUMENTASI PEKERJAAN*\nLokasi: {location_name}\nItem: {text}\n\n{}",
        caption_date(date)
    )
}

pub fn work_item_photo_name(item_id: &str, position: usize) -> String {
    format!("dokumentasi-{item_id}-{position}.jpg")
}

pub fn fund_report(location_name: &str, fund: &FundLog) -> String {
    let lines = fund
        .items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            format!(
                "{}. {} ({} {}) - Rp {}",
                idx + 1,
                item.item,
                format_qty(item.qty),
                item.unit,
                format_rupiah(item.total)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "*DANA LAPANGAN NO {}*\nLokasi: {location_name}\n\n{lines}\n\n*Total: Rp {}*",
        fund.number,
        format_rupiah(fund.grand_total())
    )
}

pub fn receipt_photo_name(fund_number: &str) -> String {
    format!("nota-dl-{fund_number}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExpenseItem;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn dates_in_indonesian() {
        assert_eq!(caption_date(date()), "Minggu | 18 Oktober | 2026");
        assert_eq!(request_date(date()), "18/10/2026");
        assert_eq!(
            request_date(NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()),
            "5/3/2026"
        );
        assert_eq!(iso_date(date()), "2026-10-18");
    }

    #[test]
    fn rupiah_grouping() {
        assert_eq!(format_rupiah(0.0), "0");
        assert_eq!(format_rupiah(950.0), "950");
        assert_eq!(format_rupiah(6000.0), "6.000");
        assert_eq!(format_rupiah(1_250_000.0), "1.250.000");
        assert_eq!(format_rupiah(1234.5), "1.234,5");
        assert_eq!(format_rupiah(-15000.0), "-15.000");
    }

    #[test]
    fn quantities_print_like_the_browser() {
        assert_eq!(format_qty(50.0), "50");
        assert_eq!(format_qty(2.5), "2.5");
    }

    #[test]
    fn stock_report_skips_blank_names() {
        let mut location = Location::new("loc1", "Lokasi 1");
        location.inventory[1].name = "  ".to_string();
        assert_eq!(
            stock_report(&location).unwrap(),
            "*LAPORAN STOK MATERIAL*\nLokasi: Lokasi 1\n\nSemen 50 Zak"
        );
        location.inventory.clear();
        assert!(stock_report(&location).is_none());
    }

    #[test]
    fn request_message_layout() {
        assert_eq!(
            request_message("Lokasi 2", "Besi 10", 12.0, Unit::Btg),
            "*REQUEST MATERIAL*\nLokasi: Lokasi 2\n\n• Besi 10 : 12 Btg"
        );
    }

    #[test]
    fn work_report_lists_filled_lines() {
        let mut location = Location::new("loc1", "Lokasi 1");
        location.report.plan[0].text = "Pasang keramik".to_string();
        location.report.plan[2].text = "Cat dinding".to_string();
        assert_eq!(
            work_report(&location, Section::Plan, date()),
            "Bismillah, Assalamualaikum\nRencana Kerja Project Lokasi 1\n⬇\nMinggu | 18 Oktober | 2026\n\n• Pek. Pasang keramik\n• Pek. Cat dinding"
        );
        assert!(work_report(&location, Section::Progress, date()).ends_with("\n\n-"));
    }

    #[test]
    fn work_item_caption_defaults_text() {
        let item = WorkItem::blank();
        let caption = work_item_caption("Lokasi 1", &item, date());
        assert!(caption.contains("Item: Tanpa Keterangan"));
        assert_eq!(work_item_photo_name("pg1", 2), "dokumentasi-pg1-2.jpg");
    }

    #[test]
    fn fund_report_totals() {
        let mut fund = FundLog::first_slot();
        let mut semen = ExpenseItem::new("2026-10-18".to_string());
        semen.item = "Semen".to_string();
        semen.unit = Unit::Zak;
        semen.set_qty(3.0);
        semen.set_price(65000.0);
        let mut paku = ExpenseItem::new("2026-10-18".to_string());
        paku.item = "Paku".to_string();
        paku.unit = Unit::Kg;
        paku.set_price(20000.0);
        fund.items = vec![semen, paku];
        assert_eq!(
            fund_report("Lokasi 1", &fund),
            "*DANA LAPANGAN NO 001*\nLokasi: Lokasi 1\n\n1. Semen (3 Zak) - Rp 195.000\n2. Paku (1 Kg) - Rp 20.000\n\n*Total: Rp 215.000*"
        );
        assert_eq!(receipt_photo_name("001"), "nota-dl-001.jpg");
    }

    #[test]
    fn wa_links_are_encoded() {
        assert_eq!(
            wa_link("*A B*\nC&D"),
            "https://wa.me/?text=%2AA%20B%2A%0AC%26D"
        );
        assert_eq!(wa_contact_link("+62 852-5500-2368"), "https://wa.me/6285255002368");
    }
}
