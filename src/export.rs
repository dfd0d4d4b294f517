//! Batch output of listings and price history.
//!
//! Provides CSV, JSON, and plain text formats for piping into other tools.

use crate::chart::format_tick;
use crate::cli::ExportFormat;
use crate::models::{ChartSeries, PricePoint, RamListing, format_timestamp};
use anyhow::{Context, Result};
use num_format::{Locale, ToFormattedString};
use serde::Serialize;

/// Export listings in the specified format.
pub fn export_listings(items: &[&RamListing], format: ExportFormat, currency: &str) -> Result<String> {
    match format {
        ExportFormat::Text => Ok(listings_text(items, currency)),
        ExportFormat::Csv => Ok(listings_csv(items)),
        ExportFormat::Json => {
            serde_json::to_string_pretty(items).context("Failed to serialize listings")
        }
    }
}

/// Export one listing's price series in the specified format.
pub fn export_series(series: &ChartSeries, format: ExportFormat, currency: &str) -> Result<String> {
    match format {
        ExportFormat::Text => {
            let mut output = String::new();
            for (date, price) in series.dates.iter().zip(&series.prices) {
                output.push_str(&format!("{:<18} {:>14}\n", date, format_tick(currency, *price)));
            }
            Ok(output)
        }
        ExportFormat::Csv => {
            let mut output = String::from("date,price\n");
            for (date, price) in series.dates.iter().zip(&series.prices) {
                output.push_str(&format!("{},{}\n", csv_field(date), price));
            }
            Ok(output)
        }
        ExportFormat::Json => {
            let points: Vec<SeriesPoint<'_>> = series
                .dates
                .iter()
                .zip(&series.prices)
                .map(|(date, price)| SeriesPoint { date, price: *price })
                .collect();
            serde_json::to_string_pretty(&points).context("Failed to serialize price history")
        }
    }
}

/// Export every scraped observation of one listing.
pub fn export_history(points: &[PricePoint], format: ExportFormat, currency: &str) -> Result<String> {
    match format {
        ExportFormat::Text => {
            let mut output = format!("{:<18} {:>14} {}\n", "SCRAPED", "PRICE", "STATUS");
            for point in points {
                output.push_str(&format!(
                    "{:<18} {:>14} {}\n",
                    format_timestamp(&point.scraped_at),
                    format_price(Some(point.price), currency),
                    point.status
                ));
            }
            Ok(output)
        }
        ExportFormat::Csv => {
            let mut output = String::from("scraped_at,price,status\n");
            for point in points {
                output.push_str(&format!(
                    "{},{},{}\n",
                    csv_field(&point.scraped_at),
                    point.price,
                    csv_field(&point.status)
                ));
            }
            Ok(output)
        }
        ExportFormat::Json => {
            serde_json::to_string_pretty(points).context("Failed to serialize price history")
        }
    }
}

#[derive(Serialize)]
struct SeriesPoint<'a> {
    date: &'a str,
    price: f64,
}

fn listings_text(items: &[&RamListing], currency: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:>6} {:<40} {:<36} {:>14} {:<12} {:<16} {}\n",
        "ID", "NAME", "SPEC", "PRICE", "STATUS", "UPDATED", "TRACKED"
    ));
    output.push_str(&"-".repeat(136));
    output.push('\n');

    for item in items {
        output.push_str(&format!(
            "{:>6} {:<40} {:<36} {:>14} {:<12} {:<16} {}\n",
            item.id,
            truncate_string(&item.display_name(), 40),
            truncate_string(&item.spec_line(), 36),
            format_price(item.latest_price, currency),
            item.latest_status.as_deref().unwrap_or("-"),
            item.scraped_at_local().unwrap_or_else(|| "-".to_string()),
            if item.is_tracked { "yes" } else { "no" },
        ));
    }
    output
}

fn listings_csv(items: &[&RamListing]) -> String {
    let mut output =
        String::from("id,brand,name,category,capacity,speed,latency,dual_channel,price,status,");
    output.push_str("scraped_at,tracked\n");

    for item in items {
        let fields = [
            item.id.to_string(),
            csv_field(item.brand.as_deref().unwrap_or_default()),
            csv_field(&item.name_raw),
            csv_field(item.category.as_deref().unwrap_or_default()),
            csv_field(item.capacity.as_deref().unwrap_or_default()),
            csv_field(item.speed.as_deref().unwrap_or_default()),
            csv_field(item.latency.as_deref().unwrap_or_default()),
            item.is_dual_channel.to_string(),
            item.latest_price.map(|p| p.to_string()).unwrap_or_default(),
            csv_field(item.latest_status.as_deref().unwrap_or_default()),
            csv_field(item.latest_scraped_at.as_deref().unwrap_or_default()),
            item.is_tracked.to_string(),
        ];
        output.push_str(&fields.join(","));
        output.push('\n');
    }
    output
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Price with thousands separators and currency, or `N/A` when unknown.
pub fn format_price(price: Option<f64>, currency: &str) -> String {
    match price {
        Some(p) if p.fract() == 0.0 && p.abs() < i64::MAX as f64 => {
            format!("{} {}", (p as i64).to_formatted_string(&Locale::en), currency)
        }
        Some(p) => format!("{:.2} {}", p, currency),
        None => "N/A".to_string(),
    }
}

/// Truncate string to max length, in characters.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::listing;

    #[test]
    fn test_export_csv() {
        let mut item = listing(1, "Fury Beast, 32GB", Some(2990.0));
        item.is_tracked = true;
        let csv = export_listings(&[&item], ExportFormat::Csv, "NT$").unwrap();
        assert!(csv.starts_with("id,brand,name"));
        assert!(csv.contains("\"Fury Beast, 32GB\""));
        assert!(csv.trim_end().ends_with("true"));
    }

    #[test]
    fn test_export_csv_carries_category_and_channel() {
        let mut item = listing(7, "Kit G", Some(1990.0));
        item.category = Some("DDR4".to_string());
        item.is_dual_channel = true;
        let csv = export_listings(&[&item], ExportFormat::Csv, "NT$").unwrap();
        let mut lines = csv.lines();
        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(header.len(), row.len());
        let col = |name: &str| header.iter().position(|h| *h == name).unwrap();
        assert_eq!(row[col("category")], "DDR4");
        assert_eq!(row[col("dual_channel")], "true");

        let text = export_listings(&[&item], ExportFormat::Text, "NT$").unwrap();
        assert!(text.contains("DDR4 32GB 6000 CL30 dual-channel"));
    }

    #[test]
    fn test_csv_field_quotes_carriage_return() {
        assert_eq!(csv_field("line\r\nbreak"), "\"line\r\nbreak\"");
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_export_json() {
        let item = listing(5, "Kit A", None);
        let json = export_listings(&[&item], ExportFormat::Json, "NT$").unwrap();
        let parsed: Vec<RamListing> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vec![item]);
    }

    #[test]
    fn test_export_text() {
        let item = listing(5, "Kit A", None);
        let text = export_listings(&[&item], ExportFormat::Text, "NT$").unwrap();
        assert!(text.contains("Kingston Kit A"));
        assert!(text.contains("N/A"));
    }

    #[test]
    fn test_export_series() {
        let series = ChartSeries {
            dates: vec!["2024-01".to_string(), "2024-02".to_string()],
            prices: vec![100.0, 110.0],
        };
        let csv = export_series(&series, ExportFormat::Csv, "NT$").unwrap();
        assert_eq!(csv, "date,price\n2024-01,100\n2024-02,110\n");
        let text = export_series(&series, ExportFormat::Text, "NT$").unwrap();
        assert!(text.contains("NT$ 110"));
    }

    #[test]
    fn test_export_history() {
        let points = vec![PricePoint {
            price: 3290.0,
            status: "out_of_stock".to_string(),
            scraped_at: "2024-03-01T08:00:00".to_string(),
        }];
        let csv = export_history(&points, ExportFormat::Csv, "NT$").unwrap();
        assert_eq!(csv, "scraped_at,price,status\n2024-03-01T08:00:00,3290,out_of_stock\n");
        let text = export_history(&points, ExportFormat::Text, "NT$").unwrap();
        assert!(text.contains("3,290 NT$"));
        assert!(text.contains("out_of_stock"));
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(Some(12990.0), "NT$"), "12,990 NT$");
        assert_eq!(format_price(Some(9.5), "$"), "9.50 $");
        assert_eq!(format_price(None, "NT$"), "N/A");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("a longer listing name", 10), "a longe...");
        assert_eq!(truncate_string("記憶體模組規格", 5), "記憶...");
    }
}
