//! Cleaning of the per-item unit-price table.
//!
//! Unlike the tender table, unit-price exports carry arbitrary extra columns, so
//! rows are handled as plain strings and unknown columns pass through untouched.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::Table;
use crate::error::{ReconcileError, Result};
use crate::pipeline::processing::currency::{ConversionTable, PriceInput};

pub const AMOUNT_COLUMN: &str = "amount";
pub const UNIT_PRICE_COLUMN: &str = "unit price";
pub const CURRENCY_COLUMN: &str = "currency";
pub const DATE_COLUMN: &str = "date";
pub const CATEGORY_COLUMN: &str = "Product category";
pub const UNIT_PRICE_EUR_COLUMN: &str = "unit_price_eur";
pub const SPENT_COLUMN: &str = "spent";

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnitPriceSummary {
    pub rows: usize,
    pub unparseable_amounts: usize,
    pub unparseable_dates: usize,
    /// Rows with more fields than the header; the extra fields are dropped
    pub overlong_rows: usize,
    pub missing_unit_price_eur: usize,
    pub total_spent_eur: f64,
}

/// Reformat a date into `%Y-%m-%d`
pub fn normalize_date(value: &str) -> Option<String> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Plain numeric coercion; anything else, thousands separators included, is missing
fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn format_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Convert unit prices to EUR, derive the spent amount, and tidy categories and dates.
///
/// `unit_price_eur` is always recomputed from `unit price` and `currency`.
pub fn clean_unit_prices(table: Table, rates: &ConversionTable) -> Result<(Table, UnitPriceSummary)> {
    let require = |name: &str| {
        table
            .column(name)
            .ok_or_else(|| ReconcileError::MissingColumn(name.to_string()))
    };
    let amount_col = require(AMOUNT_COLUMN)?;
    let unit_price_col = require(UNIT_PRICE_COLUMN)?;
    let currency_col = require(CURRENCY_COLUMN)?;
    let date_col = require(DATE_COLUMN)?;
    let category_col = require(CATEGORY_COLUMN)?;

    let mut headers = table.headers.clone();
    let eur_col = match table.column(UNIT_PRICE_EUR_COLUMN) {
        Some(col) => col,
        None => {
            headers.push(UNIT_PRICE_EUR_COLUMN.to_string());
            headers.len() - 1
        }
    };
    let spent_col = match headers.iter().position(|h| h.trim() == SPENT_COLUMN) {
        Some(col) => col,
        None => {
            headers.push(SPENT_COLUMN.to_string());
            headers.len() - 1
        }
    };

    let mut summary = UnitPriceSummary {
        rows: table.rows.len(),
        ..Default::default()
    };

    let source_width = table.headers.len();
    let width = headers.len();
    let mut rows = Vec::with_capacity(table.rows.len());
    for (line, mut row) in table.rows.into_iter().enumerate() {
        if row.len() > source_width {
            warn!(
                row = line + 1,
                fields = row.len(),
                columns = source_width,
                "Unit-price row has more fields than the header; extra fields dropped"
            );
            summary.overlong_rows += 1;
            row.truncate(source_width);
        }
        row.resize(width, String::new());

        let amount = parse_number(&row[amount_col]);
        if amount.is_none() && !row[amount_col].trim().is_empty() {
            summary.unparseable_amounts += 1;
        }
        let unit_price = parse_number(&row[unit_price_col]);

        let unit_price_eur = rates.normalize(
            unit_price.map_or(PriceInput::Missing, PriceInput::Number),
            Some(row[currency_col].as_str()),
            None,
        );
        if unit_price_eur.is_none() {
            summary.missing_unit_price_eur += 1;
        }

        let spent = match (unit_price_eur, amount) {
            (Some(price), Some(amount)) => Some(price * amount),
            _ => None,
        };
        summary.total_spent_eur += spent.unwrap_or(0.0);

        let date = normalize_date(&row[date_col]);
        if date.is_none() && !row[date_col].trim().is_empty() {
            summary.unparseable_dates += 1;
        }

        row[amount_col] = format_number(amount);
        row[unit_price_col] = format_number(unit_price);
        row[eur_col] = format_number(unit_price_eur);
        row[spent_col] = format_number(spent);
        row[date_col] = date.unwrap_or_default();
        row[category_col] = row[category_col].trim().to_uppercase();

        rows.push(row);
    }

    info!(
        rows = summary.rows,
        missing_unit_price_eur = summary.missing_unit_price_eur,
        "Cleaned unit prices"
    );

    Ok((Table { headers, rows }, summary))
}
