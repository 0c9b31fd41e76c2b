use serde::{Deserialize, Serialize};

use crate::constants;

/// Fixed output column set of a row type, in serialization order
pub trait TableColumns {
    const COLUMNS: &'static [&'static str];
}

/// One row of the heterogeneous source table: a notice, a lot, or an award.
///
/// Every column is optional because national sources populate different subsets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTenderRecord {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    #[serde(rename = "TED_id")]
    pub ted_id: Option<String>,
    pub contract_number: Option<String>,
    pub lot: Option<String>,
    pub title: Option<String>,
    pub procedure: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub status: Option<String>,
    pub product: Option<String>,
    pub buyer: Option<String>,
    pub buyer_city: Option<String>,
    pub buyer_country: Option<String>,
    pub supplier: Option<String>,
    pub supplier_id: Option<String>,
    pub supplier_country: Option<String>,
    pub supplier_city: Option<String>,
    pub supplier_street: Option<String>,
    pub supplier_postcode: Option<String>,
    pub price: Option<String>,
    pub price_currency: Option<String>,
    #[serde(rename = "price_EUR")]
    pub price_eur: Option<String>,
    pub price_lot: Option<String>,
    pub price_lot_currency: Option<String>,
    #[serde(rename = "price_lot_EUR")]
    pub price_lot_eur: Option<String>,
    pub year: Option<String>,
    pub published: Option<String>,
    pub date: Option<String>,
    pub date_until: Option<String>,
    pub date_added: Option<String>,
    pub bids: Option<String>,
    #[serde(rename = "CPV_codes")]
    pub cpv_codes: Option<String>,
    pub source: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "description_EN")]
    pub description_en: Option<String>,
}

/// A record that survived cleaning, with prices resolved into the common currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenderRecord {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    #[serde(rename = "TED_id")]
    pub ted_id: Option<String>,
    pub contract_number: Option<String>,
    pub lot: Option<String>,
    pub title: Option<String>,
    pub procedure: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub status: Option<String>,
    pub product: Option<String>,
    pub buyer: Option<String>,
    pub buyer_city: Option<String>,
    pub buyer_country: Option<String>,
    pub supplier: Option<String>,
    pub supplier_id: Option<String>,
    pub supplier_country: Option<String>,
    pub supplier_city: Option<String>,
    pub supplier_street: Option<String>,
    pub supplier_postcode: Option<String>,
    pub price: Option<String>,
    pub price_currency: Option<String>,
    #[serde(rename = "price_EUR")]
    pub price_eur: Option<f64>,
    pub price_lot: Option<String>,
    pub price_lot_currency: Option<String>,
    #[serde(rename = "price_lot_EUR")]
    pub price_lot_eur: Option<f64>,
    pub year: Option<String>,
    pub published: Option<String>,
    pub date: Option<String>,
    pub date_until: Option<String>,
    pub date_added: Option<String>,
    pub bids: Option<String>,
    #[serde(rename = "CPV_codes")]
    pub cpv_codes: Option<String>,
    pub source: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "description_EN")]
    pub description_en: Option<String>,
}

impl TableColumns for TenderRecord {
    const COLUMNS: &'static [&'static str] = &[
        "ID",
        "TED_id",
        "contract_number",
        "lot",
        "title",
        "procedure",
        "type",
        "status",
        "product",
        "buyer",
        "buyer_city",
        "buyer_country",
        "supplier",
        "supplier_id",
        "supplier_country",
        "supplier_city",
        "supplier_street",
        "supplier_postcode",
        "price",
        "price_currency",
        "price_EUR",
        "price_lot",
        "price_lot_currency",
        "price_lot_EUR",
        "year",
        "published",
        "date",
        "date_until",
        "date_added",
        "bids",
        "CPV_codes",
        "source",
        "description",
        "description_EN",
    ];
}

impl TenderRecord {
    /// Case-insensitive comparison of the record type column
    pub fn is_type(&self, record_type: &str) -> bool {
        self.record_type
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(record_type))
    }

    pub fn is_contract(&self) -> bool {
        self.is_type(constants::TYPE_CONTRACT)
    }

    pub fn is_awarded_tender(&self) -> bool {
        self.is_type(constants::TYPE_AWARDED_TENDER)
    }

    /// Every field except the record identifier, used for exact-duplicate detection.
    ///
    /// Floats are compared bitwise so two missing prices compare equal.
    pub fn content_key(&self) -> (Vec<Option<&str>>, Option<u64>, Option<u64>) {
        let text = vec![
            self.ted_id.as_deref(),
            self.contract_number.as_deref(),
            self.lot.as_deref(),
            self.title.as_deref(),
            self.procedure.as_deref(),
            self.record_type.as_deref(),
            self.status.as_deref(),
            self.product.as_deref(),
            self.buyer.as_deref(),
            self.buyer_city.as_deref(),
            self.buyer_country.as_deref(),
            self.supplier.as_deref(),
            self.supplier_id.as_deref(),
            self.supplier_country.as_deref(),
            self.supplier_city.as_deref(),
            self.supplier_street.as_deref(),
            self.supplier_postcode.as_deref(),
            self.price.as_deref(),
            self.price_currency.as_deref(),
            self.price_lot.as_deref(),
            self.price_lot_currency.as_deref(),
            self.year.as_deref(),
            self.published.as_deref(),
            self.date.as_deref(),
            self.date_until.as_deref(),
            self.date_added.as_deref(),
            self.bids.as_deref(),
            self.cpv_codes.as_deref(),
            self.source.as_deref(),
            self.description.as_deref(),
            self.description_en.as_deref(),
        ];
        (
            text,
            self.price_eur.map(f64::to_bits),
            self.price_lot_eur.map(f64::to_bits),
        )
    }
}

/// One row per distinct real-world tender or contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupedTender {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    pub product: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub status: Option<String>,
    pub published: Option<String>,
    pub year: Option<String>,
    pub date: Option<String>,
    pub procedure: Option<String>,
    pub title: Option<String>,
    pub bids: Option<String>,
    pub date_until: Option<String>,
    pub price: Option<String>,
    pub price_currency: Option<String>,
    #[serde(rename = "price_EUR")]
    pub price_eur: Option<f64>,
    pub buyer: Option<String>,
    pub buyer_city: Option<String>,
    pub buyer_country: Option<String>,
    #[serde(rename = "CPV_codes")]
    pub cpv_codes: Option<String>,
    pub source: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "description_EN")]
    pub description_en: Option<String>,
    pub date_added: Option<String>,
}

impl TableColumns for DedupedTender {
    const COLUMNS: &'static [&'static str] = &[
        "ID",
        "product",
        "type",
        "status",
        "published",
        "year",
        "date",
        "procedure",
        "title",
        "bids",
        "date_until",
        "price",
        "price_currency",
        "price_EUR",
        "buyer",
        "buyer_city",
        "buyer_country",
        "CPV_codes",
        "source",
        "description",
        "description_EN",
        "date_added",
    ];
}

impl From<&TenderRecord> for DedupedTender {
    fn from(record: &TenderRecord) -> Self {
        Self {
            id: record.id.clone(),
            product: record.product.clone(),
            record_type: record.record_type.clone(),
            status: record.status.clone(),
            published: record.published.clone(),
            year: record.year.clone(),
            date: record.date.clone(),
            procedure: record.procedure.clone(),
            title: record.title.clone(),
            bids: record.bids.clone(),
            date_until: record.date_until.clone(),
            price: record.price.clone(),
            price_currency: record.price_currency.clone(),
            price_eur: record.price_eur,
            buyer: record.buyer.clone(),
            buyer_city: record.buyer_city.clone(),
            buyer_country: record.buyer_country.clone(),
            cpv_codes: record.cpv_codes.clone(),
            source: record.source.clone(),
            description: record.description.clone(),
            description_en: record.description_en.clone(),
            date_added: record.date_added.clone(),
        }
    }
}

/// Row of the externally curated supplier-name table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierAlias {
    pub supplier: String,
    pub supplier_clean: String,
}

/// One resolved (tender, supplier, amount) award
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinningBid {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    pub date: Option<String>,
    pub product: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub title: Option<String>,
    pub lot: Option<String>,
    pub buyer_country: Option<String>,
    pub supplier: Option<String>,
    pub supplier_clean: String,
    #[serde(rename = "price_contract_EUR")]
    pub price_contract_eur: f64,
    #[serde(rename = "price_EUR")]
    pub price_eur: Option<f64>,
    #[serde(rename = "price_lot_EUR")]
    pub price_lot_eur: Option<f64>,
    pub supplier_id: Option<String>,
    pub supplier_country: Option<String>,
    pub supplier_city: Option<String>,
    pub supplier_street: Option<String>,
    pub supplier_postcode: Option<String>,
    pub procedure: Option<String>,
    pub bids: Option<String>,
    pub contract_number: Option<String>,
    #[serde(rename = "TED_id")]
    pub ted_id: Option<String>,
    pub price: Option<String>,
    pub price_currency: Option<String>,
    pub price_lot: Option<String>,
    pub source: Option<String>,
    pub resolved_by: String,
}

impl TableColumns for WinningBid {
    const COLUMNS: &'static [&'static str] = &[
        "ID",
        "date",
        "product",
        "type",
        "title",
        "lot",
        "buyer_country",
        "supplier",
        "supplier_clean",
        "price_contract_EUR",
        "price_EUR",
        "price_lot_EUR",
        "supplier_id",
        "supplier_country",
        "supplier_city",
        "supplier_street",
        "supplier_postcode",
        "procedure",
        "bids",
        "contract_number",
        "TED_id",
        "price",
        "price_currency",
        "price_lot",
        "source",
        "resolved_by",
    ];
}

impl WinningBid {
    pub fn new(
        record: &TenderRecord,
        amount: f64,
        supplier_clean: &str,
        resolved_by: &str,
    ) -> Self {
        Self {
            id: record.id.clone(),
            date: record.date.clone(),
            product: record.product.clone(),
            record_type: record.record_type.clone(),
            title: record.title.clone(),
            lot: record.lot.clone(),
            buyer_country: record.buyer_country.clone(),
            supplier: record.supplier.clone(),
            supplier_clean: supplier_clean.to_string(),
            price_contract_eur: amount,
            price_eur: record.price_eur,
            price_lot_eur: record.price_lot_eur,
            supplier_id: record.supplier_id.clone(),
            supplier_country: record.supplier_country.clone(),
            supplier_city: record.supplier_city.clone(),
            supplier_street: record.supplier_street.clone(),
            supplier_postcode: record.supplier_postcode.clone(),
            procedure: record.procedure.clone(),
            bids: record.bids.clone(),
            contract_number: record.contract_number.clone(),
            ted_id: record.ted_id.clone(),
            price: record.price.clone(),
            price_currency: record.price_currency.clone(),
            price_lot: record.price_lot.clone(),
            source: record.source.clone(),
            resolved_by: resolved_by.to_string(),
        }
    }
}

/// Schema-less table, for inputs whose extra columns must pass through untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }
}
