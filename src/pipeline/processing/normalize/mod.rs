use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::constants::{PROCEDURE_CLOSED, PROCEDURE_DIRECT, PROCEDURE_OPEN};
use crate::domain::{RawTenderRecord, TenderRecord};
use crate::pipeline::processing::currency::{ConversionTable, PriceInput};

/// Free-text procedure labels seen in the sources, mapped onto the three-value taxonomy
static PROCEDURE_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Open procedure", PROCEDURE_OPEN),
        ("Competitive dialogue", PROCEDURE_OPEN),
        ("Restricted procedure", PROCEDURE_OPEN),
        ("Restricted procedure (OJEU)", PROCEDURE_OPEN),
        ("Open procedure (OJEU)", PROCEDURE_OPEN),
        ("Competitive procedure with negotiation", PROCEDURE_CLOSED),
        ("Negotiated procedure", PROCEDURE_CLOSED),
        ("Contract award without prior publication", PROCEDURE_DIRECT),
        ("Negotiated without a call for competition", PROCEDURE_DIRECT),
        ("Contract award without notice", PROCEDURE_DIRECT),
        ("Negotiated without a prior call for competition", PROCEDURE_DIRECT),
        ("Negociado sin publicidad", PROCEDURE_DIRECT),
    ])
});

/// Map a procedure label onto the canonical taxonomy. Unknown labels pass through.
pub fn normalize_procedure(label: Option<String>) -> Option<String> {
    label.map(|label| match PROCEDURE_MAP.get(label.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => label,
    })
}

/// Trim an identity field; blank values become missing
pub fn trim_field(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Field-level normalization of a single in-scope record
pub struct RecordNormalizer {
    rates: ConversionTable,
}

impl RecordNormalizer {
    pub fn new(rates: ConversionTable) -> Self {
        Self { rates }
    }

    /// Resolve common-currency prices and trim identity fields, producing a fresh record
    pub fn normalize(&self, raw: RawTenderRecord) -> TenderRecord {
        let price_eur = self.rates.normalize(
            PriceInput::from(raw.price.as_deref()),
            raw.price_currency.as_deref(),
            raw.price_eur.as_deref(),
        );
        let price_lot_eur = self.rates.normalize(
            PriceInput::from(raw.price_lot.as_deref()),
            raw.price_lot_currency.as_deref(),
            raw.price_lot_eur.as_deref(),
        );

        TenderRecord {
            id: raw.id,
            ted_id: raw.ted_id,
            contract_number: raw.contract_number,
            lot: raw.lot,
            title: raw.title,
            procedure: raw.procedure,
            record_type: raw.record_type,
            status: raw.status,
            product: raw.product,
            buyer: trim_field(raw.buyer),
            buyer_city: raw.buyer_city,
            buyer_country: raw.buyer_country,
            supplier: trim_field(raw.supplier),
            supplier_id: raw.supplier_id,
            supplier_country: raw.supplier_country,
            supplier_city: raw.supplier_city,
            supplier_street: raw.supplier_street,
            supplier_postcode: raw.supplier_postcode,
            price: raw.price,
            price_currency: raw.price_currency,
            price_eur,
            price_lot: raw.price_lot,
            price_lot_currency: raw.price_lot_currency,
            price_lot_eur,
            year: raw.year,
            published: raw.published,
            date: raw.date,
            date_until: raw.date_until,
            date_added: raw.date_added,
            bids: raw.bids,
            cpv_codes: raw.cpv_codes,
            source: trim_field(raw.source),
            description: raw.description,
            description_en: raw.description_en,
        }
    }
}
