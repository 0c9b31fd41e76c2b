use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::app::ports::ReconcileOutputPort;
use crate::app::reconcile_use_case::RunReport;
use crate::constants;
use crate::domain::{
    DedupedTender, RawTenderRecord, SupplierAlias, Table, TableColumns, TenderRecord, WinningBid,
};
use crate::error::{ReconcileError, Result};
use crate::pipeline::processing::awards::UnmatchedSupplier;

/// Read the raw tender table; a row that fails to parse fails the whole batch
pub fn read_tender_records<R: Read>(reader: R) -> Result<Vec<RawTenderRecord>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut records = Vec::new();
    for record in rdr.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

pub fn read_tender_records_from_path(path: &Path) -> Result<Vec<RawTenderRecord>> {
    let records = read_tender_records(File::open(path)?)?;
    info!(path = %path.display(), records = records.len(), "Loaded tender records");
    Ok(records)
}

/// Read the curated supplier table (`supplier`, `supplier_clean`)
pub fn read_supplier_aliases<R: Read>(reader: R) -> Result<Vec<SupplierAlias>> {
    let mut rdr = ReaderBuilder::new().from_reader(reader);
    let headers = rdr.headers()?.clone();
    for required in ["supplier", "supplier_clean"] {
        if !headers.iter().any(|h| h.trim() == required) {
            return Err(ReconcileError::MissingColumn(required.to_string()));
        }
    }

    let mut aliases = Vec::new();
    for alias in rdr.deserialize::<SupplierAlias>() {
        aliases.push(alias?);
    }
    Ok(aliases)
}

pub fn read_supplier_aliases_from_path(path: &Path) -> Result<Vec<SupplierAlias>> {
    let aliases = read_supplier_aliases(File::open(path)?)?;
    info!(path = %path.display(), aliases = aliases.len(), "Loaded supplier aliases");
    Ok(aliases)
}

/// Read any table as strings, keeping every column
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(Table { headers, rows })
}

pub fn read_table_from_path(path: &Path) -> Result<Table> {
    read_table(File::open(path)?)
}

/// Write `rows` under the type's fixed header; the header is present even with no rows
pub fn write_rows<W: Write, T: Serialize + TableColumns>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(T::COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_table<W: Write>(writer: W, table: &Table) -> Result<()> {
    let mut wtr = WriterBuilder::new().flexible(true).from_writer(writer);
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Create the parent directory and open `path` for writing
fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            debug!("Created output directory: {:?}", parent);
        }
    }
    Ok(File::create(path)?)
}

/// File-backed output port; an artifact without a path is not written
#[derive(Debug, Clone, Default)]
pub struct CsvOutputAdapter {
    pub tenders: Option<PathBuf>,
    pub winning_bids: Option<PathBuf>,
    pub missing_awards: Option<PathBuf>,
    pub unmatched_suppliers: Option<PathBuf>,
    pub unit_prices: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

impl CsvOutputAdapter {
    /// Write every artifact under `dir` with its default file name
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            tenders: Some(dir.join(constants::TENDERS_FILE)),
            winning_bids: Some(dir.join(constants::COMPANIES_FILE)),
            missing_awards: Some(dir.join(constants::COMPANIES_MISSING_FILE)),
            unmatched_suppliers: Some(dir.join(constants::COMPANIES_UNMATCHED_FILE)),
            unit_prices: Some(dir.join(constants::UNIT_PRICES_FILE)),
            report: Some(dir.join(constants::REPORT_FILE)),
        }
    }

    fn write_to<T: Serialize + TableColumns>(&self, path: &Option<PathBuf>, rows: &[T]) -> Result<()> {
        let Some(path) = path else {
            return Ok(());
        };
        write_rows(create_file(path)?, rows)?;
        info!(path = %path.display(), rows = rows.len(), "Wrote table");
        Ok(())
    }
}

impl ReconcileOutputPort for CsvOutputAdapter {
    fn write_tenders(&self, tenders: &[DedupedTender]) -> Result<()> {
        self.write_to(&self.tenders, tenders)
    }

    fn write_winning_bids(&self, bids: &[WinningBid]) -> Result<()> {
        self.write_to(&self.winning_bids, bids)
    }

    fn write_missing_awards(&self, records: &[TenderRecord]) -> Result<()> {
        self.write_to(&self.missing_awards, records)
    }

    fn write_unmatched_suppliers(&self, rows: &[UnmatchedSupplier]) -> Result<()> {
        self.write_to(&self.unmatched_suppliers, rows)
    }

    fn write_unit_prices(&self, table: &Table) -> Result<()> {
        let Some(path) = &self.unit_prices else {
            return Ok(());
        };
        write_table(create_file(path)?, table)?;
        info!(path = %path.display(), rows = table.rows.len(), "Wrote table");
        Ok(())
    }

    fn write_report(&self, report: &RunReport) -> Result<()> {
        let Some(path) = &self.report else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(report)?;
        let mut file = create_file(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TENDERS_CSV: &str = "\
ID,TED_id,title,type,year,product,status,price,price_currency,price_EUR,buyer_country,extra
1,2020/S 001-1,Masks,awarded tender,2020,masks,active,\"1,000\",EUR,,DE,x
2,,Gloves,contract,2020,gloves,,500,CZK,18,AL,y
";

    #[test]
    fn test_read_tender_records_maps_columns_and_blanks() {
        let records = read_tender_records(TENDERS_CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.id.as_deref(), Some("1"));
        assert_eq!(first.ted_id.as_deref(), Some("2020/S 001-1"));
        assert_eq!(first.record_type.as_deref(), Some("awarded tender"));
        assert_eq!(first.price.as_deref(), Some("1,000"));
        assert_eq!(first.price_eur, None);
        assert_eq!(first.supplier, None);

        let second = &records[1];
        assert_eq!(second.ted_id, None);
        assert_eq!(second.status, None);
        assert_eq!(second.price_eur.as_deref(), Some("18"));
    }

    #[test]
    fn test_read_supplier_aliases_requires_columns() {
        let aliases = read_supplier_aliases("supplier,supplier_clean\nAcme Ltd,acme\n".as_bytes()).unwrap();
        assert_eq!(
            aliases,
            vec![SupplierAlias {
                supplier: "Acme Ltd".to_string(),
                supplier_clean: "acme".to_string(),
            }]
        );

        let result = read_supplier_aliases("supplier,name\nAcme,acme\n".as_bytes());
        assert!(matches!(result, Err(ReconcileError::MissingColumn(c)) if c == "supplier_clean"));
    }

    #[test]
    fn test_table_round_trip_keeps_unknown_columns() {
        let input = "a,b,c\n1,2,3\n4,,6\n";
        let table = read_table(input.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["a", "b", "c"]);

        let mut out = Vec::new();
        write_table(&mut out, &table).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), input);
    }

    #[test]
    fn test_write_rows_renders_missing_prices_as_empty() {
        let record = TenderRecord {
            id: Some("1".to_string()),
            price_eur: None,
            price_lot_eur: Some(2.5),
            ..Default::default()
        };
        let mut out = Vec::new();
        write_rows(&mut out, &[record]).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("ID,TED_id,contract_number"));
        assert!(header.contains("price_EUR"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("1,,"));
        assert!(row.contains(",2.5,"));
    }

    #[test]
    fn test_empty_outputs_keep_their_header() {
        let mut out = Vec::new();
        write_rows::<_, DedupedTender>(&mut out, &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("ID,product,type,"));
        assert_eq!(text.lines().count(), 1);

        let mut out = Vec::new();
        write_rows::<_, UnmatchedSupplier>(&mut out, &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ID,supplier,title,price_contract_EUR,resolved_by\n"
        );
    }

    /// Header the serde derive would produce for one row
    fn serialized_header<T: Serialize>(row: &T) -> String {
        let mut out = Vec::new();
        {
            let mut wtr = WriterBuilder::new().from_writer(&mut out);
            wtr.serialize(row).unwrap();
            wtr.flush().unwrap();
        }
        String::from_utf8(out).unwrap().lines().next().unwrap().to_string()
    }

    #[test]
    fn test_fixed_columns_match_serialized_fields() {
        let record = TenderRecord::default();
        assert_eq!(serialized_header(&record), TenderRecord::COLUMNS.join(","));
        assert_eq!(
            serialized_header(&DedupedTender::from(&record)),
            DedupedTender::COLUMNS.join(",")
        );
        assert_eq!(
            serialized_header(&WinningBid::new(&record, 1.0, "acme", "contract")),
            WinningBid::COLUMNS.join(",")
        );
        let unmatched = UnmatchedSupplier {
            id: None,
            supplier: None,
            title: None,
            price_contract_eur: 1.0,
            resolved_by: "contract".to_string(),
        };
        assert_eq!(serialized_header(&unmatched), UnmatchedSupplier::COLUMNS.join(","));
    }

    #[test]
    fn test_adapter_writes_header_for_empty_side_tables() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = CsvOutputAdapter::in_dir(dir.path());
        adapter.write_missing_awards(&[]).unwrap();
        adapter.write_unmatched_suppliers(&[]).unwrap();

        let missing = read_table_from_path(&dir.path().join(constants::COMPANIES_MISSING_FILE)).unwrap();
        assert_eq!(missing.headers.len(), TenderRecord::COLUMNS.len());
        assert!(missing.rows.is_empty());

        let unmatched =
            read_table_from_path(&dir.path().join(constants::COMPANIES_UNMATCHED_FILE)).unwrap();
        assert_eq!(unmatched.headers, UnmatchedSupplier::COLUMNS);
        assert!(unmatched.rows.is_empty());
    }

    #[test]
    fn test_unreadable_input_is_io_error() {
        let result = read_tender_records_from_path(Path::new("/nonexistent/tenders.csv"));
        assert!(matches!(result, Err(ReconcileError::Io(_))));
    }
}
