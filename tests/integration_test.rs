use anyhow::Result;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

use covid_tenders::app::reconcile_use_case::{ReconcileUseCase, RunRequest};
use covid_tenders::config::Config;
use covid_tenders::infra::csv_table;
use covid_tenders::infra::CsvOutputAdapter;

const TENDERS_CSV: &str = "\
ID,TED_id,contract_number,lot,title,type,status,product,buyer,buyer_country,supplier,price,price_currency,price_EUR,price_lot,price_lot_currency,price_lot_EUR,year,date,source
1,2020/S 070-1,,1,Surgical masks,awarded tender,active,masks,Ministry of Health,DE,Acme,1000,EUR,,,,,2020,2020-04-01,https://ted.example/1
2,2020/S 070-1,,1,Surgical masks,awarded tender,active,masks,Ministry of Health,DE,Acme,1000,EUR,,,,,2020,2020-04-01,https://ted.example/1
3,,,,Nitrile gloves,contract,active,gloves,City Hospital,CZ,Globex Ltd ,\"2,500\",EUR,,,,,2020,2020-05-02,https://register.example/3
4,,,,Old gloves,contract,active,gloves,City Hospital,CZ,Globex Ltd,100,EUR,,,,,2019,2019-05-02,https://register.example/4
5,,,,Call for masks,call for tender,active,masks,City Hospital,CZ,,,,,,,,2020,2020-03-01,https://register.example/5
6,,,,Office chairs,contract,active,not covid19 related,City Hall,CZ,Initech,50,EUR,,,,,2020,2020-03-01,https://register.example/6
7,,C-9,,Ventilators,awarded tender,active,ventilators,Clinic,MK,Initech,,,,300,EUR,,2020,2020-06-01,https://mk.example/7
8,,,,Sanitiser,awarded tender,active,sanitiser,Town Hall,FR,Nobody,,,,,,,2020,,https://fr.example/8
";

const SUPPLIERS_CSV: &str = "\
supplier,supplier_clean
Acme,acme
Globex Ltd,globex
Globex Ltd,globex
";

fn write_inputs(dir: &Path) -> Result<()> {
    fs::write(dir.join("input.csv"), TENDERS_CSV)?;
    fs::write(dir.join("suppliers.csv"), SUPPLIERS_CSV)?;
    Ok(())
}

#[test]
fn test_full_batch_writes_every_table() -> Result<()> {
    let temp_dir = tempdir()?;
    write_inputs(temp_dir.path())?;
    let out = temp_dir.path().join("out");

    let raw = csv_table::read_tender_records_from_path(&temp_dir.path().join("input.csv"))?;
    let aliases = csv_table::read_supplier_aliases_from_path(&temp_dir.path().join("suppliers.csv"))?;
    assert_eq!(raw.len(), 8);

    let use_case = ReconcileUseCase::new(Config::default(), Box::new(CsvOutputAdapter::in_dir(&out)));
    let report = use_case.run(
        raw,
        RunRequest {
            tenders: true,
            suppliers: Some(aliases),
        },
    )?;

    // Cleaning: three records out of scope, one exact duplicate
    assert_eq!(report.cleaning.records_in, 8);
    assert_eq!(report.cleaning.excluded_total(), 3);
    assert_eq!(report.cleaning.exact_duplicates, 1);
    assert_eq!(report.cleaning.records_out, 4);

    // One tender per provenance class survives
    let tenders = report.tenders.as_ref().expect("tender summary");
    assert_eq!(tenders.tenders_out, 4);

    let awards = report.awards.as_ref().expect("award summary");
    assert_eq!(awards.resolved_by_stage["contract"], 1);
    assert_eq!(awards.resolved_by_stage["single_winner_ted_id"], 1);
    assert_eq!(awards.resolved_by_stage["single_winner_lot_contract_number"], 1);
    assert_eq!(awards.resolved_total(), 3);
    assert_eq!(awards.missing, 1);
    assert_eq!(awards.suppliers_unmatched, 1);
    assert_eq!(awards.winning_bids_out, 2);
    assert_eq!(awards.total_awarded_eur, 3500.0);

    let tenders_table = csv_table::read_table_from_path(&out.join("tenders.csv"))?;
    assert_eq!(tenders_table.rows.len(), 4);

    let bids = csv_table::read_table_from_path(&out.join("companies.csv"))?;
    let clean = bids.column("supplier_clean").expect("supplier_clean column");
    let amount = bids.column("price_contract_EUR").expect("amount column");
    let stage = bids.column("resolved_by").expect("resolved_by column");
    let rows: Vec<(&str, &str, &str)> = bids
        .rows
        .iter()
        .map(|r| (r[clean].as_str(), r[amount].as_str(), r[stage].as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("acme", "1000.0", "single_winner_ted_id"),
            ("globex", "2500.0", "contract"),
        ]
    );

    let missing = csv_table::read_table_from_path(&out.join("companies_missing.csv"))?;
    let title = missing.column("title").expect("title column");
    assert_eq!(missing.rows.len(), 1);
    assert_eq!(missing.rows[0][title], "Sanitiser");

    let unmatched = csv_table::read_table_from_path(&out.join("companies_unmatched.csv"))?;
    assert_eq!(unmatched.rows.len(), 1);
    assert_eq!(unmatched.rows[0][unmatched.column("supplier").expect("supplier")], "Initech");

    let report_json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("report.json"))?)?;
    assert_eq!(report_json["cleaning"]["records_out"], 4);
    assert_eq!(report_json["awards"]["missing"], 1);
    assert!(report_json["run_id"].is_string());

    Ok(())
}

#[test]
fn test_tender_view_without_suppliers() -> Result<()> {
    let temp_dir = tempdir()?;
    write_inputs(temp_dir.path())?;
    let out = temp_dir.path().join("tenders_only.csv");

    let raw = csv_table::read_tender_records_from_path(&temp_dir.path().join("input.csv"))?;
    let adapter = CsvOutputAdapter {
        tenders: Some(out.clone()),
        ..Default::default()
    };
    let use_case = ReconcileUseCase::new(Config::default(), Box::new(adapter));
    let batch = use_case.clean(raw);
    let summary = use_case.tenders(&batch)?;

    assert_eq!(summary.tenders_out, 4);
    let table = csv_table::read_table_from_path(&out)?;
    let price = table.column("price_EUR").expect("price_EUR column");
    let gloves = table
        .rows
        .iter()
        .find(|r| r.iter().any(|v| v == "Nitrile gloves"))
        .expect("gloves tender");
    assert_eq!(gloves[price], "2500.0");
    assert!(!temp_dir.path().join("report.json").exists());

    Ok(())
}

#[test]
fn test_cli_run_command() -> Result<()> {
    let temp_dir = tempdir()?;
    write_inputs(temp_dir.path())?;
    let out = temp_dir.path().join("batch");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            "[logging]\ndir = {:?}\n\n[output]\ndir = {:?}\n",
            temp_dir.path().join("logs"),
            out
        ),
    )?;

    let status = Command::new(env!("CARGO_BIN_EXE_covid_tenders"))
        .arg("--config")
        .arg(&config_path)
        .arg("--metrics-out")
        .arg(temp_dir.path().join("metrics.prom"))
        .arg("run")
        .arg("--input")
        .arg(temp_dir.path().join("input.csv"))
        .arg("--suppliers")
        .arg(temp_dir.path().join("suppliers.csv"))
        .status()?;

    assert!(status.success());
    for file in ["tenders.csv", "companies.csv", "companies_missing.csv", "report.json"] {
        assert!(out.join(file).exists(), "{file} was not written");
    }
    let metrics = fs::read_to_string(temp_dir.path().join("metrics.prom"))?;
    assert!(metrics.contains("tenders_clean_records_in_total"));

    Ok(())
}

#[test]
fn test_cli_rejects_supplier_table_without_clean_names() -> Result<()> {
    let temp_dir = tempdir()?;
    write_inputs(temp_dir.path())?;
    fs::write(temp_dir.path().join("bad.csv"), "supplier,name\nAcme,acme\n")?;
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!("[logging]\ndir = {:?}\n", temp_dir.path().join("logs")),
    )?;

    let output = Command::new(env!("CARGO_BIN_EXE_covid_tenders"))
        .arg("--config")
        .arg(&config_path)
        .arg("companies")
        .arg("--input")
        .arg(temp_dir.path().join("input.csv"))
        .arg("--suppliers")
        .arg(temp_dir.path().join("bad.csv"))
        .arg("--output")
        .arg(temp_dir.path().join("companies.csv"))
        .output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("supplier_clean"));
    assert!(!temp_dir.path().join("companies.csv").exists());

    Ok(())
}
