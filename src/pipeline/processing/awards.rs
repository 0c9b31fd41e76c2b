//! Attribution of award amounts to (tender, supplier) pairs.
//!
//! Records pass through an ordered cascade of resolution stages. Each stage only
//! sees the records no earlier stage claimed, so a monetary figure is attributed
//! at most once. Whatever is left after the last stage is reported as missing.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use tracing::{debug, info, warn};

use crate::domain::{SupplierAlias, TableColumns, TenderRecord, WinningBid};

/// Identifier families that can single out a winning record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierField {
    /// Pan-European notice identifier
    TedId,
    /// National contract-register identifier
    ContractNumber,
}

impl IdentifierField {
    fn value<'a>(&self, record: &'a TenderRecord) -> Option<&'a str> {
        match self {
            IdentifierField::TedId => record.ted_id.as_deref(),
            IdentifierField::ContractNumber => record.contract_number.as_deref(),
        }
    }
}

/// One step of the resolution cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStage {
    /// Contract rows carry their own award amount
    Contract,
    /// Only one awarded row shares the identifier
    SingleWinner(IdentifierField),
    /// Only one awarded row shares the identifier and lot number
    SingleWinnerLot(IdentifierField),
    /// Title is unique among the leftovers; weakest evidence
    UniqueTitle,
}

impl ResolutionStage {
    /// The cascade, in evaluation order
    pub const CASCADE: [ResolutionStage; 6] = [
        ResolutionStage::Contract,
        ResolutionStage::SingleWinner(IdentifierField::TedId),
        ResolutionStage::SingleWinner(IdentifierField::ContractNumber),
        ResolutionStage::SingleWinnerLot(IdentifierField::TedId),
        ResolutionStage::SingleWinnerLot(IdentifierField::ContractNumber),
        ResolutionStage::UniqueTitle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStage::Contract => "contract",
            ResolutionStage::SingleWinner(IdentifierField::TedId) => "single_winner_ted_id",
            ResolutionStage::SingleWinner(IdentifierField::ContractNumber) => {
                "single_winner_contract_number"
            }
            ResolutionStage::SingleWinnerLot(IdentifierField::TedId) => "single_winner_lot_ted_id",
            ResolutionStage::SingleWinnerLot(IdentifierField::ContractNumber) => {
                "single_winner_lot_contract_number"
            }
            ResolutionStage::UniqueTitle => "unique_title",
        }
    }

    /// Records of `pool` this stage claims, with the amount it attributes to each
    fn claim(&self, records: &[TenderRecord], pool: &[usize]) -> Vec<Claim> {
        match self {
            ResolutionStage::Contract => pool
                .iter()
                .filter(|&&i| records[i].is_contract())
                .map(|&i| Claim {
                    index: i,
                    amount: records[i].price_eur,
                })
                .collect(),
            ResolutionStage::SingleWinner(field) => claim_unique(
                records,
                pool,
                |r| {
                    if r.is_awarded_tender() {
                        field.value(r)
                    } else {
                        None
                    }
                },
                |r| r.price_eur,
            ),
            ResolutionStage::SingleWinnerLot(field) => claim_unique(
                records,
                pool,
                |r| {
                    if r.is_awarded_tender() {
                        field.value(r).map(|id| (id, r.lot.as_deref()))
                    } else {
                        None
                    }
                },
                |r| r.price_lot_eur,
            ),
            ResolutionStage::UniqueTitle => {
                claim_unique(records, pool, |r| r.title.as_deref(), |r| r.price_eur)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Claim {
    index: usize,
    amount: Option<f64>,
}

/// Claim the pool records whose group key occurs exactly once in the pool and whose amount is known
fn claim_unique<'a, K, G, A>(
    records: &'a [TenderRecord],
    pool: &[usize],
    group_key: G,
    amount: A,
) -> Vec<Claim>
where
    K: Eq + Hash,
    G: Fn(&'a TenderRecord) -> Option<K>,
    A: Fn(&TenderRecord) -> Option<f64>,
{
    let mut counts: HashMap<K, usize> = HashMap::new();
    for &i in pool {
        if let Some(key) = group_key(&records[i]) {
            *counts.entry(key).or_insert(0) += 1;
        }
    }

    pool.iter()
        .filter_map(|&i| {
            let record = &records[i];
            let key = group_key(record)?;
            if counts.get(&key) != Some(&1) {
                return None;
            }
            amount(record).map(|amount| Claim {
                index: i,
                amount: Some(amount),
            })
        })
        .collect()
}

/// A record whose award amount was determined
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub index: usize,
    pub amount: f64,
    pub stage: ResolutionStage,
}

/// Outcome of running the cascade over a batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadeOutcome {
    pub resolved: Vec<Resolution>,
    /// Contracts whose own price is missing; claimed, but carry no amount
    pub unpriced: Vec<usize>,
    /// Records no stage could resolve
    pub missing: Vec<usize>,
}

/// Run every stage left-to-right, threading the shrinking unresolved pool
pub fn run_cascade(records: &[TenderRecord]) -> CascadeOutcome {
    let mut outcome = CascadeOutcome::default();
    let mut pool: Vec<usize> = (0..records.len()).collect();

    for stage in ResolutionStage::CASCADE {
        let claims = stage.claim(records, &pool);
        let mut claimed = vec![false; records.len()];

        for claim in &claims {
            claimed[claim.index] = true;
            match claim.amount {
                Some(amount) => outcome.resolved.push(Resolution {
                    index: claim.index,
                    amount,
                    stage,
                }),
                None => outcome.unpriced.push(claim.index),
            }
        }

        debug!(stage = stage.as_str(), claimed = claims.len(), "Resolution stage finished");
        pool.retain(|&i| !claimed[i]);
    }

    // Identifier-based resolutions keep record order; title fallbacks go last
    outcome
        .resolved
        .sort_by_key(|r| (r.stage == ResolutionStage::UniqueTitle, r.index));
    outcome.missing = pool;
    outcome
}

/// Lookup from raw supplier name to its curated canonical name
#[derive(Debug, Clone, Default)]
pub struct SupplierDirectory {
    canonical: HashMap<String, String>,
    conflicts: usize,
}

impl SupplierDirectory {
    /// Build the directory; repeated rows collapse, conflicting rows keep the first mapping
    pub fn from_aliases(aliases: Vec<SupplierAlias>) -> Self {
        let mut directory = Self::default();
        for alias in aliases {
            let raw = alias.supplier.trim().to_string();
            match directory.canonical.get(&raw) {
                Some(existing) if *existing != alias.supplier_clean => {
                    warn!(
                        supplier = %raw,
                        kept = %existing,
                        ignored = %alias.supplier_clean,
                        "Conflicting supplier alias"
                    );
                    directory.conflicts += 1;
                }
                Some(_) => {}
                None => {
                    directory.canonical.insert(raw, alias.supplier_clean);
                }
            }
        }
        directory
    }

    pub fn lookup(&self, supplier: Option<&str>) -> Option<&str> {
        supplier.and_then(|s| self.canonical.get(s.trim()).map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn conflicts(&self) -> usize {
        self.conflicts
    }
}

/// Diagnostic row for an award dropped because its supplier is not in the directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedSupplier {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    pub supplier: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "price_contract_EUR")]
    pub price_contract_eur: f64,
    pub resolved_by: String,
}

impl TableColumns for UnmatchedSupplier {
    const COLUMNS: &'static [&'static str] =
        &["ID", "supplier", "title", "price_contract_EUR", "resolved_by"];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AwardSummary {
    pub records_in: usize,
    pub resolved_by_stage: BTreeMap<&'static str, usize>,
    pub unpriced_contracts: usize,
    pub missing: usize,
    pub suppliers_known: usize,
    pub alias_conflicts: usize,
    pub suppliers_unmatched: usize,
    pub winning_bids_out: usize,
    pub total_awarded_eur: f64,
}

impl AwardSummary {
    pub fn resolved_total(&self) -> usize {
        self.resolved_by_stage.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct AwardOutcome {
    pub bids: Vec<WinningBid>,
    pub missing: Vec<TenderRecord>,
    pub unmatched: Vec<UnmatchedSupplier>,
    pub summary: AwardSummary,
}

/// Resolves award amounts and attaches curated supplier identities
pub struct AwardReconciler {
    suppliers: SupplierDirectory,
}

impl AwardReconciler {
    pub fn new(suppliers: SupplierDirectory) -> Self {
        Self { suppliers }
    }

    pub fn reconcile(&self, records: &[TenderRecord]) -> AwardOutcome {
        let cascade = run_cascade(records);

        let mut summary = AwardSummary {
            records_in: records.len(),
            unpriced_contracts: cascade.unpriced.len(),
            missing: cascade.missing.len(),
            suppliers_known: self.suppliers.len(),
            alias_conflicts: self.suppliers.conflicts(),
            ..Default::default()
        };
        for stage in ResolutionStage::CASCADE {
            summary.resolved_by_stage.insert(stage.as_str(), 0);
        }

        let mut bids = Vec::with_capacity(cascade.resolved.len());
        let mut unmatched = Vec::new();
        for resolution in &cascade.resolved {
            let record = &records[resolution.index];
            *summary
                .resolved_by_stage
                .entry(resolution.stage.as_str())
                .or_insert(0) += 1;

            match self.suppliers.lookup(record.supplier.as_deref()) {
                Some(canonical) => {
                    summary.total_awarded_eur += resolution.amount;
                    bids.push(WinningBid::new(
                        record,
                        resolution.amount,
                        canonical,
                        resolution.stage.as_str(),
                    ));
                }
                None => {
                    debug!(id = ?record.id, supplier = ?record.supplier, "Supplier not in directory");
                    unmatched.push(UnmatchedSupplier {
                        id: record.id.clone(),
                        supplier: record.supplier.clone(),
                        title: record.title.clone(),
                        price_contract_eur: resolution.amount,
                        resolved_by: resolution.stage.as_str().to_string(),
                    });
                }
            }
        }

        summary.suppliers_unmatched = unmatched.len();
        summary.winning_bids_out = bids.len();
        if !unmatched.is_empty() {
            warn!(
                count = unmatched.len(),
                "Resolved awards dropped because the supplier has no curated name"
            );
        }

        info!(
            resolved = summary.resolved_total(),
            missing = summary.missing,
            winning_bids = summary.winning_bids_out,
            "Reconciled awards"
        );

        let missing = cascade
            .missing
            .iter()
            .map(|&i| records[i].clone())
            .collect();

        AwardOutcome {
            bids,
            missing,
            unmatched,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_record(id: &str, record_type: &str) -> TenderRecord {
        TenderRecord {
            id: Some(id.to_string()),
            title: Some(format!("Tender {id}")),
            record_type: Some(record_type.to_string()),
            supplier: Some(format!("Supplier {id}")),
            ..Default::default()
        }
    }

    fn directory_for(records: &[TenderRecord]) -> SupplierDirectory {
        SupplierDirectory::from_aliases(
            records
                .iter()
                .filter_map(|r| r.supplier.clone())
                .map(|s| SupplierAlias {
                    supplier_clean: s.to_uppercase(),
                    supplier: s,
                })
                .collect(),
        )
    }

    fn stage_of(outcome: &CascadeOutcome, index: usize) -> Option<ResolutionStage> {
        outcome
            .resolved
            .iter()
            .find(|r| r.index == index)
            .map(|r| r.stage)
    }

    #[test]
    fn test_contract_amount_wins_over_single_winner_group() {
        let mut contract = create_test_record("1", "contract");
        contract.ted_id = Some("T1".to_string());
        contract.price_eur = Some(500.0);

        let outcome = run_cascade(&[contract]);
        assert_eq!(outcome.resolved.len(), 1);
        assert_eq!(outcome.resolved[0].stage, ResolutionStage::Contract);
        assert_eq!(outcome.resolved[0].amount, 500.0);
    }

    #[test]
    fn test_contract_stage_runs_before_unique_title() {
        // The contract's title is unique in the pool, so the title fallback would also claim it
        let mut contract = create_test_record("1", "contract");
        contract.title = Some("Ventilators".to_string());
        contract.price_eur = Some(500.0);
        let mut award = create_test_record("2", "awarded tender");
        award.title = Some("Masks".to_string());
        award.price_eur = Some(80.0);

        let records = [contract, award];
        let outcome = run_cascade(&records);
        assert_eq!(stage_of(&outcome, 0), Some(ResolutionStage::Contract));
        assert_eq!(stage_of(&outcome, 1), Some(ResolutionStage::UniqueTitle));

        let reconciled = AwardReconciler::new(directory_for(&records)).reconcile(&records);
        let contract_bid = reconciled
            .bids
            .iter()
            .find(|b| b.id.as_deref() == Some("1"))
            .expect("contract bid");
        assert_eq!(contract_bid.resolved_by, "contract");
        assert_eq!(contract_bid.price_contract_eur, 500.0);
        assert_eq!(reconciled.summary.resolved_by_stage["unique_title"], 1);
    }

    #[test]
    fn test_contract_claim_removes_record_from_identifier_groups() {
        // Once the contract row is claimed, the awarded tender is alone in its group
        let mut contract = create_test_record("1", "contract");
        contract.ted_id = Some("T1".to_string());
        contract.price_eur = Some(500.0);
        let mut award = create_test_record("2", "awarded tender");
        award.ted_id = Some("T1".to_string());
        award.price_eur = Some(300.0);

        let outcome = run_cascade(&[contract, award]);
        assert_eq!(stage_of(&outcome, 0), Some(ResolutionStage::Contract));
        assert_eq!(
            stage_of(&outcome, 1),
            Some(ResolutionStage::SingleWinner(IdentifierField::TedId))
        );
    }

    #[test]
    fn test_single_winner_by_contract_number() {
        let mut award = create_test_record("1", "awarded tender");
        award.contract_number = Some("C-9".to_string());
        award.price_eur = Some(42.0);

        let outcome = run_cascade(&[award]);
        assert_eq!(
            stage_of(&outcome, 0),
            Some(ResolutionStage::SingleWinner(IdentifierField::ContractNumber))
        );
    }

    #[test]
    fn test_single_winner_lot_uses_lot_price() {
        let mut lot1 = create_test_record("1", "awarded tender");
        lot1.ted_id = Some("T1".to_string());
        lot1.lot = Some("1".to_string());
        lot1.price_eur = Some(1000.0);
        lot1.price_lot_eur = Some(400.0);
        let mut lot2 = create_test_record("2", "awarded tender");
        lot2.ted_id = Some("T1".to_string());
        lot2.lot = Some("2".to_string());
        lot2.price_eur = Some(1000.0);
        lot2.price_lot_eur = Some(600.0);

        let outcome = run_cascade(&[lot1, lot2]);
        assert_eq!(outcome.resolved.len(), 2);
        assert!(outcome.resolved.iter().all(|r| r.stage
            == ResolutionStage::SingleWinnerLot(IdentifierField::TedId)));
        let total: f64 = outcome.resolved.iter().map(|r| r.amount).sum();
        assert_eq!(total, 1000.0);
    }

    #[test]
    fn test_multi_winner_lot_stays_missing_when_titles_repeat() {
        let mut a = create_test_record("1", "awarded tender");
        a.ted_id = Some("T1".to_string());
        a.lot = Some("1".to_string());
        a.title = Some("Gloves".to_string());
        a.price_eur = Some(1000.0);
        a.price_lot_eur = Some(1000.0);
        let mut b = a.clone();
        b.id = Some("2".to_string());
        b.supplier = Some("Supplier 2".to_string());

        let outcome = run_cascade(&[a, b]);
        assert!(outcome.resolved.is_empty());
        assert_eq!(outcome.missing, vec![0, 1]);
    }

    #[test]
    fn test_unique_title_fallback() {
        let mut a = create_test_record("1", "award");
        a.price_eur = Some(10.0);
        let mut b = create_test_record("2", "award");
        b.title = Some("Shared".to_string());
        b.price_eur = Some(20.0);
        let mut c = create_test_record("3", "award");
        c.title = Some("Shared".to_string());
        c.price_eur = Some(30.0);

        let outcome = run_cascade(&[a, b, c]);
        assert_eq!(stage_of(&outcome, 0), Some(ResolutionStage::UniqueTitle));
        assert_eq!(outcome.missing, vec![1, 2]);
    }

    #[test]
    fn test_unpriced_contract_is_claimed_but_not_resolved() {
        let contract = create_test_record("1", "contract");
        let outcome = run_cascade(&[contract]);
        assert!(outcome.resolved.is_empty());
        assert_eq!(outcome.unpriced, vec![0]);
        assert!(outcome.missing.is_empty());
    }

    #[test]
    fn test_unknown_currency_record_never_gets_an_amount() {
        // price_eur is None, as produced for an unknown currency
        let award = create_test_record("1", "awarded tender");
        let outcome = run_cascade(&[award]);
        assert!(outcome.resolved.is_empty());
        assert_eq!(outcome.missing, vec![0]);
    }

    #[test]
    fn test_no_double_counting_across_stages() {
        let mut records = Vec::new();
        let mut contract = create_test_record("1", "contract");
        contract.ted_id = Some("T1".to_string());
        contract.price_eur = Some(500.0);
        records.push(contract);
        for (i, lot) in ["1", "2"].iter().enumerate() {
            let mut r = create_test_record(&format!("{}", i + 2), "awarded tender");
            r.ted_id = Some("T2".to_string());
            r.lot = Some(lot.to_string());
            r.price_eur = Some(900.0);
            r.price_lot_eur = Some(450.0);
            records.push(r);
        }
        let mut single = create_test_record("4", "awarded tender");
        single.contract_number = Some("C1".to_string());
        single.price_eur = Some(250.0);
        records.push(single);

        let outcome = run_cascade(&records);
        let mut indices: Vec<usize> = outcome.resolved.iter().map(|r| r.index).collect();
        indices.dedup();
        assert_eq!(indices.len(), outcome.resolved.len());

        let resolved_total: f64 = outcome.resolved.iter().map(|r| r.amount).sum();
        // contract 500 + tender T2 900 split over its lots + 250
        assert_eq!(resolved_total, 1650.0);
    }

    #[test]
    fn test_reconcile_joins_supplier_directory() {
        let mut contract = create_test_record("1", "contract");
        contract.price_eur = Some(500.0);
        let mut stranger = create_test_record("2", "contract");
        stranger.price_eur = Some(70.0);

        let directory = directory_for(std::slice::from_ref(&contract));
        let outcome = AwardReconciler::new(directory).reconcile(&[contract, stranger]);

        assert_eq!(outcome.bids.len(), 1);
        assert_eq!(outcome.bids[0].supplier_clean, "SUPPLIER 1");
        assert_eq!(outcome.bids[0].price_contract_eur, 500.0);
        assert_eq!(outcome.bids[0].resolved_by, "contract");
        assert_eq!(outcome.unmatched.len(), 1);
        assert_eq!(outcome.unmatched[0].supplier.as_deref(), Some("Supplier 2"));
        assert_eq!(outcome.summary.suppliers_unmatched, 1);
        assert_eq!(outcome.summary.total_awarded_eur, 500.0);
        assert_eq!(outcome.summary.resolved_by_stage["contract"], 2);
    }

    #[test]
    fn test_reconcile_reports_missing_records() {
        let award = create_test_record("1", "awarded tender");
        let duplicate_title = TenderRecord {
            id: Some("2".to_string()),
            ..award.clone()
        };
        let outcome = AwardReconciler::new(SupplierDirectory::default())
            .reconcile(&[award, duplicate_title]);

        assert_eq!(outcome.summary.missing, 2);
        assert_eq!(outcome.missing.len(), 2);
        assert!(outcome.bids.is_empty());
    }

    #[test]
    fn test_directory_conflicts_keep_first_mapping() {
        let directory = SupplierDirectory::from_aliases(vec![
            SupplierAlias {
                supplier: "Acme ".to_string(),
                supplier_clean: "acme".to_string(),
            },
            SupplierAlias {
                supplier: "Acme".to_string(),
                supplier_clean: "acme".to_string(),
            },
            SupplierAlias {
                supplier: "Acme".to_string(),
                supplier_clean: "acme group".to_string(),
            },
        ]);

        assert_eq!(directory.len(), 1);
        assert_eq!(directory.conflicts(), 1);
        assert_eq!(directory.lookup(Some("Acme")), Some("acme"));
        assert_eq!(directory.lookup(None), None);
    }
}
