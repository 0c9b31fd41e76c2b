/// Literal values found in the source tables.
/// Keeping them here avoids scattering string comparisons through the reconciliation logic.

// Record types
pub const TYPE_CONTRACT: &str = "contract";
pub const TYPE_AWARDED_TENDER: &str = "awarded tender";
pub const TYPE_CALL_FOR_TENDER: &str = "call for tender";
pub const TYPE_DUPLICATE: &str = "duplicate";

// Status and product sentinels
pub const STATUS_CANCELLED: &str = "cancelled";
pub const NOT_COVID_PRODUCT: &str = "not covid19 related";

pub const SCOPE_YEAR: i32 = 2020;

// Jurisdictions with their own deduplication rules
pub const LOTLESS_COUNTRY: &str = "AL";
pub const SPLIT_LOT_COUNTRY: &str = "MK";

pub const COMMON_CURRENCY: &str = "EUR";

// Canonical procedure taxonomy
pub const PROCEDURE_OPEN: &str = "open competition";
pub const PROCEDURE_CLOSED: &str = "closed competition";
pub const PROCEDURE_DIRECT: &str = "direct award";

// Default output file names for the `run` command
pub const TENDERS_FILE: &str = "tenders.csv";
pub const COMPANIES_FILE: &str = "companies.csv";
pub const COMPANIES_MISSING_FILE: &str = "companies_missing.csv";
pub const COMPANIES_UNMATCHED_FILE: &str = "companies_unmatched.csv";
pub const UNIT_PRICES_FILE: &str = "unit_prices.csv";
pub const REPORT_FILE: &str = "report.json";
