use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Result, RiskError};
use crate::models::{StatementPayload, Transaction};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a statement amount: strips currency symbols and thousands
/// separators, and reads `(12.50)` as negative. Blank cells are `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"', '£', '$', '€'], "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace([' ', '-'], "_")
}

// ---------------------------------------------------------------------------
// Input formats, keyed by name or file extension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputFormat {
    Json,
    Csv,
}

impl InputFormat {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    pub fn detect(&self, file_path: &Path) -> bool {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        ext.as_deref() == Some(self.key())
    }

    pub fn parse(&self, file_path: &Path) -> Result<StatementPayload> {
        match self {
            Self::Json => parse_json(file_path),
            Self::Csv => parse_csv(file_path),
        }
    }
}

const ALL_FORMATS: &[InputFormat] = &[InputFormat::Json, InputFormat::Csv];

pub fn get_by_key(key: &str) -> Option<InputFormat> {
    ALL_FORMATS
        .iter()
        .find(|f| f.key().eq_ignore_ascii_case(key))
        .copied()
}

pub fn get_for_file(file_path: &Path) -> Option<InputFormat> {
    ALL_FORMATS.iter().find(|f| f.detect(file_path)).copied()
}

/// Load a statement from disk. `format_key` overrides extension detection.
pub fn load_statement(file_path: &Path, format_key: Option<&str>) -> Result<StatementPayload> {
    let format = match format_key {
        Some(key) => get_by_key(key).ok_or_else(|| RiskError::UnknownFormat(key.to_string()))?,
        None => get_for_file(file_path).ok_or_else(|| {
            RiskError::UnknownFormat(file_path.display().to_string())
        })?,
    };
    let payload = format.parse(file_path)?;
    debug!(
        format = format.key(),
        bank = %payload.bank,
        transactions = payload.transactions.len(),
        "loaded statement"
    );
    Ok(payload)
}

// ---------------------------------------------------------------------------
// JSON: extraction-service response or a bare array of transactions
// ---------------------------------------------------------------------------

fn parse_json(file_path: &Path) -> Result<StatementPayload> {
    let content = std::fs::read_to_string(file_path)?;
    parse_json_str(&content)
}

pub fn parse_json_str(content: &str) -> Result<StatementPayload> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    if value.is_array() {
        let transactions: Vec<Transaction> = serde_json::from_value(value)?;
        return Ok(StatementPayload {
            bank: String::new(),
            transactions,
        });
    }
    Ok(serde_json::from_value(value)?)
}

// ---------------------------------------------------------------------------
// CSV: one row per transaction, columns located by header name
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Columns {
    date: Option<usize>,
    description: Option<usize>,
    raw_description: Option<usize>,
    money_in: Option<usize>,
    money_out: Option<usize>,
    balance: Option<usize>,
    category: Option<usize>,
    subcategory: Option<usize>,
    subsubcategory: Option<usize>,
    note: Option<usize>,
}

impl Columns {
    fn from_header(record: &csv::StringRecord) -> Self {
        let mut cols = Self::default();
        for (i, field) in record.iter().enumerate() {
            match normalize_header(field).as_str() {
                "date" | "transaction_date" => cols.date = Some(i),
                "description" | "details" => cols.description = Some(i),
                "raw_description" => cols.raw_description = Some(i),
                "money_in" | "paid_in" | "credit" => cols.money_in = Some(i),
                "money_out" | "paid_out" | "debit" => cols.money_out = Some(i),
                "balance" => cols.balance = Some(i),
                "category" => cols.category = Some(i),
                "subcategory" => cols.subcategory = Some(i),
                "subsubcategory" => cols.subsubcategory = Some(i),
                "note" | "notes" => cols.note = Some(i),
                _ => {}
            }
        }
        cols
    }
}

fn cell(record: &csv::StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn optional_cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    Some(cell(record, idx)).filter(|v| !v.is_empty())
}

fn parse_csv(file_path: &Path) -> Result<StatementPayload> {
    let file = std::fs::File::open(file_path)?;
    let transactions = parse_csv_reader(std::io::BufReader::new(file))?;
    let bank = file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();
    Ok(StatementPayload { bank, transactions })
}

pub fn parse_csv_reader<R: std::io::Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut columns: Option<Columns> = None;
    let mut rows = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        if columns.is_none() {
            let header = Columns::from_header(&record);
            if header.date.is_none() {
                return Err(RiskError::Other(
                    "CSV header must include a date column".to_string(),
                ));
            }
            columns = Some(header);
            continue;
        }
        let Some(cols) = columns.as_ref() else { continue };
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let amount = |idx: Option<usize>| {
            let raw = cell(&record, idx);
            let parsed = parse_amount(&raw);
            if parsed.is_none() && !raw.is_empty() {
                warn!(line = line + 1, value = %raw, "ignoring unparseable amount");
            }
            parsed
        };
        rows.push(Transaction {
            date: cell(&record, cols.date),
            description: cell(&record, cols.description),
            raw_description: cell(&record, cols.raw_description),
            // Direction comes from the column; some banks sign debits too.
            money_in: amount(cols.money_in).map(f64::abs),
            money_out: amount(cols.money_out).map(f64::abs),
            balance: amount(cols.balance),
            category: cell(&record, cols.category),
            subcategory: cell(&record, cols.subcategory),
            subsubcategory: optional_cell(&record, cols.subsubcategory),
            note: optional_cell(&record, cols.note),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("£9,200.00"), Some(9200.0));
        assert_eq!(parse_amount("\"-50.00\""), Some(-50.0));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_parse_amount_parenthesized_negatives() {
        assert_eq!(parse_amount("(125.00)"), Some(-125.0));
        assert_eq!(parse_amount("(£1,000.00)"), Some(-1000.0));
    }

    #[test]
    fn test_format_lookup() {
        assert_eq!(get_by_key("JSON"), Some(InputFormat::Json));
        assert_eq!(get_by_key("csv"), Some(InputFormat::Csv));
        assert_eq!(get_by_key("xlsx"), None);
        assert_eq!(get_for_file(Path::new("stmt.CSV")), Some(InputFormat::Csv));
        assert_eq!(get_for_file(Path::new("stmt.pdf")), None);
    }

    #[test]
    fn test_parse_service_payload() {
        let json = r#"{"bank": "Monzo", "transactions": [
            {"date": "2024-03-01", "description": "ACME LTD", "money_in": 2000.0,
             "category": "Income Categories", "subcategory": "Salary (PAYE)", "currency": "GBP"}
        ]}"#;
        let payload = parse_json_str(json).unwrap();
        assert_eq!(payload.bank, "Monzo");
        assert_eq!(payload.transactions.len(), 1);
        assert_eq!(payload.transactions[0].money_in, Some(2000.0));
    }

    #[test]
    fn test_parse_bare_array() {
        let json = r#"[{"date": "2024-03-02", "description": "Bet365", "money_out": 350.0, "category": "Lifestyle"}]"#;
        let payload = parse_json_str(json).unwrap();
        assert!(payload.bank.is_empty());
        assert_eq!(payload.transactions[0].money_out, Some(350.0));
    }

    #[test]
    fn test_parse_json_rejects_garbage() {
        assert!(matches!(parse_json_str("{ nope"), Err(RiskError::Json(_))));
    }

    #[test]
    fn test_parse_csv_by_header() {
        let data = "\
Date,Description,Money In,Money Out,Balance,Category,Subcategory,Subsubcategory
01/03/2024,ACME LTD,\"2,000.00\",,2500.00,Income Categories,Salary (PAYE),
02/03/2024,Bet365,,350.00,2150.00,Lifestyle,Entertainment,Gambling
,,,,,,,
";
        let rows = parse_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "01/03/2024");
        assert_eq!(rows[0].money_in, Some(2000.0));
        assert_eq!(rows[0].money_out, None);
        assert!(rows[0].subsubcategory.is_none());
        assert_eq!(rows[1].subsubcategory.as_deref(), Some("Gambling"));
        assert_eq!(rows[1].balance, Some(2150.0));
    }

    #[test]
    fn test_parse_csv_signed_debits() {
        let data = "\
date,description,paid in,paid out,balance
2024-03-04,TESCO STORES,,-50.00,-20.00
2024-03-05,REFUND,(12.00),,-8.00
";
        let rows = parse_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(rows[0].money_out, Some(50.0));
        assert_eq!(rows[0].amount_out(), 50.0);
        assert_eq!(rows[0].balance, Some(-20.0));
        assert_eq!(rows[1].amount_in(), 12.0);
    }

    #[test]
    fn test_parse_csv_requires_date_column() {
        let data = "Description,Amount\nTESCO,5.00\n";
        assert!(parse_csv_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn test_load_statement_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("barclays.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "date,description,money_out,category").unwrap();
        writeln!(f, "2024-03-05,SATSUMA LOANS,60.00,Financial Commitments").unwrap();
        let payload = load_statement(&path, None).unwrap();
        assert_eq!(payload.bank, "barclays");
        assert_eq!(payload.transactions[0].amount_out(), 60.0);

        let err = load_statement(&dir.path().join("stmt.pdf"), None).unwrap_err();
        assert!(matches!(err, RiskError::UnknownFormat(_)));
    }
}
