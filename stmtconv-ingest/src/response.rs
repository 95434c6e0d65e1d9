//! Boundary coercion of the model's loosely typed JSON into ledger records.
//!
//! Defaults:
//!   id          missing/empty -> transaction_<n>; duplicates get a -<k> suffix
//!   date        missing       -> today (ISO)
//!   description missing       -> "Unknown transaction"
//!   amounts     number or numeric string (currency markers and thousands
//!               commas stripped, (x) negative); unreadable -> 0 and isValid false
//!   category    missing       -> "Other"
//!   isValid     true unless literally false

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use stmtconv_core::TransactionRecord;

use crate::error::ExtractError;

pub const UNKNOWN_DESCRIPTION: &str = "Unknown transaction";
pub const DEFAULT_CATEGORY: &str = "Other";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    id: Option<Value>,
    date: Option<Value>,
    description: Option<Value>,
    debit: Option<Value>,
    credit: Option<Value>,
    balance: Option<Value>,
    category: Option<Value>,
    is_valid: Option<Value>,
    notes: Option<Value>,
}

/// Parse the model's reply text into records.
pub fn parse_model_text(text: &str, today: NaiveDate) -> Result<Vec<TransactionRecord>, ExtractError> {
    let json = outer_object(text).ok_or(ExtractError::NoJson)?;
    let value: Value = serde_json::from_str(json)?;
    let items = value
        .get("transactions")
        .and_then(Value::as_array)
        .ok_or(ExtractError::MissingTransactions)?;

    let records: Vec<TransactionRecord> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let raw: RawTransaction = serde_json::from_value(item.clone()).unwrap_or_default();
            coerce(raw, i, today)
        })
        .collect();

    log::debug!("coerced {} transactions from model response", records.len());
    Ok(ensure_unique_ids(records))
}

/// First '{' through last '}', tolerating prose or code fences around it.
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn coerce(raw: RawTransaction, index: usize, today: NaiveDate) -> TransactionRecord {
    let debit = amount(raw.debit);
    let credit = amount(raw.credit);
    let balance = amount(raw.balance);
    let amounts_readable = debit.is_some() && credit.is_some() && balance.is_some();

    let record = TransactionRecord {
        id: text(raw.id).unwrap_or_else(|| format!("transaction_{}", index + 1)),
        date: text(raw.date).unwrap_or_else(|| today.format("%Y-%m-%d").to_string()),
        description: text(raw.description).unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string()),
        debit: debit.unwrap_or(0.0),
        credit: credit.unwrap_or(0.0),
        balance: balance.unwrap_or(0.0),
        category: Some(text(raw.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string())),
        is_valid: amounts_readable && !matches!(raw.is_valid, Some(Value::Bool(false))),
        notes: text(raw.notes),
    };
    if !amounts_readable {
        log::debug!("unreadable amount on {}; stored 0 and flagged for review", record.id);
    }
    record
}

fn text(v: Option<Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

const CURRENCY_SYMBOLS: [char; 6] = ['$', '€', '£', '¥', '₹', '₩'];
const CURRENCY_CODES: [&str; 9] = ["USD", "EUR", "GBP", "JPY", "INR", "KRW", "CAD", "AUD", "CHF"];

/// Absent or null is a plain 0; `None` means a value was given but could not be read.
fn amount(v: Option<Value>) -> Option<f64> {
    match v {
        None | Some(Value::Null) => Some(0.0),
        Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()),
        Some(Value::String(s)) => amount_text(&s),
        Some(_) => None,
    }
}

/// Accepts `1,234.50`, `$1,234.50`, `12.50 EUR`, `(250.00)` (negative).
/// Anything else left over after stripping currency markers is unreadable.
fn amount_text(s: &str) -> Option<f64> {
    let mut t = s.trim();
    if t.is_empty() {
        return Some(0.0);
    }

    let negative = match t.strip_prefix('(').and_then(|x| x.strip_suffix(')')) {
        Some(inner) => {
            t = inner.trim();
            true
        }
        None => false,
    };
    for code in CURRENCY_CODES {
        if let Some(rest) = t.strip_prefix(code) {
            t = rest.trim_start();
        }
        if let Some(rest) = t.strip_suffix(code) {
            t = rest.trim_end();
        }
    }

    let cleaned: String = t
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .collect();
    if !thousands_grouping_ok(&cleaned) {
        return None;
    }

    let value = cleaned
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())?;
    Some(if negative { -value } else { value })
}

/// Commas may only separate groups of three digits in the integer part.
fn thousands_grouping_ok(s: &str) -> bool {
    let (int_part, frac) = s.split_once('.').unwrap_or((s, ""));
    if frac.contains(',') {
        return false;
    }
    let digits = int_part.trim_start_matches(['-', '+']);
    if !digits.contains(',') {
        return true;
    }
    let mut groups = digits.split(',');
    let lead = groups.next().unwrap_or_default();
    (1..=3).contains(&lead.len()) && groups.all(|g| g.len() == 3)
}

/// Rewrite duplicate ids so every id in the ledger is unique.
pub fn ensure_unique_ids(mut records: Vec<TransactionRecord>) -> Vec<TransactionRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    for r in records.iter_mut() {
        if seen.insert(r.id.clone()) {
            continue;
        }
        let mut k = 2;
        let mut candidate = format!("{}-{k}", r.id);
        while seen.contains(&candidate) {
            k += 1;
            candidate = format!("{}-{k}", r.id);
        }
        log::debug!("renaming duplicate id {} to {candidate}", r.id);
        r.id = candidate.clone();
        seen.insert(candidate);
    }
    records
}
