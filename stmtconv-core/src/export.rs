//! CSV projection of a ledger

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::record::TransactionRecord;

/// Exportable column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Date,
    Description,
    Debit,
    Credit,
    Balance,
    Category,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Date,
        Column::Description,
        Column::Debit,
        Column::Credit,
        Column::Balance,
        Column::Category,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Description => "description",
            Column::Debit => "debit",
            Column::Credit => "credit",
            Column::Balance => "balance",
            Column::Category => "category",
        }
    }

    /// Header label written to the CSV
    pub fn label(&self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::Description => "Description",
            Column::Debit => "Debit Amount",
            Column::Credit => "Credit Amount",
            Column::Balance => "Balance",
            Column::Category => "Category",
        }
    }

    fn value(&self, record: &TransactionRecord, date_format: DateFormat) -> String {
        match self {
            Column::Date => date_format.apply(&record.date),
            Column::Description => record.description.clone(),
            Column::Debit => format_amount(record.debit),
            Column::Credit => format_amount(record.credit),
            Column::Balance => format_amount(record.balance),
            Column::Category => record.category.clone().unwrap_or_default(),
        }
    }
}

impl FromStr for Column {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Column::ALL
            .into_iter()
            .find(|c| c.key() == key)
            .ok_or_else(|| ExportError::UnknownColumn(s.trim().to_string()))
    }
}

/// Parse a comma-separated column list such as `date,description,balance`.
pub fn parse_columns(list: &str) -> Result<Vec<Column>, ExportError> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateFormat {
    /// YYYY-MM-DD, passed through as stored
    #[default]
    #[serde(rename = "iso")]
    Iso,
    /// MM/DD/YYYY
    #[serde(rename = "mdy")]
    MonthDayYear,
    /// DD/MM/YYYY
    #[serde(rename = "dmy")]
    DayMonthYear,
}

impl DateFormat {
    /// Reformat an ISO date. Text that is not an ISO date is left as is.
    pub fn apply(&self, date: &str) -> String {
        let pattern = match self {
            DateFormat::Iso => return date.to_string(),
            DateFormat::MonthDayYear => "%m/%d/%Y",
            DateFormat::DayMonthYear => "%d/%m/%Y",
        };
        match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
            Ok(d) => d.format(pattern).to_string(),
            Err(_) => date.to_string(),
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DateFormat::Iso => "YYYY-MM-DD",
            DateFormat::MonthDayYear => "MM/DD/YYYY",
            DateFormat::DayMonthYear => "DD/MM/YYYY",
        })
    }
}

impl FromStr for DateFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ISO" | "YYYY-MM-DD" => Ok(DateFormat::Iso),
            "MDY" | "MM/DD/YYYY" => Ok(DateFormat::MonthDayYear),
            "DMY" | "DD/MM/YYYY" => Ok(DateFormat::DayMonthYear),
            _ => Err(ExportError::UnknownDateFormat(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub columns: Vec<Column>,
    pub date_format: DateFormat,
    /// Drop records flagged for review
    pub exclude_invalid: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            columns: Column::ALL.to_vec(),
            date_format: DateFormat::Iso,
            exclude_invalid: false,
        }
    }
}

impl ExportSettings {
    /// Number of data rows an export would contain.
    pub fn row_count(&self, records: &[TransactionRecord]) -> usize {
        records
            .iter()
            .filter(|r| !self.exclude_invalid || r.is_valid)
            .count()
    }
}

/// Fixed-point with two fractional digits. Values that round to zero print
/// as `0.00`, never `-0.00`.
pub fn format_amount(amount: f64) -> String {
    let s = format!("{amount:.2}");
    if s == "-0.00" { "0.00".to_string() } else { s }
}

/// Render the ledger as CSV text: a header row, then one row per exported
/// record. Fields are quoted only when they contain a comma, quote or newline.
pub fn to_csv(records: &[TransactionRecord], settings: &ExportSettings) -> Result<String, ExportError> {
    if settings.columns.is_empty() {
        return Err(ExportError::NoColumns);
    }

    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    wtr.write_record(settings.columns.iter().map(Column::label))?;

    let mut rows = 0usize;
    for record in records.iter().filter(|r| !settings.exclude_invalid || r.is_valid) {
        wtr.write_record(
            settings
                .columns
                .iter()
                .map(|c| c.value(record, settings.date_format)),
        )?;
        rows += 1;
    }
    log::debug!("exported {rows} of {} records", records.len());

    let bytes = wtr.into_inner().map_err(|e| ExportError::Flush(e.to_string()))?;
    String::from_utf8(bytes).map_err(|_| ExportError::Encoding)
}

/// `bank_statement_<YYYY-MM-DD>.csv`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("bank_statement_{}.csv", date.format("%Y-%m-%d"))
}
