use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use stmtconv_core::TransactionRecord;

pub fn stmtconv_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("STMTCONV_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".stmtconv"))
}

pub fn ensure_stmtconv_home() -> Result<PathBuf> {
    let dir = stmtconv_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Ledger JSON as written by `convert --ledger-json`: a plain array of records.
pub fn read_ledger_json(path: &Path) -> Result<Vec<TransactionRecord>> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse ledger {}", path.display()))
}

pub fn write_ledger_json(path: &Path, records: &[TransactionRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let records = vec![
            TransactionRecord::new("1", "2024-01-15", "Opening", 0.0, 0.0, 1000.0)
                .with_category("Other")
                .with_validity(false),
        ];
        write_ledger_json(&path, &records).unwrap();
        assert_eq!(read_ledger_json(&path).unwrap(), records);
    }
}
