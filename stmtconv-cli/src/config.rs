use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use stmtconv_core::{Column, DateFormat, ExportSettings};
use stmtconv_ingest::GeminiConfig;

use crate::state::ensure_stmtconv_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub export: ExportSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub columns: Vec<Column>,
    /// iso | mdy | dmy
    pub date_format: DateFormat,
    pub exclude_invalid: bool,
}

impl Default for ExportSection {
    fn default() -> Self {
        let s = ExportSettings::default();
        Self {
            columns: s.columns,
            date_format: s.date_format,
            exclude_invalid: s.exclude_invalid,
        }
    }
}

impl ExportSection {
    pub fn settings(&self) -> ExportSettings {
        ExportSettings {
            columns: self.columns.clone(),
            date_format: self.date_format,
            exclude_invalid: self.exclude_invalid,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_stmtconv_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let p = config_path()?;
    let cfg = load_config_from(&p)?;
    let source = if p.exists() { "file" } else { "defaults" };
    println!("# {} ({})", p.display(), source);
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);

    let key_set = std::env::var(&cfg.gemini.api_key_env)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);
    println!(
        "\n# {}: {}",
        cfg.gemini.api_key_env,
        if key_set { "set" } else { "not set (demo data will be used)" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.gemini.model, "gemini-1.5-pro");
        assert_eq!(cfg.export.columns.len(), 6);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(
            &p,
            "[export]\ncolumns = [\"date\", \"balance\"]\ndate_format = \"dmy\"\n",
        )
        .unwrap();

        let cfg = load_config_from(&p).unwrap();
        let settings = cfg.export.settings();
        assert_eq!(settings.columns, vec![Column::Date, Column::Balance]);
        assert_eq!(settings.date_format, DateFormat::DayMonthYear);
        assert!(!settings.exclude_invalid);
        assert_eq!(cfg.gemini, GeminiConfig::default());
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back, Config::default());
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(&p, "[export\n").unwrap();
        assert!(load_config_from(&p).is_err());
    }
}
