use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use stmtconv_core::export::parse_columns;
use stmtconv_core::{
    BalanceSummary, DateFormat, EditField, ExportSettings, Ledger, NumericPolicy, Session,
    export_file_name,
};
use stmtconv_ingest::{Gateway, GeminiExtractor, StatementDocument};

mod config;
mod review;
mod state;

#[derive(Parser, Debug)]
#[command(
    name = "stmtconv",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("STMTCONV_BUILD_SHA"), ")"),
    about = "Turn PDF bank statements into checked, editable CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a statement, check its balances and write CSV
    Convert {
        /// PDF statement (max 10 MiB)
        pdf: PathBuf,

        /// Output file (default: bank_statement_<today>.csv)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Comma-separated columns: date,description,debit,credit,balance,category
        #[arg(long)]
        columns: Option<String>,

        /// iso | mdy | dmy
        #[arg(long)]
        date_format: Option<String>,

        /// Leave out rows flagged for review
        #[arg(long)]
        exclude_invalid: bool,

        /// Also save the extracted ledger as JSON (for `validate` / `edit`)
        #[arg(long)]
        ledger_json: Option<PathBuf>,

        /// Skip the extraction service and use demo data
        #[arg(long)]
        demo: bool,
    },

    /// Interactive review: edit rows, watch the balance check, export
    Review {
        /// PDF statement to open on start (press `o` to open one later)
        pdf: Option<PathBuf>,

        /// Skip the extraction service and use demo data
        #[arg(long)]
        demo: bool,
    },

    /// Check the running balances of a saved ledger
    Validate {
        ledger: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change one field of one record in a saved ledger
    Edit {
        ledger: PathBuf,

        #[arg(long)]
        id: String,

        /// date | description | debit | credit | balance | category | notes
        #[arg(long)]
        field: String,

        #[arg(long, allow_hyphen_values = true)]
        value: String,

        /// Refuse non-numeric amounts instead of storing 0
        #[arg(long)]
        strict: bool,
    },

    /// Manage ~/.stmtconv/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Convert {
            pdf,
            out,
            columns,
            date_format,
            exclude_invalid,
            ledger_json,
            demo,
        } => {
            let cfg = config::load_config()?;
            let mut settings = cfg.export.settings();
            if let Some(list) = columns {
                settings.columns = parse_columns(&list)?;
            }
            if let Some(f) = date_format {
                settings.date_format = f.parse::<DateFormat>()?;
            }
            settings.exclude_invalid |= exclude_invalid;

            let gateway = build_gateway(&cfg, demo);
            convert(&gateway, &pdf, out, &settings, ledger_json.as_deref()).await?;
        }

        Command::Review { pdf, demo } => {
            let cfg = config::load_config()?;
            let gateway = build_gateway(&cfg, demo);
            let handle = tokio::runtime::Handle::current();
            tokio::task::block_in_place(|| review::run_review(handle, gateway, cfg.export.settings(), pdf))?;
        }

        Command::Validate { ledger, json } => {
            let records = state::read_ledger_json(&ledger)?;
            let ledger = Ledger::new(records);
            if json {
                println!("{}", serde_json::to_string_pretty(&ledger.summary())?);
            } else {
                print_summary(&ledger);
            }
        }

        Command::Edit {
            ledger: path,
            id,
            field,
            value,
            strict,
        } => {
            let policy = if strict {
                NumericPolicy::Reject
            } else {
                NumericPolicy::CoerceToZero
            };
            let field: EditField = field.parse()?;
            let ledger = Ledger::new(state::read_ledger_json(&path)?);
            let updated = ledger
                .update_field_with(&id, field, &value, policy)
                .with_context(|| format!("editing {} of {}", field, id))?;
            state::write_ledger_json(&path, updated.records())?;

            if let Some(r) = updated.get(&id) {
                println!("{} {} = {}", id, field, field.current_text(r));
            }
            print_summary(&updated);
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },
    }

    Ok(())
}

fn build_gateway(cfg: &config::Config, demo: bool) -> Gateway<GeminiExtractor> {
    if demo {
        Gateway::demo_only("demo mode requested (--demo)")
    } else {
        Gateway::from_config(cfg.gemini.clone())
    }
}

async fn convert(
    gateway: &Gateway<GeminiExtractor>,
    pdf: &Path,
    out: Option<PathBuf>,
    settings: &ExportSettings,
    ledger_json: Option<&Path>,
) -> Result<()> {
    if !pdf.exists() {
        bail!("PDF not found: {}", pdf.display());
    }
    let doc = StatementDocument::from_path(pdf)?;

    let mut session = Session::new();
    let request_id = session.begin(doc.name());
    println!("Processing {} ({} bytes)...", doc.name(), doc.len());
    let outcome = gateway.run(&doc).await;
    session.finish(request_id, outcome);

    if let Some(notice) = session.notice() {
        eprintln!("warning: {notice}");
        eprintln!("warning: showing DEMO data, not the contents of {}", doc.name());
    }

    print_summary(session.ledger());

    let csv = session.export(settings)?;
    let out = out.unwrap_or_else(|| PathBuf::from(export_file_name(chrono::Local::now().date_naive())));
    std::fs::write(&out, csv).with_context(|| format!("write {}", out.display()))?;
    println!(
        "\nWrote {} rows to {}",
        settings.row_count(session.ledger().records()),
        out.display()
    );

    if let Some(p) = ledger_json {
        state::write_ledger_json(p, session.ledger().records())?;
        println!("Saved ledger to {}", p.display());
    }

    Ok(())
}

fn print_summary(ledger: &Ledger) {
    let Some(s) = ledger.summary() else {
        println!("No transaction data available");
        return;
    };

    println!(
        "{} transactions | {} valid | {} need review",
        s.total_transactions,
        ledger.valid_count(),
        ledger.needs_review_count()
    );
    println!(
        "Total debits: {:.2} | Total credits: {:.2}",
        s.total_debits, s.total_credits
    );
    println!("{}", summary_line(&s));

    for b in ledger.chain_breaks() {
        println!(
            "  row {} ({}): expected balance {:.2}, declared {:.2}",
            b.index + 1,
            b.id,
            b.expected_balance,
            b.declared_balance
        );
    }
}

fn summary_line(s: &BalanceSummary) -> String {
    if s.is_valid {
        format!("OK: {}", s.headline())
    } else {
        format!("MISMATCH: {}", s.headline())
    }
}
