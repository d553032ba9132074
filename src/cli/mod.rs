use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::application::{BackendKind, Config, LedgerStore, RemovedRow, StrategyName};
use crate::domain::{
    Kind, Transaction, TransactionDraft, format_amount, history_order, parse_amount, summarize,
};
use crate::storage::AnyBackend;

/// Cashbook - income and expense ledger
#[derive(Parser)]
#[command(name = "cashbook")]
#[command(about = "Record income and expenses in a spreadsheet-backed ledger")]
#[command(version)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "cashbook.toml")]
    pub config: String,

    /// Backend: csv, sqlite, sheets, memory (overrides config file)
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Backend location: file path or spreadsheet id (overrides config file)
    #[arg(long, global = true)]
    pub location: Option<String>,

    /// Write strategy: overwrite, append, optimistic (overrides config file)
    #[arg(long, global = true)]
    pub strategy: Option<String>,

    /// Log level (overrides config file)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record an income or expense
    Record {
        /// Amount (e.g., "50000" or "50,000")
        amount: String,

        /// Transaction type: income or expense
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: String,

        /// Category (e.g., Food, Transport, Salary)
        #[arg(short, long, default_value = "Other")]
        category: String,

        /// Date of the transaction (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Free-text note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// List the ledger in stored order
    Ledger {
        /// Fail instead of showing an empty ledger when the backend is unreachable
        #[arg(long)]
        strict_read: bool,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show transactions newest first
    History {
        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show totals, balance and expense breakdown
    Summary {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Remove the last recorded transaction
    Undo,

    /// Delete every transaction
    Reset {
        /// Confirm the irreversible reset
        #[arg(long)]
        yes: bool,
    },

    /// List the configured categories
    Categories,
}

impl Cli {
    /// Merge command-line overrides into the loaded config.
    fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load(&self.config)?;

        if let Some(backend) = &self.backend {
            config.backend.kind = BackendKind::from_str(backend).ok_or_else(|| {
                anyhow::anyhow!("Invalid backend '{}'. Use: csv, sqlite, sheets, memory", backend)
            })?;
        }
        if let Some(location) = &self.location {
            config.backend.location = location.clone();
        }
        if let Some(strategy) = &self.strategy {
            config.store.write_strategy = StrategyName::from_str(strategy).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid strategy '{}'. Use: overwrite, append, optimistic",
                    strategy
                )
            })?;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.resolve_config()?;
        init_tracing(&config.logging.level);

        match self.command {
            Commands::Record {
                amount,
                kind,
                category,
                date,
                note,
            } => {
                let amount =
                    parse_amount(&amount).context("Invalid amount format. Use '50000' or '50,000'")?;
                let kind = Kind::from_str(&kind).ok_or_else(|| {
                    anyhow::anyhow!("Invalid type '{}'. Use: income, expense", kind)
                })?;
                let date = match date {
                    Some(date_str) => parse_date(&date_str)?,
                    None => Local::now().date_naive(),
                };

                if !config.ui.categories.iter().any(|c| c == &category) {
                    warn!(%category, "category is not in the configured list");
                }

                let mut draft = TransactionDraft::new(date, kind, category, amount);
                if let Some(note) = note {
                    draft = draft.with_note(note);
                }

                let store = open_store(&config).await?;
                let transaction = store.record(draft).await?;
                println!(
                    "Recorded {}: {} {} ({})",
                    transaction.kind,
                    format_amount(transaction.amount),
                    config.ui.currency,
                    transaction.category
                );
            }

            Commands::Ledger {
                strict_read,
                format,
            } => {
                let store = open_store(&config).await?;
                let ledger = if strict_read {
                    store.load_ledger().await?
                } else {
                    store.current_ledger().await
                };
                match format.as_str() {
                    "json" => println!("{}", serde_json::to_string_pretty(&ledger)?),
                    "table" => print_transactions(ledger.iter()),
                    other => anyhow::bail!("Invalid format '{}'. Use: table, json", other),
                }
            }

            Commands::History { limit } => {
                let store = open_store(&config).await?;
                let ledger = store.current_ledger().await;
                let history = history_order(&ledger);
                let limit = limit.unwrap_or(history.len());
                print_transactions(history.into_iter().take(limit));
            }

            Commands::Summary { format } => {
                let store = open_store(&config).await?;
                run_summary_command(&store, &format, &config.ui.currency).await?;
            }

            Commands::Undo => {
                let store = open_store(&config).await?;
                match store.remove_last().await? {
                    Some(RemovedRow::Transaction(transaction)) => println!(
                        "Removed {}: {} ({})",
                        transaction.kind,
                        format_amount(transaction.amount),
                        transaction.category
                    ),
                    Some(RemovedRow::Unreadable { row, error }) => println!(
                        "Removed unreadable row ({}): {}",
                        error.problem,
                        row.cells().join(",")
                    ),
                    None => println!("Nothing to undo."),
                }
            }

            Commands::Reset { yes } => {
                if !yes {
                    anyhow::bail!("Reset deletes every transaction. Re-run with --yes to confirm");
                }
                let store = open_store(&config).await?;
                store.reset_ledger().await?;
                println!("Ledger cleared.");
            }

            Commands::Categories => {
                for category in &config.ui.categories {
                    println!("{}", category);
                }
            }
        }

        Ok(())
    }
}

async fn open_store(config: &Config) -> Result<LedgerStore<AnyBackend>> {
    let backend = config
        .backend
        .open()
        .await
        .context("Failed to open the ledger backend")?;
    Ok(LedgerStore::with_options(backend, config.store.options()))
}

async fn run_summary_command(
    store: &LedgerStore<AnyBackend>,
    format: &str,
    currency: &str,
) -> Result<()> {
    let ledger = store.current_ledger().await;
    let summary = summarize(&ledger);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }
        "table" => {}
        other => anyhow::bail!("Invalid format '{}'. Use: table, json", other),
    }

    if summary.count == 0 {
        println!("No data yet.");
        return Ok(());
    }

    println!("Balance: {} {}", format_amount(summary.balance), currency);
    println!(
        "Income:  {} | Expense: {}",
        format_amount(summary.total_income),
        format_amount(summary.total_expense)
    );

    if !summary.expense_by_category.is_empty() {
        println!();
        println!("{:<20} {:>14} {:>7}", "CATEGORY", "SPENT", "SHARE");
        println!("{}", "-".repeat(43));
        for share in &summary.expense_by_category {
            println!(
                "{:<20} {:>14} {:>6.1}%",
                truncate(&share.category, 20),
                format_amount(share.total),
                share.percentage
            );
        }
    }
    Ok(())
}

fn print_transactions<'a>(transactions: impl Iterator<Item = &'a Transaction>) {
    let mut transactions = transactions.peekable();
    if transactions.peek().is_none() {
        println!("No transactions found.");
        return;
    }

    println!(
        "{:<12} {:<8} {:<15} {:>14} NOTE",
        "DATE", "TYPE", "CATEGORY", "AMOUNT"
    );
    println!("{}", "-".repeat(70));

    for transaction in transactions {
        let date = transaction
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{:<12} {:<8} {:<15} {:>14} {}",
            date,
            transaction.kind,
            truncate(&transaction.category, 15),
            format_amount(transaction.amount),
            truncate(&transaction.note, 30)
        );
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str))
}
