//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::fmp_adapter::FmpAdapter;
use crate::domain::error::StockpickError;
use crate::domain::ingest::{self, IngestWindow};
use crate::domain::scan::{self, ScanOptions};
use crate::domain::scoring::ScoringWeights;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;

const DEFAULT_WINDOW_DAYS: i64 = 365;

#[derive(Parser, Debug)]
#[command(name = "stockpick", about = "Market data ingestion and undervaluation screening")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Fetch and persist price history for one or more symbols
    Ingest {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbol list
        #[arg(long)]
        symbols: String,
        /// Window start (default: window_days before --to)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Window end (default: today)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Also ingest statements, analyst targets and sentiment
        #[arg(long)]
        evidence: bool,
    },
    /// Score stored securities and print the undervalued ones
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Show what is stored for a symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
    },
    /// Create the database schema
    InitDb {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing();
    match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::Ingest {
            config,
            symbols,
            from,
            to,
            evidence,
        } => run_ingest(&config, &symbols, from, to, evidence),
        Command::Scan { config, threshold } => run_scan(&config, threshold),
        Command::Info { config, symbol } => run_info(&config, &symbol),
        Command::InitDb { config } => run_init_db(&config),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Open the configured store backend and make sure the schema exists.
/// Schema creation is idempotent, so every entry point may call this.
pub fn open_store(config: &dyn ConfigPort) -> Result<Arc<dyn StorePort>, StockpickError> {
    let backend = config
        .get_string("database", "backend")
        .unwrap_or_else(|| "sqlite".to_string());

    match backend.as_str() {
        "sqlite" => {
            #[cfg(feature = "sqlite")]
            {
                let adapter = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
                adapter.initialize_schema()?;
                return Ok(Arc::new(adapter));
            }
            #[cfg(not(feature = "sqlite"))]
            {
                Err(StockpickError::ConfigInvalid {
                    section: "database".into(),
                    key: "backend".into(),
                    reason: "sqlite backend not compiled in".into(),
                })
            }
        }
        "postgres" => {
            #[cfg(feature = "postgres")]
            {
                let adapter =
                    crate::adapters::postgres_adapter::PostgresAdapter::from_config(config)?;
                adapter.initialize_schema()?;
                return Ok(Arc::new(adapter));
            }
            #[cfg(not(feature = "postgres"))]
            {
                Err(StockpickError::ConfigInvalid {
                    section: "database".into(),
                    key: "backend".into(),
                    reason: "postgres backend not compiled in".into(),
                })
            }
        }
        other => Err(StockpickError::ConfigInvalid {
            section: "database".into(),
            key: "backend".into(),
            reason: format!("unknown backend {other}"),
        }),
    }
}

/// Split a comma-separated symbol list: trimmed, uppercased, no empties or
/// duplicates.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, StockpickError> {
    let mut symbols = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for token in input.split(',') {
        let symbol = token.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(StockpickError::Validation {
                reason: "empty symbol in list".into(),
            });
        }
        if !seen.insert(symbol.clone()) {
            return Err(StockpickError::Validation {
                reason: format!("duplicate symbol {symbol}"),
            });
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

fn resolve_window(
    config: &dyn ConfigPort,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> IngestWindow {
    let to = to.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let from = from.unwrap_or_else(|| {
        to - chrono::Duration::days(config.get_int("ingest", "window_days", DEFAULT_WINDOW_DAYS))
    });
    IngestWindow { from, to }
}

fn run_ingest(
    config_path: &PathBuf,
    symbols: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    evidence: bool,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let symbols = match parse_symbols(symbols) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let provider = match FmpAdapter::from_config(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let window = resolve_window(&config, from, to);
    eprintln!(
        "Ingesting {} symbol(s), {} to {}",
        symbols.len(),
        window.from,
        window.to
    );

    let mut succeeded = 0usize;
    let mut last_error: Option<StockpickError> = None;

    for symbol in &symbols {
        match ingest::ingest_price_history(&provider, store.as_ref(), symbol, window) {
            Ok(report) => {
                eprintln!(
                    "  {}: {} bars upserted, {} skipped, {} failed",
                    report.symbol,
                    report.upserted(),
                    report.skipped(),
                    report.failed()
                );
                succeeded += 1;
            }
            Err(e) => {
                eprintln!("  {symbol}: error: {e}");
                last_error = Some(e);
                continue;
            }
        }

        if evidence {
            match ingest::ingest_evidence(&provider, store.as_ref(), symbol, window) {
                Ok(report) => eprintln!(
                    "  {}: evidence: {} statements, {} targets, {} sentiment samples",
                    report.symbol,
                    report.statements.upserted,
                    report.targets.upserted,
                    report.sentiment.upserted
                ),
                Err(e) => {
                    eprintln!("  {symbol}: evidence error: {e}");
                    last_error = Some(e);
                }
            }
        }
    }

    if succeeded == 0 {
        if let Some(e) = last_error {
            return (&e).into();
        }
    }
    ExitCode::SUCCESS
}

fn run_scan(config_path: &PathBuf, threshold_override: Option<f64>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let weights = ScoringWeights::from_config(&config);
    let mut options = ScanOptions::from_config(&config);
    if let Some(threshold) = threshold_override {
        options.threshold = threshold;
    }

    let today = chrono::Utc::now().date_naive();
    let scores = match scan::scan_for_undervalued(store.as_ref(), &weights, &options, today) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if scores.is_empty() {
        eprintln!("No securities at or above threshold {}", options.threshold);
        return ExitCode::SUCCESS;
    }

    println!(
        "{:<8} {:>8} {:>12} {:>9} {:>11}",
        "SYMBOL", "SCORE", "FUNDAMENTAL", "ANALYST", "SENTIMENT"
    );
    for s in &scores {
        println!(
            "{:<8} {:>8.1} {:>12.1} {:>9.1} {:>11.1}",
            s.symbol, s.score, s.fundamental_score, s.analyst_score, s.sentiment_score
        );
    }

    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf, symbol: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let symbol = symbol.trim().to_uppercase();
    let security = match store.get_security_by_symbol(&symbol) {
        Ok(Some(s)) => s,
        Ok(None) => {
            eprintln!("error: no stored security for {symbol}");
            return ExitCode::from(5);
        }
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!(
        "{}: {} ({})",
        security.symbol, security.company_name, security.exchange
    );
    eprintln!("  sector:   {} / {}", security.sector, security.industry);
    eprintln!("  currency: {}", security.currency);
    eprintln!("  active:   {}", security.is_active);

    let all_time_start = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap();
    let bars = match store.get_price_bars(
        security.id,
        all_time_start,
        chrono::Utc::now().date_naive(),
    ) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => {
            eprintln!(
                "  bars:     {} ({} to {})",
                bars.len(),
                first.date,
                last.date
            );
            eprintln!("  latest close: {:.2}", last.close);
        }
        _ => eprintln!("  bars:     none stored"),
    }

    ExitCode::SUCCESS
}

fn run_init_db(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match open_store(&config) {
        Ok(_) => {
            eprintln!("Schema ready");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_serve(config_path: &PathBuf) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};
        use std::net::SocketAddr;

        eprintln!("Loading config from {}", config_path.display());
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };

        let store = match open_store(&config) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let provider = match FmpAdapter::from_config(&config) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let addr: SocketAddr = match config
            .get_string("web", "listen")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse()
        {
            Ok(a) => a,
            Err(e) => {
                let err = StockpickError::ConfigInvalid {
                    section: "web".into(),
                    key: "listen".into(),
                    reason: e.to_string(),
                };
                eprintln!("error: {err}");
                return (&err).into();
            }
        };

        let state = AppState {
            store,
            provider,
            weights: ScoringWeights::from_config(&config),
            scan_options: ScanOptions::from_config(&config),
            ingest_window_days: config.get_int("ingest", "window_days", DEFAULT_WINDOW_DAYS),
        };

        eprintln!("Starting web server on {addr}");

        let router = build_router(state);

        tokio::runtime::Runtime::new()
            .expect("failed to start tokio runtime")
            .block_on(async {
                let listener = match tokio::net::TcpListener::bind(addr).await {
                    Ok(l) => l,
                    Err(e) => {
                        eprintln!("error: failed to bind {addr}: {e}");
                        return ExitCode::from(1);
                    }
                };
                if let Err(e) = axum::serve(listener, router).await {
                    eprintln!("error: server stopped: {e}");
                    return ExitCode::from(1);
                }
                ExitCode::SUCCESS
            })
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}
