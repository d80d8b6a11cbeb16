use alpha_matrix::config::{Config, ServerConfig};
use alpha_matrix::models::analysis::Grade;
use alpha_matrix::scrapers::krx::KrxScraper;
use alpha_matrix::scrapers::yahoo::YahooScraper;
use alpha_matrix::services::{AnalyzerService, CollectorService, PublisherService};
use alpha_matrix::storage::{DataStore, GithubStore};
use alpha_matrix::{server, util};

use anyhow::{bail, Context};
use clap::{App, Arg, ArgMatches, SubCommand};
use chrono::NaiveDate;
use log::{info, warn};
use std::sync::Arc;

fn parse_date(matches: &ArgMatches) -> anyhow::Result<NaiveDate> {
    match matches.value_of("date") {
        Some(date_str) => NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .with_context(|| format!("Invalid date: {}", date_str)),
        None => Ok(util::today_kst()),
    }
}

fn date_arg<'a>() -> Arg<'a> {
    Arg::with_name("date")
        .short('d')
        .long("date")
        .value_name("DATE")
        .help("Reference date (YYYY-MM-DD), defaults to today in Seoul")
        .takes_value(true)
}

fn lookback_arg<'a>() -> Arg<'a> {
    Arg::with_name("lookback")
        .long("lookback")
        .value_name("DAYS")
        .help("Calendar days searched back from the reference date")
        .takes_value(true)
        .default_value("60")
}

fn parse_lookback(matches: &ArgMatches) -> anyhow::Result<i64> {
    let raw = matches.value_of("lookback").unwrap_or("60");
    raw.parse::<i64>().with_context(|| format!("Invalid lookback: {}", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let app = App::new("AlphaMatrix")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Korean ETF alpha matrix: data collection, grading and AI analysis API")
        .arg(
            Arg::with_name("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Directory of the CSV data pack")
                .takes_value(true)
                .default_value("data"),
        );

    // 개발 모드에서만 디버그 옵션 제공
    #[cfg(debug_assertions)]
    let app = app.arg(
        Arg::with_name("debug")
            .long("debug")
            .help("Enable debug mode")
            .takes_value(false),
    )
    .arg(
        Arg::with_name("debug-limit")
            .long("debug-limit")
            .help("Limit the number of ETFs kept in debug mode")
            .takes_value(true)
            .default_value("5"),
    );

    let app = app
        .subcommand(
            SubCommand::with_name("collect")
                .about("Collect ETF prices, market ADR and macro indices (CSV_A, CSV_E, CSV_C)")
                .arg(date_arg())
                .arg(lookback_arg())
                .arg(
                    Arg::with_name("analyze")
                        .short('a')
                        .long("analyze")
                        .help("Run the analysis right after collecting")
                        .takes_value(false),
                ),
        )
        .subcommand(
            SubCommand::with_name("analyze")
                .about("Grade ETFs from CSV_A (CSV_A_Analysis, Final_Insight)")
                .arg(date_arg())
                .arg(lookback_arg())
                .arg(
                    Arg::with_name("benchmark")
                        .long("benchmark")
                        .value_name("CODE")
                        .help("KRX index code of the benchmark (1028 = KOSPI 200)")
                        .takes_value(true)
                        .default_value("1028"),
                ),
        )
        .subcommand(
            SubCommand::with_name("publish")
                .about("Upload the data pack to the GitHub store (needs GITHUB_TOKEN)"),
        )
        .subcommand(
            SubCommand::with_name("serve")
                .about("Run the HTTP API")
                .arg(
                    Arg::with_name("bind")
                        .short('b')
                        .long("bind")
                        .value_name("ADDR")
                        .help("Listen address, overrides BIND_ADDR")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("explore")
                .about("Show the latest local analysis")
                .arg(
                    Arg::with_name("grade")
                        .short('g')
                        .long("grade")
                        .value_name("GRADE")
                        .help("Only show one grade (S, A, B)")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("min-score")
                        .short('m')
                        .long("min-score")
                        .value_name("SCORE")
                        .help("Only show ETFs scoring at least this much (0-10)")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("limit")
                        .short('l')
                        .long("limit")
                        .value_name("LIMIT")
                        .help("Limit the number of rows to display")
                        .takes_value(true)
                        .default_value("20"),
                ),
        );

    let matches = app.get_matches();
    let data_dir = matches.value_of("data-dir").unwrap_or("data").to_string();

    #[cfg(debug_assertions)]
    let debug_mode = matches.is_present("debug");
    #[cfg(not(debug_assertions))]
    let debug_mode = false;

    #[cfg(debug_assertions)]
    let debug_etf_limit = matches.value_of("debug-limit")
        .unwrap_or("5")
        .parse::<usize>()
        .unwrap_or(5);
    #[cfg(not(debug_assertions))]
    let debug_etf_limit = usize::MAX;

    let config = || {
        Config::new()
            .with_data_dir(&data_dir)
            .with_debug_mode(debug_mode)
            .with_debug_etf_limit(debug_etf_limit)
    };

    match matches.subcommand() {
        Some(("collect", sub)) => {
            let date = parse_date(sub)?;
            let lookback = parse_lookback(sub)?;
            let cfg = config().with_lookback_days(lookback);
            let krx = Arc::new(KrxScraper::new(&cfg.reference_isin)?);
            let yahoo = Arc::new(YahooScraper::new()?);

            CollectorService::new(cfg, krx.clone(), yahoo).run(&date).await?;

            if sub.is_present("analyze") {
                let records = AnalyzerService::new(config().with_lookback_days(lookback), krx).run(&date).await?;
                info!("{} ETFs graded", records.len());
            }
        }
        Some(("analyze", sub)) => {
            let date = parse_date(sub)?;
            let cfg = config()
                .with_lookback_days(parse_lookback(sub)?)
                .with_benchmark_index(sub.value_of("benchmark").unwrap_or("1028"));
            let krx = Arc::new(KrxScraper::new(&cfg.reference_isin)?);
            let records = AnalyzerService::new(cfg, krx).run(&date).await?;
            info!("{} ETFs graded", records.len());
        }
        Some(("publish", _)) => {
            let server_config = ServerConfig::from_env();
            let remote = GithubStore::from_config(&server_config)?;
            if !remote.can_write() {
                bail!("GITHUB_TOKEN, GITHUB_USER and REPO_NAME are required to publish");
            }
            let count = PublisherService::new(DataStore::new(&data_dir), remote).publish().await?;
            info!("Published {} files", count);
        }
        Some(("serve", sub)) => {
            let mut server_config = ServerConfig::from_env();
            if let Some(bind) = sub.value_of("bind") {
                server_config.bind_addr = bind.to_string();
            }
            server::serve(server_config).await?;
        }
        Some(("explore", sub)) => {
            let limit = sub.value_of("limit")
                .unwrap_or("20")
                .parse::<usize>()
                .unwrap_or(20);
            let grade_filter = match sub.value_of("grade") {
                Some(g) => Some(
                    g.chars().next()
                        .and_then(Grade::from_letter)
                        .with_context(|| format!("Unknown grade: {}", g))?,
                ),
                None => None,
            };
            let min_score = match sub.value_of("min-score") {
                Some(raw) => raw.parse::<u8>().with_context(|| format!("Invalid score: {}", raw))?,
                None => 0,
            };

            let records = DataStore::new(&data_dir).load_analysis()?;
            info!("Found {} graded ETFs", records.len());

            let filtered: Vec<_> = records.iter()
                .filter(|r| grade_filter.map_or(true, |g| r.grade() == Some(g)))
                .filter(|r| r.score().unwrap_or_default() >= min_score)
                .collect();
            if filtered.is_empty() {
                warn!("No ETFs match the filter");
            }

            info!("{:<8} {:<30} {:<6} {:>10} {:>8}  {}", "Ticker", "Name", "Grade", "Alpha1M", "RVOL", "Description");
            info!("{:-<90}", "");
            for record in filtered.iter().take(limit) {
                info!("{:<8} {:<30} {:<6} {:>10.2} {:>8.1}  {}",
                      record.ticker, record.name, record.grade_score,
                      record.alpha_1m, record.rvol, record.description);
            }
            if filtered.len() > limit {
                info!("... and {} more", filtered.len() - limit);
            }
        }
        _ => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}
