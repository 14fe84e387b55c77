//! icf-runner: headless front end for the ICF impact calculator.
//!
//! Usage:
//!   icf-runner --db icf.db --user analyst --cap "Personal Credit=1.0"   (ICF_PASSWORD in env/.env)
//!   icf-runner --db icf.db --seed 42              (populate an empty extract)
//!   icf-runner --ipc-mode                         (JSON lines on stdin/stdout)

use anyhow::{Context, Result};
use chrono::Utc;
use icf_core::{
    auth::Credentials,
    config::{CalculatorConfig, WarehouseConfig},
    error::IcfResult,
    impact::{Estimate, ImpactTable, Scope},
    schedule::CapSchedule,
    session::{CalculatorSession, SessionCommand, SessionResponse},
    store::IcfStore,
    synthetic::{generate_market, SyntheticSpec},
    types::Category,
    warehouse::Warehouse,
};
use std::env;
use std::io::{self, BufRead, Write};

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let defaults = WarehouseConfig::from_env();
    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(defaults.db_path.as_str()).to_string();
    let data_dir = flag_value(&args, "--data-dir").unwrap_or(defaults.data_dir.as_str()).to_string();
    let seed: Option<u64> = flag_value(&args, "--seed").and_then(|s| s.parse().ok());

    let config = CalculatorConfig::load(&data_dir).unwrap_or_else(|e| {
        log::warn!("{e}; using built-in calculator defaults");
        CalculatorConfig::default_test()
    });

    let mut store = IcfStore::open(&db)?;
    store.migrate()?;
    if let Some(seed) = seed {
        populate_if_empty(&mut store, &config, seed)?;
    }
    let mut warehouse = Warehouse::new(store, config.clone());

    if ipc_mode {
        let credentials = Credentials::load(&data_dir)
            .with_context(|| format!("credentials expected in {data_dir}"))?;
        let mut session = CalculatorSession::new(config, credentials);
        run_ipc_loop(&mut session, &mut warehouse)?;
    } else {
        println!("ICF cap impact estimator");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  period:    {}", config.period);
        println!();
        let username = flag_value(&args, "--user")
            .map(str::to_string)
            .or_else(|| env::var("ICF_USER").ok())
            .context("--user (or ICF_USER) is required")?;
        let password = env::var("ICF_PASSWORD").context("ICF_PASSWORD is not set")?;
        let credentials = Credentials::load(&data_dir)
            .with_context(|| format!("credentials expected in {data_dir}"))?;
        let mut session = CalculatorSession::new(config, credentials);
        if !session.login(&username, &password) {
            anyhow::bail!("login rejected for {username}");
        }
        for (category, percent) in parse_caps(&args)? {
            session.set_cap(category, percent)?;
        }
        run_once(&session, &mut warehouse)?;
    }

    Ok(())
}

fn populate_if_empty(store: &mut IcfStore, config: &CalculatorConfig, seed: u64) -> Result<()> {
    if store.flow_count(&config.period)? > 0 {
        log::info!("extract already populated; --seed ignored");
        return Ok(());
    }
    let market = generate_market(seed, &SyntheticSpec::default());
    for tier in &market.tiers {
        store.upsert_cap_tier(tier)?;
    }
    store.insert_flows(&config.period, &market.flows)?;
    log::info!("populated extract with {} synthetic flows (seed {seed})", market.flows.len());
    Ok(())
}

fn run_ipc_loop(session: &mut CalculatorSession, warehouse: &mut Warehouse) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let value: serde_json::Value = match serde_json::from_str(&buffer) {
            Ok(v) => v,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };
        if value["type"] == "quit" {
            break;
        }
        let cmd: SessionCommand = match serde_json::from_value(value) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        match dispatch(session, warehouse, cmd) {
            Ok(response) => writeln!(stdout, "{}", serde_json::to_string(&response)?)?,
            Err(e) => {
                log::warn!("session={} command failed: {e}", session.session_id);
                write_error(&mut stdout, &e.to_string())?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

/// Answer one command. Warehouse data is loaded (or taken from the
/// cache) only for commands that read it.
fn dispatch(
    session: &mut CalculatorSession,
    warehouse: &mut Warehouse,
    cmd: SessionCommand,
) -> IcfResult<SessionResponse> {
    if !cmd.needs_market_data() {
        return session.handle(cmd, &[], &CapSchedule::default());
    }
    let now = Utc::now();
    let flows = warehouse.flows(now)?;
    let base = warehouse.cap_schedule(now)?;
    session.handle(cmd, &flows, &base)
}

fn write_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{}", err_json)?;
    stdout.flush()?;
    Ok(())
}

fn run_once(session: &CalculatorSession, warehouse: &mut Warehouse) -> Result<()> {
    let now = Utc::now();
    let flows = warehouse.flows(now)?;
    let base = warehouse.cap_schedule(now)?;

    println!("=== CAP SCHEDULE ===");
    for entry in session.schedule(&base).entries() {
        println!(
            "  {:<20} {:<14} hist {:>5.2}% | current {:>4.1}% | proposed {:>4.1}%",
            entry.category.label(),
            entry.cap_label,
            entry.historical_rate_percent,
            entry.current_cap_percent,
            entry.proposed_cap_percent,
        );
    }
    println!();

    match session.estimate(&flows, &base)? {
        Estimate::NoChanges => println!("No changes made to the caps."),
        Estimate::Computed(report) => {
            print_table("WHOLE MARKET", &report.market);
            for table in &report.categories {
                if let Scope::Category(category) = table.scope {
                    print_table(category.label(), table);
                }
            }
        }
    }
    Ok(())
}

fn print_table(title: &str, table: &ImpactTable) {
    println!("=== {} ===", title.to_uppercase());
    println!(
        "  fees received 2023: ${:.0} | estimated: ${:.0} | delta: ${:.0}",
        table.totals.received_2023, table.totals.estimated_received, table.totals.delta
    );
    if table.rows.is_empty() {
        println!("  (no flows)");
    }
    for row in &table.rows {
        println!(
            "  {:<10} impact {:>14.0} ({:?}) | 2023 net {:>14.0} | est. net {:>14.0}",
            row.participant,
            row.estimated_impact,
            row.direction,
            row.net_position_2023,
            row.estimated_net_position,
        );
    }
    println!();
}

/// Every `--cap "<category>=<percent>"` pair on the command line.
fn parse_caps(args: &[String]) -> Result<Vec<(Category, f64)>> {
    args.windows(2)
        .filter(|w| w[0] == "--cap")
        .map(|w| {
            let (category, percent) = w[1]
                .split_once('=')
                .with_context(|| format!("--cap expects <category>=<percent>, got '{}'", w[1]))?;
            let percent: f64 = percent
                .trim()
                .parse()
                .with_context(|| format!("--cap percent is not a number: '{percent}'"))?;
            Ok((category.parse::<Category>()?, percent))
        })
        .collect()
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
