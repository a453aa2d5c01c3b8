//! Simple Debugger CLI Application
//!
//! This is the command-line front end for the sdb-core library. It adds:
//! - A trace-replay target loaded from a TOML config file
//! - An interactive command loop (help, c, q, si, info, x, p, w, d)
//! - Batch and one-shot expression modes

use anyhow::{Context, Result};
use clap::Parser;
use sdb_core::Debugger;
use std::io::{self, Write};
use std::path::PathBuf;

mod config;
mod session;
mod target;

use config::AppConfig;
use session::{CommandError, Session};
use target::TraceTarget;

const PROMPT: &str = "(sdb) ";

/// Simple Debugger - inspect and watch a simulated RV32 machine
#[derive(Parser, Debug)]
#[command(name = "sdb")]
#[command(about = "Expression evaluator and watchpoint debugger for a simulated RV32 machine", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (debugger bounds and target state)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run the target to completion without a prompt, stopping on watchpoint triggers
    #[arg(short, long)]
    batch: bool,

    /// Evaluate an expression and exit (can be repeated)
    #[arg(short, long, value_name = "EXPR")]
    eval: Vec<String>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors (command output is still printed)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("Simple Debugger CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using debugger library v{}", sdb_core::VERSION);

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };

    let debugger = Debugger::new(config.debugger.clone())
        .context("Failed to create debugger")?;
    let target = TraceTarget::from_config(&config.target)
        .context("Failed to load target")?;

    let stdout = io::stdout();
    let mut session = Session::new(debugger, target, stdout.lock());

    if !args.eval.is_empty() {
        eval_mode(&mut session, &args.eval)
    } else if args.batch {
        batch_mode(&mut session)
    } else {
        session.run(io::stdin().lock(), PROMPT)?;
        Ok(())
    }
}

/// Evaluate each expression against the initial target state
fn eval_mode<W: Write>(session: &mut Session<W>, exprs: &[String]) -> Result<()> {
    let mut failed = 0;
    for text in exprs {
        match session.print_expr(text) {
            Ok(()) => {}
            Err(CommandError::Io(e)) => return Err(e.into()),
            Err(e) => {
                eprintln!("{}: {}", text, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} expression(s) failed", failed, exprs.len());
    }
    Ok(())
}

/// Run the whole trace, resuming after every watchpoint trigger
fn batch_mode<W: Write>(session: &mut Session<W>) -> Result<()> {
    while !session.target().is_halted() {
        session.execute(None)?;
    }
    log::info!(
        "Batch run finished after {} instruction(s)",
        session.target().executed()
    );
    Ok(())
}

/// Initialize logging based on verbosity flags
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
