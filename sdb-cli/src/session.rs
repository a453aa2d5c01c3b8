//! Interactive debugger session
//!
//! Splits each input line into a command name and its arguments, dispatches
//! it, and drives the target when asked to run. Command errors are printed and
//! never end the session.

use crate::target::{StepOutcome, TraceTarget};
use sdb_core::{CheckReport, Debugger, SdbError};
use std::io::{self, BufRead, Write};

/// Whether the session keeps reading commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    Usage(&'static str),

    #[error("Invalid {what}: {value}")]
    InvalidArgument { what: &'static str, value: String },

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error(transparent)]
    Sdb(#[from] SdbError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Name and help text of every command
pub const COMMANDS: &[(&str, &str)] = &[
    ("help", "Display information about all supported commands"),
    ("c", "Continue the execution of the program"),
    ("q", "Exit the debugger"),
    ("si", "Step N instructions then pause, default N=1"),
    ("info", "Print program state: r(registers), w(watchpoints)"),
    ("x", "Examine memory: x N EXPR (N consecutive 4-byte units from EXPR address)"),
    ("p", "Print expression value: p EXPR (e.g., p $a0 + 1)"),
    ("w", "Set watchpoint: w EXPR (stop when EXPR changes)"),
    ("d", "Delete watchpoint: d N (delete watchpoint number N)"),
];

pub struct Session<W: Write> {
    debugger: Debugger,
    target: TraceTarget,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(debugger: Debugger, target: TraceTarget, out: W) -> Self {
        Self {
            debugger,
            target,
            out,
        }
    }

    pub fn debugger(&self) -> &Debugger {
        &self.debugger
    }

    pub fn target(&self) -> &TraceTarget {
        &self.target
    }

    /// Read commands until end of input or `q`
    pub fn run<R: BufRead>(&mut self, input: R, prompt: &str) -> io::Result<()> {
        let mut lines = input.lines();
        loop {
            write!(self.out, "{}", prompt)?;
            self.out.flush()?;

            let Some(line) = lines.next() else {
                writeln!(self.out)?;
                return Ok(());
            };
            if self.execute_line(&line?)? == Control::Quit {
                return Ok(());
            }
        }
    }

    /// Execute one command line, printing any command error
    pub fn execute_line(&mut self, line: &str) -> io::Result<Control> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Control::Continue);
        }

        let (cmd, args) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };

        match self.dispatch(cmd, args) {
            Ok(control) => Ok(control),
            Err(CommandError::Io(e)) => Err(e),
            Err(e) => {
                writeln!(self.out, "{}", e)?;
                Ok(Control::Continue)
            }
        }
    }

    fn dispatch(&mut self, cmd: &str, args: &str) -> Result<Control, CommandError> {
        log::debug!("command '{}' args '{}'", cmd, args);
        match cmd {
            "help" => self.cmd_help(args)?,
            "c" => self.cmd_continue()?,
            "q" => return Ok(Control::Quit),
            "si" => self.cmd_step(args)?,
            "info" => self.cmd_info(args)?,
            "x" => self.cmd_examine(args)?,
            "p" => self.print_expr(args)?,
            "w" => self.cmd_watch(args)?,
            "d" => self.cmd_delete(args)?,
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        }
        Ok(Control::Continue)
    }

    fn cmd_help(&mut self, args: &str) -> Result<(), CommandError> {
        let wanted = args.split_whitespace().next();
        match wanted {
            None => {
                for (name, description) in COMMANDS {
                    writeln!(self.out, "{} - {}", name, description)?;
                }
            }
            Some(arg) => {
                let (name, description) = COMMANDS
                    .iter()
                    .find(|(name, _)| *name == arg)
                    .ok_or_else(|| CommandError::UnknownCommand(arg.to_string()))?;
                writeln!(self.out, "{} - {}", name, description)?;
            }
        }
        Ok(())
    }

    fn cmd_continue(&mut self) -> Result<(), CommandError> {
        self.execute(None)
    }

    fn cmd_step(&mut self, args: &str) -> Result<(), CommandError> {
        // Anything that is not a positive count means a single step
        let n = args
            .split_whitespace()
            .next()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(1);
        writeln!(self.out, "Executing {} instruction(s)...", n)?;
        self.execute(Some(n))
    }

    fn cmd_info(&mut self, args: &str) -> Result<(), CommandError> {
        match args.chars().next() {
            Some('r') => write!(self.out, "{}", self.target.registers())?,
            Some('w') => self.print_watchpoints()?,
            Some(_) => {
                return Err(CommandError::InvalidArgument {
                    what: "info subcommand",
                    value: args.to_string(),
                })
            }
            None => {
                return Err(CommandError::Usage(
                    "'info' requires an argument (r for registers, w for watchpoints)",
                ))
            }
        }
        Ok(())
    }

    fn cmd_examine(&mut self, args: &str) -> Result<(), CommandError> {
        let (count, expr) = match args.split_once(char::is_whitespace) {
            Some((count, expr)) if !expr.trim().is_empty() => (count, expr.trim()),
            _ => return Err(CommandError::Usage("Usage: x N EXPR")),
        };
        let n = count
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| CommandError::InvalidArgument {
                what: "number of units",
                value: count.to_string(),
            })?;

        let mut words = self.debugger.examine(n, expr, &self.target)?.peekable();
        if let Some((start, _)) = words.peek() {
            writeln!(self.out, "Memory at 0x{:08x}:", start)?;
        }
        for (addr, value) in words {
            writeln!(self.out, "0x{:08x}: 0x{:08x}", addr, value)?;
        }
        Ok(())
    }

    /// Evaluate `args` and print its value in hex and decimal
    pub fn print_expr(&mut self, args: &str) -> Result<(), CommandError> {
        if args.is_empty() {
            return Err(CommandError::Usage("'p' requires an expression argument"));
        }
        let value = self.debugger.expr(args, &self.target)?;
        writeln!(self.out, "Expression value: 0x{:08x} ({})", value, value)?;
        Ok(())
    }

    fn cmd_watch(&mut self, args: &str) -> Result<(), CommandError> {
        if args.is_empty() {
            return Err(CommandError::Usage("'w' requires an expression argument"));
        }
        let id = self.debugger.set_watchpoint(args, &self.target)?;
        if let Some(wp) = self.debugger.watchpoint(id) {
            writeln!(
                self.out,
                "Watchpoint {}: {} (initial value = 0x{:08x})",
                wp.id, wp.expr, wp.last_value
            )?;
        }
        Ok(())
    }

    fn cmd_delete(&mut self, args: &str) -> Result<(), CommandError> {
        if args.is_empty() {
            return Err(CommandError::Usage("'d' requires a watchpoint number"));
        }
        let id = args.parse::<usize>().map_err(|_| CommandError::InvalidArgument {
            what: "watchpoint number",
            value: args.to_string(),
        })?;
        self.debugger.delete_watchpoint(id)?;
        writeln!(self.out, "Deleted watchpoint {}", id)?;
        Ok(())
    }

    fn print_watchpoints(&mut self) -> Result<(), CommandError> {
        let mut rows = self.debugger.list_watchpoints(&self.target).peekable();
        if rows.peek().is_none() {
            writeln!(self.out, "No watchpoints.")?;
            return Ok(());
        }

        writeln!(self.out, "Num    Type       Expr        Value")?;
        writeln!(self.out, "---    ----       ----        -----")?;
        for row in rows {
            match row.current {
                Ok(value) => writeln!(
                    self.out,
                    "{:<7}watchpoint  {:<10}  0x{:08x}",
                    row.id, row.expr, value
                )?,
                Err(_) => writeln!(
                    self.out,
                    "{:<7}watchpoint  {:<10}  <error>",
                    row.id, row.expr
                )?,
            }
        }
        Ok(())
    }

    /// Step the target `limit` times (or until it halts), checking watchpoints
    /// after every instruction and stopping at the first trigger
    pub fn execute(&mut self, limit: Option<u64>) -> Result<(), CommandError> {
        let mut remaining = limit;
        while remaining != Some(0) {
            match self.target.step()? {
                StepOutcome::Halted => {
                    writeln!(
                        self.out,
                        "Program halted after {} instruction(s)",
                        self.target.executed()
                    )?;
                    return Ok(());
                }
                StepOutcome::Executed => {}
            }
            remaining = remaining.map(|n| n - 1);

            let report = self.debugger.check_watchpoints(&self.target);
            self.print_report(&report)?;
            if report.triggered() {
                return Ok(());
            }
        }
        Ok(())
    }

    fn print_report(&mut self, report: &CheckReport) -> Result<(), CommandError> {
        for failure in &report.failures {
            writeln!(
                self.out,
                "Error: Failed to evaluate watchpoint {} expression: {}",
                failure.id, failure.expr
            )?;
        }
        for hit in &report.hits {
            writeln!(self.out, "Watchpoint {}: {}", hit.id, hit.expr)?;
            writeln!(self.out, "Old value = 0x{:08x}", hit.old_value)?;
            writeln!(self.out, "New value = 0x{:08x}", hit.new_value)?;
        }
        Ok(())
    }
}
