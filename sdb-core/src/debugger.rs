//! Main debugger API
//!
//! The [`Debugger`] struct is the entry point used by a command front end. It
//! owns the expression evaluator and the watchpoint pool; machine state is
//! passed in by reference on every call so the debugger never aliases the
//! simulator.

use crate::config::SdbConfig;
use crate::expr::Evaluator;
use crate::machine::{Machine, Memory};
use crate::types::{Result, SdbError, WatchpointId, Word, WORD_BYTES};
use crate::watchpoint::{Watchpoint, WatchpointPool};

/// The main debugger struct
pub struct Debugger {
    config: SdbConfig,
    evaluator: Evaluator,
    watchpoints: WatchpointPool,
}

/// A watchpoint whose value changed during a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchpointHit {
    pub id: WatchpointId,
    pub expr: String,
    pub old_value: Word,
    pub new_value: Word,
}

/// A watchpoint whose expression could not be evaluated during a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchpointFailure {
    pub id: WatchpointId,
    pub expr: String,
    pub error: SdbError,
}

/// Outcome of one pass over the active watchpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Watchpoints whose value changed, in active-list order
    pub hits: Vec<WatchpointHit>,
    /// Watchpoints that failed to evaluate (left untouched)
    pub failures: Vec<WatchpointFailure>,
}

impl CheckReport {
    /// True if any watchpoint changed value and execution should stop
    pub fn triggered(&self) -> bool {
        !self.hits.is_empty()
    }
}

/// One row of a watchpoint listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchpointStatus<'a> {
    pub id: WatchpointId,
    pub expr: &'a str,
    /// Freshly evaluated value, or why evaluation failed
    pub current: Result<Word>,
}

impl Debugger {
    /// Create a debugger with its own evaluator and watchpoint pool
    pub fn new(config: SdbConfig) -> Result<Self> {
        config.validate()?;
        let evaluator = Evaluator::new(&config)?;
        let watchpoints = WatchpointPool::new(config.max_watchpoints);

        log::debug!(
            "debugger initialized with {} watchpoint slots",
            config.max_watchpoints
        );
        Ok(Self {
            config,
            evaluator,
            watchpoints,
        })
    }

    pub fn config(&self) -> &SdbConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Read-only access to the watchpoint pool
    pub fn watchpoints(&self) -> &WatchpointPool {
        &self.watchpoints
    }

    /// Look up an active watchpoint
    pub fn watchpoint(&self, id: WatchpointId) -> Option<&Watchpoint> {
        self.watchpoints.get(id)
    }

    /// Evaluate an expression
    ///
    /// # Example
    /// ```
    /// use sdb_core::{Debugger, GuestMemory, Memory, RegisterFile, Riscv32Registers, SdbConfig};
    ///
    /// struct Target(Riscv32Registers, GuestMemory);
    /// impl RegisterFile for Target {
    ///     fn register(&self, name: &str) -> Option<u32> { self.0.register(name) }
    /// }
    /// impl Memory for Target {
    ///     fn read(&self, addr: u32, width: usize) -> u32 { self.1.read(addr, width) }
    /// }
    ///
    /// let debugger = Debugger::new(SdbConfig::default()).unwrap();
    /// let target = Target(Riscv32Registers::new(), GuestMemory::new(0, 16));
    /// assert_eq!(debugger.expr("(2 + 3) * 4", &target).unwrap(), 20);
    /// ```
    pub fn expr<M: Machine + ?Sized>(&self, text: &str, machine: &M) -> Result<Word> {
        self.evaluator.evaluate(text, machine)
    }

    /// Register a watchpoint on `text`
    ///
    /// The expression is evaluated first; nothing is allocated when it fails.
    ///
    /// # Returns
    /// * `Ok(id)` - the id of the slot holding the new watchpoint
    /// * `Err(InputTooLong)` - `text` does not fit the expression bound
    /// * `Err(ResourceExhausted)` - every slot is in use
    pub fn set_watchpoint<M: Machine + ?Sized>(
        &mut self,
        text: &str,
        machine: &M,
    ) -> Result<WatchpointId> {
        if text.len() >= self.config.max_expr_len {
            return Err(SdbError::InputTooLong {
                what: "expression",
                len: text.len(),
                max: self.config.max_expr_len - 1,
            });
        }

        let value = self.evaluator.evaluate(text, machine)?;
        let id = self.watchpoints.allocate()?;
        let wp = self
            .watchpoints
            .get_mut(id)
            .ok_or(SdbError::NotActive(id))?;
        wp.expr = text.to_string();
        wp.last_value = value;

        log::debug!(
            "Watchpoint {}: {} (initial value = 0x{:08x})",
            id,
            text,
            value
        );
        Ok(id)
    }

    /// Delete the active watchpoint `id`
    pub fn delete_watchpoint(&mut self, id: WatchpointId) -> Result<()> {
        if !self.watchpoints.find_active(id) {
            return Err(SdbError::NotFound(id));
        }
        self.watchpoints.release(id)?;
        log::debug!("Deleted watchpoint {}", id);
        Ok(())
    }

    /// Re-evaluate every enabled watchpoint and record value changes
    ///
    /// Evaluation failures are reported and skipped; the watchpoint stays
    /// active and is retried on the next check.
    pub fn check_watchpoints<M: Machine + ?Sized>(&mut self, machine: &M) -> CheckReport {
        let mut report = CheckReport::default();

        for id in self.watchpoints.active_ids() {
            let Some(wp) = self.watchpoints.get_mut(id) else {
                continue;
            };
            if !wp.enabled {
                continue;
            }

            match self.evaluator.evaluate(&wp.expr, machine) {
                Ok(value) if value != wp.last_value => {
                    log::debug!(
                        "Watchpoint {}: {} changed 0x{:08x} -> 0x{:08x}",
                        id,
                        wp.expr,
                        wp.last_value,
                        value
                    );
                    report.hits.push(WatchpointHit {
                        id,
                        expr: wp.expr.clone(),
                        old_value: wp.last_value,
                        new_value: value,
                    });
                    wp.last_value = value;
                }
                Ok(_) => {}
                Err(error) => {
                    log::warn!(
                        "Failed to evaluate watchpoint {} expression: {}: {}",
                        id,
                        wp.expr,
                        error
                    );
                    report.failures.push(WatchpointFailure {
                        id,
                        expr: wp.expr.clone(),
                        error,
                    });
                }
            }
        }

        report
    }

    /// Lazily list active watchpoints with their current values
    ///
    /// Each row is evaluated when the iterator reaches it; a failing row does
    /// not affect the others.
    pub fn list_watchpoints<'a, M: Machine + ?Sized>(
        &'a self,
        machine: &'a M,
    ) -> impl Iterator<Item = WatchpointStatus<'a>> + 'a {
        self.watchpoints.iter().map(move |wp| WatchpointStatus {
            id: wp.id,
            expr: &wp.expr,
            current: self.evaluator.evaluate(&wp.expr, machine),
        })
    }

    /// Read `count` consecutive machine words starting at the address `text`
    /// evaluates to
    ///
    /// Words are read lazily as the iterator advances, so `count` only bounds
    /// the walk. Addresses wrap at the machine word width.
    ///
    /// # Returns
    /// * `Ok(iter)` - yields `(address, value)` once per word
    pub fn examine<'a, M: Machine + ?Sized>(
        &self,
        count: usize,
        text: &str,
        machine: &'a M,
    ) -> Result<impl Iterator<Item = (Word, Word)> + 'a> {
        if count == 0 {
            return Err(SdbError::Parse("number of units must be positive".to_string()));
        }

        let start = self.evaluator.evaluate(text, machine)?;
        let step = WORD_BYTES as Word;
        let addrs = std::iter::successors(Some(start), move |addr| Some(addr.wrapping_add(step)));
        Ok(addrs
            .take(count)
            .map(move |addr| (addr, machine.read(addr, WORD_BYTES))))
    }
}
