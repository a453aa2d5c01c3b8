//! Trace-replay target
//!
//! Stands in for a CPU: each step applies the next recorded set of register
//! and memory changes. The debugger sees it only through the register file and
//! memory traits.

use crate::config::{StepConfig, TargetConfig};
use sdb_core::{GuestMemory, Memory, RegisterFile, Result, Riscv32Registers, SdbError, Word};
use std::collections::VecDeque;

/// What happened when the target was asked to execute one instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Executed,
    /// The trace is exhausted
    Halted,
}

#[derive(Debug)]
pub struct TraceTarget {
    regs: Riscv32Registers,
    mem: GuestMemory,
    steps: VecDeque<StepConfig>,
    executed: u64,
}

impl TraceTarget {
    /// Build the initial machine state and validate every recorded step
    pub fn from_config(config: &TargetConfig) -> Result<Self> {
        let mut regs = Riscv32Registers::new();
        regs.set_pc(config.pc);
        for (name, value) in &config.registers {
            regs.set(name, *value)?;
        }

        let mut mem = GuestMemory::new(config.memory_base, config.memory_size);
        for word in &config.memory {
            mem.write_word(word.addr, word.value)?;
        }

        // Reject a bad trace up front rather than halfway through a run
        let mut scratch = mem.clone();
        let mut scratch_regs = regs.clone();
        for (idx, step) in config.steps.iter().enumerate() {
            apply_step(&mut scratch_regs, &mut scratch, step).map_err(|e| {
                SdbError::InvalidConfig(format!("trace step {}: {}", idx + 1, e))
            })?;
        }

        log::debug!(
            "trace target: {} bytes at 0x{:08x}, {} recorded steps",
            config.memory_size,
            config.memory_base,
            config.steps.len()
        );

        Ok(Self {
            regs,
            mem,
            steps: config.steps.iter().cloned().collect(),
            executed: 0,
        })
    }

    /// Execute one instruction
    pub fn step(&mut self) -> Result<StepOutcome> {
        let Some(step) = self.steps.pop_front() else {
            return Ok(StepOutcome::Halted);
        };
        apply_step(&mut self.regs, &mut self.mem, &step)?;
        self.executed += 1;
        log::trace!("step {}: pc = 0x{:08x}", self.executed, self.regs.pc);
        Ok(StepOutcome::Executed)
    }

    pub fn is_halted(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of instructions executed so far
    pub fn executed(&self) -> u64 {
        self.executed
    }

    pub fn registers(&self) -> &Riscv32Registers {
        &self.regs
    }
}

fn apply_step(regs: &mut Riscv32Registers, mem: &mut GuestMemory, step: &StepConfig) -> Result<()> {
    let next_pc = step.pc.unwrap_or_else(|| regs.pc.wrapping_add(4));
    for (name, value) in &step.registers {
        regs.set(name, *value)?;
    }
    for word in &step.memory {
        mem.write_word(word.addr, word.value)?;
    }
    regs.set_pc(next_pc);
    Ok(())
}

impl RegisterFile for TraceTarget {
    fn register(&self, name: &str) -> Option<Word> {
        self.regs.register(name)
    }
}

impl Memory for TraceTarget {
    fn read(&self, addr: Word, width: usize) -> Word {
        self.mem.read(addr, width)
    }
}
