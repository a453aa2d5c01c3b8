//! Simple Debugger Core Library
//!
//! The expression evaluator and watchpoint engine behind an instruction-set
//! simulator's interactive debugger.
//!
//! # Architecture
//!
//! This library is intentionally small and free of global state:
//! - Tokenizes expressions with an ordered pattern table
//! - Evaluates integer/register/memory expressions by recursive splitting at
//!   the main operator
//! - Manages a fixed pool of watchpoints and detects value changes on demand
//!
//! The library does NOT:
//! - Execute instructions
//! - Own the register file or the address space (see [`RegisterFile`] and
//!   [`Memory`])
//! - Read commands from a terminal
//!
//! All of that is in the application layer (sdb-cli).
//!
//! # Example Usage
//!
//! ```
//! use sdb_core::{Debugger, GuestMemory, Memory, RegisterFile, Riscv32Registers, SdbConfig};
//!
//! struct Cpu {
//!     regs: Riscv32Registers,
//!     mem: GuestMemory,
//! }
//!
//! impl RegisterFile for Cpu {
//!     fn register(&self, name: &str) -> Option<u32> {
//!         self.regs.register(name)
//!     }
//! }
//!
//! impl Memory for Cpu {
//!     fn read(&self, addr: u32, width: usize) -> u32 {
//!         self.mem.read(addr, width)
//!     }
//! }
//!
//! let mut cpu = Cpu {
//!     regs: Riscv32Registers::new(),
//!     mem: GuestMemory::new(0x8000_0000, 0x1000),
//! };
//! let mut debugger = Debugger::new(SdbConfig::default()).unwrap();
//!
//! let id = debugger.set_watchpoint("$a0 + 1", &cpu).unwrap();
//!
//! // ... the simulator executes an instruction ...
//! cpu.regs.set("a0", 41).unwrap();
//!
//! let report = debugger.check_watchpoints(&cpu);
//! assert!(report.triggered());
//! assert_eq!(report.hits[0].id, id);
//! assert_eq!(report.hits[0].new_value, 42);
//! ```

// Public modules
pub mod config;
pub mod debugger;
pub mod expr;
pub mod lexer;
pub mod machine;
pub mod types;
pub mod watchpoint;

// Re-export main types for convenience
pub use config::{SdbConfig, TokenOverflow, NR_WP};
pub use debugger::{CheckReport, Debugger, WatchpointFailure, WatchpointHit, WatchpointStatus};
pub use expr::Evaluator;
pub use lexer::{Lexer, Token, TokenKind};
pub use machine::{GuestMemory, Machine, Memory, RegisterFile, Riscv32Registers, GPR_NAMES};
pub use types::{ErrorKind, Result, SdbError, WatchpointId, Word, WORD_BYTES};
pub use watchpoint::{Watchpoint, WatchpointPool};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
