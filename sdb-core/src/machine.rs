//! Machine state interfaces
//!
//! The evaluator never owns CPU state. It reads registers and memory through
//! the [`RegisterFile`] and [`Memory`] traits, which a simulator implements.
//! [`Riscv32Registers`] and [`GuestMemory`] are plain implementations used by
//! the CLI's trace target and by tests.

use crate::types::{Result, SdbError, Word, WORD_BYTES};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Register lookup by name
pub trait RegisterFile {
    /// Resolve a register name (without the leading `$`), `"pc"` included
    ///
    /// Returns `None` for unknown names.
    fn register(&self, name: &str) -> Option<Word>;
}

/// Simulated address space
pub trait Memory {
    /// Read `width` bytes at `addr`. Reads never fault.
    fn read(&self, addr: Word, width: usize) -> Word;
}

/// Everything an expression can observe
pub trait Machine: RegisterFile + Memory {}

impl<T: RegisterFile + Memory + ?Sized> Machine for T {}

/// ABI names of the RISC-V general purpose registers, indexed by number
pub const GPR_NAMES: [&str; 32] = [
    "$0", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4", "a5",
    "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4", "t5",
    "t6",
];

/// RISC-V 32 register file: `pc` plus 32 general purpose registers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Riscv32Registers {
    pub pc: Word,
    gpr: [Word; 32],
}

impl Riscv32Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a register name to its GPR index
    ///
    /// Accepts `0` and `zero` for x0 as well as every ABI name.
    pub fn index_of(name: &str) -> Option<usize> {
        if name == "zero" {
            return Some(0);
        }
        GPR_NAMES
            .iter()
            .position(|&n| n.strip_prefix('$').unwrap_or(n) == name)
    }

    /// Value of GPR `idx`; x0 always reads 0
    pub fn gpr(&self, idx: usize) -> Word {
        if idx == 0 {
            0
        } else {
            self.gpr[idx]
        }
    }

    /// Write GPR `idx`; writes to x0 are ignored
    pub fn set_gpr(&mut self, idx: usize, value: Word) {
        if idx != 0 && idx < self.gpr.len() {
            self.gpr[idx] = value;
        }
    }

    pub fn set_pc(&mut self, value: Word) {
        self.pc = value;
    }

    /// Write a register by name (`pc` or any GPR name)
    pub fn set(&mut self, name: &str, value: Word) -> Result<()> {
        if name == "pc" {
            self.pc = value;
            return Ok(());
        }
        let idx = Self::index_of(name).ok_or_else(|| SdbError::UnknownRegister(name.to_string()))?;
        self.set_gpr(idx, value);
        Ok(())
    }
}

impl RegisterFile for Riscv32Registers {
    fn register(&self, name: &str) -> Option<Word> {
        if name == "pc" {
            return Some(self.pc);
        }
        Self::index_of(name).map(|idx| self.gpr(idx))
    }
}

impl fmt::Display for Riscv32Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pc: 0x{:08x}", self.pc)?;
        for (idx, name) in GPR_NAMES.iter().enumerate() {
            write!(f, "{:<3}: 0x{:08x}  ", name, self.gpr(idx))?;
            if (idx + 1) % 4 == 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Flat little-endian guest memory starting at `base`
///
/// Bytes outside the backing store read as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestMemory {
    base: Word,
    bytes: Vec<u8>,
}

impl GuestMemory {
    /// Zero-filled memory of `size` bytes at `base`
    pub fn new(base: Word, size: usize) -> Self {
        Self {
            base,
            bytes: vec![0; size],
        }
    }

    pub fn base(&self) -> Word {
        self.base
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    fn offset(&self, addr: Word, width: usize) -> Option<usize> {
        let offset = addr.checked_sub(self.base)? as usize;
        let end = offset.checked_add(width)?;
        (end <= self.bytes.len()).then_some(offset)
    }

    /// Copy `data` into memory at `addr`
    pub fn load(&mut self, addr: Word, data: &[u8]) -> Result<()> {
        let offset = self.offset(addr, data.len()).ok_or_else(|| {
            SdbError::InvalidConfig(format!(
                "{} bytes at 0x{:08x} do not fit in memory [0x{:08x}, +0x{:x})",
                data.len(),
                addr,
                self.base,
                self.bytes.len()
            ))
        })?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Store one machine word at `addr`
    pub fn write_word(&mut self, addr: Word, value: Word) -> Result<()> {
        let mut buf = [0u8; WORD_BYTES];
        LittleEndian::write_u32(&mut buf, value);
        self.load(addr, &buf)
    }
}

impl Memory for GuestMemory {
    fn read(&self, addr: Word, width: usize) -> Word {
        let Some(offset) = self.offset(addr, width) else {
            log::trace!("read of {} bytes at 0x{:08x} outside guest memory", width, addr);
            return 0;
        };
        let data = &self.bytes[offset..offset + width];
        match width {
            1 => data[0] as Word,
            2 => LittleEndian::read_u16(data) as Word,
            4 => LittleEndian::read_u32(data),
            _ => {
                log::warn!("unsupported memory read width {}", width);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_names() {
        let mut regs = Riscv32Registers::new();
        regs.set("a0", 5).unwrap();
        regs.set("s11", 0xdead).unwrap();
        regs.set_pc(0x8000_0000);

        assert_eq!(regs.register("a0"), Some(5));
        assert_eq!(regs.register("s11"), Some(0xdead));
        assert_eq!(regs.register("pc"), Some(0x8000_0000));
        assert_eq!(regs.register("nope"), None);
        assert!(regs.set("nope", 1).is_err());
    }

    #[test]
    fn test_zero_register_is_hardwired() {
        let mut regs = Riscv32Registers::new();
        regs.set_gpr(0, 42);
        regs.set("zero", 42).unwrap();
        assert_eq!(regs.register("0"), Some(0));
        assert_eq!(regs.register("zero"), Some(0));
        assert_eq!(Riscv32Registers::index_of("$0"), None);
    }

    #[test]
    fn test_register_dump() {
        let mut regs = Riscv32Registers::new();
        regs.set("ra", 0x10).unwrap();
        let dump = regs.to_string();
        assert!(dump.starts_with("pc: 0x00000000\n"));
        assert!(dump.contains("ra : 0x00000010"));
        assert_eq!(dump.lines().count(), 9);
    }

    #[test]
    fn test_guest_memory_little_endian() {
        let mut mem = GuestMemory::new(0x8000_0000, 16);
        mem.write_word(0x8000_0004, 0x1122_3344).unwrap();

        assert_eq!(mem.read(0x8000_0004, 4), 0x1122_3344);
        assert_eq!(mem.read(0x8000_0004, 2), 0x3344);
        assert_eq!(mem.read(0x8000_0004, 1), 0x44);
        assert_eq!(mem.read(0x8000_0000, 4), 0);
    }

    #[test]
    fn test_guest_memory_out_of_range_reads_zero() {
        let mem = GuestMemory::new(0x100, 8);
        assert_eq!(mem.read(0x0, 4), 0);
        assert_eq!(mem.read(0x106, 4), 0);
        assert_eq!(mem.read(0xffff_fffe, 4), 0);
    }

    #[test]
    fn test_guest_memory_load_bounds() {
        let mut mem = GuestMemory::new(0, 4);
        assert!(mem.load(0, &[1, 2, 3, 4]).is_ok());
        assert!(mem.load(2, &[1, 2, 3]).is_err());
        assert!(mem.write_word(4, 1).is_err());
    }
}
