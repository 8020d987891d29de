//! Syscall calling conventions, and register access at syscall-stops.

use std::fmt;

use nix::errno::Errno;
use tracing::debug;

use crate::error::{Error, Result};
use crate::syscalls::{self, SyscallInfo, SyscallTable};
use crate::tracer::Tracer;

#[cfg(target_arch = "x86_64")]
use crate::x86 as host;

#[cfg(target_arch = "aarch64")]
use crate::aarch64 as host;

pub use host::Registers;

/// Number of syscall arguments passed in registers.
pub const MAX_ARGS: usize = 6;

/// Set in the syscall number of an x32 syscall on x86_64.
pub const X32_SYSCALL_BIT: u64 = 0x4000_0000;

/// Largest errno a syscall can return as `-errno`.
const MAX_ERRNO: i64 = 4095;

/// Execution personality of a tracee at a syscall-stop.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Architecture {
    X86_64,
    X32,
    I386,
    Aarch64,
    Arm,
}

impl Architecture {
    pub const ALL: &'static [Architecture] = &[
        Architecture::X86_64,
        Architecture::X32,
        Architecture::I386,
        Architecture::Aarch64,
        Architecture::Arm,
    ];

    /// Return the syscall calling convention of this architecture.
    pub fn abi(self) -> &'static Abi {
        match self {
            Architecture::X86_64 => &X86_64,
            Architecture::X32 => &X32,
            Architecture::I386 => &I386,
            Architecture::Aarch64 => &AARCH64,
            Architecture::Arm => &ARM,
        }
    }

    /// Size in bytes of a pointer or `long` in the tracee.
    pub fn word_size(self) -> usize {
        self.abi().word_size
    }

    pub fn name(self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::X32 => "x32",
            Architecture::I386 => "i386",
            Architecture::Aarch64 => "aarch64",
            Architecture::Arm => "arm",
        }
    }

    /// Return `true` if syscalls on this architecture may be multiplexed through
    /// `socketcall(2)`.
    pub fn has_socketcall(self) -> bool {
        self == Architecture::I386
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Name of a register, across the supported register sets.
///
/// Not every register exists in every register set. For the 32-bit ARM compat set,
/// `X(n)` names `r<n>`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reg {
    Rax,
    OrigRax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    R8,
    R9,
    R10,
    Rsp,
    Rip,
    Cs,
    X(u8),
    Sp,
    Pc,
    Pstate,
}

/// A syscall calling convention.
#[derive(Debug)]
pub struct Abi {
    pub arch: Architecture,

    /// Size of a pointer or `long`, which is also the unit of `socketcall(2)` arguments.
    pub word_size: usize,

    /// Width of the argument registers.
    pub register_size: usize,

    pub syscall_number: Reg,
    pub arguments: [Reg; MAX_ARGS],
    pub return_value: Reg,

    pub(crate) table: &'static SyscallTable,
}

impl Abi {
    fn truncate(&self, value: u64) -> u64 {
        if self.register_size == 4 {
            value & 0xffff_ffff
        } else {
            value
        }
    }

    fn sign_extend(&self, value: u64) -> i64 {
        if self.register_size == 4 {
            value as u32 as i32 as i64
        } else {
            value as i64
        }
    }
}

static X86_64: Abi = Abi {
    arch: Architecture::X86_64,
    word_size: 8,
    register_size: 8,
    syscall_number: Reg::OrigRax,
    arguments: [Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::R10, Reg::R8, Reg::R9],
    return_value: Reg::Rax,
    table: &syscalls::X86_64,
};

static X32: Abi = Abi {
    arch: Architecture::X32,
    word_size: 4,
    register_size: 8,
    syscall_number: Reg::OrigRax,
    arguments: [Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::R10, Reg::R8, Reg::R9],
    return_value: Reg::Rax,
    table: &syscalls::X32,
};

static I386: Abi = Abi {
    arch: Architecture::I386,
    word_size: 4,
    register_size: 4,
    syscall_number: Reg::OrigRax,
    arguments: [Reg::Rbx, Reg::Rcx, Reg::Rdx, Reg::Rsi, Reg::Rdi, Reg::Rbp],
    return_value: Reg::Rax,
    table: &syscalls::I386,
};

static AARCH64: Abi = Abi {
    arch: Architecture::Aarch64,
    word_size: 8,
    register_size: 8,
    syscall_number: Reg::X(8),
    arguments: [Reg::X(0), Reg::X(1), Reg::X(2), Reg::X(3), Reg::X(4), Reg::X(5)],
    return_value: Reg::X(0),
    table: &syscalls::AARCH64,
};

static ARM: Abi = Abi {
    arch: Architecture::Arm,
    word_size: 4,
    register_size: 4,
    syscall_number: Reg::X(7),
    arguments: [Reg::X(0), Reg::X(1), Reg::X(2), Reg::X(3), Reg::X(4), Reg::X(5)],
    return_value: Reg::X(0),
    table: &syscalls::ARM,
};

/// Interpret a syscall return value, returning the errno if it signals failure.
pub fn errno_of(value: i64) -> Option<Errno> {
    if (-MAX_ERRNO..0).contains(&value) {
        Some(Errno::from_i32(-value as i32))
    } else {
        None
    }
}

fn read_reg(regs: &Registers, reg: Reg) -> Result<u64> {
    match host::get(regs, reg) {
        Some(value) => Ok(value),
        None => Err(Error::Unsupported(format!("register {:?} not in register set", reg))),
    }
}

fn write_reg(regs: &mut Registers, reg: Reg, value: u64) -> Result<()> {
    if host::set(regs, reg, value) {
        Ok(())
    } else {
        Err(Error::Unsupported(format!("register {:?} not in register set", reg)))
    }
}

fn check_index(index: usize) -> Result<()> {
    if index < MAX_ARGS {
        Ok(())
    } else {
        Err(Error::ArgumentIndexOutOfRange { index, max: MAX_ARGS - 1 })
    }
}

impl Tracer {
    /// Read the raw register set of the stopped tracee.
    pub fn registers(&self) -> Result<Registers> {
        self.ensure_stopped()?;

        host::registers(self.pid())
    }

    /// Overwrite the register set of the stopped tracee.
    pub fn set_registers(&mut self, regs: &Registers) -> Result<()> {
        self.ensure_stopped()?;

        host::set_registers(self.pid(), regs)
    }

    /// Return the execution personality of the stopped tracee.
    ///
    /// On x86_64 hosts an x32 tracee is only recognized by the syscall number bit, so at
    /// stops other than syscall-stops (where `orig_rax` is `-1`) it is reported as
    /// [`Architecture::X86_64`].
    pub fn architecture(&self) -> Result<Architecture> {
        let regs = self.registers()?;

        host::architecture(&regs)
    }

    // Snapshot of the calling convention and registers.
    fn abi_registers(&self) -> Result<(&'static Abi, Registers)> {
        let regs = self.registers()?;
        let abi = host::architecture(&regs)?.abi();

        Ok((abi, regs))
    }

    /// Return the syscall number at the current syscall-stop.
    ///
    /// At stops that are not syscall-stops, this is whatever the register holds, commonly
    /// `-1`.
    pub fn syscall_number(&self) -> Result<i64> {
        let (abi, regs) = self.abi_registers()?;

        let mut raw = abi.truncate(read_reg(&regs, abi.syscall_number)?);

        if abi.arch == Architecture::X32 {
            raw &= !X32_SYSCALL_BIT;
        }

        Ok(abi.sign_extend(raw))
    }

    /// Return the syscall argument `index`, in `0..6`, truncated to the register width.
    pub fn argument(&self, index: usize) -> Result<u64> {
        check_index(index)?;

        let (abi, regs) = self.abi_registers()?;

        Ok(abi.truncate(read_reg(&regs, abi.arguments[index])?))
    }

    /// Return the syscall return value, sign-extended from the register width.
    ///
    /// Only meaningful at a syscall-exit-stop. See [`errno_of()`].
    pub fn return_value(&self) -> Result<i64> {
        let (abi, regs) = self.abi_registers()?;

        Ok(abi.sign_extend(read_reg(&regs, abi.return_value)?))
    }

    /// Return the name and argument descriptors of the syscall at the current stop.
    pub fn syscall_info(&self) -> Result<SyscallInfo> {
        let arch = self.architecture()?;
        let number = self.syscall_number()?;

        Ok(syscalls::syscall_info(arch, number))
    }

    /// Replace the syscall to be run, at a syscall-enter-stop.
    ///
    /// Setting `-1` skips the syscall, and its return value can then be set at the exit.
    pub fn set_syscall_number(&mut self, number: i64) -> Result<()> {
        let (abi, mut regs) = self.abi_registers()?;

        let mut raw = abi.truncate(number as u64);

        if abi.arch == Architecture::X32 && number >= 0 {
            raw |= X32_SYSCALL_BIT;
        }

        debug!(pid = self.pid().as_raw(), number, "setting syscall number");

        host::set_syscall_number(self.pid(), &mut regs, raw)
    }

    /// Overwrite the syscall argument `index` at a syscall-enter-stop.
    pub fn set_argument(&mut self, index: usize, value: u64) -> Result<()> {
        check_index(index)?;

        let (abi, mut regs) = self.abi_registers()?;

        write_reg(&mut regs, abi.arguments[index], abi.truncate(value))?;

        debug!(pid = self.pid().as_raw(), index, value, "setting syscall argument");

        host::set_registers(self.pid(), &regs)
    }

    /// Overwrite the syscall return value at a syscall-exit-stop.
    ///
    /// To fail the syscall with an errno, pass `-(errno as i64)`.
    pub fn set_return_value(&mut self, value: i64) -> Result<()> {
        let (abi, mut regs) = self.abi_registers()?;

        write_reg(&mut regs, abi.return_value, abi.truncate(value as u64))?;

        debug!(pid = self.pid().as_raw(), value, "setting syscall return value");

        host::set_registers(self.pid(), &regs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truncate_and_sign_extend() {
        let abi = Architecture::I386.abi();

        assert_eq!(abi.truncate(0xffff_ffff_ffff_fffe), 0xffff_fffe);
        assert_eq!(abi.sign_extend(0xffff_fffe), -2);
        assert_eq!(abi.sign_extend(0x7fff_ffff), i32::MAX as i64);

        let abi = Architecture::X86_64.abi();

        assert_eq!(abi.truncate(u64::MAX), u64::MAX);
        assert_eq!(abi.sign_extend(u64::MAX), -1);

        // x32 has 32-bit pointers but full-width argument registers.
        let abi = Architecture::X32.abi();

        assert_eq!(abi.word_size, 4);
        assert_eq!(abi.truncate(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_errno_of() {
        assert_eq!(errno_of(-(libc::ENOENT as i64)), Some(Errno::ENOENT));
        assert_eq!(errno_of(-1), Some(Errno::EPERM));
        assert_eq!(errno_of(0), None);
        assert_eq!(errno_of(3), None);
        assert_eq!(errno_of(-4096), None);
    }

    #[test]
    fn test_check_index() {
        assert!(check_index(0).is_ok());
        assert!(check_index(5).is_ok());
        assert!(matches!(
            check_index(6),
            Err(Error::ArgumentIndexOutOfRange { index: 6, max: 5 })
        ));
    }

    #[test]
    fn test_argument_registers() {
        assert_eq!(Architecture::X86_64.abi().arguments[3], Reg::R10);
        assert_eq!(Architecture::I386.abi().arguments[0], Reg::Rbx);
        assert_eq!(Architecture::Aarch64.abi().syscall_number, Reg::X(8));
        assert_eq!(Architecture::Arm.abi().syscall_number, Reg::X(7));
    }
}
