//! x86_64 hosts: `struct user_regs_struct`, for 64-bit, x32 and i386 tracees.

use nix::sys::ptrace;

use crate::abi::{Architecture, Reg, X32_SYSCALL_BIT};
use crate::error::{Error, Result, ResultExt};
use crate::tracer::Pid;

pub type Registers = libc::user_regs_struct;

/// Code segment selectors of user mode, per `arch/x86/include/asm/segment.h`.
const USER_CS: u64 = 0x33;
const USER32_CS: u64 = 0x23;

pub(crate) fn registers(pid: Pid) -> Result<Registers> {
    ptrace::getregs(pid).died_if_esrch(pid)
}

pub(crate) fn set_registers(pid: Pid, regs: &Registers) -> Result<()> {
    ptrace::setregs(pid, *regs).died_if_esrch(pid)
}

/// The kernel keeps the registers of a 32-bit tracee zero-extended in the 64-bit set,
/// so the personality is told apart by `cs`, and x32 by its syscall number bit. Outside
/// syscall-stops `orig_rax` is `-1`, and an x32 tracee reads as x86_64.
pub(crate) fn architecture(regs: &Registers) -> Result<Architecture> {
    match regs.cs {
        USER_CS => {
            let nr = regs.orig_rax;

            if (nr as i64) >= 0 && nr & X32_SYSCALL_BIT != 0 {
                Ok(Architecture::X32)
            } else {
                Ok(Architecture::X86_64)
            }
        },
        USER32_CS => Ok(Architecture::I386),
        cs => Err(Error::Unsupported(format!("code segment selector {:#x}", cs))),
    }
}

pub(crate) fn get(regs: &Registers, reg: Reg) -> Option<u64> {
    let value = match reg {
        Reg::Rax => regs.rax,
        Reg::OrigRax => regs.orig_rax,
        Reg::Rbx => regs.rbx,
        Reg::Rcx => regs.rcx,
        Reg::Rdx => regs.rdx,
        Reg::Rsi => regs.rsi,
        Reg::Rdi => regs.rdi,
        Reg::Rbp => regs.rbp,
        Reg::R8 => regs.r8,
        Reg::R9 => regs.r9,
        Reg::R10 => regs.r10,
        Reg::Rsp | Reg::Sp => regs.rsp,
        Reg::Rip | Reg::Pc => regs.rip,
        Reg::Cs => regs.cs,
        Reg::X(_) | Reg::Pstate => return None,
    };

    Some(value)
}

pub(crate) fn set(regs: &mut Registers, reg: Reg, value: u64) -> bool {
    let slot = match reg {
        Reg::Rax => &mut regs.rax,
        Reg::OrigRax => &mut regs.orig_rax,
        Reg::Rbx => &mut regs.rbx,
        Reg::Rcx => &mut regs.rcx,
        Reg::Rdx => &mut regs.rdx,
        Reg::Rsi => &mut regs.rsi,
        Reg::Rdi => &mut regs.rdi,
        Reg::Rbp => &mut regs.rbp,
        Reg::R8 => &mut regs.r8,
        Reg::R9 => &mut regs.r9,
        Reg::R10 => &mut regs.r10,
        Reg::Rsp | Reg::Sp => &mut regs.rsp,
        Reg::Rip | Reg::Pc => &mut regs.rip,
        Reg::Cs | Reg::X(_) | Reg::Pstate => return false,
    };

    *slot = value;

    true
}

/// On x86, the syscall to run is taken from `orig_rax` when the tracee resumes.
pub(crate) fn set_syscall_number(pid: Pid, regs: &mut Registers, nr: u64) -> Result<()> {
    regs.orig_rax = nr;

    set_registers(pid, regs)
}
