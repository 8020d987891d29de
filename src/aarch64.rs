//! aarch64 hosts: the `NT_PRSTATUS` register set, for native and 32-bit ARM tracees.

use std::mem::size_of;

use nix::errno::Errno;

use crate::abi::{Architecture, Reg};
use crate::error::{Error, Result, ResultExt};
use crate::tracer::Pid;

#[cfg(target_os = "android")]
const PTRACE_GETREGSET: i32 = 0x4204;

#[cfg(not(target_os = "android"))]
const PTRACE_GETREGSET: u32 = 0x4204;

#[cfg(target_os = "android")]
const PTRACE_SETREGSET: i32 = 0x4205;

#[cfg(not(target_os = "android"))]
const PTRACE_SETREGSET: u32 = 0x4205;

/// Defined in [`include/uapi/linux/elf.h`](https://android.googlesource.com/kernel/common/+/refs/heads/android-mainline/include/uapi/linux/elf.h).
const NT_PRSTATUS: i32 = 1;
const NT_ARM_SYSTEM_CALL: i32 = 0x404;

/// Number of 32-bit words in the register set of a compat ARM tracee:
/// `r0`..`r15`, `cpsr` and `orig_r0`.
const ARM_NREGS: usize = 18;

const ARM_SP: usize = 13;
const ARM_PC: usize = 15;
const ARM_CPSR: usize = 16;

/// Defined in [`arch/arm64/include/uapi/asm/ptrace.h`](https://android.googlesource.com/kernel/common/+/refs/heads/android-mainline/arch/arm64/include/uapi/asm/ptrace.h#88).
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct user_pt_regs {
    pub regs: [u64; 31],
    pub sp: u64,
    pub pc: u64,
    pub pstate: u64,
}

const NATIVE_LEN: usize = size_of::<user_pt_regs>();
const COMPAT_LEN: usize = ARM_NREGS * 4;

/// Register set of a stopped tracee. The kernel reports the layout matching the
/// tracee's personality.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Registers {
    Aarch64(user_pt_regs),
    Arm([u32; ARM_NREGS]),
}

impl Registers {
    fn from_bytes(buf: &[u8]) -> Result<Self> {
        match buf.len() {
            NATIVE_LEN => {
                let mut words = [0u64; NATIVE_LEN / 8];

                for (word, chunk) in words.iter_mut().zip(buf.chunks_exact(8)) {
                    let mut bytes = [0; 8];
                    bytes.copy_from_slice(chunk);
                    *word = u64::from_ne_bytes(bytes);
                }

                let mut regs = user_pt_regs::default();
                regs.regs.copy_from_slice(&words[..31]);
                regs.sp = words[31];
                regs.pc = words[32];
                regs.pstate = words[33];

                Ok(Registers::Aarch64(regs))
            },
            COMPAT_LEN => {
                let mut regs = [0u32; ARM_NREGS];

                for (word, chunk) in regs.iter_mut().zip(buf.chunks_exact(4)) {
                    let mut bytes = [0; 4];
                    bytes.copy_from_slice(chunk);
                    *word = u32::from_ne_bytes(bytes);
                }

                Ok(Registers::Arm(regs))
            },
            len => Err(Error::Unsupported(format!("register set of {} bytes", len))),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        match self {
            Registers::Aarch64(regs) => regs
                .regs
                .iter()
                .chain(&[regs.sp, regs.pc, regs.pstate])
                .flat_map(|word| word.to_ne_bytes())
                .collect(),
            Registers::Arm(regs) => regs
                .iter()
                .flat_map(|word| word.to_ne_bytes())
                .collect(),
        }
    }
}

pub(crate) fn registers(pid: Pid) -> Result<Registers> {
    let mut buf = [0u8; NATIVE_LEN];
    let mut rv = libc::iovec {
        iov_base: buf.as_mut_ptr() as *mut libc::c_void,
        iov_len: buf.len(),
    };

    // SAFETY: the kernel writes at most `rv.iov_len` bytes, and shrinks it to the size
    // of the register set it wrote.
    let res = unsafe {
        libc::ptrace(PTRACE_GETREGSET, pid.as_raw(), NT_PRSTATUS, &mut rv as *mut _ as *mut libc::c_void)
    };

    Errno::result(res).died_if_esrch(pid)?;

    Registers::from_bytes(&buf[..rv.iov_len])
}

pub(crate) fn set_registers(pid: Pid, regs: &Registers) -> Result<()> {
    let mut buf = regs.to_bytes();
    let mut rv = libc::iovec {
        iov_base: buf.as_mut_ptr() as *mut libc::c_void,
        iov_len: buf.len(),
    };

    let res = unsafe {
        libc::ptrace(PTRACE_SETREGSET, pid.as_raw(), NT_PRSTATUS, &mut rv as *mut _ as *mut libc::c_void)
    };

    Errno::result(res).died_if_esrch(pid)?;

    Ok(())
}

pub(crate) fn architecture(regs: &Registers) -> Result<Architecture> {
    match regs {
        Registers::Aarch64(_) => Ok(Architecture::Aarch64),
        Registers::Arm(_) => Ok(Architecture::Arm),
    }
}

pub(crate) fn get(regs: &Registers, reg: Reg) -> Option<u64> {
    match regs {
        Registers::Aarch64(regs) => match reg {
            Reg::X(n) if (n as usize) < regs.regs.len() => Some(regs.regs[n as usize]),
            Reg::Sp => Some(regs.sp),
            Reg::Pc => Some(regs.pc),
            Reg::Pstate => Some(regs.pstate),
            _ => None,
        },
        Registers::Arm(regs) => arm_index(reg).map(|i| regs[i] as u64),
    }
}

pub(crate) fn set(regs: &mut Registers, reg: Reg, value: u64) -> bool {
    match regs {
        Registers::Aarch64(regs) => {
            let slot = match reg {
                Reg::X(n) if (n as usize) < regs.regs.len() => &mut regs.regs[n as usize],
                Reg::Sp => &mut regs.sp,
                Reg::Pc => &mut regs.pc,
                Reg::Pstate => &mut regs.pstate,
                _ => return false,
            };

            *slot = value;
            true
        },
        Registers::Arm(regs) => match arm_index(reg) {
            Some(i) => {
                regs[i] = value as u32;
                true
            },
            None => false,
        },
    }
}

fn arm_index(reg: Reg) -> Option<usize> {
    match reg {
        Reg::X(n) if (n as usize) < 16 => Some(n as usize),
        Reg::Sp => Some(ARM_SP),
        Reg::Pc => Some(ARM_PC),
        Reg::Pstate => Some(ARM_CPSR),
        _ => None,
    }
}

/// The syscall number register is only read at syscall entry, so changing the number
/// goes through the dedicated `NT_ARM_SYSTEM_CALL` register set.
pub(crate) fn set_syscall_number(pid: Pid, _regs: &mut Registers, nr: u64) -> Result<()> {
    let mut nr = nr as i32;
    let mut rv = libc::iovec {
        iov_base: &mut nr as *mut i32 as *mut libc::c_void,
        iov_len: size_of::<i32>(),
    };

    let res = unsafe {
        libc::ptrace(PTRACE_SETREGSET, pid.as_raw(), NT_ARM_SYSTEM_CALL, &mut rv as *mut _ as *mut libc::c_void)
    };

    Errno::result(res).died_if_esrch(pid)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_layout() {
        let mut regs = user_pt_regs::default();
        regs.regs[8] = 203;
        regs.sp = 0x1000;
        regs.pc = 0x2000;

        let regs = Registers::Aarch64(regs);
        let parsed = Registers::from_bytes(&regs.to_bytes()).unwrap();

        assert_eq!(parsed, regs);
        assert_eq!(get(&parsed, Reg::X(8)), Some(203));
        assert_eq!(get(&parsed, Reg::Sp), Some(0x1000));
        assert_eq!(get(&parsed, Reg::X(31)), None);
        assert_eq!(architecture(&parsed).unwrap(), Architecture::Aarch64);
    }

    #[test]
    fn test_compat_layout() {
        let mut words = [0u32; ARM_NREGS];
        words[7] = 283;
        words[ARM_SP] = 0xbeef;

        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_ne_bytes()).collect();
        let mut regs = Registers::from_bytes(&bytes).unwrap();

        assert_eq!(architecture(&regs).unwrap(), Architecture::Arm);
        assert_eq!(get(&regs, Reg::X(7)), Some(283));
        assert_eq!(get(&regs, Reg::Sp), Some(0xbeef));

        assert!(set(&mut regs, Reg::X(0), u64::MAX));
        assert_eq!(get(&regs, Reg::X(0)), Some(0xffff_ffff));
        assert!(!set(&mut regs, Reg::X(16), 0));
    }

    #[test]
    fn test_unknown_layout() {
        assert!(Registers::from_bytes(&[0; 12]).is_err());
    }
}
