#[macro_use]
pub mod error;

pub mod abi;
pub mod cmd;
pub mod events;
pub mod socket;
pub mod syscalls;
pub mod tracer;

mod memory;

#[cfg(target_arch = "x86_64")]
pub mod x86;

#[cfg(target_arch = "aarch64")]
pub mod aarch64;

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("only x86_64 and aarch64 hosts are supported");

pub use abi::{Architecture, Registers};
pub use cmd::Command;
pub use error::{Error, Result};
pub use events::{Event, EventStream};
pub use nix::sys::signal::Signal;
pub use socket::Address;
pub use syscalls::{Arg, SyscallInfo};
pub use tracer::{Boundary, DetachError, Options, Pid, PtraceEvent, Restart, State, StopEvent, Tracer};

pub const PACKAGE: &str = env!("CARGO_PKG_NAME");

pub const VERSION_MAJOR: u32 = parse_version(env!("CARGO_PKG_VERSION_MAJOR"));
pub const VERSION_MINOR: u32 = parse_version(env!("CARGO_PKG_VERSION_MINOR"));
pub const VERSION_MICRO: u32 = parse_version(env!("CARGO_PKG_VERSION_PATCH"));

/// Pre-release part of the version, without the leading `-`. Empty for releases.
pub const VERSION_SUFFIX: &str = env!("CARGO_PKG_VERSION_PRE");

/// Git commit the crate was built from, if `PINKTRACE_GIT_HEAD` was set at build time.
pub const GIT_HEAD: Option<&str> = option_env!("PINKTRACE_GIT_HEAD");

/// Return the full version string, e.g. `0.1.0` or `0.2.0-rc1`.
pub fn version() -> String {
    let mut version = format!("{}.{}.{}", VERSION_MAJOR, VERSION_MINOR, VERSION_MICRO);

    if !VERSION_SUFFIX.is_empty() {
        version.push('-');
        version.push_str(VERSION_SUFFIX);
    }

    version
}

const fn parse_version(digits: &str) -> u32 {
    let digits = digits.as_bytes();
    let mut value = 0;
    let mut i = 0;

    while i < digits.len() {
        value = value * 10 + (digits[i] - b'0') as u32;
        i += 1;
    }

    value
}
