//! Word-granular access to the memory of a stopped tracee.

use std::cmp;

use nix::errno::Errno;
use nix::sys::ptrace::{self, AddressType};
use tracing::trace;

use crate::error::{Error, Result, ResultExt};
use crate::tracer::Tracer;

/// Size of the words transferred by `PTRACE_PEEKDATA` and `PTRACE_POKEDATA`.
const WORD: u64 = std::mem::size_of::<libc::c_long>() as u64;

type Word = [u8; WORD as usize];

impl Tracer {
    /// Read the word at `addr`, which need not be aligned.
    pub fn read_word(&self, addr: u64) -> Result<u64> {
        self.ensure_stopped()?;

        let word = self.peek(addr)?;

        Ok(u64::from_ne_bytes(word))
    }

    /// Write the word at `addr`, which need not be aligned.
    pub fn write_word(&mut self, addr: u64, word: u64) -> Result<()> {
        self.ensure_stopped()?;

        self.poke(addr, word.to_ne_bytes())
    }

    /// Read `len` bytes starting at `addr`.
    ///
    /// Fails with [`Error::InvalidAddress`] if no byte is readable, and with
    /// [`Error::ShortRead`] if the range crosses into unmapped memory.
    pub fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>> {
        self.ensure_stopped()?;

        let pid = self.pid();
        let mut data = Vec::with_capacity(len);

        if len == 0 {
            return Ok(data);
        }

        if addr.checked_add(len as u64).is_none() {
            return Err(Error::InvalidAddress { pid, addr });
        }

        let mut offset = (addr % WORD) as usize;
        let mut at = addr - offset as u64;

        while data.len() < len {
            let word = match self.peek(at) {
                Ok(word) => word,
                Err(Error::InvalidAddress { .. }) if !data.is_empty() => {
                    return Err(Error::ShortRead { addr, requested: len, read: data.len() });
                },
                Err(err) => return Err(err),
            };

            let take = cmp::min(word.len() - offset, len - data.len());
            data.extend_from_slice(&word[offset..offset + take]);

            offset = 0;
            at = at.wrapping_add(WORD);
        }

        trace!(pid = pid.as_raw(), addr, len, "read tracee memory");

        Ok(data)
    }

    /// Read a NUL-terminated string at `addr`, without the NUL.
    ///
    /// At most `max` bytes are read, including the terminator.
    pub fn read_cstring(&self, addr: u64, max: usize) -> Result<Vec<u8>> {
        self.ensure_stopped()?;

        let pid = self.pid();
        let mut data = Vec::new();

        let mut offset = (addr % WORD) as usize;
        let mut at = addr - offset as u64;

        while data.len() < max {
            let word = match self.peek(at) {
                Ok(word) => word,
                Err(Error::InvalidAddress { .. }) if !data.is_empty() => {
                    return Err(Error::ShortRead { addr, requested: max, read: data.len() });
                },
                Err(err) => return Err(err),
            };

            let take = cmp::min(word.len() - offset, max - data.len());

            for &byte in &word[offset..offset + take] {
                if byte == 0 {
                    trace!(pid = pid.as_raw(), addr, len = data.len(), "read tracee string");
                    return Ok(data);
                }

                data.push(byte);
            }

            offset = 0;
            at = match at.checked_add(WORD) {
                Some(at) => at,
                None => break,
            };
        }

        Err(Error::StringTooLong { addr, max })
    }

    /// Write `data` starting at `addr`.
    ///
    /// Partial words at either end are merged with the bytes already in the tracee.
    pub fn write_bytes(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        self.ensure_stopped()?;

        if data.is_empty() {
            return Ok(());
        }

        let pid = self.pid();

        if addr.checked_add(data.len() as u64).is_none() {
            return Err(Error::InvalidAddress { pid, addr });
        }

        let mut offset = (addr % WORD) as usize;
        let mut at = addr - offset as u64;
        let mut rest = data;

        while !rest.is_empty() {
            let take = cmp::min(WORD as usize - offset, rest.len());

            let mut word = if take < WORD as usize {
                self.peek(at)?
            } else {
                Word::default()
            };

            word[offset..offset + take].copy_from_slice(&rest[..take]);
            self.poke(at, word)?;

            rest = &rest[take..];
            offset = 0;
            at = at.wrapping_add(WORD);
        }

        trace!(pid = pid.as_raw(), addr, len = data.len(), "wrote tracee memory");

        Ok(())
    }

    fn peek(&self, addr: u64) -> Result<Word> {
        let pid = self.pid();

        let word = ptrace::read(pid, addr as AddressType).faulted_at(pid, addr)?;

        Ok((word as u64).to_ne_bytes())
    }

    fn poke(&self, addr: u64, word: Word) -> Result<()> {
        let pid = self.pid();
        let data = libc::c_long::from_ne_bytes(word);

        // SAFETY: `PTRACE_POKEDATA` takes the word by value, and writes only to the tracee.
        let res = unsafe {
            libc::ptrace(
                libc::PTRACE_POKEDATA,
                pid.as_raw(),
                addr as *mut libc::c_void,
                data as *mut libc::c_void,
            )
        };

        Errno::result(res).faulted_at(pid, addr)?;

        Ok(())
    }
}
