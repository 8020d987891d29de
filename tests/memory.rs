use anyhow::Result;
use ntest::timeout;
use pinktrace::{Error, Tracer};
use pretty_assertions::assert_eq;

mod support;
use support::*;

// The forked tracee has its own copy of these, at the same addresses.
static MESSAGE: &[u8] = b"The quick brown fox jumps over the lazy dog.";
static GREETING: &[u8] = b"hello, tracee\0";
static mut SCRATCH: [u8; 32] = [0; 32];

fn addr_of(data: &[u8]) -> u64 {
    data.as_ptr() as u64
}

fn scratch_addr() -> u64 {
    unsafe { std::ptr::addr_of!(SCRATCH) as u64 }
}

#[test]
#[timeout(2000)]
fn test_read_bytes() -> Result<()> {
    let mut tracer = Tracer::fork(|| 0)?;
    start(&mut tracer)?;

    let base = addr_of(MESSAGE);

    assert_eq!(tracer.read_bytes(base, MESSAGE.len())?, MESSAGE);

    // Unaligned starts and odd lengths, within and across words.
    for offset in 0..9 {
        for len in [0, 1, 3, 7, 8, 9, 17] {
            let data = tracer.read_bytes(base + offset as u64, len)?;

            assert_eq!(data, &MESSAGE[offset..offset + len]);
        }
    }

    let word = tracer.read_word(base + 3)?;
    assert_eq!(&word.to_ne_bytes()[..], &MESSAGE[3..11]);

    kill(&mut tracer)?;

    Ok(())
}

#[test]
#[timeout(2000)]
fn test_read_cstring() -> Result<()> {
    let mut tracer = Tracer::fork(|| 0)?;
    start(&mut tracer)?;

    let base = addr_of(GREETING);

    assert_eq!(tracer.read_cstring(base, 4096)?, b"hello, tracee");
    assert_eq!(tracer.read_cstring(base + 7, 4096)?, b"tracee");

    // Exactly enough room for the string and its NUL.
    assert_eq!(tracer.read_cstring(base, GREETING.len())?, b"hello, tracee");

    let err = tracer.read_cstring(base, GREETING.len() - 1).unwrap_err();
    assert!(matches!(err, Error::StringTooLong { max: 13, .. }), "{:?}", err);

    kill(&mut tracer)?;

    Ok(())
}

#[test]
#[timeout(2000)]
fn test_invalid_address() -> Result<()> {
    let mut tracer = Tracer::fork(|| 0)?;
    start(&mut tracer)?;

    assert!(matches!(tracer.read_word(0), Err(Error::InvalidAddress { addr: 0, .. })));
    assert!(matches!(tracer.read_bytes(8, 4), Err(Error::InvalidAddress { .. })));
    assert!(matches!(tracer.read_cstring(0, 16), Err(Error::InvalidAddress { .. })));
    assert!(matches!(
        tracer.read_bytes(u64::MAX - 2, 8),
        Err(Error::InvalidAddress { .. })
    ));

    kill(&mut tracer)?;

    Ok(())
}

#[test]
#[timeout(2000)]
fn test_write_bytes() -> Result<()> {
    let mut tracer = Tracer::fork(|| 0)?;
    start(&mut tracer)?;

    let base = scratch_addr();

    tracer.write_bytes(base + 3, b"pinktrace")?;

    let data = tracer.read_bytes(base, 16)?;
    assert_eq!(&data[..], b"\0\0\0pinktrace\0\0\0\0");

    tracer.write_word(base + 8, u64::from_ne_bytes(*b"ABCDEFGH"))?;

    let data = tracer.read_bytes(base, 16)?;
    assert_eq!(&data[..], b"\0\0\0pinktABCDEFGH");

    // Our own copy is untouched.
    assert_eq!(unsafe { std::ptr::addr_of!(SCRATCH).read() }, [0; 32]);

    kill(&mut tracer)?;

    Ok(())
}

#[test]
#[timeout(2000)]
fn test_short_read() -> Result<()> {
    // Map two pages, unmap the second, and fill the last 16 bytes before the hole.
    let mut tracer = Tracer::fork(|| unsafe {
        let page = libc::sysconf(libc::_SC_PAGESIZE) as usize;

        let base = libc::mmap(
            std::ptr::null_mut(),
            2 * page,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        );

        if base == libc::MAP_FAILED {
            return 1;
        }

        let base = base as *mut u8;

        if libc::munmap(base.add(page) as *mut libc::c_void, page) != 0 {
            return 1;
        }

        let tail = base.add(page - 16);
        std::ptr::copy_nonoverlapping(b"0123456789abcdef".as_ptr(), tail, 16);

        // `getppid()` ignores its arguments, so this passes the address to the tracer.
        libc::syscall(libc::SYS_getppid, tail as u64);

        0
    })?;
    start(&mut tracer)?;

    run_to_entry(&mut tracer, "getppid")?;

    let tail = tracer.argument(0)?;

    assert_eq!(tracer.read_bytes(tail, 16)?, b"0123456789abcdef");

    let err = tracer.read_bytes(tail, 32).unwrap_err();
    assert!(
        matches!(err, Error::ShortRead { requested: 32, read: 16, .. }),
        "{:?}",
        err,
    );

    let err = tracer.read_bytes(tail + 4, 20).unwrap_err();
    assert!(
        matches!(err, Error::ShortRead { requested: 20, read: 12, .. }),
        "{:?}",
        err,
    );

    // No NUL before the hole.
    let err = tracer.read_cstring(tail, 64).unwrap_err();
    assert!(matches!(err, Error::ShortRead { read: 16, .. }), "{:?}", err);

    assert!(matches!(
        tracer.read_bytes(tail + 16, 8),
        Err(Error::InvalidAddress { .. })
    ));

    assert_eq!(finish(&mut tracer)?, 0);

    Ok(())
}
