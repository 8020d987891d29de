use anyhow::Result;
use nix::errno::Errno;
use ntest::timeout;
use pinktrace::{
    abi::errno_of,
    Boundary,
    Command,
    Error,
    State,
    EventStream,
    PtraceEvent,
    StopEvent,
    Tracer,
};
use pretty_assertions::assert_eq;

mod support;
use support::*;

#[test]
#[timeout(5000)]
fn test_entry_exit_alternate() -> Result<()> {
    let cmd = Command::new(vec!["/bin/true"])?;
    let tracer = Tracer::spawn(cmd)?;

    let mut stream = EventStream::new(tracer);
    let mut events = vec![];

    while let Some(event) = stream.next_event()? {
        eprintln!("{}: {:?}", event.pid, event.stop);
        events.push(event);
    }

    let mut in_syscall: Option<String> = None;

    for event in &events {
        match event.stop {
            StopEvent::SyscallEntry => {
                assert_eq!(in_syscall, None, "two entries without an exit");
                in_syscall = event.syscall.as_ref().map(|info| info.name.to_string());
            },
            StopEvent::SyscallExit => {
                let name = in_syscall.take().expect("exit without an entry");
                assert_eq!(event.syscall.as_ref().unwrap().name, name);
            },
            _ => {},
        }
    }

    let first = &events[0];
    assert_eq!(first.stop, StopEvent::SyscallEntry);
    assert_eq!(first.syscall.as_ref().unwrap().name, "execve");
    assert!(matches!(events[1].stop, StopEvent::Event(PtraceEvent::Exec { .. })));

    // `exit_group()` never returns.
    assert_eq!(in_syscall.as_deref(), Some("exit_group"));
    assert_eq!(events.last().unwrap().stop, StopEvent::Exited(0));

    // The initial `SIGSTOP` is not reported.
    assert!(events.iter().all(|e| !matches!(e.stop, StopEvent::Signaled(_))));

    assert!(stream.next_event()?.is_none());

    Ok(())
}

static PAYLOAD: &[u8] = b"payload";

#[test]
#[timeout(2000)]
fn test_arguments_and_return_value() -> Result<()> {
    let mut tracer = Tracer::fork(|| unsafe {
        libc::write(-1, PAYLOAD.as_ptr() as *const libc::c_void, PAYLOAD.len());
        0
    })?;
    start(&mut tracer)?;

    run_to_entry(&mut tracer, "write")?;

    let info = tracer.syscall_info()?;
    assert_eq!(info.arch, tracer.architecture()?);
    assert_eq!(info.args.len(), 3);

    assert_eq!(tracer.argument(0)? as u32 as i32, -1);
    assert_eq!(tracer.argument(1)?, PAYLOAD.as_ptr() as u64);
    assert_eq!(tracer.argument(2)?, PAYLOAD.len() as u64);
    assert_eq!(tracer.read_bytes(tracer.argument(1)?, PAYLOAD.len())?, PAYLOAD);

    assert!(matches!(
        tracer.argument(6),
        Err(pinktrace::Error::ArgumentIndexOutOfRange { index: 6, .. })
    ));

    run_to_exit(&mut tracer)?;

    let ret = tracer.return_value()?;
    assert_eq!(errno_of(ret), Some(Errno::EBADF));

    assert_eq!(finish(&mut tracer)?, 0);

    Ok(())
}

#[test]
#[timeout(2000)]
fn test_set_return_value() -> Result<()> {
    let mut tracer = Tracer::fork(|| unsafe { libc::syscall(libc::SYS_getppid) as i32 })?;
    start(&mut tracer)?;

    run_to_entry(&mut tracer, "getppid")?;
    run_to_exit(&mut tracer)?;

    assert_eq!(tracer.return_value()?, std::process::id() as i64);

    tracer.set_return_value(42)?;
    assert_eq!(tracer.return_value()?, 42);

    assert_eq!(finish(&mut tracer)?, 42);

    Ok(())
}

#[test]
#[timeout(2000)]
fn test_skip_syscall() -> Result<()> {
    let mut tracer = Tracer::fork(|| unsafe {
        let ret = libc::syscall(libc::SYS_getppid);

        if ret == -1 && *libc::__errno_location() == libc::EPERM {
            0
        } else {
            1
        }
    })?;
    start(&mut tracer)?;

    run_to_entry(&mut tracer, "getppid")?;

    // An invalid syscall number skips the syscall.
    tracer.set_syscall_number(-1)?;

    run_to_exit(&mut tracer)?;

    tracer.set_return_value(-(libc::EPERM as i64))?;

    assert_eq!(finish(&mut tracer)?, 0);

    Ok(())
}

#[test]
#[timeout(2000)]
fn test_protocol_desync() -> Result<()> {
    let mut tracer = Tracer::fork(|| {
        unsafe { libc::syscall(libc::SYS_getppid) };
        0
    })?;
    start(&mut tracer)?;

    run_to_entry(&mut tracer, "getppid")?;
    tracer.syscall(None)?;

    // A second controller for the same tracee, which has not seen the entry.
    let mut tracer = Tracer::new(tracer.pid());

    let err = tracer.wait().unwrap_err();
    assert!(
        matches!(err, Error::ProtocolDesync { expected: Boundary::Entry, found: Boundary::Exit, .. }),
        "{:?}",
        err,
    );

    // The kernel's view was adopted, so the trace goes on.
    assert_eq!(tracer.state(), State::StoppedAtExit);
    assert_eq!(tracer.syscall_info()?.name, "getppid");

    tracer.syscall(None)?;
    assert_eq!(tracer.wait()?, StopEvent::SyscallEntry);
    assert_eq!(tracer.syscall_info()?.name, "exit_group");

    assert_eq!(finish(&mut tracer)?, 0);

    Ok(())
}
