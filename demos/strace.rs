use anyhow::Result;
use pinktrace::{
    abi::errno_of,
    syscalls::{self, Arg},
    Command,
    EventStream,
    Pid,
    StopEvent,
    Tracer,
};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
struct Opt {
    /// Attach to a running process instead of spawning `argv`.
    #[structopt(short, long)]
    pid: Option<i32>,

    /// Maximum length of decoded string arguments.
    #[structopt(short = "s", long, default_value = "4096")]
    string_limit: usize,

    /// Also print signal and ptrace-event stops.
    #[structopt(short, long)]
    verbose: bool,

    argv: Vec<String>,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let tracer = match opt.pid {
        Some(pid) => Tracer::attach(Pid::from_raw(pid))?,
        None => {
            if opt.argv.is_empty() {
                anyhow::bail!("either --pid or a command is required");
            }

            Tracer::spawn(Command::new(opt.argv.clone())?)?
        },
    };

    let mut stream = EventStream::new(tracer);

    // Formatted call, printed once the syscall returns.
    let mut pending: Option<String> = None;

    while let Some(event) = stream.next_event()? {
        let tracer = stream.tracer();

        match event.stop {
            StopEvent::SyscallEntry => {
                if let Some(call) = pending.take() {
                    println!("[{}] {} = ?", event.pid, call);
                }

                pending = Some(format_call(tracer, &opt)?);
            },
            StopEvent::SyscallExit => {
                let call = match pending.take() {
                    Some(call) => call,
                    None => continue,
                };

                let ret = tracer.return_value()?;

                match errno_of(ret) {
                    Some(errno) => println!("[{}] {} = -1 {}", event.pid, call, errno),
                    None => {
                        let out = format_outputs(tracer)?;
                        println!("[{}] {} = {}{}", event.pid, call, ret, out);
                    },
                }
            },
            StopEvent::Exited(code) => {
                if let Some(call) = pending.take() {
                    println!("[{}] {} = ?", event.pid, call);
                }

                println!("[{}] +++ exited with {} +++", event.pid, code);
            },
            StopEvent::Killed { signal, .. } => {
                println!("[{}] +++ killed by {} +++", event.pid, signal);
            },
            stop => {
                if opt.verbose {
                    println!("[{}] --- {:?} ---", event.pid, stop);
                }
            },
        }
    }

    Ok(())
}

// Name and signature of the syscall at the current stop, resolving `socketcall(2)`.
fn signature(tracer: &Tracer) -> Result<(String, &'static [Arg])> {
    let name = match tracer.socket_subcall()? {
        Some(subcall) => subcall.to_owned(),
        None => tracer.syscall_info()?.name.into_owned(),
    };

    let args = syscalls::signature(&name).unwrap_or(&[Arg::Int; 6]);

    Ok((name, args))
}

fn format_call(tracer: &Tracer, opt: &Opt) -> Result<String> {
    let (name, args) = signature(tracer)?;

    let mut formatted = vec![];

    for (index, arg) in args.iter().enumerate() {
        let raw = tracer.socket_argument(index)?;

        let text = match arg {
            Arg::Fd => (raw as u32 as i32).to_string(),
            Arg::Int => raw.to_string(),
            Arg::Flags => format!("{:#x}", raw),
            Arg::Path => match tracer.decode_string(index, opt.string_limit) {
                Ok(Some(path)) => format!("{:?}", String::from_utf8_lossy(&path)),
                Ok(None) => "NULL".to_owned(),
                Err(_) => format!("{:#x}", raw),
            },
            Arg::SockAddr => match tracer.decode_address(index) {
                Ok(addr) => format!("{{{}}}", addr),
                Err(_) => format!("{:#x}", raw),
            },
            Arg::Buffer | Arg::SockAddrOut | Arg::Struct => format!("{:#x}", raw),
        };

        formatted.push(text);
    }

    Ok(format!("{}({})", name, formatted.join(", ")))
}

// Addresses written back by the kernel, as in `accept(2)`.
fn format_outputs(tracer: &Tracer) -> Result<String> {
    let (_, args) = signature(tracer)?;

    let mut out = String::new();

    for (index, arg) in args.iter().enumerate() {
        if *arg == Arg::SockAddrOut {
            if let Ok(addr) = tracer.decode_address(index) {
                out.push_str(&format!(" (addr = {})", addr));
            }
        }
    }

    Ok(out)
}
