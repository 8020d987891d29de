//! Static syscall tables: names by number per architecture, and argument descriptors.

use std::borrow::Cow;
use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::abi::{Architecture, MAX_ARGS};

/// How to interpret one syscall argument.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Arg {
    /// Plain integer.
    Int,

    /// File descriptor.
    Fd,

    /// Bit flags or mode.
    Flags,

    /// Pointer to a NUL-terminated string.
    Path,

    /// Pointer to a byte buffer, sized by another argument.
    Buffer,

    /// Pointer to a `struct sockaddr`, sized by the next argument.
    SockAddr,

    /// Pointer to a `struct sockaddr`, sized by a `socklen_t` the next argument points to.
    SockAddrOut,

    /// Pointer to some other structure.
    Struct,
}

/// Coarse shape of an argument.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Shape {
    Scalar,
    Struct,
    Buffer,
}

impl Arg {
    pub fn shape(self) -> Shape {
        match self {
            Arg::Int | Arg::Fd | Arg::Flags => Shape::Scalar,
            Arg::Path | Arg::Buffer => Shape::Buffer,
            Arg::SockAddr | Arg::SockAddrOut | Arg::Struct => Shape::Struct,
        }
    }

    pub fn is_sockaddr(self) -> bool {
        matches!(self, Arg::SockAddr | Arg::SockAddrOut)
    }
}

/// Name and argument descriptors of a syscall.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyscallInfo {
    pub arch: Architecture,
    pub number: i64,
    pub name: Cow<'static, str>,

    /// Argument descriptors, in order. Syscalls without a known signature are described
    /// as [`MAX_ARGS`] plain integers.
    pub args: &'static [Arg],
}

impl SyscallInfo {
    pub fn is_known(&self) -> bool {
        !self.name.starts_with(UNKNOWN_PREFIX)
    }
}

/// Return the name and argument descriptors of syscall `number` on `arch`.
pub fn syscall_info(arch: Architecture, number: i64) -> SyscallInfo {
    let name = name_for_number(arch, number);
    let args = signature(&name).unwrap_or(&RAW_ARGS);

    SyscallInfo { arch, number, name, args }
}

/// Return the name of syscall `number` on `arch`, or `unknown_syscall_N`.
pub fn name_for_number(arch: Architecture, number: i64) -> Cow<'static, str> {
    match arch.abi().table.name(number) {
        Some(name) => Cow::Borrowed(name),
        None => Cow::Owned(format!("{}{}", UNKNOWN_PREFIX, number)),
    }
}

/// Return the number of the syscall `name` on `arch`, if it exists there.
pub fn number_for_name(arch: Architecture, name: &str) -> Option<i64> {
    BY_NAME.get(&(arch, name)).copied()
}

/// Return the argument descriptors of the syscall `name`, if known.
///
/// Also knows the subcalls of `socketcall(2)`.
pub fn signature(name: &str) -> Option<&'static [Arg]> {
    SIGNATURES.get(name).copied()
}

/// Return the name of the `socketcall(2)` subcall `call`.
pub fn socket_subcall_name(call: u64) -> Option<&'static str> {
    SOCKET_SUBCALLS
        .get(call as usize)
        .copied()
        .filter(|name| !name.is_empty())
}

const UNKNOWN_PREFIX: &str = "unknown_syscall_";

static RAW_ARGS: [Arg; MAX_ARGS] = [Arg::Int; MAX_ARGS];

/// Syscall names of one architecture, as dense runs of consecutive numbers.
#[derive(Debug)]
pub(crate) struct SyscallTable {
    /// Pairs of first syscall number and the names from there on. Holes are `""`.
    ranges: &'static [(i64, &'static [&'static str])],
}

impl SyscallTable {
    pub(crate) fn name(&self, number: i64) -> Option<&'static str> {
        self.ranges.iter().find_map(|&(first, names)| {
            if number < first {
                return None;
            }

            names
                .get((number - first) as usize)
                .copied()
                .filter(|name| !name.is_empty())
        })
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (i64, &'static str)> {
        self.ranges.iter().flat_map(|&(first, names)| {
            names
                .iter()
                .enumerate()
                .filter(|(_, name)| !name.is_empty())
                .map(move |(i, &name)| (first + i as i64, name))
        })
    }
}

lazy_static! {
    static ref BY_NAME: HashMap<(Architecture, &'static str), i64> = {
        let mut map = HashMap::new();

        for &arch in Architecture::ALL {
            for (number, name) in arch.abi().table.entries() {
                map.entry((arch, name)).or_insert(number);
            }
        }

        map
    };

    static ref SIGNATURES: HashMap<&'static str, &'static [Arg]> = SIGNATURE_LIST
        .iter()
        .copied()
        .collect();
}

use self::Arg::*;

#[rustfmt::skip]
static SIGNATURE_LIST: &[(&str, &[Arg])] = &[
    // Sockets.
    ("socket", &[Int, Int, Int]),
    ("socketpair", &[Int, Int, Int, Struct]),
    ("bind", &[Fd, SockAddr, Int]),
    ("connect", &[Fd, SockAddr, Int]),
    ("listen", &[Fd, Int]),
    ("accept", &[Fd, SockAddrOut, Struct]),
    ("accept4", &[Fd, SockAddrOut, Struct, Flags]),
    ("getsockname", &[Fd, SockAddrOut, Struct]),
    ("getpeername", &[Fd, SockAddrOut, Struct]),
    ("send", &[Fd, Buffer, Int, Flags]),
    ("recv", &[Fd, Buffer, Int, Flags]),
    ("sendto", &[Fd, Buffer, Int, Flags, SockAddr, Int]),
    ("recvfrom", &[Fd, Buffer, Int, Flags, SockAddrOut, Struct]),
    ("sendmsg", &[Fd, Struct, Flags]),
    ("recvmsg", &[Fd, Struct, Flags]),
    ("sendmmsg", &[Fd, Struct, Int, Flags]),
    ("recvmmsg", &[Fd, Struct, Int, Flags, Struct]),
    ("shutdown", &[Fd, Int]),
    ("setsockopt", &[Fd, Int, Int, Buffer, Int]),
    ("getsockopt", &[Fd, Int, Int, Buffer, Struct]),
    ("socketcall", &[Int, Struct]),

    // Files and paths.
    ("read", &[Fd, Buffer, Int]),
    ("write", &[Fd, Buffer, Int]),
    ("pread64", &[Fd, Buffer, Int, Int]),
    ("pwrite64", &[Fd, Buffer, Int, Int]),
    ("open", &[Path, Flags, Flags]),
    ("openat", &[Fd, Path, Flags, Flags]),
    ("creat", &[Path, Flags]),
    ("close", &[Fd]),
    ("dup", &[Fd]),
    ("dup2", &[Fd, Fd]),
    ("dup3", &[Fd, Fd, Flags]),
    ("pipe", &[Struct]),
    ("pipe2", &[Struct, Flags]),
    ("lseek", &[Fd, Int, Int]),
    ("ioctl", &[Fd, Int, Int]),
    ("fcntl", &[Fd, Int, Int]),
    ("fcntl64", &[Fd, Int, Int]),
    ("stat", &[Path, Struct]),
    ("lstat", &[Path, Struct]),
    ("fstat", &[Fd, Struct]),
    ("stat64", &[Path, Struct]),
    ("lstat64", &[Path, Struct]),
    ("fstat64", &[Fd, Struct]),
    ("newfstatat", &[Fd, Path, Struct, Flags]),
    ("fstatat64", &[Fd, Path, Struct, Flags]),
    ("statx", &[Fd, Path, Flags, Flags, Struct]),
    ("statfs", &[Path, Struct]),
    ("access", &[Path, Flags]),
    ("faccessat", &[Fd, Path, Flags]),
    ("faccessat2", &[Fd, Path, Flags, Flags]),
    ("chdir", &[Path]),
    ("fchdir", &[Fd]),
    ("chroot", &[Path]),
    ("getcwd", &[Buffer, Int]),
    ("mkdir", &[Path, Flags]),
    ("mkdirat", &[Fd, Path, Flags]),
    ("rmdir", &[Path]),
    ("unlink", &[Path]),
    ("unlinkat", &[Fd, Path, Flags]),
    ("rename", &[Path, Path]),
    ("renameat", &[Fd, Path, Fd, Path]),
    ("renameat2", &[Fd, Path, Fd, Path, Flags]),
    ("link", &[Path, Path]),
    ("linkat", &[Fd, Path, Fd, Path, Flags]),
    ("symlink", &[Path, Path]),
    ("symlinkat", &[Path, Fd, Path]),
    ("readlink", &[Path, Buffer, Int]),
    ("readlinkat", &[Fd, Path, Buffer, Int]),
    ("chmod", &[Path, Flags]),
    ("fchmod", &[Fd, Flags]),
    ("fchmodat", &[Fd, Path, Flags]),
    ("chown", &[Path, Int, Int]),
    ("lchown", &[Path, Int, Int]),
    ("fchown", &[Fd, Int, Int]),
    ("fchownat", &[Fd, Path, Int, Int, Flags]),
    ("truncate", &[Path, Int]),
    ("ftruncate", &[Fd, Int]),
    ("mknod", &[Path, Flags, Int]),
    ("mknodat", &[Fd, Path, Flags, Int]),
    ("utimensat", &[Fd, Path, Struct, Flags]),
    ("mount", &[Path, Path, Path, Flags, Struct]),
    ("umount2", &[Path, Flags]),

    // Processes and memory.
    ("execve", &[Path, Struct, Struct]),
    ("execveat", &[Fd, Path, Struct, Struct, Flags]),
    ("fork", &[]),
    ("vfork", &[]),
    ("clone", &[Flags, Int, Struct, Struct, Int]),
    ("exit", &[Int]),
    ("exit_group", &[Int]),
    ("wait4", &[Int, Struct, Flags, Struct]),
    ("kill", &[Int, Int]),
    ("tkill", &[Int, Int]),
    ("tgkill", &[Int, Int, Int]),
    ("getpid", &[]),
    ("gettid", &[]),
    ("brk", &[Int]),
    ("mmap", &[Int, Int, Flags, Flags, Fd, Int]),
    ("mmap2", &[Int, Int, Flags, Flags, Fd, Int]),
    ("munmap", &[Int, Int]),
    ("mprotect", &[Int, Int, Flags]),
];

/// Subcalls of `socketcall(2)`, from `include/uapi/linux/net.h`.
static SOCKET_SUBCALLS: &[&str] = &[
    "", "socket", "bind", "connect", "listen", "accept", "getsockname", "getpeername",
    "socketpair", "send", "recv", "sendto", "recvfrom", "shutdown", "setsockopt",
    "getsockopt", "sendmsg", "recvmsg", "accept4", "recvmmsg", "sendmmsg",
];

// Syscalls numbered from 424 on are shared by all architectures.
#[rustfmt::skip]
const COMMON: &[&str] = &[
    /* 424 */ "pidfd_send_signal", "io_uring_setup", "io_uring_enter", "io_uring_register",
    "open_tree", "move_mount",
    /* 430 */ "fsopen", "fsconfig", "fsmount", "fspick", "pidfd_open", "clone3", "close_range",
    "openat2", "pidfd_getfd", "faccessat2",
    /* 440 */ "process_madvise", "epoll_pwait2", "mount_setattr", "quotactl_fd",
    "landlock_create_ruleset", "landlock_add_rule", "landlock_restrict_self", "memfd_secret",
    "process_mrelease", "futex_waitv",
    /* 450 */ "set_mempolicy_home_node", "cachestat", "fchmodat2", "map_shadow_stack",
    "futex_wake", "futex_wait", "futex_requeue", "statmount", "listmount", "lsm_get_self_attr",
    /* 460 */ "lsm_set_self_attr", "lsm_list_modules", "mseal",
];

#[rustfmt::skip]
const X86_64_NAMES: &[&str] = &[
    /* 0 */ "read", "write", "open", "close", "stat", "fstat", "lstat", "poll", "lseek", "mmap",
    /* 10 */ "mprotect", "munmap", "brk", "rt_sigaction", "rt_sigprocmask", "rt_sigreturn",
    "ioctl", "pread64", "pwrite64", "readv",
    /* 20 */ "writev", "access", "pipe", "select", "sched_yield", "mremap", "msync", "mincore",
    "madvise", "shmget",
    /* 30 */ "shmat", "shmctl", "dup", "dup2", "pause", "nanosleep", "getitimer", "alarm",
    "setitimer", "getpid",
    /* 40 */ "sendfile", "socket", "connect", "accept", "sendto", "recvfrom", "sendmsg",
    "recvmsg", "shutdown", "bind",
    /* 50 */ "listen", "getsockname", "getpeername", "socketpair", "setsockopt", "getsockopt",
    "clone", "fork", "vfork", "execve",
    /* 60 */ "exit", "wait4", "kill", "uname", "semget", "semop", "semctl", "shmdt", "msgget",
    "msgsnd",
    /* 70 */ "msgrcv", "msgctl", "fcntl", "flock", "fsync", "fdatasync", "truncate", "ftruncate",
    "getdents", "getcwd",
    /* 80 */ "chdir", "fchdir", "rename", "mkdir", "rmdir", "creat", "link", "unlink", "symlink",
    "readlink",
    /* 90 */ "chmod", "fchmod", "chown", "fchown", "lchown", "umask", "gettimeofday",
    "getrlimit", "getrusage", "sysinfo",
    /* 100 */ "times", "ptrace", "getuid", "syslog", "getgid", "setuid", "setgid", "geteuid",
    "getegid", "setpgid",
    /* 110 */ "getppid", "getpgrp", "setsid", "setreuid", "setregid", "getgroups", "setgroups",
    "setresuid", "getresuid", "setresgid",
    /* 120 */ "getresgid", "getpgid", "setfsuid", "setfsgid", "getsid", "capget", "capset",
    "rt_sigpending", "rt_sigtimedwait", "rt_sigqueueinfo",
    /* 130 */ "rt_sigsuspend", "sigaltstack", "utime", "mknod", "uselib", "personality",
    "ustat", "statfs", "fstatfs", "sysfs",
    /* 140 */ "getpriority", "setpriority", "sched_setparam", "sched_getparam",
    "sched_setscheduler", "sched_getscheduler", "sched_get_priority_max",
    "sched_get_priority_min", "sched_rr_get_interval", "mlock",
    /* 150 */ "munlock", "mlockall", "munlockall", "vhangup", "modify_ldt", "pivot_root",
    "_sysctl", "prctl", "arch_prctl", "adjtimex",
    /* 160 */ "setrlimit", "chroot", "sync", "acct", "settimeofday", "mount", "umount2",
    "swapon", "swapoff", "reboot",
    /* 170 */ "sethostname", "setdomainname", "iopl", "ioperm", "create_module", "init_module",
    "delete_module", "get_kernel_syms", "query_module", "quotactl",
    /* 180 */ "nfsservctl", "getpmsg", "putpmsg", "afs_syscall", "tuxcall", "security",
    "gettid", "readahead", "setxattr", "lsetxattr",
    /* 190 */ "fsetxattr", "getxattr", "lgetxattr", "fgetxattr", "listxattr", "llistxattr",
    "flistxattr", "removexattr", "lremovexattr", "fremovexattr",
    /* 200 */ "tkill", "time", "futex", "sched_setaffinity", "sched_getaffinity",
    "set_thread_area", "io_setup", "io_destroy", "io_getevents", "io_submit",
    /* 210 */ "io_cancel", "get_thread_area", "lookup_dcookie", "epoll_create", "epoll_ctl_old",
    "epoll_wait_old", "remap_file_pages", "getdents64", "set_tid_address", "restart_syscall",
    /* 220 */ "semtimedop", "fadvise64", "timer_create", "timer_settime", "timer_gettime",
    "timer_getoverrun", "timer_delete", "clock_settime", "clock_gettime", "clock_getres",
    /* 230 */ "clock_nanosleep", "exit_group", "epoll_wait", "epoll_ctl", "tgkill", "utimes",
    "vserver", "mbind", "set_mempolicy", "get_mempolicy",
    /* 240 */ "mq_open", "mq_unlink", "mq_timedsend", "mq_timedreceive", "mq_notify",
    "mq_getsetattr", "kexec_load", "waitid", "add_key", "request_key",
    /* 250 */ "keyctl", "ioprio_set", "ioprio_get", "inotify_init", "inotify_add_watch",
    "inotify_rm_watch", "migrate_pages", "openat", "mkdirat", "mknodat",
    /* 260 */ "fchownat", "futimesat", "newfstatat", "unlinkat", "renameat", "linkat",
    "symlinkat", "readlinkat", "fchmodat", "faccessat",
    /* 270 */ "pselect6", "ppoll", "unshare", "set_robust_list", "get_robust_list", "splice",
    "tee", "sync_file_range", "vmsplice", "move_pages",
    /* 280 */ "utimensat", "epoll_pwait", "signalfd", "timerfd_create", "eventfd", "fallocate",
    "timerfd_settime", "timerfd_gettime", "accept4", "signalfd4",
    /* 290 */ "eventfd2", "epoll_create1", "dup3", "pipe2", "inotify_init1", "preadv",
    "pwritev", "rt_tgsigqueueinfo", "perf_event_open", "recvmmsg",
    /* 300 */ "fanotify_init", "fanotify_mark", "prlimit64", "name_to_handle_at",
    "open_by_handle_at", "clock_adjtime", "syncfs", "sendmmsg", "setns", "getcpu",
    /* 310 */ "process_vm_readv", "process_vm_writev", "kcmp", "finit_module", "sched_setattr",
    "sched_getattr", "renameat2", "seccomp", "getrandom", "memfd_create",
    /* 320 */ "kexec_file_load", "bpf", "execveat", "userfaultfd", "membarrier", "mlock2",
    "copy_file_range", "preadv2", "pwritev2", "pkey_mprotect",
    /* 330 */ "pkey_alloc", "pkey_free", "statx", "io_pgetevents", "rseq", "uretprobe",
];

// x32 syscalls with a compat calling convention, numbered from 512 on.
#[rustfmt::skip]
const X32_NAMES: &[&str] = &[
    /* 512 */ "rt_sigaction", "rt_sigreturn", "ioctl", "readv", "writev", "recvfrom",
    "sendmsg", "recvmsg",
    /* 520 */ "execve", "ptrace", "rt_sigpending", "rt_sigtimedwait", "rt_sigqueueinfo",
    "sigaltstack", "timer_create", "mq_notify", "kexec_load", "waitid",
    /* 530 */ "set_robust_list", "get_robust_list", "vmsplice", "move_pages", "preadv",
    "pwritev", "rt_tgsigqueueinfo", "recvmmsg", "sendmmsg", "process_vm_readv",
    /* 540 */ "process_vm_writev", "setsockopt", "getsockopt", "io_setup", "io_submit",
    "execveat", "preadv2", "pwritev2",
];

#[rustfmt::skip]
const I386_NAMES: &[&str] = &[
    /* 0 */ "restart_syscall", "exit", "fork", "read", "write", "open", "close", "waitpid",
    "creat", "link",
    /* 10 */ "unlink", "execve", "chdir", "time", "mknod", "chmod", "lchown", "break", "oldstat",
    "lseek",
    /* 20 */ "getpid", "mount", "umount", "setuid", "getuid", "stime", "ptrace", "alarm",
    "oldfstat", "pause",
    /* 30 */ "utime", "stty", "gtty", "access", "nice", "ftime", "sync", "kill", "rename",
    "mkdir",
    /* 40 */ "rmdir", "dup", "pipe", "times", "prof", "brk", "setgid", "getgid", "signal",
    "geteuid",
    /* 50 */ "getegid", "acct", "umount2", "lock", "ioctl", "fcntl", "mpx", "setpgid", "ulimit",
    "oldolduname",
    /* 60 */ "umask", "chroot", "ustat", "dup2", "getppid", "getpgrp", "setsid", "sigaction",
    "sgetmask", "ssetmask",
    /* 70 */ "setreuid", "setregid", "sigsuspend", "sigpending", "sethostname", "setrlimit",
    "getrlimit", "getrusage", "gettimeofday", "settimeofday",
    /* 80 */ "getgroups", "setgroups", "select", "symlink", "oldlstat", "readlink", "uselib",
    "swapon", "reboot", "readdir",
    /* 90 */ "mmap", "munmap", "truncate", "ftruncate", "fchmod", "fchown", "getpriority",
    "setpriority", "profil", "statfs",
    /* 100 */ "fstatfs", "ioperm", "socketcall", "syslog", "setitimer", "getitimer", "stat",
    "lstat", "fstat", "olduname",
    /* 110 */ "iopl", "vhangup", "idle", "vm86old", "wait4", "swapoff", "sysinfo", "ipc",
    "fsync", "sigreturn",
    /* 120 */ "clone", "setdomainname", "uname", "modify_ldt", "adjtimex", "mprotect",
    "sigprocmask", "create_module", "init_module", "delete_module",
    /* 130 */ "get_kernel_syms", "quotactl", "getpgid", "fchdir", "bdflush", "sysfs",
    "personality", "afs_syscall", "setfsuid", "setfsgid",
    /* 140 */ "_llseek", "getdents", "_newselect", "flock", "msync", "readv", "writev",
    "getsid", "fdatasync", "_sysctl",
    /* 150 */ "mlock", "munlock", "mlockall", "munlockall", "sched_setparam", "sched_getparam",
    "sched_setscheduler", "sched_getscheduler", "sched_yield", "sched_get_priority_max",
    /* 160 */ "sched_get_priority_min", "sched_rr_get_interval", "nanosleep", "mremap",
    "setresuid", "getresuid", "vm86", "query_module", "poll", "nfsservctl",
    /* 170 */ "setresgid", "getresgid", "prctl", "rt_sigreturn", "rt_sigaction",
    "rt_sigprocmask", "rt_sigpending", "rt_sigtimedwait", "rt_sigqueueinfo", "rt_sigsuspend",
    /* 180 */ "pread64", "pwrite64", "chown", "getcwd", "capget", "capset", "sigaltstack",
    "sendfile", "getpmsg", "putpmsg",
    /* 190 */ "vfork", "ugetrlimit", "mmap2", "truncate64", "ftruncate64", "stat64", "lstat64",
    "fstat64", "lchown32", "getuid32",
    /* 200 */ "getgid32", "geteuid32", "getegid32", "setreuid32", "setregid32", "getgroups32",
    "setgroups32", "fchown32", "setresuid32", "getresuid32",
    /* 210 */ "setresgid32", "getresgid32", "chown32", "setuid32", "setgid32", "setfsuid32",
    "setfsgid32", "pivot_root", "mincore", "madvise",
    /* 220 */ "getdents64", "fcntl64", "", "", "gettid", "readahead", "setxattr", "lsetxattr",
    "fsetxattr", "getxattr",
    /* 230 */ "lgetxattr", "fgetxattr", "listxattr", "llistxattr", "flistxattr", "removexattr",
    "lremovexattr", "fremovexattr", "tkill", "sendfile64",
    /* 240 */ "futex", "sched_setaffinity", "sched_getaffinity", "set_thread_area",
    "get_thread_area", "io_setup", "io_destroy", "io_getevents", "io_submit", "io_cancel",
    /* 250 */ "fadvise64", "", "exit_group", "lookup_dcookie", "epoll_create", "epoll_ctl",
    "epoll_wait", "remap_file_pages", "set_tid_address", "timer_create",
    /* 260 */ "timer_settime", "timer_gettime", "timer_getoverrun", "timer_delete",
    "clock_settime", "clock_gettime", "clock_getres", "clock_nanosleep", "statfs64",
    "fstatfs64",
    /* 270 */ "tgkill", "utimes", "fadvise64_64", "vserver", "mbind", "get_mempolicy",
    "set_mempolicy", "mq_open", "mq_unlink", "mq_timedsend",
    /* 280 */ "mq_timedreceive", "mq_notify", "mq_getsetattr", "kexec_load", "waitid", "",
    "add_key", "request_key", "keyctl", "ioprio_set",
    /* 290 */ "ioprio_get", "inotify_init", "inotify_add_watch", "inotify_rm_watch",
    "migrate_pages", "openat", "mkdirat", "mknodat", "fchownat", "futimesat",
    /* 300 */ "fstatat64", "unlinkat", "renameat", "linkat", "symlinkat", "readlinkat",
    "fchmodat", "faccessat", "pselect6", "ppoll",
    /* 310 */ "unshare", "set_robust_list", "get_robust_list", "splice", "sync_file_range",
    "tee", "vmsplice", "move_pages", "getcpu", "epoll_pwait",
    /* 320 */ "utimensat", "signalfd", "timerfd_create", "eventfd", "fallocate",
    "timerfd_settime", "timerfd_gettime", "signalfd4", "eventfd2", "epoll_create1",
    /* 330 */ "dup3", "pipe2", "inotify_init1", "preadv", "pwritev", "rt_tgsigqueueinfo",
    "perf_event_open", "recvmmsg", "fanotify_init", "fanotify_mark",
    /* 340 */ "prlimit64", "name_to_handle_at", "open_by_handle_at", "clock_adjtime", "syncfs",
    "sendmmsg", "setns", "process_vm_readv", "process_vm_writev", "kcmp",
    /* 350 */ "finit_module", "sched_setattr", "sched_getattr", "renameat2", "seccomp",
    "getrandom", "memfd_create", "bpf", "execveat", "socket",
    /* 360 */ "socketpair", "bind", "connect", "listen", "accept4", "getsockopt", "setsockopt",
    "getsockname", "getpeername", "sendto",
    /* 370 */ "sendmsg", "recvfrom", "recvmsg", "shutdown", "userfaultfd", "membarrier",
    "mlock2", "copy_file_range", "preadv2", "pwritev2",
    /* 380 */ "pkey_mprotect", "pkey_alloc", "pkey_free", "statx", "arch_prctl",
    "io_pgetevents", "rseq", "", "", "",
    /* 390 */ "", "", "", "semget", "semctl", "shmget", "shmctl", "shmat", "shmdt", "msgget",
    /* 400 */ "msgsnd", "msgrcv", "msgctl", "clock_gettime64", "clock_settime64",
    "clock_adjtime64", "clock_getres_time64", "clock_nanosleep_time64", "timer_gettime64",
    "timer_settime64",
    /* 410 */ "timerfd_gettime64", "timerfd_settime64", "utimensat_time64", "pselect6_time64",
    "ppoll_time64", "", "io_pgetevents_time64", "recvmmsg_time64", "mq_timedsend_time64",
    "mq_timedreceive_time64",
    /* 420 */ "semtimedop_time64", "rt_sigtimedwait_time64", "futex_time64",
    "sched_rr_get_interval_time64",
];

// The generic table of `include/uapi/asm-generic/unistd.h`, as used by arm64.
#[rustfmt::skip]
const AARCH64_NAMES: &[&str] = &[
    /* 0 */ "io_setup", "io_destroy", "io_submit", "io_cancel", "io_getevents", "setxattr",
    "lsetxattr", "fsetxattr", "getxattr", "lgetxattr",
    /* 10 */ "fgetxattr", "listxattr", "llistxattr", "flistxattr", "removexattr",
    "lremovexattr", "fremovexattr", "getcwd", "lookup_dcookie", "eventfd2",
    /* 20 */ "epoll_create1", "epoll_ctl", "epoll_pwait", "dup", "dup3", "fcntl",
    "inotify_init1", "inotify_add_watch", "inotify_rm_watch", "ioctl",
    /* 30 */ "ioprio_set", "ioprio_get", "flock", "mknodat", "mkdirat", "unlinkat", "symlinkat",
    "linkat", "renameat", "umount2",
    /* 40 */ "mount", "pivot_root", "nfsservctl", "statfs", "fstatfs", "truncate", "ftruncate",
    "fallocate", "faccessat", "chdir",
    /* 50 */ "fchdir", "chroot", "fchmod", "fchmodat", "fchownat", "fchown", "openat", "close",
    "vhangup", "pipe2",
    /* 60 */ "quotactl", "getdents64", "lseek", "read", "write", "readv", "writev", "pread64",
    "pwrite64", "preadv",
    /* 70 */ "pwritev", "sendfile", "pselect6", "ppoll", "signalfd4", "vmsplice", "splice",
    "tee", "readlinkat", "newfstatat",
    /* 80 */ "fstat", "sync", "fsync", "fdatasync", "sync_file_range", "timerfd_create",
    "timerfd_settime", "timerfd_gettime", "utimensat", "acct",
    /* 90 */ "capget", "capset", "personality", "exit", "exit_group", "waitid",
    "set_tid_address", "unshare", "futex", "set_robust_list",
    /* 100 */ "get_robust_list", "nanosleep", "getitimer", "setitimer", "kexec_load",
    "init_module", "delete_module", "timer_create", "timer_gettime", "timer_getoverrun",
    /* 110 */ "timer_settime", "timer_delete", "clock_settime", "clock_gettime", "clock_getres",
    "clock_nanosleep", "syslog", "ptrace", "sched_setparam", "sched_setscheduler",
    /* 120 */ "sched_getscheduler", "sched_getparam", "sched_setaffinity", "sched_getaffinity",
    "sched_yield", "sched_get_priority_max", "sched_get_priority_min", "sched_rr_get_interval",
    "restart_syscall", "kill",
    /* 130 */ "tkill", "tgkill", "sigaltstack", "rt_sigsuspend", "rt_sigaction",
    "rt_sigprocmask", "rt_sigpending", "rt_sigtimedwait", "rt_sigqueueinfo", "rt_sigreturn",
    /* 140 */ "setpriority", "getpriority", "reboot", "setregid", "setgid", "setreuid", "setuid",
    "setresuid", "getresuid", "setresgid",
    /* 150 */ "getresgid", "setfsuid", "setfsgid", "times", "setpgid", "getpgid", "getsid",
    "setsid", "getgroups", "setgroups",
    /* 160 */ "uname", "sethostname", "setdomainname", "getrlimit", "setrlimit", "getrusage",
    "umask", "prctl", "getcpu", "gettimeofday",
    /* 170 */ "settimeofday", "adjtimex", "getpid", "getppid", "getuid", "geteuid", "getgid",
    "getegid", "gettid", "sysinfo",
    /* 180 */ "mq_open", "mq_unlink", "mq_timedsend", "mq_timedreceive", "mq_notify",
    "mq_getsetattr", "msgget", "msgctl", "msgrcv", "msgsnd",
    /* 190 */ "semget", "semctl", "semtimedop", "semop", "shmget", "shmctl", "shmat", "shmdt",
    "socket", "socketpair",
    /* 200 */ "bind", "listen", "accept", "connect", "getsockname", "getpeername", "sendto",
    "recvfrom", "setsockopt", "getsockopt",
    /* 210 */ "shutdown", "sendmsg", "recvmsg", "readahead", "brk", "munmap", "mremap",
    "add_key", "request_key", "keyctl",
    /* 220 */ "clone", "execve", "mmap", "fadvise64", "swapon", "swapoff", "mprotect", "msync",
    "mlock", "munlock",
    /* 230 */ "mlockall", "munlockall", "mincore", "madvise", "remap_file_pages", "mbind",
    "get_mempolicy", "set_mempolicy", "migrate_pages", "move_pages",
    /* 240 */ "rt_tgsigqueueinfo", "perf_event_open", "accept4", "recvmmsg", "", "", "", "",
    "", "",
    /* 250 */ "", "", "", "", "", "", "", "", "", "",
    /* 260 */ "wait4", "prlimit64", "fanotify_init", "fanotify_mark", "name_to_handle_at",
    "open_by_handle_at", "clock_adjtime", "syncfs", "setns", "sendmmsg",
    /* 270 */ "process_vm_readv", "process_vm_writev", "kcmp", "finit_module", "sched_setattr",
    "sched_getattr", "renameat2", "seccomp", "getrandom", "memfd_create",
    /* 280 */ "bpf", "execveat", "userfaultfd", "membarrier", "mlock2", "copy_file_range",
    "preadv2", "pwritev2", "pkey_mprotect", "pkey_alloc",
    /* 290 */ "pkey_free", "statx", "io_pgetevents", "rseq", "kexec_file_load",
];

// ARM EABI.
#[rustfmt::skip]
const ARM_NAMES: &[&str] = &[
    /* 0 */ "restart_syscall", "exit", "fork", "read", "write", "open", "close", "", "creat",
    "link",
    /* 10 */ "unlink", "execve", "chdir", "", "mknod", "chmod", "lchown", "", "", "lseek",
    /* 20 */ "getpid", "mount", "", "setuid", "getuid", "", "ptrace", "", "", "pause",
    /* 30 */ "", "", "", "access", "nice", "", "sync", "kill", "rename", "mkdir",
    /* 40 */ "rmdir", "dup", "pipe", "times", "", "brk", "setgid", "getgid", "", "geteuid",
    /* 50 */ "getegid", "acct", "umount2", "", "ioctl", "fcntl", "", "setpgid", "", "",
    /* 60 */ "umask", "chroot", "ustat", "dup2", "getppid", "getpgrp", "setsid", "sigaction",
    "", "",
    /* 70 */ "setreuid", "setregid", "sigsuspend", "sigpending", "sethostname", "setrlimit",
    "", "getrusage", "gettimeofday", "settimeofday",
    /* 80 */ "getgroups", "setgroups", "", "symlink", "", "readlink", "uselib", "swapon",
    "reboot", "",
    /* 90 */ "", "munmap", "truncate", "ftruncate", "fchmod", "fchown", "getpriority",
    "setpriority", "", "statfs",
    /* 100 */ "fstatfs", "", "", "syslog", "setitimer", "getitimer", "stat", "lstat", "fstat",
    "",
    /* 110 */ "", "vhangup", "", "", "wait4", "swapoff", "sysinfo", "", "fsync", "sigreturn",
    /* 120 */ "clone", "setdomainname", "uname", "", "adjtimex", "mprotect", "sigprocmask", "",
    "init_module", "delete_module",
    /* 130 */ "", "quotactl", "getpgid", "fchdir", "bdflush", "sysfs", "personality", "",
    "setfsuid", "setfsgid",
    /* 140 */ "_llseek", "getdents", "_newselect", "flock", "msync", "readv", "writev",
    "getsid", "fdatasync", "_sysctl",
    /* 150 */ "mlock", "munlock", "mlockall", "munlockall", "sched_setparam", "sched_getparam",
    "sched_setscheduler", "sched_getscheduler", "sched_yield", "sched_get_priority_max",
    /* 160 */ "sched_get_priority_min", "sched_rr_get_interval", "nanosleep", "mremap",
    "setresuid", "getresuid", "", "", "poll", "nfsservctl",
    /* 170 */ "setresgid", "getresgid", "prctl", "rt_sigreturn", "rt_sigaction",
    "rt_sigprocmask", "rt_sigpending", "rt_sigtimedwait", "rt_sigqueueinfo", "rt_sigsuspend",
    /* 180 */ "pread64", "pwrite64", "chown", "getcwd", "capget", "capset", "sigaltstack",
    "sendfile", "", "",
    /* 190 */ "vfork", "ugetrlimit", "mmap2", "truncate64", "ftruncate64", "stat64", "lstat64",
    "fstat64", "lchown32", "getuid32",
    /* 200 */ "getgid32", "geteuid32", "getegid32", "setreuid32", "setregid32", "getgroups32",
    "setgroups32", "fchown32", "setresuid32", "getresuid32",
    /* 210 */ "setresgid32", "getresgid32", "chown32", "setuid32", "setgid32", "setfsuid32",
    "setfsgid32", "getdents64", "pivot_root", "mincore",
    /* 220 */ "madvise", "fcntl64", "", "", "gettid", "readahead", "setxattr", "lsetxattr",
    "fsetxattr", "getxattr",
    /* 230 */ "lgetxattr", "fgetxattr", "listxattr", "llistxattr", "flistxattr", "removexattr",
    "lremovexattr", "fremovexattr", "tkill", "sendfile64",
    /* 240 */ "futex", "sched_setaffinity", "sched_getaffinity", "io_setup", "io_destroy",
    "io_getevents", "io_submit", "io_cancel", "exit_group", "lookup_dcookie",
    /* 250 */ "epoll_create", "epoll_ctl", "epoll_wait", "remap_file_pages", "", "",
    "set_tid_address", "timer_create", "timer_settime", "timer_gettime",
    /* 260 */ "timer_getoverrun", "timer_delete", "clock_settime", "clock_gettime",
    "clock_getres", "clock_nanosleep", "statfs64", "fstatfs64", "tgkill", "utimes",
    /* 270 */ "arm_fadvise64_64", "pciconfig_iobase", "pciconfig_read", "pciconfig_write",
    "mq_open", "mq_unlink", "mq_timedsend", "mq_timedreceive", "mq_notify", "mq_getsetattr",
    /* 280 */ "waitid", "socket", "bind", "connect", "listen", "accept", "getsockname",
    "getpeername", "socketpair", "send",
    /* 290 */ "sendto", "recv", "recvfrom", "shutdown", "setsockopt", "getsockopt", "sendmsg",
    "recvmsg", "semop", "semget",
    /* 300 */ "semctl", "msgsnd", "msgrcv", "msgget", "msgctl", "shmat", "shmdt", "shmget",
    "shmctl", "add_key",
    /* 310 */ "request_key", "keyctl", "semtimedop", "vserver", "ioprio_set", "ioprio_get",
    "inotify_init", "inotify_add_watch", "inotify_rm_watch", "mbind",
    /* 320 */ "get_mempolicy", "set_mempolicy", "openat", "mkdirat", "mknodat", "fchownat",
    "futimesat", "fstatat64", "unlinkat", "renameat",
    /* 330 */ "linkat", "symlinkat", "readlinkat", "fchmodat", "faccessat", "pselect6", "ppoll",
    "unshare", "set_robust_list", "get_robust_list",
    /* 340 */ "splice", "arm_sync_file_range", "tee", "vmsplice", "move_pages", "getcpu",
    "epoll_pwait", "kexec_load", "utimensat", "signalfd",
    /* 350 */ "timerfd_create", "eventfd", "fallocate", "timerfd_settime", "timerfd_gettime",
    "signalfd4", "eventfd2", "epoll_create1", "dup3", "pipe2",
    /* 360 */ "inotify_init1", "preadv", "pwritev", "rt_tgsigqueueinfo", "perf_event_open",
    "recvmmsg", "accept4", "fanotify_init", "fanotify_mark", "prlimit64",
    /* 370 */ "name_to_handle_at", "open_by_handle_at", "clock_adjtime", "syncfs", "sendmmsg",
    "setns", "process_vm_readv", "process_vm_writev", "kcmp", "finit_module",
    /* 380 */ "sched_setattr", "sched_getattr", "renameat2", "seccomp", "getrandom",
    "memfd_create", "bpf", "execveat", "userfaultfd", "membarrier",
    /* 390 */ "mlock2", "copy_file_range", "preadv2", "pwritev2", "pkey_mprotect", "pkey_alloc",
    "pkey_free", "statx", "rseq", "io_pgetevents",
    /* 400 */ "migrate_pages", "kexec_file_load", "", "clock_gettime64", "clock_settime64",
    "clock_adjtime64", "clock_getres_time64", "clock_nanosleep_time64", "timer_gettime64",
    "timer_settime64",
    /* 410 */ "timerfd_gettime64", "timerfd_settime64", "utimensat_time64", "pselect6_time64",
    "ppoll_time64", "", "io_pgetevents_time64", "recvmmsg_time64", "mq_timedsend_time64",
    "mq_timedreceive_time64",
    /* 420 */ "semtimedop_time64", "rt_sigtimedwait_time64", "futex_time64",
    "sched_rr_get_interval_time64",
];

// ARM private syscalls, from `__ARM_NR_BASE` (0x0f0000) on.
const ARM_PRIVATE_NAMES: &[&str] = &[
    "", "breakpoint", "cacheflush", "usr26", "usr32", "set_tls", "get_tls",
];

pub(crate) static X86_64: SyscallTable = SyscallTable {
    ranges: &[(0, X86_64_NAMES), (424, COMMON)],
};

pub(crate) static X32: SyscallTable = SyscallTable {
    ranges: &[(0, X86_64_NAMES), (424, COMMON), (512, X32_NAMES)],
};

pub(crate) static I386: SyscallTable = SyscallTable {
    ranges: &[(0, I386_NAMES), (424, COMMON)],
};

pub(crate) static AARCH64: SyscallTable = SyscallTable {
    ranges: &[(0, AARCH64_NAMES), (424, COMMON)],
};

pub(crate) static ARM: SyscallTable = SyscallTable {
    ranges: &[(0, ARM_NAMES), (424, COMMON), (0x0f_0000, ARM_PRIVATE_NAMES)],
};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_lengths() {
        assert_eq!(X86_64_NAMES.len(), 336);
        assert_eq!(X32_NAMES.len(), 36);
        assert_eq!(I386_NAMES.len(), 424);
        assert_eq!(AARCH64_NAMES.len(), 295);
        assert_eq!(ARM_NAMES.len(), 424);
        assert_eq!(COMMON.len(), 39);
    }

    #[test]
    fn test_well_known_numbers() {
        use Architecture::*;

        let cases: &[(Architecture, &str, i64)] = &[
            (X86_64, "read", 0),
            (X86_64, "connect", 42),
            (X86_64, "accept", 43),
            (X86_64, "execve", 59),
            (X86_64, "openat", 257),
            (X86_64, "rseq", 334),
            (X86_64, "clone3", 435),
            (X32, "connect", 42),
            (X32, "recvfrom", 45),
            (I386, "socketcall", 102),
            (I386, "connect", 362),
            (I386, "madvise", 219),
            (I386, "futex_time64", 422),
            (Aarch64, "openat", 56),
            (Aarch64, "connect", 203),
            (Aarch64, "wait4", 260),
            (Aarch64, "kexec_file_load", 294),
            (Arm, "connect", 283),
            (Arm, "getdents64", 217),
            (Arm, "madvise", 220),
            (Arm, "set_tls", 0x0f_0005),
        ];

        for &(arch, name, number) in cases {
            assert_eq!(name_for_number(arch, number), name, "{:?}", arch);
            assert_eq!(number_for_name(arch, name), Some(number), "{:?}", arch);
        }
    }

    #[test]
    fn test_unknown_numbers() {
        assert_eq!(name_for_number(Architecture::X86_64, 400), "unknown_syscall_400");
        assert_eq!(name_for_number(Architecture::Aarch64, 250), "unknown_syscall_250");
        assert_eq!(name_for_number(Architecture::I386, -1), "unknown_syscall_-1");
        assert_eq!(number_for_name(Architecture::X86_64, "socketcall"), None);
        assert_eq!(number_for_name(Architecture::Aarch64, "open"), None);

        let info = syscall_info(Architecture::X86_64, 9999);
        assert!(!info.is_known());
        assert_eq!(info.args.len(), MAX_ARGS);
        assert!(info.args.iter().all(|arg| arg.shape() == Shape::Scalar));
    }

    #[test]
    fn test_reverse_lookup_prefers_native_number() {
        // x32 has both a native-ABI and a compat entry for some syscalls.
        assert_eq!(number_for_name(Architecture::X32, "execve"), Some(59));
        assert_eq!(name_for_number(Architecture::X32, 520), "execve");
        assert_eq!(name_for_number(Architecture::X32, 547), "pwritev2");
    }

    #[test]
    fn test_signatures() {
        let info = syscall_info(Architecture::X86_64, 42);
        assert_eq!(info.name, "connect");
        assert_eq!(info.args, &[Arg::Fd, Arg::SockAddr, Arg::Int]);
        assert_eq!(info.args[1].shape(), Shape::Struct);

        let info = syscall_info(Architecture::Aarch64, 242);
        assert_eq!(info.name, "accept4");
        assert_eq!(info.args[1], Arg::SockAddrOut);

        let info = syscall_info(Architecture::Arm, 5);
        assert_eq!(info.name, "open");
        assert_eq!(info.args[0].shape(), Shape::Buffer);
    }

    #[test]
    fn test_socket_subcalls() {
        assert_eq!(socket_subcall_name(3), Some("connect"));
        assert_eq!(socket_subcall_name(18), Some("accept4"));
        assert_eq!(socket_subcall_name(0), None);
        assert_eq!(socket_subcall_name(21), None);

        for call in 1..=20 {
            let name = socket_subcall_name(call).unwrap();
            assert!(signature(name).is_some(), "{}", name);
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_host_libc_numbers() {
        let cases = &[
            (libc::SYS_socket, "socket"),
            (libc::SYS_connect, "connect"),
            (libc::SYS_accept4, "accept4"),
            (libc::SYS_openat, "openat"),
            (libc::SYS_exit_group, "exit_group"),
            (libc::SYS_statx, "statx"),
        ];

        for &(number, name) in cases {
            assert_eq!(name_for_number(Architecture::X86_64, number), name);
        }
    }

    #[cfg(target_arch = "aarch64")]
    #[test]
    fn test_host_libc_numbers() {
        let cases = &[
            (libc::SYS_socket, "socket"),
            (libc::SYS_connect, "connect"),
            (libc::SYS_accept4, "accept4"),
            (libc::SYS_openat, "openat"),
            (libc::SYS_exit_group, "exit_group"),
            (libc::SYS_statx, "statx"),
        ];

        for &(number, name) in cases {
            assert_eq!(name_for_number(Architecture::Aarch64, number), name);
        }
    }
}
