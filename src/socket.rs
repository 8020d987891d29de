//! Decoding of syscall arguments: socket addresses, strings, and `socketcall(2)` arguments.

use std::borrow::Cow;
use std::cmp;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::unix::io::RawFd;

use tracing::trace;

use crate::abi::MAX_ARGS;
use crate::error::{Error, Result};
use crate::syscalls::{self, Arg};
use crate::tracer::Tracer;

/// Largest address read from a tracee, `sizeof(struct sockaddr_storage)`.
pub const SOCKADDR_MAX_LEN: usize = 128;

/// Offset of the family-specific part of every `struct sockaddr`.
const FAMILY_LEN: usize = 2;

const SOCKADDR_IN_MIN_LEN: usize = 8;

/// Size of a `struct sockaddr_in6` without `sin6_scope_id`, per RFC 2133.
const SOCKADDR_IN6_MIN_LEN: usize = 24;
const SOCKADDR_IN6_LEN: usize = 28;

const SOCKADDR_NL_LEN: usize = 12;

/// A socket address decoded from tracee memory.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Address {
    /// The address pointer was NULL.
    Null,

    /// `AF_UNIX`. An empty, non-abstract path is an unnamed socket.
    Unix {
        path: Vec<u8>,

        /// The name is in the abstract namespace. The leading NUL is not part of `path`.
        is_abstract: bool,
    },

    Inet {
        ip: Ipv4Addr,
        port: u16,
    },

    Inet6 {
        ip: Ipv6Addr,
        port: u16,
        flowinfo: u32,
        scope_id: u32,
    },

    Netlink {
        pid: u32,
        groups: u32,
    },

    /// Any other family, or a known family too short to decode.
    Unknown {
        family: u16,
        bytes: Vec<u8>,
    },
}

impl Address {
    /// Decode the raw bytes of a `struct sockaddr`.
    ///
    /// Bytes past [`SOCKADDR_MAX_LEN`] are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let bytes = &bytes[..cmp::min(bytes.len(), SOCKADDR_MAX_LEN)];

        if bytes.len() < FAMILY_LEN {
            return Address::Unknown {
                family: libc::AF_UNSPEC as u16,
                bytes: bytes.to_vec(),
            };
        }

        let family = u16::from_ne_bytes([bytes[0], bytes[1]]);

        let decoded = match family as i32 {
            libc::AF_UNIX => Some(decode_unix(&bytes[FAMILY_LEN..])),
            libc::AF_INET => decode_inet(bytes),
            libc::AF_INET6 => decode_inet6(bytes),
            libc::AF_NETLINK => decode_netlink(bytes),
            _ => None,
        };

        decoded.unwrap_or_else(|| Address::Unknown {
            family,
            bytes: bytes.to_vec(),
        })
    }

    /// Return the address family, or `None` for [`Address::Null`].
    pub fn family(&self) -> Option<u16> {
        let family = match self {
            Address::Null => return None,
            Address::Unix { .. } => libc::AF_UNIX,
            Address::Inet { .. } => libc::AF_INET,
            Address::Inet6 { .. } => libc::AF_INET6,
            Address::Netlink { .. } => libc::AF_NETLINK,
            Address::Unknown { family, .. } => return Some(*family),
        };

        Some(family as u16)
    }

    /// Convert an IP address to the standard library type.
    pub fn to_socket_addr(&self) -> Option<SocketAddr> {
        match *self {
            Address::Inet { ip, port } => Some(SocketAddrV4::new(ip, port).into()),
            Address::Inet6 { ip, port, flowinfo, scope_id } => {
                Some(SocketAddrV6::new(ip, port, flowinfo, scope_id).into())
            },
            _ => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Address::Null => write!(f, "NULL"),
            Address::Unix { path, is_abstract: true } => {
                write!(f, "unix:@{}", String::from_utf8_lossy(path))
            },
            Address::Unix { path, .. } if path.is_empty() => write!(f, "unix:(unnamed)"),
            Address::Unix { path, .. } => write!(f, "unix:{}", String::from_utf8_lossy(path)),
            Address::Inet { ip, port } => write!(f, "{}:{}", ip, port),
            Address::Inet6 { ip, port, .. } => write!(f, "[{}]:{}", ip, port),
            Address::Netlink { pid, groups } => {
                write!(f, "netlink:pid={},groups={:#x}", pid, groups)
            },
            Address::Unknown { family, bytes } => {
                write!(f, "family={},len={}", family, bytes.len())
            },
        }
    }
}

fn decode_unix(path: &[u8]) -> Address {
    match path.split_first() {
        // Autobind, or an unbound socket.
        None => Address::Unix {
            path: Vec::new(),
            is_abstract: false,
        },
        Some((0, name)) => Address::Unix {
            path: name.to_vec(),
            is_abstract: true,
        },
        Some(_) => {
            let end = path.iter().position(|&b| b == 0).unwrap_or(path.len());

            Address::Unix {
                path: path[..end].to_vec(),
                is_abstract: false,
            }
        },
    }
}

fn decode_inet(bytes: &[u8]) -> Option<Address> {
    if bytes.len() < SOCKADDR_IN_MIN_LEN {
        return None;
    }

    let port = u16::from_be_bytes([bytes[2], bytes[3]]);
    let ip = Ipv4Addr::new(bytes[4], bytes[5], bytes[6], bytes[7]);

    Some(Address::Inet { ip, port })
}

fn decode_inet6(bytes: &[u8]) -> Option<Address> {
    if bytes.len() < SOCKADDR_IN6_MIN_LEN {
        return None;
    }

    let port = u16::from_be_bytes([bytes[2], bytes[3]]);
    let flowinfo = u32::from_be_bytes(word(&bytes[4..8]));

    let mut octets = [0; 16];
    octets.copy_from_slice(&bytes[8..24]);
    let ip = Ipv6Addr::from(octets);

    let scope_id = if bytes.len() >= SOCKADDR_IN6_LEN {
        u32::from_ne_bytes(word(&bytes[24..28]))
    } else {
        0
    };

    Some(Address::Inet6 { ip, port, flowinfo, scope_id })
}

fn decode_netlink(bytes: &[u8]) -> Option<Address> {
    if bytes.len() < SOCKADDR_NL_LEN {
        return None;
    }

    // Bytes 2..4 are `nl_pad`.
    let pid = u32::from_ne_bytes(word(&bytes[4..8]));
    let groups = u32::from_ne_bytes(word(&bytes[8..12]));

    Some(Address::Netlink { pid, groups })
}

fn word(bytes: &[u8]) -> [u8; 4] {
    let mut word = [0; 4];
    word.copy_from_slice(bytes);
    word
}

/// Where the arguments of the current socket syscall live.
#[derive(Clone, Copy, Debug)]
enum SocketArgs {
    /// In registers.
    Registers,

    /// In an array of words in tracee memory, as passed to `socketcall(2)`.
    Memory { subcall: u64, addr: u64, word_size: usize },
}

impl Tracer {
    // Find out whether the syscall at the current stop multiplexes through `socketcall(2)`.
    fn socket_args(&self) -> Result<SocketArgs> {
        let arch = self.architecture()?;

        if !arch.has_socketcall() {
            return Ok(SocketArgs::Registers);
        }

        let number = self.syscall_number()?;

        if syscalls::number_for_name(arch, "socketcall") != Some(number) {
            return Ok(SocketArgs::Registers);
        }

        Ok(SocketArgs::Memory {
            subcall: self.argument(0)?,
            addr: self.argument(1)?,
            word_size: arch.word_size(),
        })
    }

    /// Return the name of the `socketcall(2)` subcall at the current stop, or `None` if
    /// the syscall is not `socketcall`.
    pub fn socket_subcall(&self) -> Result<Option<&'static str>> {
        match self.socket_args()? {
            SocketArgs::Registers => Ok(None),
            SocketArgs::Memory { subcall, .. } => match syscalls::socket_subcall_name(subcall) {
                Some(name) => Ok(Some(name)),
                None => Err(Error::Unsupported(format!("socketcall subcall {}", subcall))),
            },
        }
    }

    /// Return argument `index` of the socket syscall at the current stop.
    ///
    /// For `socketcall(2)`, this is the argument of the subcall, read from tracee memory.
    /// Otherwise it is the same as [`argument()`](Tracer::argument).
    pub fn socket_argument(&self, index: usize) -> Result<u64> {
        match self.socket_args()? {
            SocketArgs::Registers => self.argument(index),
            SocketArgs::Memory { addr, word_size, .. } => {
                if index >= MAX_ARGS {
                    return Err(Error::ArgumentIndexOutOfRange { index, max: MAX_ARGS - 1 });
                }

                let at = addr.wrapping_add((index * word_size) as u64);
                let bytes = self.read_bytes(at, word_size)?;

                let value = if word_size == 4 {
                    u32::from_ne_bytes(word(&bytes)) as u64
                } else {
                    let mut long = [0u8; 8];
                    long.copy_from_slice(&bytes);
                    u64::from_ne_bytes(long)
                };

                Ok(value)
            },
        }
    }

    // Argument descriptors of the socket syscall, or subcall, at the current stop.
    fn socket_signature(&self) -> Result<&'static [Arg]> {
        let name: Cow<'static, str> = match self.socket_subcall()? {
            Some(name) => name.into(),
            None => self.syscall_info()?.name,
        };

        Ok(syscalls::signature(&name).unwrap_or(&[]))
    }

    /// Decode the socket address in argument `index`.
    ///
    /// The length read is taken from the argument after it, as the syscall signature
    /// describes. It is at most [`SOCKADDR_MAX_LEN`].
    pub fn decode_address(&self, index: usize) -> Result<Address> {
        let args = self.socket_signature()?;
        let ptr = self.socket_argument(index)?;

        if ptr == 0 {
            return Ok(Address::Null);
        }

        let len = match args.get(index) {
            Some(Arg::SockAddr) => self.socket_argument(index + 1)? as usize,
            Some(Arg::SockAddrOut) => {
                let len_ptr = self.socket_argument(index + 1)?;

                if len_ptr == 0 {
                    SOCKADDR_MAX_LEN
                } else {
                    let bytes = self.read_bytes(len_ptr, std::mem::size_of::<libc::socklen_t>())?;
                    u32::from_ne_bytes(word(&bytes)) as usize
                }
            },
            _ => SOCKADDR_MAX_LEN,
        };
        let len = cmp::min(len, SOCKADDR_MAX_LEN);

        let bytes = self.read_bytes(ptr, len)?;
        let addr = Address::from_bytes(&bytes);

        trace!(pid = self.pid().as_raw(), index, len, %addr, "decoded socket address");

        Ok(addr)
    }

    /// Decode the socket address in argument `index`, along with the socket descriptor
    /// in argument 0.
    pub fn decode_address_and_fd(&self, index: usize) -> Result<(RawFd, Address)> {
        let fd = self.socket_argument(0)? as u32 as RawFd;
        let addr = self.decode_address(index)?;

        Ok((fd, addr))
    }

    /// Read the NUL-terminated string pointed to by argument `index`, without the NUL.
    ///
    /// Returns `None` for a NULL pointer.
    pub fn decode_string(&self, index: usize, max: usize) -> Result<Option<Vec<u8>>> {
        let ptr = self.argument(index)?;

        if ptr == 0 {
            return Ok(None);
        }

        self.read_cstring(ptr, max).map(Some)
    }
}
