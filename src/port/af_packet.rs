//! AF_PACKET port implementation

use super::{Mbuf, MbufPool, Port, PortId};
use crate::telemetry::PortStats;
use crate::{Error, Result};
use std::ffi::CString;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use tracing::{debug, warn};

/// Raw socket bound to one interface, polled without blocking
pub struct AfPacketPort {
    id: PortId,
    name: String,
    fd: RawFd,
    ifindex: i32,
    stats: PortStats,
}

impl AfPacketPort {
    /// Create a new AF_PACKET socket bound to the specified interface
    pub fn bind(id: PortId, ifname: &str) -> Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW | libc::SOCK_NONBLOCK,
                (libc::ETH_P_ALL as u16).to_be() as i32,
            )
        };

        if fd < 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        let ifindex = match Self::get_ifindex(fd, ifname) {
            Ok(ifindex) => ifindex,
            Err(e) => {
                unsafe { libc::close(fd) };
                return Err(e);
            }
        };

        // Bind to interface
        let sockaddr = libc::sockaddr_ll {
            sll_family: libc::AF_PACKET as u16,
            sll_protocol: (libc::ETH_P_ALL as u16).to_be(),
            sll_ifindex: ifindex,
            sll_hatype: 0,
            sll_pkttype: 0,
            sll_halen: 0,
            sll_addr: [0; 8],
        };

        let ret = unsafe {
            libc::bind(
                fd,
                &sockaddr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as u32,
            )
        };

        if ret < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(Error::Io(err));
        }

        if let Err(e) = Self::set_promisc(fd, ifindex, true) {
            unsafe { libc::close(fd) };
            return Err(e);
        }

        debug!(port = id, interface = ifname, ifindex, "AF_PACKET port bound");

        Ok(Self {
            id,
            name: ifname.to_string(),
            fd,
            ifindex,
            stats: PortStats::new(),
        })
    }

    fn ifreq_for(ifname: &str) -> Result<libc::ifreq> {
        let ifname_c = CString::new(ifname).map_err(|_| Error::InterfaceNotFound {
            name: ifname.to_string(),
        })?;

        let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
        let name_bytes = ifname_c.as_bytes_with_nul();
        if name_bytes.len() > ifr.ifr_name.len() {
            return Err(Error::InterfaceNotFound {
                name: ifname.to_string(),
            });
        }
        for (dst, src) in ifr.ifr_name.iter_mut().zip(name_bytes) {
            *dst = *src as libc::c_char;
        }
        Ok(ifr)
    }

    fn get_ifindex(fd: RawFd, ifname: &str) -> Result<i32> {
        let mut ifr = Self::ifreq_for(ifname)?;

        let ret = unsafe { libc::ioctl(fd, libc::SIOCGIFINDEX, &mut ifr) };
        if ret < 0 {
            return Err(Error::InterfaceNotFound {
                name: ifname.to_string(),
            });
        }

        Ok(unsafe { ifr.ifr_ifru.ifru_ifindex })
    }

    fn set_promisc(fd: RawFd, ifindex: i32, enable: bool) -> Result<()> {
        let mreq = libc::packet_mreq {
            mr_ifindex: ifindex,
            mr_type: libc::PACKET_MR_PROMISC as u16,
            mr_alen: 0,
            mr_address: [0; 8],
        };

        let optname = if enable {
            libc::PACKET_ADD_MEMBERSHIP
        } else {
            libc::PACKET_DROP_MEMBERSHIP
        };

        let ret = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_PACKET,
                optname,
                &mreq as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::packet_mreq>() as u32,
            )
        };

        if ret < 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        Ok(())
    }

    /// Receive one frame into `m`'s tailroom. `Ok(false)` when nothing is
    /// waiting.
    fn recv_one(&self, m: &mut Mbuf) -> io::Result<bool> {
        let room = m.tailroom_mut();
        let n = unsafe {
            libc::recv(
                self.fd,
                room.as_mut_ptr() as *mut libc::c_void,
                room.len(),
                libc::MSG_DONTWAIT | libc::MSG_TRUNC,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::WouldBlock => Ok(false),
                _ => Err(err),
            };
        }
        // MSG_TRUNC reports the real length; anything beyond the buffer is lost
        let n = n as usize;
        if n > room.len() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "frame truncated"));
        }
        m.append(n).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        Ok(true)
    }

    fn send_one(&self, m: &Mbuf) -> io::Result<bool> {
        let data = m.data();
        let n = unsafe {
            libc::send(
                self.fd,
                data.as_ptr() as *const libc::c_void,
                data.len(),
                libc::MSG_DONTWAIT,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::WouldBlock => Ok(false),
                _ => Err(err),
            };
        }
        Ok(true)
    }

    pub fn ifindex(&self) -> i32 {
        self.ifindex
    }
}

impl Port for AfPacketPort {
    fn id(&self) -> PortId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn recv_burst(&self, pool: &MbufPool, out: &mut Vec<Mbuf>, max: usize) -> usize {
        let mut received = 0;
        while received < max {
            let Ok(mut m) = pool.alloc() else {
                self.stats.record_rx_error();
                break;
            };
            match self.recv_one(&mut m) {
                Ok(true) => {
                    self.stats.record_rx(m.pkt_len());
                    out.push(m);
                    received += 1;
                }
                Ok(false) => break,
                Err(e) => {
                    self.stats.record_rx_error();
                    debug!(port = self.id, error = %e, "receive failed");
                    break;
                }
            }
        }
        received
    }

    fn send_burst(&self, frames: &mut Vec<Mbuf>) -> usize {
        let mut accepted = 0;
        for m in frames.iter() {
            match self.send_one(m) {
                Ok(true) => {
                    self.stats.record_tx(m.pkt_len());
                    accepted += 1;
                }
                Ok(false) => break,
                Err(e) => {
                    warn!(port = self.id, error = %e, "transmit failed");
                    break;
                }
            }
        }
        frames.drain(..accepted);
        accepted
    }

    fn link_up(&self) -> bool {
        let Ok(mut ifr) = Self::ifreq_for(&self.name) else {
            return false;
        };
        let ret = unsafe { libc::ioctl(self.fd, libc::SIOCGIFFLAGS, &mut ifr) };
        if ret < 0 {
            return false;
        }
        let flags = unsafe { ifr.ifr_ifru.ifru_flags } as libc::c_int;
        flags & libc::IFF_UP != 0 && flags & libc::IFF_RUNNING != 0
    }

    fn stats(&self) -> &PortStats {
        &self.stats
    }
}

impl AsRawFd for AfPacketPort {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for AfPacketPort {
    fn drop(&mut self) {
        let _ = Self::set_promisc(self.fd, self.ifindex, false);
        unsafe { libc::close(self.fd) };
    }
}
