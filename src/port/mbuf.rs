//! Frame buffers
//!
//! An [`Mbuf`] owns one frame plus reserved space in front of it
//! (headroom) so that headers can be prepended without reallocating. Every
//! prepend-style mutation is bounded by the headroom left in the buffer and
//! fails with [`Error::NoHeadroom`] once it is used up.
//!
//! [`MbufPool`] owns a fixed set of preallocated buffers. A buffer goes
//! back to its pool when dropped, from whichever thread drops it.

use crate::{Error, Result};
use std::fmt;
use crossbeam::queue::ArrayQueue;
use std::sync::Arc;

/// Headroom reserved in front of received frames
pub const DEFAULT_HEADROOM: usize = 128;
/// Space available for frame data after the headroom
pub const DEFAULT_DATAROOM: usize = 2048;
/// Default number of buffers in a pool
pub const DEFAULT_POOL_SIZE: usize = 8192;

/// A single-segment frame buffer with header-length metadata.
pub struct Mbuf {
    buf: Box<[u8]>,
    data_off: usize,
    data_len: usize,
    /// Ethernet header including VLAN tags and EtherType
    pub l2_len: u16,
    /// MPLS label stack pushed behind the Ethernet header
    pub mpls_len: u16,
    pub l3_len: u16,
    pub l4_len: u16,
    pool: Option<Arc<PoolShared>>,
}

impl Mbuf {
    /// Copy `data` into a fresh buffer with the default headroom.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::with_headroom(data, DEFAULT_HEADROOM)
    }

    pub fn with_headroom(data: &[u8], headroom: usize) -> Self {
        let mut buf = vec![0u8; headroom + data.len()].into_boxed_slice();
        buf[headroom..].copy_from_slice(data);
        Self {
            buf,
            data_off: headroom,
            data_len: data.len(),
            l2_len: 0,
            mpls_len: 0,
            l3_len: 0,
            l4_len: 0,
            pool: None,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.buf[self.data_off..self.data_off + self.data_len]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.data_off..self.data_off + self.data_len]
    }

    /// Total frame length. Buffers are single-segment, so this always
    /// equals [`Mbuf::data_len`].
    pub fn pkt_len(&self) -> usize {
        self.data_len
    }

    pub fn data_len(&self) -> usize {
        self.data_len
    }

    pub fn is_empty(&self) -> bool {
        self.data_len == 0
    }

    pub fn headroom(&self) -> usize {
        self.data_off
    }

    pub fn tailroom(&self) -> usize {
        self.buf.len() - self.data_off - self.data_len
    }

    /// Unused space after the frame data, for receiving into.
    pub fn tailroom_mut(&mut self) -> &mut [u8] {
        let end = self.data_off + self.data_len;
        &mut self.buf[end..]
    }

    /// Grow the frame into the tailroom by `len` bytes.
    pub fn append(&mut self, len: usize) -> Result<&mut [u8]> {
        if len > self.tailroom() {
            return Err(Error::InvalidPacket("frame exceeds buffer size"));
        }
        let start = self.data_off + self.data_len;
        self.data_len += len;
        Ok(&mut self.buf[start..start + len])
    }

    /// Move the start of the frame `len` bytes into the headroom and return
    /// the newly exposed bytes. Their content is unspecified.
    pub fn prepend(&mut self, len: usize) -> Result<&mut [u8]> {
        if len > self.data_off {
            return Err(Error::NoHeadroom {
                needed: len,
                available: self.data_off,
            });
        }
        self.data_off -= len;
        self.data_len += len;
        Ok(&mut self.buf[self.data_off..self.data_off + len])
    }

    /// Offset of the application payload once header lengths are set
    pub fn payload_offset(&self) -> usize {
        self.l2_len as usize + self.mpls_len as usize + self.l3_len as usize + self.l4_len as usize
    }

    /// Application payload; empty if the header lengths overrun the frame.
    pub fn payload(&self) -> &[u8] {
        self.data().get(self.payload_offset()..).unwrap_or(&[])
    }

    pub fn reset_header_lengths(&mut self) {
        self.l2_len = 0;
        self.mpls_len = 0;
        self.l3_len = 0;
        self.l4_len = 0;
    }

    fn copy_header_lengths(&mut self, other: &Mbuf) {
        self.l2_len = other.l2_len;
        self.mpls_len = other.mpls_len;
        self.l3_len = other.l3_len;
        self.l4_len = other.l4_len;
    }
}

impl Drop for Mbuf {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.give_back(std::mem::take(&mut self.buf));
        }
    }
}

impl fmt::Debug for Mbuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mbuf")
            .field("pkt_len", &self.data_len)
            .field("headroom", &self.data_off)
            .field("l2_len", &self.l2_len)
            .field("mpls_len", &self.mpls_len)
            .field("l3_len", &self.l3_len)
            .field("l4_len", &self.l4_len)
            .finish()
    }
}

struct PoolShared {
    capacity: usize,
    free: ArrayQueue<Box<[u8]>>,
    headroom: usize,
    dataroom: usize,
}

impl PoolShared {
    fn take(&self) -> Result<Box<[u8]>> {
        self.free.pop().ok_or(Error::PoolExhausted)
    }

    fn give_back(&self, buf: Box<[u8]>) {
        // Only buffers that came out of this queue are pushed back, so it
        // never overflows.
        let _ = self.free.push(buf);
    }
}

/// Bounded frame buffer allocator, shareable across cores.
///
/// Every buffer is allocated up front. `alloc` pops one from a lock-free
/// free list and dropping the [`Mbuf`] pushes it back, so the polling loop
/// never touches the heap.
#[derive(Clone)]
pub struct MbufPool {
    shared: Arc<PoolShared>,
}

impl MbufPool {
    pub fn new(capacity: usize, headroom: usize, dataroom: usize) -> Self {
        let free = ArrayQueue::new(capacity.max(1));
        for _ in 0..capacity {
            let _ = free.push(vec![0u8; headroom + dataroom].into_boxed_slice());
        }
        Self {
            shared: Arc::new(PoolShared {
                capacity,
                free,
                headroom,
                dataroom,
            }),
        }
    }

    /// Allocate an empty buffer; received data goes into its tailroom.
    pub fn alloc(&self) -> Result<Mbuf> {
        let buf = self.shared.take()?;
        Ok(Mbuf {
            buf,
            data_off: self.shared.headroom,
            data_len: 0,
            l2_len: 0,
            mpls_len: 0,
            l3_len: 0,
            l4_len: 0,
            pool: Some(self.shared.clone()),
        })
    }

    /// Allocate a buffer holding a copy of `data`.
    pub fn alloc_from(&self, data: &[u8]) -> Result<Mbuf> {
        if data.len() > self.shared.dataroom {
            return Err(Error::InvalidPacket("frame exceeds buffer size"));
        }
        let mut m = self.alloc()?;
        m.append(data.len())?.copy_from_slice(data);
        Ok(m)
    }

    /// Duplicate a frame, header lengths included, into a new buffer.
    ///
    /// A frame that has grown past the dataroom through pushes is placed
    /// further forward, eating into the copy's headroom.
    pub fn alloc_copy(&self, original: &Mbuf) -> Result<Mbuf> {
        let len = original.data_len();
        let size = self.shared.headroom + self.shared.dataroom;
        if len > size {
            return Err(Error::InvalidPacket("frame exceeds buffer size"));
        }
        let mut m = self.alloc()?;
        m.data_off = self.shared.headroom.min(size - len);
        m.append(len)?.copy_from_slice(original.data());
        m.copy_header_lengths(original);
        Ok(m)
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn in_use(&self) -> usize {
        self.shared.capacity - self.available()
    }

    pub fn available(&self) -> usize {
        self.shared.free.len()
    }
}

impl Default for MbufPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE, DEFAULT_HEADROOM, DEFAULT_DATAROOM)
    }
}

impl fmt::Debug for MbufPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MbufPool")
            .field("capacity", &self.shared.capacity)
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice() {
        let m = Mbuf::from_slice(&[1, 2, 3]);
        assert_eq!(m.data(), &[1, 2, 3]);
        assert_eq!(m.pkt_len(), 3);
        assert_eq!(m.headroom(), DEFAULT_HEADROOM);
        assert_eq!(m.tailroom(), 0);
    }

    #[test]
    fn test_prepend_consumes_headroom() {
        let mut m = Mbuf::with_headroom(&[0xaa, 0xbb], 4);
        m.prepend(4).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(m.data(), &[1, 2, 3, 4, 0xaa, 0xbb]);
        assert_eq!(m.headroom(), 0);
        assert_eq!(m.pkt_len(), 6);
    }

    #[test]
    fn test_prepend_without_headroom_fails() {
        let mut m = Mbuf::with_headroom(&[0xaa, 0xbb], 3);
        let err = m.prepend(4).unwrap_err();
        assert!(matches!(
            err,
            Error::NoHeadroom {
                needed: 4,
                available: 3
            }
        ));
        // Untouched on failure
        assert_eq!(m.data(), &[0xaa, 0xbb]);
        assert_eq!(m.headroom(), 3);
    }

    #[test]
    fn test_payload_follows_header_lengths() {
        let mut m = Mbuf::from_slice(&[0u8; 10]);
        m.data_mut()[8] = 0x42;
        m.l2_len = 4;
        m.l3_len = 2;
        m.l4_len = 2;
        assert_eq!(m.payload(), &[0x42, 0]);

        m.l4_len = 20;
        assert!(m.payload().is_empty());
    }

    #[test]
    fn test_pool_alloc_and_release() {
        let pool = MbufPool::new(2, 16, 64);
        let a = pool.alloc_from(&[1, 2, 3]).unwrap();
        let b = pool.alloc().unwrap();
        assert_eq!(pool.in_use(), 2);
        assert!(matches!(pool.alloc(), Err(Error::PoolExhausted)));

        drop(a);
        assert_eq!(pool.in_use(), 1);
        drop(b);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_pool_alloc_from_too_large() {
        let pool = MbufPool::new(2, 16, 4);
        assert!(pool.alloc_from(&[0u8; 5]).is_err());
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_alloc_copy_is_independent() {
        let pool = MbufPool::new(4, 16, 64);
        let mut original = Mbuf::from_slice(&[1, 2, 3, 4]);
        original.l2_len = 14;
        let mut copy = pool.alloc_copy(&original).unwrap();

        copy.data_mut()[0] = 0xff;
        assert_eq!(original.data(), &[1, 2, 3, 4]);
        assert_eq!(copy.data(), &[0xff, 2, 3, 4]);
        assert_eq!(copy.l2_len, 14);
        assert_eq!(copy.headroom(), 16);
    }

    #[test]
    fn test_alloc_copy_of_grown_frame() {
        let pool = MbufPool::new(4, 16, 4);
        let grown = Mbuf::from_slice(&[7u8; 8]);
        let copy = pool.alloc_copy(&grown).unwrap();
        assert_eq!(copy.data(), &[7u8; 8]);
        assert_eq!(copy.headroom(), 12);
        drop(copy);

        let oversized = Mbuf::from_slice(&[0u8; 21]);
        assert!(pool.alloc_copy(&oversized).is_err());
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_freed_buffers_are_reused() {
        let pool = MbufPool::new(2, 16, 64);
        let first = pool.alloc().unwrap();
        let second = pool.alloc().unwrap();
        let addrs = [first.buf.as_ptr(), second.buf.as_ptr()];
        drop(first);
        drop(second);

        for _ in 0..1000 {
            let mut m = pool.alloc_from(&[1, 2, 3]).unwrap();
            assert!(addrs.contains(&m.buf.as_ptr()));
            // Recycled buffers start clean
            assert_eq!(m.headroom(), 16);
            assert_eq!(m.l2_len, 0);
            m.l2_len = 14;
        }
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_empty_pool() {
        let pool = MbufPool::new(0, 16, 64);
        assert!(matches!(pool.alloc(), Err(Error::PoolExhausted)));
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_receive_into_tailroom() {
        let pool = MbufPool::new(1, 8, 16);
        let mut m = pool.alloc().unwrap();
        m.tailroom_mut()[..3].copy_from_slice(&[7, 8, 9]);
        m.append(3).unwrap();
        assert_eq!(m.data(), &[7, 8, 9]);
        assert_eq!(m.tailroom(), 13);
        assert!(m.append(14).is_err());
    }
}
