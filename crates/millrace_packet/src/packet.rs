//! Shared and exclusive packet handles.

use crate::annotations::Annotations;
use std::sync::Arc;

/// Packet result type
pub type PacketResult<T> = Result<T, PacketError>;

/// Packet error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    /// Buffer allocation failed; callers must treat this as "produced
    /// nothing", never as a fatal condition
    #[error("out of packet buffers")]
    NoBuffer,
}

/// Buffer plus bounds plus annotations. `start..end` is the packet data;
/// bytes before `start` are headroom, bytes after `end` are tailroom.
#[derive(Debug, Clone)]
struct PacketData {
    buf: Vec<u8>,
    start: usize,
    end: usize,
    anno: Annotations,
}

impl PacketData {
    fn data(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }
}

/// Shared read-only packet handle.
///
/// Cloning ([`Packet::duplicate`]) increments a reference count without
/// copying the buffer. No mutable access exists on this type; writing
/// requires [`Packet::make_writable`].
#[derive(Debug)]
pub struct Packet {
    data: Arc<PacketData>,
}

impl Packet {
    /// Packet data bytes
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Packet data length
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.end - self.data.start
    }

    /// Whether the packet holds no data bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Annotation slots (read-only)
    #[must_use]
    pub fn annotations(&self) -> &Annotations {
        &self.data.anno
    }

    /// Number of live handles to this buffer, this one included
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    /// Take another reference to this packet; no copy
    #[must_use]
    pub fn duplicate(&self) -> Packet {
        Packet {
            data: Arc::clone(&self.data),
        }
    }

    /// Obtain an exclusive handle.
    ///
    /// Returns the buffer without copying iff this is the sole reference
    /// at this moment; otherwise copies buffer and annotations. Either
    /// way this handle is consumed.
    #[must_use]
    pub fn make_writable(self) -> WritablePacket {
        match Arc::try_unwrap(self.data) {
            Ok(data) => WritablePacket { data },
            Err(shared) => WritablePacket {
                data: (*shared).clone(),
            },
        }
    }
}

impl Clone for Packet {
    fn clone(&self) -> Self {
        self.duplicate()
    }
}

/// Exclusive writable packet handle. Exactly one owner by construction;
/// all mutation of bytes and annotations goes through this type.
#[derive(Debug)]
pub struct WritablePacket {
    data: PacketData,
}

impl WritablePacket {
    /// Create a packet of `len` zeroed bytes with the requested spare
    /// head and tail room.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::NoBuffer`] if the buffer cannot be
    /// allocated.
    pub fn create(len: usize, headroom: usize, tailroom: usize) -> PacketResult<WritablePacket> {
        let total = headroom
            .checked_add(len)
            .and_then(|n| n.checked_add(tailroom))
            .ok_or(PacketError::NoBuffer)?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(total).map_err(|_| PacketError::NoBuffer)?;
        buf.resize(total, 0);
        Ok(WritablePacket {
            data: PacketData {
                buf,
                start: headroom,
                end: headroom + len,
                anno: Annotations::new(),
            },
        })
    }

    /// Packet data bytes
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Packet data bytes, writable
    #[must_use]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data.buf[self.data.start..self.data.end]
    }

    /// Packet data length
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.end - self.data.start
    }

    /// Whether the packet holds no data bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spare room before the data
    #[must_use]
    pub fn headroom(&self) -> usize {
        self.data.start
    }

    /// Spare room after the data
    #[must_use]
    pub fn tailroom(&self) -> usize {
        self.data.buf.len() - self.data.end
    }

    /// Annotation slots (read-only)
    #[must_use]
    pub fn annotations(&self) -> &Annotations {
        &self.data.anno
    }

    /// Annotation slots, writable
    #[must_use]
    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.data.anno
    }

    /// Extend the data region `n` bytes at the front, reallocating only
    /// when the headroom is exhausted. New bytes are zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::NoBuffer`] if a reallocation fails.
    pub fn grow_front(&mut self, n: usize) -> PacketResult<()> {
        if self.data.start >= n {
            self.data.start -= n;
            self.data.buf[self.data.start..self.data.start + n].fill(0);
            return Ok(());
        }
        let extra = n - self.data.start;
        let mut buf = Vec::new();
        buf.try_reserve_exact(extra + self.data.buf.len())
            .map_err(|_| PacketError::NoBuffer)?;
        buf.resize(extra, 0);
        buf.extend_from_slice(&self.data.buf);
        buf[..self.data.start + extra].fill(0);
        self.data.buf = buf;
        self.data.end += extra;
        self.data.start = 0;
        Ok(())
    }

    /// Shrink the data region `n` bytes at the front (the removed bytes
    /// become headroom). Clamped to the data length.
    pub fn shrink_front(&mut self, n: usize) {
        self.data.start = (self.data.start + n).min(self.data.end);
    }

    /// Extend the data region `n` bytes at the back, reallocating only
    /// when the tailroom is exhausted. New bytes are zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::NoBuffer`] if a reallocation fails.
    pub fn grow_back(&mut self, n: usize) -> PacketResult<()> {
        if self.tailroom() < n {
            let extra = n - self.tailroom();
            self.data
                .buf
                .try_reserve_exact(extra)
                .map_err(|_| PacketError::NoBuffer)?;
            self.data.buf.resize(self.data.buf.len() + extra, 0);
        }
        self.data.buf[self.data.end..self.data.end + n].fill(0);
        self.data.end += n;
        Ok(())
    }

    /// Shrink the data region `n` bytes at the back (the removed bytes
    /// become tailroom). Clamped to the data length.
    pub fn shrink_back(&mut self, n: usize) {
        self.data.end = self.data.end.saturating_sub(n).max(self.data.start);
    }

    /// Freeze into a shared read-only handle
    #[must_use]
    pub fn into_packet(self) -> Packet {
        Packet {
            data: Arc::new(self.data),
        }
    }
}

impl From<WritablePacket> for Packet {
    fn from(wp: WritablePacket) -> Self {
        wp.into_packet()
    }
}
