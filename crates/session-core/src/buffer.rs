//! Adaptive frame buffer
//!
//! Accumulates raw audio whose frame size does not match the active codec
//! and hands it back out in native-sized units. Capacity is fixed when the
//! buffer is created; writes that do not fit fail instead of truncating.

use crate::errors::{Result, SwitchError};
use bytes::{Bytes, BytesMut};

/// Fixed-capacity byte FIFO
#[derive(Debug)]
pub struct FrameBuffer {
    data: BytesMut,
    capacity: usize,
}

impl FrameBuffer {
    /// Create an empty buffer holding at most `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of buffered bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently buffered
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Free space in bytes
    pub fn available(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// Append `bytes`, all or nothing
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.available() {
            return Err(SwitchError::BufferFull {
                needed: bytes.len(),
                available: self.available(),
                capacity: self.capacity,
            });
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Remove and return exactly `len` bytes, or `None` if fewer are buffered
    pub fn read(&mut self, len: usize) -> Option<Bytes> {
        if len == 0 || self.data.len() < len {
            return None;
        }
        Some(self.data.split_to(len).freeze())
    }

    /// Put `bytes` back in front of everything buffered, all or nothing
    pub fn unread(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.available() {
            return Err(SwitchError::BufferFull {
                needed: bytes.len(),
                available: self.available(),
                capacity: self.capacity,
            });
        }
        let mut data = BytesMut::with_capacity(self.capacity);
        data.extend_from_slice(bytes);
        data.extend_from_slice(&self.data);
        self.data = data;
        Ok(())
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut buffer = FrameBuffer::new(8);
        buffer.write(&[1, 2, 3]).unwrap();
        buffer.write(&[4, 5]).unwrap();

        assert_eq!(buffer.read(4).unwrap().as_ref(), &[1, 2, 3, 4]);
        assert!(buffer.read(4).is_none());
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.read(1).unwrap().as_ref(), &[5]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_overflow_is_rejected_whole() {
        let mut buffer = FrameBuffer::new(4);
        buffer.write(&[0; 3]).unwrap();

        let err = buffer.write(&[0; 2]).unwrap_err();
        assert!(matches!(err, SwitchError::BufferFull { needed: 2, available: 1, capacity: 4 }));
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.capacity(), 4);
    }

    #[test]
    fn test_unread_restores_head() {
        let mut buffer = FrameBuffer::new(6);
        buffer.write(&[1, 2, 3, 4, 5]).unwrap();
        let unit = buffer.read(2).unwrap();

        buffer.unread(&unit).unwrap();
        assert_eq!(buffer.read(5).unwrap().as_ref(), &[1, 2, 3, 4, 5]);

        buffer.write(&[0; 5]).unwrap();
        assert!(matches!(buffer.unread(&[9, 9]), Err(SwitchError::BufferFull { .. })));
        assert_eq!(buffer.len(), 5);
    }
}
