//! Codec transcoding pipeline
//!
//! One [`MediaPath`] per direction. Frames whose codec already matches the
//! session codec pass straight through. Everything else is decoded to raw
//! audio, cut into native-sized units (buffering when the sizes do not line
//! up) and encoded with the session codec.

use crate::buffer::FrameBuffer;
use crate::errors::{Result, SwitchError};
use crate::frame::{Frame, ScratchBuffer};
use bytes::Bytes;
use softswitch_codec_core::{Codec, CodecImplementation, CodecOutcome};
use softswitch_infra_common::MemoryPool;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Which side of the session a path serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("Read"),
            Self::Write => f.write_str("Write"),
        }
    }
}

/// Adaptive buffer statistics of one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaStats {
    /// Capacity of the adaptive buffer; 0 until it is engaged
    pub buffer_capacity: usize,
    /// Bytes waiting in the adaptive buffer
    pub buffered_bytes: usize,
    /// How many times the adaptive buffer was allocated
    pub buffer_allocations: usize,
}

/// What the write path does with one outbound frame
pub(crate) enum Outbound {
    /// Forward the caller's frame untouched
    Direct,
    /// Forward this single frame
    Encoded(Frame),
    /// The audio went into the adaptive buffer; drain it with `next_outbound`
    Buffered,
}

pub(crate) struct MediaPath {
    direction: Direction,
    codec: Option<Arc<Codec>>,
    raw: ScratchBuffer,
    enc: ScratchBuffer,
    buffer: Option<FrameBuffer>,
    buffer_frames: usize,
    buffer_allocations: usize,
    pool: Arc<MemoryPool>,
}

impl MediaPath {
    pub(crate) fn new(
        direction: Direction,
        scratch_bytes: usize,
        buffer_frames: usize,
        pool: Arc<MemoryPool>,
    ) -> Result<Self> {
        pool.charge(scratch_bytes * 2)?;
        Ok(Self {
            direction,
            codec: None,
            raw: ScratchBuffer::new(scratch_bytes),
            enc: ScratchBuffer::new(scratch_bytes),
            buffer: None,
            buffer_frames,
            buffer_allocations: 0,
            pool,
        })
    }

    pub(crate) fn codec(&self) -> Option<Arc<Codec>> {
        self.codec.clone()
    }

    /// Swap the session codec. An engaged buffer keeps its capacity.
    pub(crate) fn set_codec(&mut self, codec: Option<Arc<Codec>>) {
        self.codec = codec;
    }

    pub(crate) fn stats(&self) -> MediaStats {
        MediaStats {
            buffer_capacity: self.buffer.as_ref().map_or(0, FrameBuffer::capacity),
            buffered_bytes: self.buffer.as_ref().map_or(0, FrameBuffer::len),
            buffer_allocations: self.buffer_allocations,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.codec = None;
        self.buffer = None;
    }

    fn needs_transcode(&self, frame_codec: Option<&Arc<Codec>>) -> bool {
        match (&self.codec, frame_codec) {
            (Some(ours), Some(theirs)) => !ours.same_implementation(theirs),
            (None, None) => false,
            _ => true,
        }
    }

    /// Inbound frame to at most one frame in the session codec.
    ///
    /// `Ok(None)` means the bytes were buffered and no full unit is ready yet.
    pub(crate) fn transcode_inbound(&mut self, frame: Frame) -> Result<Option<Frame>> {
        if !self.needs_transcode(frame.codec.as_ref()) {
            return Ok(Some(frame));
        }

        let raw = self.decode(&frame)?;
        let Some(codec) = self.codec.clone() else {
            return Ok(Some(passthrough_raw(raw, &frame)));
        };

        let native = codec.native_frame_bytes();
        let unit = if raw.len() == native {
            raw
        } else {
            let buffer = self.engage_buffer(native, raw.len())?;
            buffer.write(&raw)?;
            match buffer.read(native) {
                Some(unit) => unit,
                None => return Ok(None),
            }
        };

        let other = frame.codec.as_deref().map(|c| c.implementation().as_ref());
        self.encode(&codec, other, unit).map(Some)
    }

    /// Outbound frame to a single frame in the session codec, or into the
    /// adaptive buffer when its size does not match the native unit
    pub(crate) fn transcode_outbound(&mut self, frame: &Frame) -> Result<Outbound> {
        if !self.needs_transcode(frame.codec.as_ref()) {
            return Ok(Outbound::Direct);
        }

        let raw = self.decode(frame)?;
        let Some(codec) = self.codec.clone() else {
            return Ok(Outbound::Encoded(passthrough_raw(raw, frame)));
        };

        let native = codec.native_frame_bytes();
        if raw.len() == native {
            let other = frame.codec.as_deref().map(|c| c.implementation().as_ref());
            return self.encode(&codec, other, raw).map(Outbound::Encoded);
        }

        self.engage_buffer(native, raw.len())?.write(&raw)?;
        Ok(Outbound::Buffered)
    }

    /// Take the next native unit out of the adaptive buffer and encode it.
    ///
    /// Returns the encoded frame together with the raw unit so the caller can
    /// hand the unit back with [`requeue`](Self::requeue) if the sink refuses it.
    pub(crate) fn next_outbound(
        &mut self,
        other: Option<&CodecImplementation>,
    ) -> Result<Option<(Frame, Bytes)>> {
        let Some(codec) = self.codec.clone() else {
            return Ok(None);
        };
        let native = codec.native_frame_bytes();
        let Some(unit) = self.buffer.as_mut().and_then(|buffer| buffer.read(native)) else {
            return Ok(None);
        };
        let encoded = self.encode(&codec, other, unit.clone())?;
        Ok(Some((encoded, unit)))
    }

    /// Put a unit that was never delivered back at the head of the buffer
    pub(crate) fn requeue(&mut self, unit: Bytes) {
        let direction = self.direction;
        let Some(buffer) = self.buffer.as_mut() else {
            warn!(direction = %direction, bytes = unit.len(), "Adaptive buffer gone, dropping undelivered unit");
            return;
        };
        if let Err(err) = buffer.unread(&unit) {
            warn!(direction = %direction, error = %err, "Could not requeue undelivered unit");
        }
    }

    /// Decode with the frame's own codec into the raw scratch buffer
    fn decode(&mut self, frame: &Frame) -> Result<Bytes> {
        let Some(source) = frame.codec.as_ref() else {
            return Ok(frame.data.clone());
        };
        self.raw.check(frame.len())?;

        let other = self.codec.as_deref().map(|c| c.implementation().as_ref());
        match source.decode(other, &frame.data, self.raw.as_mut_slice()) {
            Ok(CodecOutcome::Processed(len)) => {
                self.raw.check(len)?;
                Ok(self.raw.bytes(len))
            }
            Ok(CodecOutcome::NoOp) => Ok(frame.data.clone()),
            Err(softswitch_codec_core::CodecError::BufferTooSmall { needed, .. }) => {
                Err(SwitchError::Capacity {
                    size: needed,
                    capacity: self.raw.capacity(),
                })
            }
            Err(source_err) => {
                warn!(codec = %source.name(), direction = %self.direction, error = %source_err, "Codec decoder error");
                Err(SwitchError::Decode {
                    codec: source.name().to_string(),
                    source: source_err,
                })
            }
        }
    }

    /// Encode one native unit with the session codec
    fn encode(
        &mut self,
        codec: &Arc<Codec>,
        other: Option<&CodecImplementation>,
        unit: Bytes,
    ) -> Result<Frame> {
        let timestamp_delta = codec.implementation().samples_per_frame;
        match codec.encode(other, &unit, self.enc.as_mut_slice()) {
            Ok(CodecOutcome::Processed(len)) => Ok(Frame::new(self.enc.bytes(len), Some(Arc::clone(codec)))
                .with_timestamp_delta(timestamp_delta)),
            Ok(CodecOutcome::NoOp) => {
                Ok(Frame::new(unit, Some(Arc::clone(codec))).with_timestamp_delta(timestamp_delta))
            }
            Err(source) => {
                warn!(codec = %codec.name(), direction = %self.direction, error = %source, "Codec encoder error");
                Err(SwitchError::Encode {
                    codec: codec.name().to_string(),
                    source,
                })
            }
        }
    }

    /// The adaptive buffer, created on first use at `buffer_frames` native frames
    fn engage_buffer(&mut self, native: usize, incoming: usize) -> Result<&mut FrameBuffer> {
        let capacity = native * self.buffer_frames;
        if self.buffer.is_none() {
            self.pool.charge(capacity)?;
            info!(
                direction = %self.direction,
                bytes = capacity,
                incoming,
                native,
                "Engaging adaptive buffer"
            );
            self.buffer_allocations += 1;
        }
        Ok(self.buffer.get_or_insert_with(|| FrameBuffer::new(capacity)))
    }
}

fn passthrough_raw(raw: Bytes, original: &Frame) -> Frame {
    Frame::raw(raw)
        .with_timestamp_delta(original.timestamp_delta)
        .with_flags(original.flags)
}
