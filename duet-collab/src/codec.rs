//! Stroke chunk wire format.
//!
//! Each sample travels as the text `"<x>,<y>"` (normalized floats). A chunk
//! is an ordered collection of those strings, bincode-encoded, so the
//! payload is self-delimiting: the decoder recovers count and order from
//! the bytes alone.
//!
//! Wire format (bincode, standard config):
//! ```text
//! Legacy:  ┌──────────┬─────────────────────────────┐
//!          │ len      │ len × "<x>,<y>" strings     │
//!          │ varint   │ (varint length + utf-8)     │
//!          └──────────┴─────────────────────────────┘
//!
//! Marked:  ┌──────────┬──────────┬──────────────────┐
//!          │ kind     │ len      │ coordinate strs  │
//!          │ varint   │ varint   │ as above         │
//!          └──────────┴──────────┴──────────────────┘
//! ```
//!
//! Both peers must agree on the framing; it is not negotiated.

use duet_core::Sample;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Flush threshold for one chunk, kept below [`MAX_MESSAGE_BYTES`].
pub const WIRE_CAP: usize = 4000;

/// Hard per-message limit of the peer transport.
pub const MAX_MESSAGE_BYTES: usize = 4096;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Position of a chunk within its stroke (marked framing only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkKind {
    /// First chunk of a multi-chunk stroke.
    Begin,
    /// Middle chunk.
    Continue,
    /// Last chunk of a multi-chunk stroke.
    End,
    /// The whole stroke fits in one chunk.
    Whole,
}

impl ChunkKind {
    pub fn for_position(first: bool, last: bool) -> Self {
        match (first, last) {
            (true, true) => Self::Whole,
            (true, false) => Self::Begin,
            (false, false) => Self::Continue,
            (false, true) => Self::End,
        }
    }

    /// Whether this chunk starts a new remote path.
    pub fn opens_stroke(self) -> bool {
        matches!(self, Self::Begin | Self::Whole)
    }

    /// Whether the remote path is finished after this chunk.
    pub fn closes_stroke(self) -> bool {
        matches!(self, Self::End | Self::Whole)
    }
}

/// How stroke boundaries are represented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeFraming {
    /// Bare coordinate list; the receiver cannot tell strokes apart, so
    /// every batch becomes a new sub-path of the open remote path.
    Legacy,
    /// Coordinate list preceded by a [`ChunkKind`].
    #[default]
    Marked,
}

/// A decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeChunk {
    /// `None` under legacy framing.
    pub kind: Option<ChunkKind>,
    pub samples: Vec<Sample>,
}

#[derive(Serialize, Deserialize)]
struct MarkedPayload {
    kind: ChunkKind,
    coords: Vec<String>,
}

/// Encoder/decoder for stroke chunks with a flush threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeCodec {
    framing: StrokeFraming,
    cap: usize,
}

impl StrokeCodec {
    /// Codec with the standard [`WIRE_CAP`].
    pub fn new(framing: StrokeFraming) -> Self {
        Self::with_cap(framing, WIRE_CAP)
    }

    /// Codec with a custom flush threshold (tests, constrained transports).
    pub fn with_cap(framing: StrokeFraming, cap: usize) -> Self {
        Self { framing, cap }
    }

    pub fn framing(&self) -> StrokeFraming {
        self.framing
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Serialize a chunk. `kind` is ignored under legacy framing.
    pub fn encode(&self, kind: ChunkKind, samples: &[Sample]) -> Result<Vec<u8>, CodecError> {
        let coords: Vec<String> = samples.iter().map(format_sample).collect();
        let config = bincode::config::standard();
        let encoded = match self.framing {
            StrokeFraming::Legacy => bincode::serde::encode_to_vec(&coords, config),
            StrokeFraming::Marked => {
                bincode::serde::encode_to_vec(&MarkedPayload { kind, coords }, config)
            }
        };
        encoded.map_err(|e| CodecError::Serialization(e.to_string()))
    }

    /// Parse a payload produced by a peer using the same framing.
    pub fn decode(&self, bytes: &[u8]) -> Result<StrokeChunk, CodecError> {
        let config = bincode::config::standard();
        let malformed = |e: bincode::error::DecodeError| CodecError::MalformedPayload(e.to_string());

        let (kind, coords, consumed) = match self.framing {
            StrokeFraming::Legacy => {
                let (coords, consumed): (Vec<String>, usize) =
                    bincode::serde::decode_from_slice(bytes, config).map_err(malformed)?;
                (None, coords, consumed)
            }
            StrokeFraming::Marked => {
                let (payload, consumed): (MarkedPayload, usize) =
                    bincode::serde::decode_from_slice(bytes, config).map_err(malformed)?;
                (Some(payload.kind), payload.coords, consumed)
            }
        };

        if consumed != bytes.len() {
            return Err(CodecError::MalformedPayload(format!(
                "{} trailing bytes after chunk",
                bytes.len() - consumed
            )));
        }

        let samples = coords
            .iter()
            .map(|c| parse_sample(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StrokeChunk { kind, samples })
    }

    /// Size of `encode(kind, samples)` in bytes.
    pub fn encoded_len(&self, kind: ChunkKind, samples: &[Sample]) -> Result<usize, CodecError> {
        self.encode(kind, samples).map(|bytes| bytes.len())
    }

    /// Whether encoding `samples` reaches the flush threshold.
    ///
    /// Measured on the real encoding, never estimated. An encoding failure
    /// counts as exceeding so the caller flushes.
    pub fn exceeds_cap(&self, kind: ChunkKind, samples: &[Sample]) -> bool {
        self.encoded_len(kind, samples)
            .map_or(true, |len| len >= self.cap)
    }
}

fn format_sample(sample: &Sample) -> String {
    format!("{},{}", sample.x(), sample.y())
}

fn parse_sample(text: &str) -> Result<Sample, CodecError> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| CodecError::MalformedPayload(format!("missing ',' in {text:?}")))?;
    Ok(Sample::new(parse_component(x)?, parse_component(y)?))
}

fn parse_component(text: &str) -> Result<f32, CodecError> {
    let v: f32 = text
        .trim()
        .parse()
        .map_err(|_| CodecError::MalformedPayload(format!("bad coordinate {text:?}")))?;
    if !v.is_finite() {
        return Err(CodecError::MalformedPayload(format!("non-finite coordinate {text:?}")));
    }
    Ok(v)
}
