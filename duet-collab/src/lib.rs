//! # duet-collab: Stroke sharing between two peers
//!
//! Turns local pointer gestures into size-capped wire chunks and turns
//! received chunks back into remote paths in the shared [`PathStore`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐   binary chunks   ┌──────────────────────┐
//! │ StrokeSynchronizer A │ ◄───────────────► │ StrokeSynchronizer B │
//! │  begin/extend/end    │     PeerLink      │  on_payload_received │
//! └──────────┬───────────┘   (WebSocket)     └──────────┬───────────┘
//!            │                                          │
//!            ▼                                          ▼
//!       PathStore A                                PathStore B
//! ```
//!
//! ## Modules
//!
//! - [`codec`]: chunk wire format, cap measurement, stroke framing
//! - [`transport`]: the `Transport`/`PayloadHandler` seam, in-memory transports
//! - [`sync`]: capture, chunking and remote reassembly
//! - [`link`]: single-peer WebSocket transport
//! - [`config`]: session settings loaded from JSON
//!
//! [`PathStore`]: duet_core::PathStore

pub mod codec;
pub mod transport;
pub mod sync;
pub mod link;
pub mod config;

pub use codec::{
    ChunkKind, CodecError, StrokeChunk, StrokeCodec, StrokeFraming, MAX_MESSAGE_BYTES, WIRE_CAP,
};
pub use config::{ConfigError, SessionConfig};
pub use link::{LinkConfig, LinkError, LinkEvent, LinkStats, PeerLink};
pub use sync::{StrokeSynchronizer, SyncStats};
pub use transport::{
    LoopbackTransport, MemoryTransport, PayloadHandler, PeerId, Transport, TransportError,
};
