//! wtmux-protocol: Shared definitions for viewer/core communication
//!
//! This crate defines the message types exchanged between a viewer
//! transport and the session core, the deterministic session key, and
//! a length-prefixed codec for transports that want wire framing. The
//! transport itself (socket, websocket, in-process channel) is owned
//! by the caller.

pub mod codec;
pub mod messages;
pub mod types;

// Re-export main types at crate root
pub use codec::{Codec, CodecError, CoreCodec, ViewerCodec};
pub use messages::{ErrorCode, SessionEvent, ViewerRequest, ViewerResponse};
pub use types::{unix_now, AttachOutcome, Checkpoint, SessionKey, SessionStatus};

/// Current protocol version
pub const PROTOCOL_VERSION: u32 = 1;
