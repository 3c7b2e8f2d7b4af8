//! Length-prefixed message framing
//!
//! One concrete wire adapter for transports that want it; in-process
//! transports can move the message types directly and skip this.

use std::marker::PhantomData;

use bytes::{Buf, BufMut, BytesMut};
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::{ViewerRequest, ViewerResponse};

/// Maximum message size (16 MB)
const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Bincode codec over a 4-byte big-endian length prefix
///
/// `Tx` is the message type this side encodes, `Rx` the type it
/// decodes. See [`ViewerCodec`] and [`CoreCodec`] for the two
/// orientations.
pub struct Codec<Tx, Rx> {
    _marker: PhantomData<(Tx, Rx)>,
}

/// Codec used by the viewer side (encodes requests, decodes responses)
pub type ViewerCodec = Codec<ViewerRequest, ViewerResponse>;

/// Codec used by the core side (encodes responses, decodes requests)
pub type CoreCodec = Codec<ViewerResponse, ViewerRequest>;

impl<Tx, Rx> Codec<Tx, Rx> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<Tx, Rx> Default for Codec<Tx, Rx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tx, Rx: DeserializeOwned> Decoder for Codec<Tx, Rx> {
    type Item = Rx;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Rx>, CodecError> {
        // Need at least 4 bytes for the length prefix
        if src.len() < 4 {
            return Ok(None);
        }

        // Peek at length without consuming
        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if len > MAX_MESSAGE_SIZE {
            return Err(CodecError::MessageTooLarge {
                size: len,
                max: MAX_MESSAGE_SIZE,
            });
        }

        // Wait for the full message
        if src.len() < 4 + len {
            src.reserve(4 + len - src.len());
            return Ok(None);
        }

        src.advance(4);
        let data = src.split_to(len);

        let msg: Rx = bincode::deserialize(&data)?;
        Ok(Some(msg))
    }
}

impl<Tx: Serialize, Rx> Encoder<Tx> for Codec<Tx, Rx> {
    type Error = CodecError;

    fn encode(&mut self, item: Tx, dst: &mut BytesMut) -> Result<(), CodecError> {
        let data = bincode::serialize(&item)?;

        if data.len() > MAX_MESSAGE_SIZE {
            return Err(CodecError::MessageTooLarge {
                size: data.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        dst.reserve(4 + data.len());
        dst.put_u32(data.len() as u32);
        dst.put_slice(&data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_request_roundtrip() {
        let mut viewer = ViewerCodec::new();
        let mut core = CoreCodec::new();

        let msg = ViewerRequest::Attach {
            workspace: "/repos/project/wt-A".into(),
            viewer_id: "window-1".into(),
            cols: 80,
            rows: 24,
        };

        let mut buf = BytesMut::new();
        viewer.encode(msg.clone(), &mut buf).unwrap();

        let decoded = core.decode(&mut buf).unwrap().unwrap();
        assert_eq!(format!("{:?}", msg), format!("{:?}", decoded));
    }

    #[test]
    fn test_partial_message() {
        let mut viewer = ViewerCodec::new();
        let mut core = CoreCodec::new();

        let msg = ViewerRequest::Terminate {
            process_id: Uuid::new_v4(),
        };

        let mut buf = BytesMut::new();
        viewer.encode(msg, &mut buf).unwrap();

        // Split buffer to simulate partial read
        let mut partial = buf.split_to(2);
        assert!(core.decode(&mut partial).unwrap().is_none());

        // Rest arrives
        partial.unsplit(buf);
        assert!(core.decode(&mut partial).unwrap().is_some());
    }

    #[test]
    fn test_message_too_large_on_decode() {
        let mut core = CoreCodec::new();
        let mut buf = BytesMut::new();

        let huge_size: u32 = (MAX_MESSAGE_SIZE + 1) as u32;
        buf.put_u32(huge_size);

        let result = core.decode(&mut buf);
        assert!(matches!(result, Err(CodecError::MessageTooLarge { .. })));
    }

    #[test]
    fn test_back_to_back_messages() {
        let mut viewer = ViewerCodec::new();
        let mut core = CoreCodec::new();

        let mut buf = BytesMut::new();
        let pid = Uuid::new_v4();
        viewer
            .encode(
                ViewerRequest::Write {
                    process_id: pid,
                    data: b"echo hi\n".to_vec(),
                },
                &mut buf,
            )
            .unwrap();
        viewer
            .encode(
                ViewerRequest::Resize {
                    process_id: pid,
                    cols: 100,
                    rows: 40,
                },
                &mut buf,
            )
            .unwrap();

        let first = core.decode(&mut buf).unwrap().unwrap();
        let second = core.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(first, ViewerRequest::Write { .. }));
        assert!(matches!(second, ViewerRequest::Resize { cols: 100, rows: 40, .. }));
        assert!(core.decode(&mut buf).unwrap().is_none());
    }
}
