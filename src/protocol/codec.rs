//! Newline-delimited JSON event framing.
//!
//! One frame per line. A line that is not a well-formed event is surfaced as
//! [`ClientFrame::Malformed`] instead of killing the stream: line boundaries
//! survive bad payloads, so the session can keep going.

use bytes::{BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use super::messages::{ClientMessage, ServerMessage};

#[derive(Debug, PartialEq)]
pub enum ClientFrame {
    Message(ClientMessage),
    Malformed { detail: String },
}

#[derive(Clone)]
pub struct EventCodec {
    max_frame_bytes: usize,
}

impl EventCodec {
    pub fn new(max_frame_bytes: usize) -> Self {
        EventCodec { max_frame_bytes }
    }
}

impl Default for EventCodec {
    fn default() -> Self {
        Self::new(4 * 1024 * 1024)
    }
}

impl Decoder for EventCodec {
    type Item = ClientFrame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(newline) = src.iter().position(|&b| b == b'\n') else {
                if src.len() > self.max_frame_bytes {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("frame exceeds {} bytes", self.max_frame_bytes),
                    ));
                }
                return Ok(None);
            };

            let line = src.split_to(newline + 1);
            let line = &line[..line.len() - 1];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }
            if line.len() > self.max_frame_bytes {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("frame exceeds {} bytes", self.max_frame_bytes),
                ));
            }

            return Ok(Some(match serde_json::from_slice::<ClientMessage>(line) {
                Ok(message) => ClientFrame::Message(message),
                Err(e) => ClientFrame::Malformed {
                    detail: e.to_string(),
                },
            }));
        }
    }
}

impl Encoder<ServerMessage> for EventCodec {
    type Error = io::Error;

    fn encode(&mut self, msg: ServerMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let encoded = serde_json::to_vec(&msg).map_err(io::Error::other)?;
        dst.reserve(encoded.len() + 1);
        dst.put_slice(&encoded);
        dst.put_u8(b'\n');
        Ok(())
    }
}
