//! Decodes one request: the head, then a `Content-Length` framed payload.

use std::cmp;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};

/// Request decoder state machine.
///
/// While `remaining` is `None` the decoder looks for a head. Once a head with
/// a non-empty payload is found it yields payload chunks until `remaining`
/// drops to zero, then a single [`PayloadItem::Eof`].
#[derive(Debug, Default)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    remaining: Option<u64>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                self.remaining = None;
                return Ok(Some(Message::Payload(PayloadItem::Eof)));
            }

            if src.is_empty() {
                return Ok(None);
            }

            let len = cmp::min(*remaining, src.len() as u64) as usize;
            let bytes = src.split_to(len).freeze();
            *remaining -= len as u64;
            return Ok(Some(Message::Payload(PayloadItem::Chunk(bytes))));
        }

        let message = match self.header_decoder.decode(src)? {
            Some((header, payload_size)) => {
                if let PayloadSize::Length(length) = payload_size {
                    self.remaining = Some(length);
                }
                Some(Message::Header((header, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }
}
