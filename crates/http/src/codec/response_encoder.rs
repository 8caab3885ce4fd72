use std::io;
use std::io::ErrorKind;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::{error, warn};

use crate::codec::header::HeaderEncoder;
use crate::protocol::{Message, PayloadItem, PayloadSize, ResponseHead, SendError};

/// Encodes a response head followed by its payload.
#[derive(Debug, Default)]
pub struct ResponseEncoder {
    header_encoder: HeaderEncoder,
    payload: Option<PayloadState>,
}

/// How much payload the current response still expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadState {
    Length(u64),
    UntilClose,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl<D: Buf> Encoder<Message<(ResponseHead, PayloadSize), D>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(ResponseHead, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload.is_some() {
                    error!("expect payload item but receive response head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                self.payload = Some(match payload_size {
                    PayloadSize::Length(length) => PayloadState::Length(length),
                    PayloadSize::Empty => PayloadState::Length(0),
                    PayloadSize::UntilClose => PayloadState::UntilClose,
                });
                self.header_encoder.encode((head, payload_size), dst)
            }

            Message::Payload(payload_item) => {
                let Some(state) = &mut self.payload else {
                    error!("expect response header but receive payload item");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                match payload_item {
                    PayloadItem::Chunk(data) => {
                        let size = data.remaining() as u64;
                        if let PayloadState::Length(remaining) = state {
                            if size > *remaining {
                                return Err(SendError::invalid_body(format!(
                                    "body chunk of {size} bytes exceeds the {remaining} bytes left of content-length"
                                )));
                            }
                            *remaining -= size;
                        }
                        dst.put(data);
                        Ok(())
                    }
                    PayloadItem::Eof => {
                        if let PayloadState::Length(remaining) = state
                            && *remaining > 0
                        {
                            warn!(remaining = *remaining, "response body ended before content-length was reached");
                        }
                        self.payload = None;
                        Ok(())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Response;

    type Item = Message<(ResponseHead, PayloadSize), Bytes>;

    fn head() -> ResponseHead {
        Response::builder().body(()).unwrap()
    }

    #[test]
    fn length_framed_response() {
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Item::Header((head(), PayloadSize::Length(5))), &mut dst).unwrap();
        encoder.encode(Item::Payload(PayloadItem::Chunk(Bytes::from_static(b"hello"))), &mut dst).unwrap();
        encoder.encode(Item::Payload(PayloadItem::Eof), &mut dst).unwrap();

        assert!(dst.ends_with(b"\r\n\r\nhello"));
    }

    #[test]
    fn overlong_body_is_rejected() {
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Item::Header((head(), PayloadSize::Length(2))), &mut dst).unwrap();
        let result = encoder.encode(Item::Payload(PayloadItem::Chunk(Bytes::from_static(b"hello"))), &mut dst);
        assert!(matches!(result, Err(SendError::InvalidBody { .. })));
    }

    #[test]
    fn payload_before_head_is_rejected() {
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();

        let result = encoder.encode(Item::Payload(PayloadItem::Eof), &mut dst);
        assert!(matches!(result, Err(SendError::Io { .. })));
    }

    #[test]
    fn until_close_writes_raw_bytes() {
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Item::Header((head(), PayloadSize::UntilClose)), &mut dst).unwrap();
        encoder.encode(Item::Payload(PayloadItem::Chunk(Bytes::from_static(b"a"))), &mut dst).unwrap();
        encoder.encode(Item::Payload(PayloadItem::Chunk(Bytes::from_static(b"b"))), &mut dst).unwrap();

        assert!(dst.ends_with(b"\r\n\r\nab"));
    }
}
