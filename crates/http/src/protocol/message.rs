use bytes::{Buf, Bytes};

/// A unit produced by a decoder or consumed by an encoder: either the head of
/// a message or one piece of its payload.
pub enum Message<T, Data: Buf = Bytes> {
    Header(T),
    Payload(PayloadItem<Data>),
}

/// One piece of a payload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    Chunk(Data),
    /// The payload is complete.
    Eof,
}

/// How a payload is delimited on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Exactly this many bytes follow the head.
    Length(u64),
    /// No payload at all.
    Empty,
    /// Bytes follow until the connection is closed. Only used for responses.
    UntilClose,
}

impl PayloadSize {
    /// Maps a declared length to a size, folding zero into [`PayloadSize::Empty`].
    #[inline]
    pub fn from_length(length: u64) -> Self {
        if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }

    /// The exact length, if the payload has one.
    #[inline]
    pub fn exact(&self) -> Option<u64> {
        match self {
            PayloadSize::Length(length) => Some(*length),
            PayloadSize::Empty => Some(0),
            PayloadSize::UntilClose => None,
        }
    }
}

impl<T> Message<T> {
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }

    /// Returns the payload item, or `None` if this is a head.
    pub fn into_payload_item(self) -> Option<PayloadItem> {
        match self {
            Message::Header(_) => None,
            Message::Payload(payload_item) => Some(payload_item),
        }
    }
}

impl<T> From<Bytes> for Message<T> {
    fn from(bytes: Bytes) -> Self {
        Self::Payload(PayloadItem::Chunk(bytes))
    }
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
