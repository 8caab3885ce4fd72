//! The request body handed to handlers.
//!
//! A [`ReqBody`] is lazy: it owns the remainder of the connection's decoded
//! payload stream and only pulls bytes off the socket when it is polled. Since
//! a connection serves a single request, nothing has to be drained or handed
//! back once the handler is done with it.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use http_body::{Body, Frame, SizeHint};
use tracing::{error, trace};

use crate::protocol::{Message, ParseError, PayloadItem};

type PayloadStream = Pin<Box<dyn Stream<Item = Result<PayloadItem, ParseError>> + Send>>;

/// The body of an incoming request, implementing [`http_body::Body`].
pub struct ReqBody {
    kind: Kind,
}

enum Kind {
    Empty,
    Payload { stream: PayloadStream, declared: u64, remaining: u64, finished: bool },
}

impl ReqBody {
    /// A body with no bytes.
    pub fn empty() -> Self {
        Self { kind: Kind::Empty }
    }

    /// A body that yields `bytes` as a single chunk.
    pub fn full(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Self::empty();
        }

        let length = bytes.len() as u64;
        let items = stream::iter([Ok(PayloadItem::Chunk(bytes)), Ok(PayloadItem::Eof)]);
        Self::from_payload(items, length)
    }

    /// A body read from a stream of payload items, expected to carry exactly `length` bytes.
    pub fn from_payload<S>(payload: S, length: u64) -> Self
    where
        S: Stream<Item = Result<PayloadItem, ParseError>> + Send + 'static,
    {
        if length == 0 {
            return Self::empty();
        }

        Self { kind: Kind::Payload { stream: Box::pin(payload), declared: length, remaining: length, finished: false } }
    }

    /// A body read from the decoded messages that follow a request head.
    ///
    /// Receiving another head before the payload's end is a framing error.
    pub fn from_messages<S, T>(messages: S, length: u64) -> Self
    where
        S: Stream<Item = Result<Message<T>, ParseError>> + Send + 'static,
    {
        let payload = messages.map(|message| match message {
            Ok(Message::Payload(item)) => Ok(item),
            Ok(Message::Header(_)) => {
                error!("received header while reading body");
                Err(ParseError::UnexpectedHead)
            }
            Err(e) => Err(e),
        });

        Self::from_payload(payload, length)
    }

    /// The length the client declared for this body.
    pub fn content_length(&self) -> u64 {
        match &self.kind {
            Kind::Empty => 0,
            Kind::Payload { declared, .. } => *declared,
        }
    }
}

impl Default for ReqBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for ReqBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Kind::Empty => f.write_str("ReqBody::Empty"),
            Kind::Payload { declared, remaining, finished, .. } => f
                .debug_struct("ReqBody::Payload")
                .field("declared", declared)
                .field("remaining", remaining)
                .field("finished", finished)
                .finish(),
        }
    }
}

impl Body for ReqBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let Kind::Payload { stream, declared, remaining, finished } = &mut self.get_mut().kind else {
            return Poll::Ready(None);
        };

        if *finished {
            return Poll::Ready(None);
        }

        match ready!(stream.as_mut().poll_next(cx)) {
            Some(Ok(PayloadItem::Chunk(bytes))) => {
                *remaining = remaining.saturating_sub(bytes.len() as u64);
                trace!(size = bytes.len(), remaining = *remaining, "read body chunk");
                Poll::Ready(Some(Ok(Frame::data(bytes))))
            }
            Some(Ok(PayloadItem::Eof)) => {
                *finished = true;
                Poll::Ready(None)
            }
            Some(Err(e)) => {
                *finished = true;
                Poll::Ready(Some(Err(e)))
            }
            None => {
                *finished = true;
                Poll::Ready(Some(Err(ParseError::IncompleteBody { declared: *declared, missing: *remaining })))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.kind {
            Kind::Empty => true,
            Kind::Payload { finished, .. } => *finished,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            Kind::Empty => SizeHint::with_exact(0),
            Kind::Payload { finished: true, .. } => SizeHint::with_exact(0),
            Kind::Payload { remaining, .. } => SizeHint::with_exact(*remaining),
        }
    }
}
