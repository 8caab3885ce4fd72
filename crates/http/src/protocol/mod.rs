//! Protocol types shared by the codec and the connection.
//!
//! - [`Message`] / [`PayloadItem`] / [`PayloadSize`]: what the codecs produce and consume
//! - [`RequestHeader`]: a parsed request head
//! - [`ResponseHead`]: a response before its body is attached
//! - [`body::ReqBody`]: the lazily read request body
//! - [`HttpError`], [`ParseError`], [`SendError`]: transport failures

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
