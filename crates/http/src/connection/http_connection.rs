use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::{Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, trace};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::body::ReqBody;
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, PayloadSize, ResponseHead, SendError};

/// Serves exactly one request over a reader/writer pair.
///
/// The head is decoded eagerly; the body is handed to the handler as a lazy
/// [`ReqBody`] that owns the rest of the read side. After the response is
/// written the writer is shut down.
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
        }
    }

    pub async fn process<H>(self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        let Self { framed_read, mut framed_write } = self;

        let result = exchange(framed_read, &mut framed_write, handler).await;
        let shutdown = framed_write.get_mut().shutdown().await;

        result?;
        shutdown.map_err(SendError::io)?;
        Ok(())
    }
}

async fn exchange<R, W, H>(
    mut framed_read: FramedRead<R, RequestDecoder>,
    framed_write: &mut FramedWrite<W, ResponseEncoder>,
    handler: Arc<H>,
) -> Result<(), HttpError>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Unpin,
    H: Handler + ?Sized,
    H::RespBody: Body<Data = Bytes> + Unpin,
    <H::RespBody as Body>::Error: Display,
{
    let (header, payload_size) = match framed_read.next().await {
        Some(Ok(Message::Header(head))) => head,

        Some(Ok(Message::Payload(_))) => {
            error!("received payload before any request head");
            send_response(framed_write, error_response(StatusCode::BAD_REQUEST)).await?;
            return Err(ParseError::MissingHead.into());
        }

        Some(Err(e)) => {
            error!(cause = %e, "can't decode request head");
            send_response(framed_write, error_response(status_for(&e))).await?;
            return Err(e.into());
        }

        None => {
            debug!("connection closed before a request arrived");
            return Ok(());
        }
    };

    if header.expects_continue() && !payload_size.is_empty() {
        let writer = framed_write.get_mut();
        writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(SendError::io)?;
        writer.flush().await.map_err(SendError::io)?;
        info!("receive expect request header, sent continue response");
    }

    let body = match payload_size {
        PayloadSize::Length(length) => ReqBody::from_messages(framed_read, length),
        PayloadSize::Empty | PayloadSize::UntilClose => ReqBody::empty(),
    };

    let response = match handler.call(header.body(body)).await {
        Ok(response) => Ok(response),
        Err(e) => Err(e.into()),
    };

    match response {
        Ok(response) => send_response(framed_write, response).await,
        Err(e) => {
            let e: Box<dyn Error + Send + Sync> = e;
            error!(cause = %e, "handler failed");
            send_response(framed_write, error_response(StatusCode::INTERNAL_SERVER_ERROR)).await
        }
    }
}

async fn send_response<W, T>(framed_write: &mut FramedWrite<W, ResponseEncoder>, response: Response<T>) -> Result<(), HttpError>
where
    W: AsyncWrite + Unpin,
    T: Body + Unpin,
    T::Error: Display,
{
    let (header_parts, mut body) = response.into_parts();

    let payload_size = match body.size_hint().exact() {
        Some(length) => PayloadSize::from_length(length),
        None => PayloadSize::UntilClose,
    };

    let header = Message::<_, T::Data>::Header((ResponseHead::from_parts(header_parts, ()), payload_size));
    framed_write.feed(header).await?;

    loop {
        match body.frame().await {
            Some(Ok(frame)) => match frame.into_data() {
                Ok(data) => framed_write.send(Message::Payload(PayloadItem::Chunk(data))).await?,
                Err(_) => trace!("skip non data frame"),
            },
            Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
            None => {
                framed_write.send(Message::Payload(PayloadItem::<T::Data>::Eof)).await?;
                return Ok(());
            }
        }
    }
}

fn status_for(e: &ParseError) -> StatusCode {
    match e {
        ParseError::TooLargeHeader { .. } => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
        ParseError::UnsupportedTransferEncoding => StatusCode::NOT_IMPLEMENTED,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn error_response(status_code: StatusCode) -> Response<Empty<Bytes>> {
    let mut response = Response::new(Empty::new());
    *response.status_mut() = status_code;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::make_handler;
    use http::Request;
    use tokio::io::{AsyncReadExt, duplex, split};

    async fn roundtrip<H>(raw_request: &'static [u8], handler: H) -> String
    where
        H: Handler + 'static,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        let (mut client, server) = duplex(64 * 1024);
        let (reader, writer) = split(server);

        let serve = async move {
            let _ = HttpConnection::new(reader, writer).process(Arc::new(handler)).await;
        };
        let request = async move {
            client.write_all(raw_request).await.unwrap();
            let mut response = Vec::new();
            client.read_to_end(&mut response).await.unwrap();
            response
        };

        let ((), response) = tokio::join!(serve, request);
        String::from_utf8(response).unwrap()
    }

    async fn echo(request: Request<ReqBody>) -> Result<Response<String>, Box<dyn Error + Send + Sync>> {
        let path = request.uri().path().to_string();
        let body = request.into_body().collect().await?.to_bytes();
        Ok(Response::new(format!("{path}:{}", String::from_utf8_lossy(&body))))
    }

    async fn failing(_request: Request<ReqBody>) -> Result<Response<String>, Box<dyn Error + Send + Sync>> {
        Err("boom".into())
    }

    #[tokio::test]
    async fn echoes_the_body() {
        let response = roundtrip(b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello", make_handler(echo)).await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("content-length: 11\r\n"));
        assert!(response.contains("connection: close\r\n"));
        assert!(response.ends_with("/echo:hello"));
    }

    #[tokio::test]
    async fn handler_error_becomes_500() {
        let response = roundtrip(b"GET / HTTP/1.1\r\n\r\n", make_handler(failing)).await;
        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn chunked_request_is_refused() {
        let response =
            roundtrip(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n", make_handler(echo)).await;
        assert!(response.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
    }

    #[tokio::test]
    async fn garbage_is_a_bad_request() {
        let response = roundtrip(b"NOT HTTP AT ALL\r\n\r\n", make_handler(echo)).await;
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn expect_continue_gets_an_interim_response() {
        let response = roundtrip(
            b"POST /up HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 2\r\n\r\nok",
            make_handler(echo),
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("/up:ok"));
    }
}
