//! Shared helpers for spinning up an in-process mock server that speaks
//! the wire protocol, used by tests that need to exercise the codec and
//! the multiplexed channel end-to-end without a real cluster.

use crate::pb;
use crate::varint;
use bytes::{Bytes, BytesMut};
use prost::Message;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Reads and discards one connection preamble (magic + length-prefixed
/// `ConnectionHeader`) off `stream`.
pub async fn read_preamble(stream: &mut TcpStream) {
    let mut magic = [0u8; 6];
    stream.read_exact(&mut magic).await.expect("read preamble magic");
    let mut len_bytes = [0u8; 4];
    stream.read_exact(&mut len_bytes).await.expect("read preamble length");
    let len = u32::from_be_bytes(len_bytes) as usize;
    let mut header = vec![0u8; len];
    stream.read_exact(&mut header).await.expect("read preamble header");
}

/// A decoded request frame, as seen server-side.
pub struct DecodedRequest {
    pub call_id: u32,
    pub method_name: String,
    pub body: Bytes,
}

/// Decodes a request frame body (bytes after the outer length-delimited
/// envelope has been stripped), the inverse of `frame::encode_request`.
pub fn decode_request(data: &[u8]) -> DecodedRequest {
    let header_len = data[0] as usize;
    let header = pb::RequestHeader::decode(&data[1..1 + header_len]).expect("decode request header");
    let rest = &data[1 + header_len..];
    let (body_len, body_start) = varint::decode(rest, 0).expect("decode request body length");
    let body = Bytes::copy_from_slice(&rest[body_start..body_start + body_len as usize]);
    DecodedRequest {
        call_id: header.call_id,
        method_name: header.method_name.unwrap_or_default(),
        body,
    }
}

/// Encodes a successful response frame body carrying `msg` for `call_id`.
pub fn encode_ok_response(call_id: u32, msg: &impl Message) -> BytesMut {
    let mut body = BytesMut::new();
    msg.encode(&mut body).expect("encode response body");
    let mut payload = BytesMut::new();
    varint::encode(body.len() as u64, &mut payload);
    payload.extend_from_slice(&body);
    encode_response_frame(call_id, None, &payload)
}

/// Encodes a response frame body reporting a server-side exception.
pub fn encode_exception_response(call_id: u32, class_name: &str) -> BytesMut {
    encode_response_frame(call_id, Some(class_name), &[])
}

fn encode_response_frame(call_id: u32, exception_class_name: Option<&str>, payload: &[u8]) -> BytesMut {
    let header = pb::ResponseHeader {
        call_id,
        exception: exception_class_name.map(|name| pb::ExceptionResponse {
            exception_class_name: Some(name.to_string()),
            stack_trace: None,
        }),
    };
    let mut header_bytes = BytesMut::new();
    header.encode(&mut header_bytes).expect("encode response header");

    let mut out = BytesMut::new();
    varint::encode(header_bytes.len() as u64, &mut out);
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(payload);
    out
}

/// Writes `frame_body` as one outer length-delimited frame directly to
/// `stream`, bypassing `tokio_util`'s codec (the server side here doesn't
/// need the buffering a `Sink` gives a real client).
pub async fn write_frame(stream: &mut TcpStream, frame_body: &[u8]) {
    stream
        .write_all(&(frame_body.len() as u32).to_be_bytes())
        .await
        .expect("write frame length");
    stream.write_all(frame_body).await.expect("write frame body");
}

/// Reads one outer length-delimited frame from `stream`, or `None` on a
/// clean close.
pub async fn read_frame(stream: &mut TcpStream) -> Option<BytesMut> {
    let mut len_bytes = [0u8; 4];
    if stream.read_exact(&mut len_bytes).await.is_err() {
        return None;
    }
    let len = u32::from_be_bytes(len_bytes) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await.expect("read frame body");
    Some(BytesMut::from(&body[..]))
}
