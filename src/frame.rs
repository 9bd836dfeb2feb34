//! Length-prefixed frame codec for the cluster's RPC wire format.
//!
//! A frame is always `u32` big-endian `total_size` followed by exactly
//! `total_size` bytes; that outer envelope is handled by
//! [`tokio_util::codec::LengthDelimitedCodec`] rather than hand-rolled.
//! What's inside a frame differs by direction, which is the one
//! wire-format asymmetry worth calling out: a **request** frame encodes
//! its header length as a fixed single byte, while a **response** frame
//! encodes its header length as a varint. Both were carried over
//! unchanged from the source protocol rather than "fixed", since peers
//! on the wire still expect exactly this.

use crate::error::ProtocolError;
use crate::pb;
use crate::varint;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::Message;
use tokio_util::codec::LengthDelimitedCodec;

/// The outer `u32`-length-prefixed envelope every frame travels in,
/// max 128 MiB per frame.
pub fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .big_endian()
        .length_field_length(4)
        .max_frame_length(1 << 27)
        .new_codec()
}

/// The connection preamble sent once, immediately after connecting:
/// magic bytes, then a big-endian `u32` length, then a serialized
/// `ConnectionHeader`.
const PREAMBLE_MAGIC: &[u8] = b"HBas\x00\x50";

/// Builds the connection preamble frame (magic + length + header bytes).
pub fn encode_preamble(effective_user: &str, service_name: &str) -> BytesMut {
    let header = pb::ConnectionHeader {
        user_info: Some(pb::UserInformation {
            effective_user: Some(effective_user.to_string()),
        }),
        service_name: Some(service_name.to_string()),
    };
    let header_bytes = header.encode_to_vec();

    let mut out = BytesMut::with_capacity(PREAMBLE_MAGIC.len() + 4 + header_bytes.len());
    out.put_slice(PREAMBLE_MAGIC);
    out.put_u32(header_bytes.len() as u32);
    out.put_slice(&header_bytes);
    out
}

/// Encodes one request frame's body — everything the outer
/// length-delimited envelope wraps, but not the envelope itself.
pub fn encode_request(call_id: u32, method_name: &str, body: &impl Message) -> BytesMut {
    let header = pb::RequestHeader {
        call_id,
        method_name: Some(method_name.to_string()),
        request_param: Some(true),
    };
    let header_bytes = header.encode_to_vec();
    assert!(
        header_bytes.len() <= u8::MAX as usize,
        "request header grew past the single-byte length field"
    );

    let mut req_bytes = BytesMut::new();
    body.encode(&mut req_bytes).expect("buffer has sufficient capacity");
    let mut req_len_bytes = BytesMut::new();
    varint::encode(req_bytes.len() as u64, &mut req_len_bytes);

    let total_size = 1 + header_bytes.len() + req_len_bytes.len() + req_bytes.len();

    let mut out = BytesMut::with_capacity(total_size);
    out.put_u8(header_bytes.len() as u8);
    out.put_slice(&header_bytes);
    out.put_slice(&req_len_bytes);
    out.put_slice(&req_bytes);
    out
}

/// A decoded response frame: the header's call id, plus either a
/// server-side exception class name or the still-encoded payload bytes.
pub struct DecodedResponse {
    pub call_id: u32,
    pub exception_class_name: Option<String>,
    pub payload: Bytes,
}

/// Decodes a response frame body (the bytes *after* the 4-byte total-size
/// prefix has already been stripped off by the reader).
pub fn decode_response(data: &[u8]) -> Result<DecodedResponse, ProtocolError> {
    let (header_size, header_start) = varint::decode(data, 0)?;
    let header_end = header_start + header_size as usize;
    if header_end > data.len() {
        return Err(ProtocolError::HeaderSizeOverflow(header_size as usize));
    }

    let header = pb::ResponseHeader::decode(&data[header_start..header_end])?;
    let exception_class_name = header
        .exception
        .as_ref()
        .and_then(|e| e.exception_class_name.clone());

    Ok(DecodedResponse {
        call_id: header.call_id,
        exception_class_name,
        payload: Bytes::copy_from_slice(&data[header_end..]),
    })
}

/// Splits a decoded response's payload into the declared length and the
/// message bytes that follow (a varint-prefixed `prost` message).
pub fn split_payload(payload: &[u8]) -> Result<&[u8], ProtocolError> {
    let (len, start) = varint::decode(payload, 0)?;
    let end = start + len as usize;
    if end > payload.len() {
        return Err(ProtocolError::HeaderSizeOverflow(len as usize));
    }
    Ok(&payload[start..end])
}

/// Consumes a `Buf`-style cursor's remaining bytes as an owned `Bytes`.
pub fn remaining_bytes(buf: &mut impl Buf) -> Bytes {
    buf.copy_to_bytes(buf.remaining())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_frame_round_trips_through_the_header() {
        let get = pb::GetRequest {
            region: Some(pb::RegionSpecifier::by_name(b"t1,,1.abc.")),
            get: Some(pb::Get {
                row: b"row-1".to_vec(),
                column: vec![],
                filter: None,
            }),
        };
        let body = encode_request(7, "Get", &get);

        let header_size = body[0] as usize;
        let header = pb::RequestHeader::decode(&body[1..1 + header_size]).unwrap();
        assert_eq!(header.call_id, 7);
        assert_eq!(header.method_name.as_deref(), Some("Get"));

        let rest = &body[1 + header_size..];
        let (req_len, req_start) = varint::decode(rest, 0).unwrap();
        let decoded = pb::GetRequest::decode(&rest[req_start..req_start + req_len as usize]).unwrap();
        assert_eq!(decoded, get);
    }

    #[test]
    fn response_frame_carries_call_id_through_success_and_error() {
        let mut header_bytes = BytesMut::new();
        let header = pb::ResponseHeader {
            call_id: 42,
            exception: None,
        };
        header.encode(&mut header_bytes).unwrap();

        let mut frame = BytesMut::new();
        varint::encode(header_bytes.len() as u64, &mut frame);
        frame.put_slice(&header_bytes);
        frame.put_slice(b"payload-bytes");

        let decoded = decode_response(&frame).unwrap();
        assert_eq!(decoded.call_id, 42);
        assert!(decoded.exception_class_name.is_none());
        assert_eq!(&decoded.payload[..], b"payload-bytes");

        let mut err_header_bytes = BytesMut::new();
        let err_header = pb::ResponseHeader {
            call_id: 42,
            exception: Some(pb::ExceptionResponse {
                exception_class_name: Some("java.io.IOException".to_string()),
                stack_trace: None,
            }),
        };
        err_header.encode(&mut err_header_bytes).unwrap();
        let mut err_frame = BytesMut::new();
        varint::encode(err_header_bytes.len() as u64, &mut err_frame);
        err_frame.put_slice(&err_header_bytes);

        let decoded_err = decode_response(&err_frame).unwrap();
        assert_eq!(decoded_err.call_id, 42);
        assert_eq!(decoded_err.exception_class_name.as_deref(), Some("java.io.IOException"));
    }

    #[test]
    fn truncated_header_is_rejected() {
        let mut frame = BytesMut::new();
        varint::encode(100, &mut frame); // claims a 100-byte header, but there's none
        let err = decode_response(&frame).unwrap_err();
        assert!(matches!(err, ProtocolError::HeaderSizeOverflow(100)));
    }
}
