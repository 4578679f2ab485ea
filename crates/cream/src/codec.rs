//! Wire codec for the one-shot request/response protocol.
//!
//! A request is a 12-byte header (`request_code`, `key_size`, `value_size`,
//! all little-endian `u32`) followed by `key_size` key bytes and, for `PUT`,
//! `value_size` value bytes. A response is an 8-byte header
//! (`response_code`, `value_size`) followed by `value_size` body bytes. The
//! body is non-empty only for a `GET` hit.
//!
//! Every frame fits in [`CMSGSIZE`] bytes; the connection layer reads and
//! writes through fixed buffers of exactly that size, so nothing here
//! allocates for headers.

use bytes::{Buf, BufMut};
use thiserror::Error;

use crate::types::{MAX_KEY_SIZE, MAX_VALUE_SIZE, MIN_KEY_SIZE, MIN_VALUE_SIZE};

/// Bytes in a request header: three `u32` fields.
pub const REQUEST_HEADER_LEN: usize = 12;

/// Bytes in a response header: two `u32` fields.
pub const RESPONSE_HEADER_LEN: usize = 8;

/// Largest possible frame: a maximal `PUT` request. Also comfortably bounds
/// every response, whose body never exceeds [`MAX_VALUE_SIZE`].
pub const CMSGSIZE: usize = MAX_KEY_SIZE + MAX_VALUE_SIZE + REQUEST_HEADER_LEN;

/// On-the-wire request codes.
pub mod request_code {
    pub const PUT: u32 = 0x01;
    pub const GET: u32 = 0x02;
    pub const EVICT: u32 = 0x03;
    pub const CLEAR: u32 = 0x04;
}

/// On-the-wire response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ResponseCode {
    Ok = 0x01,
    NotFound = 0x02,
    BadRequest = 0x03,
    Unsupported = 0x04,
}

impl TryFrom<u32> for ResponseCode {
    type Error = DecodeError;

    fn try_from(raw: u32) -> Result<Self, DecodeError> {
        match raw {
            0x01 => Ok(Self::Ok),
            0x02 => Ok(Self::NotFound),
            0x03 => Ok(Self::BadRequest),
            0x04 => Ok(Self::Unsupported),
            other => Err(DecodeError::UnknownCode(other)),
        }
    }
}

/// A decoded request, borrowing its payload from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    Put { key: &'a [u8], value: &'a [u8] },
    Get { key: &'a [u8] },
    Evict { key: &'a [u8] },
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ends before the header, or before the payload the header
    /// promised.
    #[error("frame is shorter than its header declares")]
    Truncated,

    /// A size field falls outside the protocol bounds.
    #[error("key or value size outside protocol bounds")]
    BadSizes,

    /// A code this protocol version does not know.
    #[error("unknown wire code {0:#04x}")]
    UnknownCode(u32),
}

/// Decode one request frame from `buf` (the bytes actually received).
pub fn decode_request(buf: &[u8]) -> Result<Request<'_>, DecodeError> {
    if buf.len() < REQUEST_HEADER_LEN {
        return Err(DecodeError::Truncated);
    }
    let mut header = &buf[..REQUEST_HEADER_LEN];
    let code = header.get_u32_le();
    let key_size = header.get_u32_le() as usize;
    let value_size = header.get_u32_le() as usize;
    let payload = &buf[REQUEST_HEADER_LEN..];

    match code {
        request_code::PUT => {
            if !(MIN_KEY_SIZE..=MAX_KEY_SIZE).contains(&key_size)
                || !(MIN_VALUE_SIZE..=MAX_VALUE_SIZE).contains(&value_size)
            {
                return Err(DecodeError::BadSizes);
            }
            if payload.len() < key_size + value_size {
                return Err(DecodeError::Truncated);
            }
            Ok(Request::Put {
                key: &payload[..key_size],
                value: &payload[key_size..key_size + value_size],
            })
        }
        request_code::GET | request_code::EVICT => {
            // value_size is ignored for these operations.
            if !(MIN_KEY_SIZE..=MAX_KEY_SIZE).contains(&key_size) {
                return Err(DecodeError::BadSizes);
            }
            if payload.len() < key_size {
                return Err(DecodeError::Truncated);
            }
            let key = &payload[..key_size];
            if code == request_code::GET {
                Ok(Request::Get { key })
            } else {
                Ok(Request::Evict { key })
            }
        }
        request_code::CLEAR => Ok(Request::Clear),
        other => Err(DecodeError::UnknownCode(other)),
    }
}

/// Encode `req` into `out`, returning the frame length. `out` must hold at
/// least [`CMSGSIZE`] bytes.
pub fn encode_request(req: &Request<'_>, out: &mut [u8]) -> usize {
    let (code, key, value): (u32, &[u8], &[u8]) = match req {
        Request::Put { key, value } => (request_code::PUT, key, value),
        Request::Get { key } => (request_code::GET, key, &[]),
        Request::Evict { key } => (request_code::EVICT, key, &[]),
        Request::Clear => (request_code::CLEAR, &[], &[]),
    };
    let mut cursor = &mut out[..];
    cursor.put_u32_le(code);
    cursor.put_u32_le(key.len() as u32);
    cursor.put_u32_le(value.len() as u32);
    cursor.put_slice(key);
    cursor.put_slice(value);
    REQUEST_HEADER_LEN + key.len() + value.len()
}

/// Encode a response into `out`, returning the frame length. `out` must hold
/// at least `RESPONSE_HEADER_LEN + body.len()` bytes.
pub fn encode_response(code: ResponseCode, body: &[u8], out: &mut [u8]) -> usize {
    let mut cursor = &mut out[..];
    cursor.put_u32_le(code as u32);
    cursor.put_u32_le(body.len() as u32);
    cursor.put_slice(body);
    RESPONSE_HEADER_LEN + body.len()
}

/// Decode a response header, returning the code and the body length that
/// follows it.
pub fn decode_response_header(buf: &[u8]) -> Result<(ResponseCode, usize), DecodeError> {
    if buf.len() < RESPONSE_HEADER_LEN {
        return Err(DecodeError::Truncated);
    }
    let mut header = &buf[..RESPONSE_HEADER_LEN];
    let code = ResponseCode::try_from(header.get_u32_le())?;
    let value_size = header.get_u32_le() as usize;
    Ok((code, value_size))
}
