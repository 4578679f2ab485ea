//! The per-connection request/response state machine.
//!
//! Each worker loops forever: pop a connection from the handoff, read one
//! frame, dispatch into the cache, write one response, close. A connection
//! carries exactly one request; there is no pipelining and no reuse. The
//! request and response buffers are fixed [`CMSGSIZE`] arrays reused across
//! iterations, so a worker's memory footprint does not depend on its
//! clients.

use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::Cache;
use crate::codec::{
    self, DecodeError, Request, ResponseCode, CMSGSIZE, REQUEST_HEADER_LEN,
};
use crate::handoff::Handoff;

/// How many interrupted reads or writes are retried before the connection is
/// abandoned.
const MAX_IO_RETRIES: u32 = 10;

/// Body of one worker thread. Returns when the handoff is invalidated.
pub(crate) fn worker_loop(handoff: Arc<Handoff<TcpStream>>, cache: Arc<Cache>) {
    let mut request = [0u8; CMSGSIZE];
    let mut response = [0u8; CMSGSIZE];
    loop {
        let stream = match handoff.pop() {
            Ok(stream) => stream,
            Err(_) => return,
        };
        serve_connection(&cache, stream, &mut request, &mut response);
    }
}

fn serve_connection(
    cache: &Cache,
    mut stream: TcpStream,
    request: &mut [u8; CMSGSIZE],
    response: &mut [u8; CMSGSIZE],
) {
    let received = match read_frame(&mut stream, request) {
        Ok(n) => n,
        Err(e) => {
            debug!(error = %e, "dropping connection on read failure");
            return;
        }
    };
    if received < REQUEST_HEADER_LEN {
        debug!(bytes = received, "short frame, dropping connection");
        return;
    }

    let (code, body) = dispatch(cache, &request[..received]);
    let frame = codec::encode_response(code, &body, response);
    if let Err(e) = write_frame(&mut stream, &response[..frame]) {
        if e.kind() == ErrorKind::BrokenPipe {
            debug!("peer went away before the response");
        } else {
            warn!(error = %e, "response write failed");
        }
    }
    // Dropping the stream closes the connection.
}

/// Map one decoded request onto the cache and produce the response code and
/// body. Inserts always force eviction: the protocol has no way to say
/// "try without making room".
fn dispatch(cache: &Cache, frame: &[u8]) -> (ResponseCode, Vec<u8>) {
    match codec::decode_request(frame) {
        Ok(Request::Get { key }) => {
            debug!(key_len = key.len(), "get request");
            match cache.get(key) {
                Ok(Some(value)) => (ResponseCode::Ok, value),
                Ok(None) => (ResponseCode::NotFound, Vec::new()),
                Err(_) => (ResponseCode::BadRequest, Vec::new()),
            }
        }
        Ok(Request::Put { key, value }) => {
            debug!(key_len = key.len(), value_len = value.len(), "put request");
            match cache.put(key, value, true) {
                Ok(()) => (ResponseCode::Ok, Vec::new()),
                Err(_) => (ResponseCode::BadRequest, Vec::new()),
            }
        }
        Ok(Request::Evict { key }) => {
            debug!(key_len = key.len(), "evict request");
            // Present or not, the outcome is the same: the key is gone.
            match cache.evict(key) {
                Ok(_) => (ResponseCode::Ok, Vec::new()),
                Err(_) => (ResponseCode::BadRequest, Vec::new()),
            }
        }
        Ok(Request::Clear) => {
            debug!("clear request");
            match cache.clear() {
                Ok(()) => (ResponseCode::Ok, Vec::new()),
                Err(_) => (ResponseCode::BadRequest, Vec::new()),
            }
        }
        Err(DecodeError::UnknownCode(code)) => {
            debug!(code, "unsupported request code");
            (ResponseCode::Unsupported, Vec::new())
        }
        Err(e) => {
            debug!(error = %e, "malformed request");
            (ResponseCode::BadRequest, Vec::new())
        }
    }
}

/// One read call for the whole frame, retrying only interruption.
fn read_frame(stream: &mut TcpStream, buf: &mut [u8]) -> io::Result<usize> {
    let mut retries = 0;
    loop {
        match stream.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted && retries < MAX_IO_RETRIES => {
                retries += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// One write call for the whole frame, retrying only interruption.
fn write_frame(stream: &mut TcpStream, frame: &[u8]) -> io::Result<()> {
    let mut retries = 0;
    loop {
        match stream.write(frame) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::Interrupted && retries < MAX_IO_RETRIES => {
                retries += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
