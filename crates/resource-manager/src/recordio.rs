//! RecordIO framing used by the resource manager event stream
//!
//! Every record is encoded as `<decimal length>\n<length bytes>`.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

use common::error::{Error, Result};

/// Upper bound on the length prefix, digits included
const MAX_HEADER_LEN: usize = 20;

/// Largest record accepted from the event stream
const MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

/// Decoder splitting a byte stream into RecordIO records
#[derive(Debug, Default)]
pub struct RecordIoCodec {
    /// Length of the record being read, once its header was consumed
    pending: Option<usize>,
}

impl RecordIoCodec {
    /// Creates a decoder positioned at a record boundary
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RecordIoCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        loop {
            match self.pending {
                None => {
                    let Some(newline) = src.iter().position(|b| *b == b'\n') else {
                        if src.len() > MAX_HEADER_LEN {
                            return Err(Error::Driver("RecordIO header too long".to_string()));
                        }
                        return Ok(None);
                    };

                    let header = src.split_to(newline + 1);
                    let text = std::str::from_utf8(&header[..newline])
                        .map_err(|_| Error::Driver("RecordIO header is not UTF-8".to_string()))?;
                    let len = text.trim().parse::<usize>().map_err(|_| {
                        Error::Driver(format!("Invalid RecordIO header: {:?}", text))
                    })?;
                    if len > MAX_RECORD_LEN {
                        return Err(Error::Driver("RecordIO record too large".to_string()));
                    }
                    self.pending = Some(len);
                }
                Some(len) => {
                    if src.len() < len {
                        src.reserve(len - src.len());
                        return Ok(None);
                    }
                    self.pending = None;
                    return Ok(Some(src.split_to(len).freeze()));
                }
            }
        }
    }
}
