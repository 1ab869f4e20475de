//! Compression method resolution and payload decoding.
//!
//! The raw primitives live behind [`RawCodec`], shaped like the native
//! libdeflate bindings the game tooling links against: each takes the
//! compressed bytes plus a preallocated output buffer and returns a status
//! code, `0` meaning success. [`Decompressor`] picks the primitive for an
//! entry's method and applies the handle's [`DecodePolicy`] on failure.

use flate2::{Decompress, FlushDecompress, Status};
use log::warn;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Primitive status: success.
pub const STATUS_OK: i32 = 0;
/// Primitive status: the input is not a valid stream.
pub const STATUS_BAD_DATA: i32 = 1;
/// Primitive status: the stream decoded to fewer bytes than expected.
pub const STATUS_SHORT_OUTPUT: i32 = 2;
/// Primitive status: the output buffer was too small.
pub const STATUS_INSUFFICIENT_SPACE: i32 = 3;
/// Primitive status: no implementation is available for this codec.
pub const STATUS_UNSUPPORTED: i32 = -1;

/// Size of the GDeflate tile-stream header preceding the tile data.
pub const TILE_STREAM_HEADER_SIZE: usize = 8;

/// Upper bound on how far one compressed byte can expand under deflate.
pub const MAX_DEFLATE_RATIO: usize = 1032;

/// Compression methods an entry can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    None,
    /// Raw deflate, ZIP method 8.
    Deflate,
    /// Zlib-wrapped deflate, used by compressed HashFS entries.
    Zlib,
    /// GPU-friendly tiled deflate.
    GDeflate,
    Unknown(u16),
}

impl CompressionMethod {
    /// Map a ZIP compression method code.
    pub fn from_zip(value: u16) -> Self {
        match value {
            0 => CompressionMethod::None,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMethod::None => write!(f, "stored"),
            CompressionMethod::Deflate => write!(f, "deflate"),
            CompressionMethod::Zlib => write!(f, "zlib"),
            CompressionMethod::GDeflate => write!(f, "gdeflate"),
            CompressionMethod::Unknown(code) => write!(f, "method {}", code),
        }
    }
}

/// What to do when a primitive reports failure for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Return [`Error::Decode`].
    #[default]
    Fail,
    /// Log a warning and hand back the still-compressed bytes.
    Passthrough,
}

/// Raw decompression primitives.
///
/// Each function fills `out` from `input` and returns a status code;
/// [`STATUS_OK`] means `out` was filled completely.
pub trait RawCodec: Send + Sync {
    fn deflate(&self, input: &[u8], out: &mut [u8]) -> i32;

    fn zlib(&self, input: &[u8], out: &mut [u8]) -> i32;

    /// `input` starts after the tile-stream header.
    fn gdeflate(&self, input: &[u8], out: &mut [u8]) -> i32;
}

/// flate2-backed primitives.
///
/// GDeflate has no pure-Rust decoder here; it reports [`STATUS_UNSUPPORTED`]
/// so callers wanting texture payloads can plug in a native codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlateCodec;

impl FlateCodec {
    fn inflate(input: &[u8], out: &mut [u8], zlib_header: bool) -> i32 {
        let mut decompress = Decompress::new(zlib_header);
        match decompress.decompress(input, out, FlushDecompress::Finish) {
            Ok(Status::StreamEnd) if decompress.total_out() as usize == out.len() => STATUS_OK,
            Ok(Status::StreamEnd) => STATUS_SHORT_OUTPUT,
            // Output full before the stream ended.
            Ok(_) if decompress.total_out() as usize == out.len() => STATUS_INSUFFICIENT_SPACE,
            Ok(_) => STATUS_SHORT_OUTPUT,
            Err(_) => STATUS_BAD_DATA,
        }
    }
}

impl RawCodec for FlateCodec {
    fn deflate(&self, input: &[u8], out: &mut [u8]) -> i32 {
        Self::inflate(input, out, false)
    }

    fn zlib(&self, input: &[u8], out: &mut [u8]) -> i32 {
        Self::inflate(input, out, true)
    }

    fn gdeflate(&self, _input: &[u8], _out: &mut [u8]) -> i32 {
        STATUS_UNSUPPORTED
    }
}

fn describe_status(status: i32) -> String {
    match status {
        STATUS_BAD_DATA => "corrupt compressed stream".to_string(),
        STATUS_SHORT_OUTPUT => "stream ended before the declared size".to_string(),
        STATUS_INSUFFICIENT_SPACE => "stream exceeds the declared size".to_string(),
        STATUS_UNSUPPORTED => "no decoder available".to_string(),
        other => format!("decoder status {}", other),
    }
}

/// Dispatches payloads to the right primitive.
#[derive(Clone)]
pub struct Decompressor {
    codec: Arc<dyn RawCodec>,
    policy: DecodePolicy,
}

impl Decompressor {
    pub fn new(codec: Arc<dyn RawCodec>, policy: DecodePolicy) -> Self {
        Self { codec, policy }
    }

    /// Decode `raw` to `uncompressed_size` bytes using `method`.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] for unknown methods regardless of policy;
    /// [`Error::Decode`] on primitive failure under [`DecodePolicy::Fail`].
    /// A declared size no deflate stream of `raw.len()` bytes can reach is
    /// a failure too, reported before any output is allocated.
    pub fn decompress(
        &self,
        method: CompressionMethod,
        raw: Vec<u8>,
        uncompressed_size: usize,
    ) -> Result<Vec<u8>> {
        let compressed = !matches!(
            method,
            CompressionMethod::None | CompressionMethod::Unknown(_)
        );
        if compressed && uncompressed_size / MAX_DEFLATE_RATIO > raw.len() {
            let reason = format!(
                "declared size {} is out of reach for {} compressed bytes",
                uncompressed_size,
                raw.len()
            );
            return self.on_failure(method, reason, raw);
        }

        let status_and_output = match method {
            CompressionMethod::None => return Ok(raw),
            CompressionMethod::Unknown(code) => return Err(Error::Unsupported(code)),
            CompressionMethod::Deflate => {
                let mut out = vec![0u8; uncompressed_size];
                (self.codec.deflate(&raw, &mut out), out)
            }
            CompressionMethod::Zlib => {
                let mut out = vec![0u8; uncompressed_size];
                (self.codec.zlib(&raw, &mut out), out)
            }
            CompressionMethod::GDeflate => {
                if raw.len() < TILE_STREAM_HEADER_SIZE {
                    (STATUS_BAD_DATA, Vec::new())
                } else {
                    let mut out = vec![0u8; uncompressed_size];
                    (
                        self.codec.gdeflate(&raw[TILE_STREAM_HEADER_SIZE..], &mut out),
                        out,
                    )
                }
            }
        };

        match status_and_output {
            (STATUS_OK, out) => Ok(out),
            (status, _) => self.on_failure(method, describe_status(status), raw),
        }
    }

    fn on_failure(&self, method: CompressionMethod, reason: String, raw: Vec<u8>) -> Result<Vec<u8>> {
        match self.policy {
            DecodePolicy::Fail => Err(Error::decode(method, reason)),
            DecodePolicy::Passthrough => {
                warn!(
                    "{} payload failed to decode ({}), returning raw bytes",
                    method, reason
                );
                Ok(raw)
            }
        }
    }
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new(Arc::new(FlateCodec), DecodePolicy::default())
    }
}

impl fmt::Debug for Decompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decompressor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
