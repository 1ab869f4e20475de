//! Format detection and the contract every container format implements.

use log::debug;
use std::fmt;

use crate::codec::Decompressor;
use crate::entry::{Payload, RawEntryRecord};
use crate::error::{Error, Result};
use crate::io::ReadAt;
use crate::options::ArchiveOptions;
use crate::scs::ScsV1Container;
use crate::zip::ZipContainer;

/// Archive formats this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Zip,
    /// HashFS v1, magic `SCS#`.
    ScsV1,
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Zip => write!(f, "zip"),
            ArchiveFormat::ScsV1 => write!(f, "HashFS v1"),
        }
    }
}

/// One archive format's view of an open source.
///
/// Implementations hold only what they learned while detecting the format
/// (header fields, index location). The source itself is owned by the
/// [`ArchiveHandle`](crate::ArchiveHandle) and passed in on every call.
pub trait Container: Send + Sync {
    fn format(&self) -> ArchiveFormat;

    /// Hash salt for synthesized entries.
    fn salt(&self) -> u16 {
        0
    }

    /// Parse the index into flat records. Runs sequentially to completion.
    fn parse_records(
        &self,
        source: &dyn ReadAt,
        decompressor: &Decompressor,
    ) -> Result<Vec<RawEntryRecord>>;

    /// Read and decode one entry's bytes.
    fn read_payload(
        &self,
        source: &dyn ReadAt,
        payload: &Payload,
        decompressor: &Decompressor,
    ) -> Result<Vec<u8>>;
}

/// Sniff the format of `source` and open the matching container.
///
/// The `SCS#` magic selects HashFS; anything else must carry a ZIP end of
/// central directory record.
///
/// # Errors
///
/// [`Error::Format`] with no format when neither matches.
pub fn detect(
    name: &str,
    source: &dyn ReadAt,
    options: &ArchiveOptions,
) -> Result<Box<dyn Container>> {
    let mut magic = [0u8; 4];
    if source.size() >= magic.len() as u64 {
        source.read_exact_at(0, &mut magic)?;
        if ScsV1Container::detect(&magic) {
            debug!("{}: detected {}", name, ArchiveFormat::ScsV1);
            return Ok(Box::new(ScsV1Container::open(name, source)?));
        }
    }

    match ZipContainer::open(name, source, options)? {
        Some(container) => {
            debug!("{}: detected {}", name, ArchiveFormat::Zip);
            Ok(Box::new(container))
        }
        None => Err(Error::not_an_archive(
            name,
            "no HashFS magic and no zip end of central directory record",
        )),
    }
}
