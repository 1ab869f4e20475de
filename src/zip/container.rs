use log::{debug, info};

use crate::codec::Decompressor;
use crate::container::{ArchiveFormat, Container};
use crate::entry::{EntryKind, Payload, RawEntryRecord};
use crate::error::{Error, Result};
use crate::hash::{hash_path, normalize_path};
use crate::io::{RandomAccessReader, ReadAt};
use crate::options::{ArchiveOptions, SignaturePolicy};

use super::parser::ZipParser;
use super::structures::{CentralDirectoryLocation, CentralDirectoryRecord};

/// A ZIP-variant archive.
///
/// Opening locates the central directory; parsing walks it; reads go
/// through each entry's local file header.
#[derive(Debug)]
pub struct ZipContainer {
    name: String,
    location: CentralDirectoryLocation,
    trim_root: bool,
    signature_policy: SignaturePolicy,
}

impl ZipContainer {
    /// Locate the central directory of `source`.
    ///
    /// Returns `Ok(None)` when no EOCD record exists, so detection can
    /// report "not an archive" rather than "corrupt zip".
    pub fn open(name: &str, source: &dyn ReadAt, options: &ArchiveOptions) -> Result<Option<Self>> {
        let parser = ZipParser::new(name, source);
        let Some((eocd, eocd_offset)) = parser.find_eocd()? else {
            return Ok(None);
        };
        let location = parser.locate_central_directory(&eocd, eocd_offset)?;

        let trim_root = options.trims_root(name);
        if trim_root {
            info!("{}: stripping the top-level folder from every entry", name);
        }

        Ok(Some(Self {
            name: name.to_string(),
            location,
            trim_root,
            signature_policy: options.signature_policy,
        }))
    }

    /// Turn a central directory record into an indexable record.
    ///
    /// `None` for records that vanish under root trimming.
    fn to_raw_record(&self, record: CentralDirectoryRecord) -> Option<RawEntryRecord> {
        let kind = if record.is_directory() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };

        let mut path = normalize_path(&record.file_name);
        if self.trim_root {
            path = match path.split_once('/') {
                Some((_, rest)) => rest.to_string(),
                None => return None,
            };
        }
        if path.is_empty() {
            return None;
        }

        Some(RawEntryRecord {
            hash: hash_path(&path),
            path,
            kind,
            payload: Payload {
                offset: record.lfh_offset,
                compressed_size: record.compressed_size,
                uncompressed_size: record.uncompressed_size,
                method: record.compression_method,
            },
            crc32: record.crc32,
        })
    }
}

impl Container for ZipContainer {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    fn parse_records(
        &self,
        source: &dyn ReadAt,
        _decompressor: &Decompressor,
    ) -> Result<Vec<RawEntryRecord>> {
        let parser = ZipParser::new(&self.name, source);
        let records = parser.read_central_directory(&self.location, self.signature_policy)?;
        let total = records.len();

        let records: Vec<_> = records
            .into_iter()
            .filter_map(|record| self.to_raw_record(record))
            .collect();
        debug!(
            "{}: {} central directory records, {} indexed",
            self.name,
            total,
            records.len()
        );
        Ok(records)
    }

    fn read_payload(
        &self,
        source: &dyn ReadAt,
        payload: &Payload,
        decompressor: &Decompressor,
    ) -> Result<Vec<u8>> {
        if payload.uncompressed_size == 0 {
            return Ok(Vec::new());
        }

        let parser = ZipParser::new(&self.name, source);
        let data_offset = parser.data_offset(payload.offset)?;
        if data_offset
            .checked_add(payload.compressed_size)
            .is_none_or(|end| end > source.size())
        {
            return Err(Error::corrupt(
                &self.name,
                ArchiveFormat::Zip,
                format!(
                    "{} compressed bytes at offset {} run past end of file",
                    payload.compressed_size, data_offset
                ),
            ));
        }

        let (Ok(compressed_size), Ok(uncompressed_size)) = (
            usize::try_from(payload.compressed_size),
            usize::try_from(payload.uncompressed_size),
        ) else {
            return Err(Error::corrupt(
                &self.name,
                ArchiveFormat::Zip,
                "entry too large for this platform",
            ));
        };

        let mut reader = RandomAccessReader::at(source, data_offset);
        let raw = reader.read_exact(compressed_size)?;
        decompressor.decompress(payload.method, raw, uncompressed_size)
    }
}
