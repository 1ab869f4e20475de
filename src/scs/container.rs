use log::{debug, warn};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Cursor;

use crate::codec::{CompressionMethod, Decompressor};
use crate::container::{ArchiveFormat, Container};
use crate::entry::{EntryKind, Payload, RawEntryRecord};
use crate::error::{Error, Result};
use crate::hash::{hash_path_salted, join_path};
use crate::io::{RandomAccessReader, ReadAt};

use super::structures::*;

/// A HashFS v1 archive.
#[derive(Debug)]
pub struct ScsV1Container {
    name: String,
    header: ScsHeader,
}

impl ScsV1Container {
    pub fn detect(magic: &[u8]) -> bool {
        magic.starts_with(SCS_MAGIC)
    }

    /// Read the header. The header is not validated here; see
    /// [`ScsV1Container::is_valid`].
    pub fn open(name: &str, source: &dyn ReadAt) -> Result<Self> {
        let mut buf = [0u8; ScsHeader::SIZE];
        source.read_exact_at(0, &mut buf).map_err(|_| {
            Error::corrupt(name, ArchiveFormat::ScsV1, "truncated header")
        })?;
        let header = ScsHeader::from_bytes(&buf)?;
        Ok(Self {
            name: name.to_string(),
            header,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.header.is_valid()
    }

    pub fn hash(&self, path: &str) -> u64 {
        hash_path_salted(path, self.header.salt)
    }

    fn corrupt(&self, reason: impl Into<String>) -> Error {
        Error::corrupt(&self.name, ArchiveFormat::ScsV1, reason)
    }

    /// Read the whole entry table in one request.
    fn read_entry_table(&self, source: &dyn ReadAt) -> Result<HashMap<u64, ScsEntryRecord>> {
        let table_size = self.header.entry_count as u64 * ScsEntryRecord::SIZE as u64;
        let table_offset = self.header.entry_table_offset as u64;
        if table_offset + table_size > source.size() {
            return Err(self.corrupt(format!(
                "entry table of {} entries at offset {} runs past end of file",
                self.header.entry_count, table_offset
            )));
        }

        let mut reader = RandomAccessReader::at(source, table_offset);
        let table = reader
            .read_exact(table_size as usize)
            .map_err(|err| Error::truncated(err, &self.name, ArchiveFormat::ScsV1, "entry table"))?;
        let mut cursor = Cursor::new(table.as_slice());

        let mut entries = HashMap::with_capacity(self.header.entry_count as usize);
        for _ in 0..self.header.entry_count {
            let record = ScsEntryRecord::read(&mut cursor)?;
            entries.insert(record.hash, record);
        }
        Ok(entries)
    }

    fn payload_of(record: &ScsEntryRecord) -> Payload {
        Payload {
            offset: record.offset,
            compressed_size: record.compressed_size as u64,
            uncompressed_size: record.size as u64,
            method: if record.is_compressed() {
                CompressionMethod::Zlib
            } else {
                CompressionMethod::None
            },
        }
    }

    fn to_raw_record(path: String, record: &ScsEntryRecord) -> RawEntryRecord {
        RawEntryRecord {
            path,
            hash: record.hash,
            kind: if record.is_directory() {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
            payload: Self::payload_of(record),
            crc32: record.crc32,
        }
    }
}

impl Container for ScsV1Container {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::ScsV1
    }

    fn salt(&self) -> u16 {
        self.header.salt
    }

    /// Walk the directory listings breadth-first from the root.
    fn parse_records(
        &self,
        source: &dyn ReadAt,
        decompressor: &Decompressor,
    ) -> Result<Vec<RawEntryRecord>> {
        if !self.is_valid() {
            return Err(Error::Precondition(format!(
                "{}: unsupported HashFS header (version {}, hash method {:?})",
                self.name,
                self.header.version,
                String::from_utf8_lossy(&self.header.hash_method)
            )));
        }

        let table = self.read_entry_table(source)?;
        let mut records = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([String::new()]);

        if !table.contains_key(&self.hash("")) {
            warn!("{}: no root directory listing, nothing is addressable by path", self.name);
        }

        while let Some(dir_path) = queue.pop_front() {
            let hash = self.hash(&dir_path);
            let Some(record) = table.get(&hash) else {
                continue;
            };
            if !visited.insert(hash) {
                continue;
            }

            if !record.is_directory() {
                if !dir_path.is_empty() {
                    records.push(Self::to_raw_record(dir_path, record));
                }
                continue;
            }

            let listing = self.read_payload(source, &Self::payload_of(record), decompressor)?;
            let listing = parse_directory_listing(&listing);
            records.push(Self::to_raw_record(dir_path.clone(), record));

            for name in listing.subdirectories.iter().chain(listing.files.iter()) {
                let child = join_path(&dir_path, name);
                if table.contains_key(&self.hash(&child)) {
                    queue.push_back(child);
                } else {
                    debug!("{}: listed entry {} is not in the entry table", self.name, child);
                }
            }
        }

        let unreachable = table.len() - visited.len();
        if unreachable > 0 {
            debug!(
                "{}: {} entries are not reachable from the root and have no path",
                self.name, unreachable
            );
        }

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

        if payload
            .offset
            .checked_add(payload.compressed_size)
            .is_none_or(|end| end > source.size())
        {
            return Err(self.corrupt(format!(
                "{} compressed bytes at offset {} run past end of file",
                payload.compressed_size, payload.offset
            )));
        }

        let mut reader = RandomAccessReader::at(source, payload.offset);
        let raw = reader
            .read_exact(payload.compressed_size as usize)
            .map_err(|err| Error::truncated(err, &self.name, ArchiveFormat::ScsV1, "entry data"))?;
        decompressor.decompress(payload.method, raw, payload.uncompressed_size as usize)
    }
}
