//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Walk the Central Directory record by record
//! 4. For reads, consult each file's Local File Header for the data offset

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};
use std::io::{self, Cursor};

use crate::codec::CompressionMethod;
use crate::container::ArchiveFormat;
use crate::error::{Error, Result};
use crate::io::{RandomAccessReader, ReadAt};
use crate::options::SignaturePolicy;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level ZIP file parser.
///
/// Borrows the source for the duration of one operation; the owning
/// handle keeps the descriptor.
pub struct ZipParser<'a> {
    /// Archive name for error messages
    name: &'a str,
    /// The underlying data source
    reader: &'a dyn ReadAt,
    /// Total size of the archive in bytes
    size: u64,
}

impl<'a> ZipParser<'a> {
    pub fn new(name: &'a str, reader: &'a dyn ReadAt) -> Self {
        let size = reader.size();
        Self { name, reader, size }
    }

    fn corrupt(&self, reason: impl Into<String>) -> Error {
        Error::corrupt(self.name, ArchiveFormat::Zip, reason)
    }

    fn truncated<'s>(&'s self, what: &'s str) -> impl FnOnce(io::Error) -> Error + 's {
        move |err| Error::truncated(err, self.name, ArchiveFormat::Zip, what)
    }

    /// Whether an EOCD candidate at `eocd_offset` can be the real record.
    ///
    /// Its central directory must end before the record and start with a
    /// central directory signature. An empty directory is accepted as is.
    fn is_plausible(&self, eocd: &EndOfCentralDirectory, eocd_offset: u64) -> Result<bool> {
        if eocd.is_zip64() || eocd.cd_size == 0 {
            return Ok(true);
        }
        let cd_offset = eocd.cd_offset as u64;
        if cd_offset + eocd.cd_size as u64 > eocd_offset {
            return Ok(false);
        }
        let mut signature = [0u8; 4];
        self.reader.read_exact_at(cd_offset, &mut signature)?;
        Ok(u32::from_le_bytes(signature) == CDFH_SIGNATURE)
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Tries the no-comment position first, then scans backwards through
    /// the last `22 + 65535` bytes. Only candidates whose central directory
    /// lies before them and starts with a valid signature are considered, so
    /// signature lookalikes inside a comment are skipped. A candidate whose
    /// comment length reaches exactly to the end of the file wins. Failing
    /// that, the plausible candidate nearest the end is accepted, which
    /// tolerates producers that append bytes after the record.
    ///
    /// # Returns
    ///
    /// The EOCD and its offset, or `None` if this is not a ZIP file.
    pub fn find_eocd(&self) -> Result<Option<(EndOfCentralDirectory, u64)>> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if self.size < eocd_size {
            return Ok(None);
        }

        // Fast path: no comment
        let offset = self.size - eocd_size;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf)?;
        if let Some(eocd) = EndOfCentralDirectory::from_bytes(&buf) {
            if eocd.comment_len == 0 && self.is_plausible(&eocd, offset)? {
                return Ok(Some((eocd, offset)));
            }
        }

        let search_size = (MAX_COMMENT_SIZE + eocd_size).min(self.size);
        let search_start = self.size - search_size;
        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf)?;

        let signature_low = EndOfCentralDirectory::SIGNATURE as u8;
        let mut fallback = None;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if buf[i] != signature_low {
                continue;
            }
            let Some(eocd) = EndOfCentralDirectory::from_bytes(&buf[i..]) else {
                continue;
            };
            let eocd_offset = search_start + i as u64;
            if !self.is_plausible(&eocd, eocd_offset)? {
                continue;
            }

            if eocd.comment_len as usize == buf.len() - i - EndOfCentralDirectory::SIZE {
                return Ok(Some((eocd, eocd_offset)));
            }
            if fallback.is_none() {
                fallback = Some((eocd, eocd_offset));
            }
        }

        if let Some((_, offset)) = &fallback {
            warn!(
                "{}: end of central directory at {} does not match its comment length",
                self.name, offset
            );
        }
        Ok(fallback)
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD indicates ZIP64 extensions are needed
    /// (fields set to 0xFFFF or 0xFFFFFFFF).
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        // The ZIP64 EOCD Locator is located immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| self.corrupt("missing zip64 end of central directory locator"))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader
            .read_exact_at(locator_offset, &mut locator_buf)
            .map_err(self.truncated("zip64 end of central directory locator"))?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)
            .ok_or_else(|| self.corrupt("invalid zip64 end of central directory locator"))?;

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)
            .map_err(self.truncated("zip64 end of central directory"))?;

        Zip64EOCD::from_bytes(&eocd64_buf)
            .ok_or_else(|| self.corrupt("invalid zip64 end of central directory"))
    }

    /// Resolve the central directory location, following ZIP64 if needed.
    pub fn locate_central_directory(
        &self,
        eocd: &EndOfCentralDirectory,
        eocd_offset: u64,
    ) -> Result<CentralDirectoryLocation> {
        if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            Ok(CentralDirectoryLocation {
                offset: eocd64.cd_offset,
                size: eocd64.cd_size,
                total_entries: eocd64.total_entries,
            })
        } else {
            Ok(CentralDirectoryLocation {
                offset: eocd.cd_offset as u64,
                size: eocd.cd_size as u64,
                total_entries: eocd.total_entries as u64,
            })
        }
    }

    /// Walk the central directory.
    ///
    /// Records are read one at a time until the declared span is consumed.
    /// Each record's length is known only after its fixed header is read.
    /// The declared entry count is not trusted.
    pub fn read_central_directory(
        &self,
        location: &CentralDirectoryLocation,
        policy: SignaturePolicy,
    ) -> Result<Vec<CentralDirectoryRecord>> {
        let end = location
            .offset
            .checked_add(location.size)
            .ok_or_else(|| self.corrupt("central directory span overflows"))?;
        let mut reader = RandomAccessReader::at(self.reader, location.offset);
        let mut records = Vec::new();

        while reader.position() < end {
            let remaining = end - reader.position();
            let header = if remaining >= CDFH_SIZE as u64 {
                let fixed = reader
                    .read_exact(CDFH_SIZE)
                    .map_err(self.truncated("central directory"))?;
                CentralDirectoryHeader::from_bytes(&fixed)
            } else {
                None
            };

            let Some(header) = header else {
                let reason = format!(
                    "unexpected data at offset {} after {} central directory records",
                    reader.position(),
                    records.len()
                );
                match policy {
                    SignaturePolicy::Strict => return Err(self.corrupt(reason)),
                    SignaturePolicy::Stop => {
                        warn!("{}: {}, stopping", self.name, reason);
                        break;
                    }
                }
            };

            let name = reader
                .read_exact(header.file_name_length as usize)
                .map_err(self.truncated("central directory"))?;
            let extra = reader
                .read_exact(header.extra_field_length as usize)
                .map_err(self.truncated("central directory"))?;
            reader.advance(header.file_comment_length as u64);

            records.push(self.build_record(&header, &name, &extra)?);
        }

        if records.len() as u64 != location.total_entries {
            debug!(
                "{}: central directory declares {} entries, found {}",
                self.name,
                location.total_entries,
                records.len()
            );
        }

        Ok(records)
    }

    /// Combine the fixed header with its trailing fields.
    ///
    /// ZIP64 uses extra field ID 0x0001; its values are present only for
    /// header fields saturated to 0xFFFFFFFF, in a fixed order.
    fn build_record(
        &self,
        header: &CentralDirectoryHeader,
        name: &[u8],
        extra: &[u8],
    ) -> Result<CentralDirectoryRecord> {
        let mut compressed_size = header.compressed_size as u64;
        let mut uncompressed_size = header.uncompressed_size as u64;
        let mut lfh_offset = header.lfh_offset as u64;

        let mut cursor = Cursor::new(extra);
        let extra_end = extra.len() as u64;
        while cursor.position() + 4 <= extra_end {
            let header_id = cursor.read_u16::<LittleEndian>()?;
            let field_size = cursor.read_u16::<LittleEndian>()? as u64;
            let field_end = (cursor.position() + field_size).min(extra_end);

            if header_id == 0x0001 {
                if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    uncompressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    compressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    lfh_offset = cursor.read_u64::<LittleEndian>()?;
                }
            }
            cursor.set_position(field_end);
        }

        Ok(CentralDirectoryRecord {
            // Lossy conversion handles non-UTF8 names from old packagers
            file_name: String::from_utf8_lossy(name).into_owned(),
            compression_method: CompressionMethod::from_zip(header.compression_method),
            compressed_size,
            uncompressed_size,
            crc32: header.crc32,
            lfh_offset,
            last_mod_time: header.last_mod_time,
            last_mod_date: header.last_mod_date,
        })
    }

    /// Get the actual data offset for a record.
    ///
    /// The Local File Header's name and extra field lengths may differ
    /// from the Central Directory's, so they are read from the LFH itself.
    pub fn data_offset(&self, lfh_offset: u64) -> Result<u64> {
        let mut reader = RandomAccessReader::at(self.reader, lfh_offset);
        let signature = reader
            .read_u32_le()
            .map_err(self.truncated("local file header"))?;
        if signature != LFH_SIGNATURE {
            return Err(self.corrupt(format!("invalid local file header at offset {}", lfh_offset)));
        }

        reader.seek_to(lfh_offset + LFH_NAME_LENGTH_OFFSET);
        let file_name_length = reader
            .read_u16_le()
            .map_err(self.truncated("local file header"))? as u64;
        let extra_field_length = reader
            .read_u16_le()
            .map_err(self.truncated("local file header"))? as u64;

        // Data starts after: LFH (30 bytes) + filename + extra field
        Ok(lfh_offset + LFH_SIZE + file_name_length + extra_field_length)
    }
}
