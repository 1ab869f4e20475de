//! Fixture builders for synthetic ZIP and HashFS v1 archives.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::{DeflateEncoder, ZlibEncoder};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use scsarc::hash::hash_path_salted;

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

fn put16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub struct ZipEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub method: u16,
    /// Extra bytes in the local header only, absent from the central directory.
    pub local_extra: Vec<u8>,
}

#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<ZipEntry>,
    comment: Vec<u8>,
    cd_trailer: Vec<u8>,
    zip64: bool,
    declared_sizes: BTreeMap<usize, u64>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(ZipEntry {
            name: name.to_string(),
            data: data.to_vec(),
            method: 0,
            local_extra: Vec::new(),
        });
        self
    }

    pub fn deflated(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(ZipEntry {
            name: name.to_string(),
            data: data.to_vec(),
            method: 8,
            local_extra: Vec::new(),
        });
        self
    }

    pub fn entry(mut self, entry: ZipEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn directory(self, name: &str) -> Self {
        self.stored(name, b"")
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Bytes appended inside the declared central directory span.
    pub fn cd_trailer(mut self, bytes: &[u8]) -> Self {
        self.cd_trailer = bytes.to_vec();
        self
    }

    /// Declare `size` as the last entry's uncompressed size through a ZIP64
    /// extra field in its central directory record.
    pub fn declared_size(mut self, size: u64) -> Self {
        let index = self.entries.len() - 1;
        self.declared_sizes.insert(index, size);
        self
    }

    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for (index, entry) in self.entries.iter().enumerate() {
            let declared_size = self.declared_sizes.get(&index).copied();
            let payload = match entry.method {
                8 => deflate(&entry.data),
                _ => entry.data.clone(),
            };
            let crc = crc32(&entry.data);
            let lfh_offset = out.len() as u32;

            put32(&mut out, 0x04034B50);
            put16(&mut out, 20);
            put16(&mut out, 0);
            put16(&mut out, entry.method);
            put16(&mut out, 0);
            put16(&mut out, 0);
            put32(&mut out, crc);
            put32(&mut out, payload.len() as u32);
            put32(&mut out, entry.data.len() as u32);
            put16(&mut out, entry.name.len() as u16);
            put16(&mut out, entry.local_extra.len() as u16);
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&entry.local_extra);
            out.extend_from_slice(&payload);

            put32(&mut central, 0x02014B50);
            put16(&mut central, 20);
            put16(&mut central, 20);
            put16(&mut central, 0);
            put16(&mut central, entry.method);
            put16(&mut central, 0);
            put16(&mut central, 0);
            put32(&mut central, crc);
            put32(&mut central, payload.len() as u32);
            match declared_size {
                Some(_) => put32(&mut central, 0xFFFFFFFF),
                None => put32(&mut central, entry.data.len() as u32),
            }
            put16(&mut central, entry.name.len() as u16);
            put16(&mut central, if declared_size.is_some() { 12 } else { 0 });
            put16(&mut central, 0);
            put16(&mut central, 0);
            put16(&mut central, 0);
            put32(&mut central, 0);
            put32(&mut central, lfh_offset);
            central.extend_from_slice(entry.name.as_bytes());
            if let Some(size) = declared_size {
                put16(&mut central, 0x0001);
                put16(&mut central, 8);
                put64(&mut central, size);
            }
        }
        central.extend_from_slice(&self.cd_trailer);

        let cd_offset = out.len() as u64;
        let cd_size = central.len() as u64;
        let count = self.entries.len() as u64;
        out.extend_from_slice(&central);

        if self.zip64 {
            let eocd64_offset = out.len() as u64;
            put32(&mut out, 0x06064B50);
            put64(&mut out, 44);
            put16(&mut out, 45);
            put16(&mut out, 45);
            put32(&mut out, 0);
            put32(&mut out, 0);
            put64(&mut out, count);
            put64(&mut out, count);
            put64(&mut out, cd_size);
            put64(&mut out, cd_offset);

            put32(&mut out, 0x07064B50);
            put32(&mut out, 0);
            put64(&mut out, eocd64_offset);
            put32(&mut out, 1);
        }

        put32(&mut out, 0x06054B50);
        put16(&mut out, 0);
        put16(&mut out, 0);
        if self.zip64 {
            put16(&mut out, 0xFFFF);
            put16(&mut out, 0xFFFF);
            put32(&mut out, 0xFFFFFFFF);
            put32(&mut out, 0xFFFFFFFF);
        } else {
            put16(&mut out, count as u16);
            put16(&mut out, count as u16);
            put32(&mut out, cd_size as u32);
            put32(&mut out, cd_offset as u32);
        }
        put16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);
        out
    }
}

/// Little-endian u32 at `offset`, for patching built archives.
pub fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

/// Offset of the central directory of an archive built without a comment.
pub fn cd_offset(data: &[u8]) -> usize {
    read_u32(data, data.len() - 22 + 16) as usize
}

/// A bare EOCD record with no central directory behind it.
pub fn eocd_only(cd_offset: u32, cd_size: u32) -> Vec<u8> {
    let mut out = Vec::new();
    put32(&mut out, 0x06054B50);
    put16(&mut out, 0);
    put16(&mut out, 0);
    put16(&mut out, 0);
    put16(&mut out, 0);
    put32(&mut out, cd_size);
    put32(&mut out, cd_offset);
    put16(&mut out, 0);
    out
}

#[derive(Default)]
pub struct ScsBuilder {
    salt: u16,
    version: u16,
    files: Vec<(String, Vec<u8>, bool)>,
    compress_listings: bool,
    omit: BTreeSet<String>,
    orphans: Vec<Vec<u8>>,
    extra_listing_lines: Vec<(String, String)>,
}

impl ScsBuilder {
    pub fn new() -> Self {
        Self {
            version: 1,
            ..Default::default()
        }
    }

    pub fn salt(mut self, salt: u16) -> Self {
        self.salt = salt;
        self
    }

    pub fn version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.files.push((path.to_string(), data.to_vec(), false));
        self
    }

    pub fn compressed_file(mut self, path: &str, data: &[u8]) -> Self {
        self.files.push((path.to_string(), data.to_vec(), true));
        self
    }

    pub fn compress_listings(mut self) -> Self {
        self.compress_listings = true;
        self
    }

    /// Keep `path` in its parent's listing but leave it out of the table.
    pub fn omit_from_table(mut self, path: &str) -> Self {
        self.omit.insert(path.to_string());
        self
    }

    /// A table entry no listing mentions.
    pub fn orphan(mut self, data: &[u8]) -> Self {
        self.orphans.push(data.to_vec());
        self
    }

    /// A raw line appended to a directory listing.
    pub fn listing_line(mut self, dir: &str, line: &str) -> Self {
        self.extra_listing_lines
            .push((dir.to_string(), line.to_string()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut dirs: BTreeMap<String, (BTreeSet<String>, BTreeSet<String>)> = BTreeMap::new();
        dirs.insert(String::new(), Default::default());
        for (path, _, _) in &self.files {
            let segments: Vec<&str> = path.split('/').collect();
            for depth in 0..segments.len() {
                let parent = segments[..depth].join("/");
                let name = segments[depth].to_string();
                let entry = dirs.entry(parent).or_default();
                if depth + 1 == segments.len() {
                    entry.1.insert(name);
                } else {
                    entry.0.insert(name);
                    dirs.entry(segments[..=depth].join("/")).or_default();
                }
            }
        }

        // (hash, flags, data as stored, uncompressed size)
        let mut blobs: Vec<(u64, u32, Vec<u8>, u32)> = Vec::new();

        for (dir, (subdirs, files)) in &dirs {
            let mut text = String::new();
            for sub in subdirs {
                text.push_str(&format!("*{}\r\n", sub));
            }
            for file in files {
                text.push_str(&format!("{}\r\n", file));
            }
            for (target, line) in &self.extra_listing_lines {
                if target == dir {
                    text.push_str(&format!("{}\r\n", line));
                }
            }
            if self.omit.contains(dir) {
                continue;
            }
            let raw = text.into_bytes();
            let (flags, stored) = if self.compress_listings {
                (0x3, zlib(&raw))
            } else {
                (0x1, raw.clone())
            };
            blobs.push((hash_path_salted(dir, self.salt), flags, stored, raw.len() as u32));
        }

        for (path, data, compressed) in &self.files {
            if self.omit.contains(path) {
                continue;
            }
            let (flags, stored) = if *compressed {
                (0x2, zlib(data))
            } else {
                (0x0, data.clone())
            };
            blobs.push((hash_path_salted(path, self.salt), flags, stored, data.len() as u32));
        }

        for (i, data) in self.orphans.iter().enumerate() {
            let hash = hash_path_salted(&format!("orphan/{}", i), self.salt);
            blobs.push((hash, 0, data.clone(), data.len() as u32));
        }

        let mut out = Vec::new();
        out.extend_from_slice(b"SCS#");
        put16(&mut out, self.version);
        put16(&mut out, self.salt);
        out.extend_from_slice(b"CITY");
        put32(&mut out, blobs.len() as u32);
        put32(&mut out, 0); // patched below

        let mut table = Vec::new();
        for (hash, flags, stored, size) in &blobs {
            let offset = out.len() as u64;
            out.extend_from_slice(stored);
            put64(&mut table, *hash);
            put64(&mut table, offset);
            put32(&mut table, *flags);
            put32(&mut table, crc32(stored));
            put32(&mut table, *size);
            put32(&mut table, stored.len() as u32);
        }

        let table_offset = out.len() as u32;
        out[16..20].copy_from_slice(&table_offset.to_le_bytes());
        out.extend_from_slice(&table);
        out
    }
}
