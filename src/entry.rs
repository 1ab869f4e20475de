//! Parsed entries and the stores indexing them.
//!
//! Containers produce flat [`RawEntryRecord`]s. [`Entries::build`] runs them
//! through the [`DirectoryTreeBuilder`], then materializes immutable
//! [`FileEntry`] and [`DirectoryEntry`] values indexed by hash and by path.

use log::debug;
use std::collections::{BTreeSet, HashMap};

use crate::codec::CompressionMethod;
use crate::hash::{hash_path_salted, normalize_path};
use crate::tree::DirectoryTreeBuilder;

/// Kind of a parsed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Where an entry's bytes live and how they are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    /// Container-specific locator: the local file header offset for ZIP,
    /// the data offset for HashFS.
    pub offset: u64,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub method: CompressionMethod,
}

/// Format-specific metadata for one record, before any bytes are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntryRecord {
    /// Normalized path.
    pub path: String,
    pub hash: u64,
    pub kind: EntryKind,
    pub payload: Payload,
    pub crc32: u32,
}

/// A file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub hash: u64,
    pub path: String,
    pub payload: Payload,
    pub crc32: u32,
}

impl FileEntry {
    /// Uncompressed size in bytes.
    pub fn size(&self) -> u64 {
        self.payload.uncompressed_size
    }
}

/// A directory and the names of its immediate children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub hash: u64,
    pub path: String,
    pub subdirectories: BTreeSet<String>,
    pub files: BTreeSet<String>,
}

/// A file or a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File(FileEntry),
    Directory(DirectoryEntry),
}

impl Entry {
    pub fn hash(&self) -> u64 {
        match self {
            Entry::File(file) => file.hash,
            Entry::Directory(dir) => dir.hash,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Entry::File(file) => &file.path,
            Entry::Directory(dir) => &dir.path,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }
}

/// Entries addressable by path hash and by normalized path.
#[derive(Debug, Clone)]
pub struct EntryStore<T> {
    by_hash: HashMap<u64, T>,
    by_path: HashMap<String, u64>,
}

impl<T> Default for EntryStore<T> {
    fn default() -> Self {
        Self {
            by_hash: HashMap::new(),
            by_path: HashMap::new(),
        }
    }
}

impl<T> EntryStore<T> {
    fn insert(&mut self, hash: u64, path: String, value: T) -> bool {
        let replaced = self.by_hash.insert(hash, value).is_some();
        self.by_path.insert(path, hash);
        replaced
    }

    pub fn get(&self, hash: u64) -> Option<&T> {
        self.by_hash.get(&hash)
    }

    /// Look up by path. The path is normalized first.
    pub fn get_by_path(&self, path: &str) -> Option<&T> {
        let hash = self.by_path.get(&normalize_path(path))?;
        self.by_hash.get(hash)
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Iterate entries in no particular order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.by_hash.values()
    }

    /// Paths in sorted order.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.by_path.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

/// Everything one archive contains.
#[derive(Debug, Clone, Default)]
pub struct Entries {
    pub directories: EntryStore<DirectoryEntry>,
    pub files: EntryStore<FileEntry>,
    /// Hash salt the archive was built with; 0 for ZIP archives.
    pub salt: u16,
}

impl Entries {
    /// Build the stores from flat records.
    ///
    /// Directories without a record of their own are synthesized and hashed
    /// with `salt`. A later file record for an already-seen path replaces the
    /// earlier one.
    pub fn build(records: Vec<RawEntryRecord>, salt: u16) -> Self {
        let mut builder = DirectoryTreeBuilder::new();
        let mut directory_hashes = HashMap::new();
        let mut file_records = Vec::new();

        for record in records {
            match record.kind {
                EntryKind::Directory => {
                    builder.add_directory(&record.path);
                    directory_hashes.insert(record.path, record.hash);
                }
                EntryKind::File => {
                    builder.add_file(&record.path);
                    file_records.push(record);
                }
            }
        }

        let tree = builder.build();
        let mut entries = Entries {
            salt,
            ..Default::default()
        };

        for (path, node) in tree.into_nodes() {
            let hash = directory_hashes
                .get(&path)
                .copied()
                .unwrap_or_else(|| hash_path_salted(&path, salt));
            let dir = DirectoryEntry {
                hash,
                path: path.clone(),
                subdirectories: node.subdirectories,
                files: node.files,
            };
            entries.directories.insert(hash, path, dir);
        }

        for record in file_records {
            let file = FileEntry {
                hash: record.hash,
                path: record.path.clone(),
                payload: record.payload,
                crc32: record.crc32,
            };
            if entries.files.insert(record.hash, record.path, file) {
                debug!("duplicate record for hash {:016x}, keeping the last", record.hash);
            }
        }

        entries
    }

    pub fn root(&self) -> Option<&DirectoryEntry> {
        self.directories.get_by_path("")
    }

    pub fn file_by_path(&self, path: &str) -> Option<&FileEntry> {
        self.files.get_by_path(path)
    }

    pub fn directory_by_path(&self, path: &str) -> Option<&DirectoryEntry> {
        self.directories.get_by_path(path)
    }

    pub fn file_by_hash(&self, hash: u64) -> Option<&FileEntry> {
        self.files.get(hash)
    }

    pub fn directory_by_hash(&self, hash: u64) -> Option<&DirectoryEntry> {
        self.directories.get(hash)
    }

    /// Look up either kind by path; directories win if both exist.
    pub fn entry(&self, path: &str) -> Option<Entry> {
        if let Some(dir) = self.directory_by_path(path) {
            return Some(Entry::Directory(dir.clone()));
        }
        self.file_by_path(path).cloned().map(Entry::File)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_path;

    fn record(path: &str, kind: EntryKind, size: u64) -> RawEntryRecord {
        RawEntryRecord {
            path: path.to_string(),
            hash: hash_path(path),
            kind,
            payload: Payload {
                offset: 0,
                compressed_size: size,
                uncompressed_size: size,
                method: CompressionMethod::None,
            },
            crc32: 0,
        }
    }

    #[test]
    fn test_build_synthesizes_directories() {
        let entries = Entries::build(
            vec![
                record("def/vehicle/truck.sii", EntryKind::File, 10),
                record("def/city.sii", EntryKind::File, 20),
            ],
            0,
        );

        assert_eq!(entries.files.len(), 2);
        assert_eq!(entries.directories.len(), 3);

        let def = entries.directory_by_path("def").unwrap();
        assert_eq!(def.hash, hash_path("def"));
        assert!(def.subdirectories.contains("vehicle"));
        assert!(def.files.contains("city.sii"));

        let truck = entries.file_by_hash(hash_path("def/vehicle/truck.sii")).unwrap();
        assert_eq!(truck.size(), 10);
        assert_eq!(entries.root().unwrap().hash, hash_path(""));
    }

    #[test]
    fn test_explicit_directory_hash_is_kept() {
        let mut dir = record("map", EntryKind::Directory, 0);
        dir.hash = 0x1234;
        let entries = Entries::build(vec![dir], 7);

        assert_eq!(entries.directory_by_path("map").unwrap().hash, 0x1234);
        assert_eq!(entries.root().unwrap().hash, hash_path_salted("", 7));
        assert_eq!(entries.salt, 7);
    }

    #[test]
    fn test_lookup_normalizes_path() {
        let entries = Entries::build(vec![record("a/b.txt", EntryKind::File, 1)], 0);
        assert!(entries.file_by_path("/a\\b.txt").is_some());
        assert!(matches!(entries.entry("a/"), Some(Entry::Directory(_))));
        let file = entries.entry("a/b.txt").unwrap();
        assert!(!file.is_directory());
        assert_eq!(file.path(), "a/b.txt");
        assert_eq!(file.hash(), hash_path("a/b.txt"));
        assert!(entries.entry("missing").is_none());
    }

    #[test]
    fn test_empty_records_yield_root_only() {
        let entries = Entries::build(Vec::new(), 0);
        assert!(entries.files.is_empty());
        assert_eq!(entries.directories.len(), 1);
        assert_eq!(entries.directories.paths(), vec![""]);
    }
}
