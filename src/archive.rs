//! The archive handle: one open file, one detected format, one memoized
//! set of entries.

use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::codec::Decompressor;
use crate::container::{self, ArchiveFormat, Container};
use crate::entry::{Entries, FileEntry};
use crate::error::Result;
use crate::io::{LocalFileReader, ReadAt};
use crate::options::ArchiveOptions;

/// An open archive.
///
/// Owns the descriptor. Entries are parsed on the first call to
/// [`parse_entries`](Self::parse_entries) and kept for the handle's life.
/// A handle has one logical owner at a time; independent handles may be
/// used from different threads.
pub struct ArchiveHandle<R: ReadAt = LocalFileReader> {
    name: String,
    reader: R,
    container: Box<dyn Container>,
    decompressor: Decompressor,
    entries: Option<Entries>,
}

impl ArchiveHandle<LocalFileReader> {
    /// Open an archive with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &ArchiveOptions::default())
    }

    /// Open an archive, sniffing its format.
    ///
    /// # Errors
    ///
    /// [`Error::Io`](crate::Error::Io) if the file cannot be opened,
    /// [`Error::Format`](crate::Error::Format) if it is not a supported
    /// archive or its index metadata is corrupt.
    pub fn open_with(path: impl AsRef<Path>, options: &ArchiveOptions) -> Result<Self> {
        let path = path.as_ref();
        let reader = LocalFileReader::new(path)?;
        Self::from_reader(path.display().to_string(), reader, options)
    }
}

impl<R: ReadAt> ArchiveHandle<R> {
    /// Wrap an already-open source. `name` is used for messages and for
    /// matching root-trim rules.
    pub fn from_reader(
        name: impl Into<String>,
        reader: R,
        options: &ArchiveOptions,
    ) -> Result<Self> {
        let name = name.into();
        let container = container::detect(&name, &reader, options)?;
        info!("opened {} as {}", name, container.format());

        Ok(Self {
            name,
            reader,
            container,
            decompressor: options.decompressor(),
            entries: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> ArchiveFormat {
        self.container.format()
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Parse the archive index, or return the result of an earlier parse.
    ///
    /// Only the first call does I/O. A failed parse is not cached.
    pub fn parse_entries(&mut self) -> Result<&Entries> {
        match &mut self.entries {
            Some(entries) => Ok(entries),
            slot @ None => {
                let records = self
                    .container
                    .parse_records(&self.reader, &self.decompressor)?;
                let entries = Entries::build(records, self.container.salt());
                debug!(
                    "{}: {} files in {} directories",
                    self.name,
                    entries.files.len(),
                    entries.directories.len()
                );
                Ok(slot.insert(entries))
            }
        }
    }

    /// Entries from an earlier [`parse_entries`](Self::parse_entries), if any.
    pub fn entries(&self) -> Option<&Entries> {
        self.entries.as_ref()
    }

    /// Read and decode a file's bytes.
    pub fn read(&self, file: &FileEntry) -> Result<Vec<u8>> {
        self.container
            .read_payload(&self.reader, &file.payload, &self.decompressor)
    }

    /// Read a file by path, parsing entries first if needed.
    ///
    /// `Ok(None)` if the archive has no file at `path`.
    pub fn read_path(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        let file = self.parse_entries()?.file_by_path(path).cloned();
        file.map(|file| self.read(&file)).transpose()
    }

    /// Close the archive, releasing its descriptor.
    pub fn dispose(self) {
        debug!("closing {}", self.name);
    }
}

/// Open archives in load order.
///
/// Each archive is opened independently; one result per path, in the
/// order given, so callers can skip the ones that fail. Precedence between
/// archives is the caller's business.
pub fn open_in_order<P: AsRef<Path>>(
    paths: impl IntoIterator<Item = P>,
    options: &ArchiveOptions,
) -> Vec<(PathBuf, Result<ArchiveHandle>)> {
    paths
        .into_iter()
        .map(|path| {
            let path = path.as_ref().to_path_buf();
            let handle = ArchiveHandle::open_with(&path, options);
            (path, handle)
        })
        .collect()
}
