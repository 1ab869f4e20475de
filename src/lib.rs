//! # scsarc
//!
//! Random-access reader for the archives SCS Software games ship their
//! assets in.
//!
//! Base-game and DLC content comes in HashFS v1 containers (`SCS#` magic);
//! most mods are ZIP files with bent rules. Both are exposed as the same
//! virtual tree of directories and files, parsed from the archive index
//! without loading the archive into memory.
//!
//! ## Features
//!
//! - Format sniffing: HashFS v1 or ZIP (including ZIP64)
//! - Directory trees rebuilt from paths when producers omit directory records
//! - Entries addressable by path or by CityHash64 path hash across archives
//! - STORED, DEFLATE and zlib payloads; pluggable primitives for GDeflate
//! - Tolerant central directory scanning and root-folder trimming for mods
//!
//! ## Example
//!
//! ```no_run
//! use scsarc::ArchiveHandle;
//!
//! fn main() -> scsarc::Result<()> {
//!     let mut archive = ArchiveHandle::open("def.scs")?;
//!
//!     let entries = archive.parse_entries()?;
//!     if let Some(root) = entries.root() {
//!         for name in &root.subdirectories {
//!             println!("{}/", name);
//!         }
//!     }
//!
//!     if let Some(bytes) = archive.read_path("def/city.sii")? {
//!         println!("{} bytes", bytes.len());
//!     }
//!
//!     archive.dispose();
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod codec;
pub mod container;
pub mod entry;
pub mod error;
pub mod glob;
pub mod hash;
pub mod io;
pub mod options;
pub mod scs;
pub mod tree;
pub mod zip;

pub use archive::{ArchiveHandle, open_in_order};
pub use cli::Cli;
pub use codec::{CompressionMethod, DecodePolicy, Decompressor, FlateCodec, RawCodec};
pub use container::{ArchiveFormat, Container};
pub use entry::{DirectoryEntry, Entries, Entry, EntryKind, EntryStore, FileEntry, RawEntryRecord};
pub use error::{Error, Result};
pub use hash::hash_path;
pub use io::{LocalFileReader, RandomAccessReader, ReadAt};
pub use options::{ArchiveOptions, RootTrimRule, SignaturePolicy};
pub use tree::{DirectoryTree, DirectoryTreeBuilder};
