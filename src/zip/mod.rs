//! ZIP-variant archive parsing.
//!
//! Many mod and DLC archives are plain ZIP files with a `.scs` extension,
//! often produced by packagers that bend the format. This module reads them
//! without loading the archive into memory.
//!
//! - [`structures`]: fixed-layout records (EOCD, ZIP64 locator, central
//!   directory header) decoded from byte slices
//! - [`parser`]: the tail scan and central directory walk over a
//!   [`ReadAt`](crate::io::ReadAt) source
//! - [`container`]: [`ZipContainer`], which turns central directory records
//!   into entries and reads payloads through local file headers
//!
//! Only the archive tail is touched to build the index: the EOCD (or its
//! ZIP64 counterpart) names the central directory span, and every record in
//! that span carries the local header offset of its data.
//!
//! Packagers of `.scs` mods are not strict about the format. Directory
//! records are usually missing, declared entry counts may disagree with the
//! byte span, and some archives wrap everything in one extra top-level
//! folder. Encryption and multi-disk archives are not supported.

pub mod container;
pub mod parser;
pub mod structures;

pub use container::ZipContainer;
pub use parser::ZipParser;
pub use structures::*;
