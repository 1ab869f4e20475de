//! HashFS v1 archives (`SCS#` magic).
//!
//! The entry table stores CityHash64 path hashes, never paths. Paths are
//! recovered by walking directory listings down from the root, whose hash
//! is that of the empty path.
//!
//! ## Layout
//!
//! ```text
//! header (20 bytes)
//!   magic "SCS#" | version u16 | salt u16 | hash method "CITY"
//!   entry count u32 | entry table offset u32
//! entry table (32 bytes per entry)
//!   hash u64 | offset u64 | flags u32 | crc u32 | size u32 | compressed size u32
//! ```

pub mod container;
pub mod structures;

pub use container::ScsV1Container;
pub use structures::*;
