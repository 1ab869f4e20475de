use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor};

pub const SCS_MAGIC: &[u8; 4] = b"SCS#";
pub const CITY_HASH_METHOD: &[u8; 4] = b"CITY";
pub const SUPPORTED_VERSION: u16 = 1;

/// Fixed archive header - 20 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScsHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub salt: u16,
    pub hash_method: [u8; 4],
    pub entry_count: u32,
    pub entry_table_offset: u32,
}

impl ScsHeader {
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(data);
        let mut magic = [0u8; 4];
        io::Read::read_exact(&mut cursor, &mut magic)?;
        let version = cursor.read_u16::<LittleEndian>()?;
        let salt = cursor.read_u16::<LittleEndian>()?;
        let mut hash_method = [0u8; 4];
        io::Read::read_exact(&mut cursor, &mut hash_method)?;
        Ok(Self {
            magic,
            version,
            salt,
            hash_method,
            entry_count: cursor.read_u32::<LittleEndian>()?,
            entry_table_offset: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Exact match on magic, hash method and version.
    pub fn is_valid(&self) -> bool {
        &self.magic == SCS_MAGIC
            && &self.hash_method == CITY_HASH_METHOD
            && self.version == SUPPORTED_VERSION
    }
}

/// Entry flag: the payload is a directory listing.
pub const FLAG_DIRECTORY: u32 = 0x1;
/// Entry flag: the payload is zlib-compressed.
pub const FLAG_COMPRESSED: u32 = 0x2;

/// One entry table record - 32 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScsEntryRecord {
    pub hash: u64,
    pub offset: u64,
    pub flags: u32,
    pub crc32: u32,
    pub size: u32,
    pub compressed_size: u32,
}

impl ScsEntryRecord {
    pub const SIZE: usize = 32;

    pub fn read(cursor: &mut Cursor<&[u8]>) -> io::Result<Self> {
        Ok(Self {
            hash: cursor.read_u64::<LittleEndian>()?,
            offset: cursor.read_u64::<LittleEndian>()?,
            flags: cursor.read_u32::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            size: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
        })
    }

    pub fn is_directory(&self) -> bool {
        self.flags & FLAG_DIRECTORY != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }
}

/// Children named in a directory payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub subdirectories: Vec<String>,
    pub files: Vec<String>,
}

/// Parse a directory payload.
///
/// One name per line; a leading `*` marks a subdirectory. Blank lines and
/// trailing `\r` are ignored.
pub fn parse_directory_listing(data: &[u8]) -> DirectoryListing {
    let text = String::from_utf8_lossy(data);
    let mut listing = DirectoryListing::default();

    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        match line.strip_prefix('*') {
            Some(dir) => listing.subdirectories.push(dir.to_string()),
            None => listing.files.push(line.to_string()),
        }
    }

    listing
}
