use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ReadAt;

/// Local file reader with random access support
///
/// Owns the open descriptor; dropping the reader closes it.
pub struct LocalFileReader {
    file: std::fs::File,
    size: u64,
    read_bytes: AtomicU64,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file,
            size,
            read_bytes: AtomicU64::new(0),
        })
    }

    /// Get total bytes read from the file so far
    pub fn read_bytes(&self) -> u64 {
        self.read_bytes.load(Ordering::Relaxed)
    }
}

impl ReadAt for LocalFileReader {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        #[cfg(unix)]
        let n = {
            use std::os::unix::fs::FileExt;
            self.file.read_at(buf, offset)?
        };

        #[cfg(windows)]
        let n = {
            use std::os::windows::fs::FileExt;
            // seek_read moves the file cursor, but every read here is positioned
            self.file.seek_read(buf, offset)?
        };

        #[cfg(not(any(unix, windows)))]
        let n = {
            use std::io::{Read, Seek, SeekFrom};
            let mut file = &self.file;
            file.seek(SeekFrom::Start(offset))?;
            file.read(buf)?
        };

        self.read_bytes.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
