use byteorder::{ByteOrder, LittleEndian};
use std::io;

use super::ReadAt;

/// Cursor over a [`ReadAt`] source.
///
/// The position is tracked here rather than in the descriptor, and every
/// read is issued at an absolute offset, so several cursors may walk the
/// same source independently.
pub struct RandomAccessReader<'a> {
    source: &'a dyn ReadAt,
    pos: u64,
}

impl<'a> RandomAccessReader<'a> {
    pub fn new(source: &'a dyn ReadAt) -> Self {
        Self { source, pos: 0 }
    }

    /// Create a cursor already positioned at `offset`.
    pub fn at(source: &'a dyn ReadAt, offset: u64) -> Self {
        Self { source, pos: offset }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn seek_to(&mut self, offset: u64) {
        self.pos = offset;
    }

    pub fn advance(&mut self, n: u64) {
        self.pos += n;
    }

    /// Read exactly `n` bytes and move past them.
    pub fn read_exact(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    pub fn read_into(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.source.read_exact_at(self.pos, buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    pub fn read_u16_le(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;
        Ok(LittleEndian::read_u16(&buf))
    }

    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(LittleEndian::read_u32(&buf))
    }

    pub fn read_u64_le(&mut self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(LittleEndian::read_u64(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_tracks_position() {
        let data: Vec<u8> = vec![0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xAA, 0xBB];
        let mut reader = RandomAccessReader::new(&data);

        assert_eq!(reader.read_u16_le().unwrap(), 0x1234);
        assert_eq!(reader.read_u32_le().unwrap(), 0x12345678);
        assert_eq!(reader.position(), 6);

        reader.seek_to(1);
        reader.advance(5);
        assert_eq!(reader.read_exact(2).unwrap(), vec![0xAA, 0xBB]);
    }

    #[test]
    fn test_short_read_fails_without_moving() {
        let data: Vec<u8> = vec![1, 2, 3];
        let mut reader = RandomAccessReader::at(&data, 2);
        let err = reader.read_u32_le().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(reader.position(), 2);
    }
}
