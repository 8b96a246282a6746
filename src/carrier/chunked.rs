//! Chunked copy-on-write view of a large carrier file.
//!
//! Only the chunk being read and the chunks that were modified are held in
//! memory. Saving streams the source through chunk by chunk, substituting
//! modified chunks, so the source is never mutated and untouched bytes are
//! copied verbatim.

use crate::carrier::ReadSeek;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};

pub(crate) struct ChunkedRegion {
    source: Box<dyn ReadSeek>,
    len: u64,
    chunk_size: usize,
    clean: Option<(u64, Vec<u8>)>,
    dirty: BTreeMap<u64, Vec<u8>>,
}

impl ChunkedRegion {
    pub fn new(mut source: Box<dyn ReadSeek>, chunk_size: usize) -> Result<Self> {
        let len = source.seek(SeekFrom::End(0))?;
        Ok(Self {
            source,
            len,
            chunk_size: chunk_size.max(1),
            clean: None,
            dirty: BTreeMap::new(),
        })
    }

    /// Total length of the underlying source.
    pub fn len(&self) -> u64 {
        self.len
    }

    fn chunk_count(&self) -> u64 {
        self.len.div_ceil(self.chunk_size as u64)
    }

    fn load_chunk(&mut self, idx: u64) -> Result<Vec<u8>> {
        let start = idx * self.chunk_size as u64;
        let size = (self.len - start).min(self.chunk_size as u64) as usize;
        let mut buffer = vec![0u8; size];
        self.source.seek(SeekFrom::Start(start))?;
        self.source.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn locate(&self, offset: u64) -> Result<(u64, usize)> {
        if offset >= self.len {
            return Err(Error::MalformedCarrier(format!(
                "offset {} past end of carrier ({} bytes)",
                offset, self.len
            )));
        }
        let cs = self.chunk_size as u64;
        Ok((offset / cs, (offset % cs) as usize))
    }

    /// Read one byte.
    pub fn byte(&mut self, offset: u64) -> Result<u8> {
        let (idx, within) = self.locate(offset)?;
        if let Some(chunk) = self.dirty.get(&idx) {
            return Ok(chunk[within]);
        }

        let data = match self.clean.take() {
            Some((cached, data)) if cached == idx => data,
            _ => self.load_chunk(idx)?,
        };
        let value = data[within];
        self.clean = Some((idx, data));
        Ok(value)
    }

    /// Overwrite one byte.
    pub fn set_byte(&mut self, offset: u64, value: u8) -> Result<()> {
        let (idx, within) = self.locate(offset)?;
        if !self.dirty.contains_key(&idx) {
            let data = match self.clean.take() {
                Some((cached, data)) if cached == idx => data,
                other => {
                    self.clean = other;
                    self.load_chunk(idx)?
                }
            };
            self.dirty.insert(idx, data);
        }
        if let Some(chunk) = self.dirty.get_mut(&idx) {
            chunk[within] = value;
        }
        Ok(())
    }

    /// Read up to `buf.len()` bytes at `offset`, stopping at end of source.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let available = self.len.saturating_sub(offset).min(buf.len() as u64) as usize;
        for (i, slot) in buf.iter_mut().take(available).enumerate() {
            *slot = self.byte(offset + i as u64)?;
        }
        Ok(available)
    }

    /// Stream the source to `out` with modified chunks substituted.
    pub fn copy_to(&mut self, out: &mut dyn Write) -> Result<()> {
        for idx in 0..self.chunk_count() {
            match self.dirty.get(&idx) {
                Some(chunk) => out.write_all(chunk)?,
                None => {
                    let chunk = self.load_chunk(idx)?;
                    out.write_all(&chunk)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn region(data: Vec<u8>, chunk_size: usize) -> ChunkedRegion {
        ChunkedRegion::new(Box::new(Cursor::new(data)), chunk_size).unwrap()
    }

    #[test]
    fn test_read_across_chunks() {
        let data: Vec<u8> = (0..100).collect();
        let mut region = region(data.clone(), 7);

        for (i, expected) in data.iter().enumerate() {
            assert_eq!(region.byte(i as u64).unwrap(), *expected);
        }
    }

    #[test]
    fn test_copy_substitutes_dirty_chunks() {
        let data: Vec<u8> = (0..100).collect();
        let mut region = region(data.clone(), 16);

        region.set_byte(5, 0xAA).unwrap();
        region.set_byte(99, 0xBB).unwrap();

        let mut out = Vec::new();
        region.copy_to(&mut out).unwrap();

        let mut expected = data;
        expected[5] = 0xAA;
        expected[99] = 0xBB;
        assert_eq!(out, expected);
    }

    #[test]
    fn test_read_after_write() {
        let mut region = region(vec![0u8; 50], 8);
        region.byte(3).unwrap();
        region.set_byte(3, 7).unwrap();
        region.byte(20).unwrap();

        assert_eq!(region.byte(3).unwrap(), 7);
    }

    #[test]
    fn test_read_at_stops_at_end() {
        let mut region = region(b"FRAME\n".to_vec(), 4);
        let mut buf = [0u8; 16];

        let n = region.read_at(2, &mut buf).unwrap();
        assert_eq!(n, 4);
        assert_eq!(&buf[..4], b"AME\n");
    }

    #[test]
    fn test_offset_past_end() {
        let mut region = region(vec![1, 2, 3], 2);
        assert!(matches!(region.byte(3), Err(Error::MalformedCarrier(_))));
    }
}
