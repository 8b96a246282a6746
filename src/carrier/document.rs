//! Whitespace carrier over UTF-8 text documents.
//!
//! Every line carries [`DOCUMENT_BITS_PER_LINE`] units in a trailing
//! whitespace suffix: a space is 0, a tab is 1. The visible text of a line
//! is never altered. Lines that were not written keep their original bytes.

use crate::carrier::{check_index, CarrierAdapter, MediaKind, ReadSeek, SizingGuidance};
use crate::config::DOCUMENT_BITS_PER_LINE;
use crate::error::{Error, Result};
use std::io::{Read, Write};

const SLOTS: usize = DOCUMENT_BITS_PER_LINE;
const PER_LINE: u64 = DOCUMENT_BITS_PER_LINE as u64;

struct Line {
    /// Original line without `\n`.
    raw: String,
    /// Visible text, trailing spaces and tabs removed.
    body_len: usize,
    slots: [u8; SLOTS],
    crlf: bool,
    dirty: bool,
}

impl Line {
    fn parse(raw: &str) -> Self {
        let (content, crlf) = match raw.strip_suffix('\r') {
            Some(stripped) => (stripped, true),
            None => (raw, false),
        };
        let body = content.trim_end_matches([' ', '\t']);
        let suffix = content[body.len()..].as_bytes();

        let mut slots = [0u8; SLOTS];
        let skip = SLOTS.saturating_sub(suffix.len());
        let tail = &suffix[suffix.len().saturating_sub(SLOTS)..];
        for (slot, &ch) in slots[skip..].iter_mut().zip(tail) {
            *slot = (ch == b'\t') as u8;
        }

        Self {
            raw: raw.to_string(),
            body_len: body.len(),
            slots,
            crlf,
            dirty: false,
        }
    }

    fn render(&self, out: &mut dyn Write) -> std::io::Result<()> {
        if !self.dirty {
            return out.write_all(self.raw.as_bytes());
        }
        out.write_all(&self.raw.as_bytes()[..self.body_len])?;
        for &slot in &self.slots {
            out.write_all(if slot == 1 { b"\t" } else { b" " })?;
        }
        if self.crlf {
            out.write_all(b"\r")?;
        }
        Ok(())
    }
}

/// Text document carrier held in memory.
pub struct DocumentCarrier {
    lines: Vec<Line>,
    trailing_newline: bool,
}

impl DocumentCarrier {
    /// Parse a document from raw bytes, which must be UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::MalformedCarrier(format!("document is not UTF-8: {}", e)))?;

        let mut pieces: Vec<&str> = text.split('\n').collect();
        let trailing_newline = pieces.len() > 1 && pieces.last() == Some(&"");
        if trailing_newline || text.is_empty() {
            pieces.pop();
        }

        Ok(Self {
            lines: pieces.into_iter().map(Line::parse).collect(),
            trailing_newline,
        })
    }

    /// Read a whole document from a source.
    pub fn from_reader(source: &mut Box<dyn ReadSeek>) -> Result<Self> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn locate(&self, unit: u64) -> (usize, usize) {
        ((unit / PER_LINE) as usize, (unit % PER_LINE) as usize)
    }
}

impl CarrierAdapter for DocumentCarrier {
    fn media_kind(&self) -> MediaKind {
        MediaKind::Document
    }

    fn unit_count(&self) -> u64 {
        self.lines.len() as u64 * PER_LINE
    }

    fn read_bit(&mut self, index: u64) -> Result<u8> {
        check_index(index, self.unit_count())?;
        let (line, slot) = self.locate(index);
        Ok(self.lines[line].slots[slot])
    }

    fn write_bit(&mut self, index: u64, bit: u8) -> Result<()> {
        check_index(index, self.unit_count())?;
        let (line, slot) = self.locate(index);
        let line = &mut self.lines[line];
        let bit = bit & 1;
        if line.slots[slot] != bit {
            line.slots[slot] = bit;
            line.dirty = true;
        }
        Ok(())
    }

    fn sizing_guidance(&self, required_units: u64) -> SizingGuidance {
        SizingGuidance::DocumentLines {
            min_lines: required_units.div_ceil(PER_LINE),
        }
    }

    fn save_to(&mut self, out: &mut dyn Write) -> Result<()> {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.write_all(b"\n")?;
            }
            line.render(out)?;
        }
        if self.trailing_newline {
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}
