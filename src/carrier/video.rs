//! LSB carrier over raw YUV4MPEG2 video.
//!
//! Units are the plane bytes of every frame, frame after frame. The stream
//! header and per-frame `FRAME` lines are structural and never modified.

use crate::carrier::chunked::ChunkedRegion;
use crate::carrier::{check_index, CarrierAdapter, MediaKind, ReadSeek, SizingGuidance};
use crate::error::{Error, Result};
use std::io::Write;

/// Longest header line accepted, stream or frame.
const MAX_HEADER_LINE: usize = 4096;

const STREAM_MAGIC: &[u8] = b"YUV4MPEG2";
const FRAME_MAGIC: &[u8] = b"FRAME";

/// Chroma layout of a Y4M stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colorspace {
    C420,
    C422,
    C444,
    C444Alpha,
    Mono,
}

impl Colorspace {
    fn parse(tag: &str) -> Result<Self> {
        match tag {
            "420" | "420jpeg" | "420paldv" | "420mpeg2" => Ok(Colorspace::C420),
            "422" => Ok(Colorspace::C422),
            "444" => Ok(Colorspace::C444),
            "444alpha" => Ok(Colorspace::C444Alpha),
            "mono" => Ok(Colorspace::Mono),
            other => Err(Error::UnsupportedCarrierFormat(format!(
                "Y4M colour space C{} (only 8-bit streams are supported)",
                other
            ))),
        }
    }

    /// Bytes of plane data in one frame.
    fn frame_len(self, width: u64, height: u64) -> u64 {
        let luma = width * height;
        let cw = width.div_ceil(2);
        let ch = height.div_ceil(2);
        match self {
            Colorspace::C420 => luma + 2 * cw * ch,
            Colorspace::C422 => luma + 2 * cw * height,
            Colorspace::C444 => 3 * luma,
            Colorspace::C444Alpha => 4 * luma,
            Colorspace::Mono => luma,
        }
    }
}

/// Y4M carrier backed by a chunked view of the source file.
pub struct VideoCarrier {
    region: ChunkedRegion,
    width: u32,
    height: u32,
    colorspace: Colorspace,
    frame_len: u64,
    /// Offset of each frame's plane data.
    frames: Vec<u64>,
}

impl VideoCarrier {
    /// Open a Y4M source, indexing its frames.
    pub fn open(source: Box<dyn ReadSeek>, chunk_size: usize) -> Result<Self> {
        let mut region = ChunkedRegion::new(source, chunk_size)?;
        let (header, mut pos) = read_line(&mut region, 0)?;

        let mut tokens = header.split(' ');
        if tokens.next().map(str::as_bytes) != Some(STREAM_MAGIC) {
            return Err(Error::MalformedCarrier("missing YUV4MPEG2 signature".to_string()));
        }

        let mut width = None;
        let mut height = None;
        let mut colorspace = Colorspace::C420;
        for token in tokens.filter(|t| !t.is_empty() && t.is_ascii()) {
            let (key, value) = token.split_at(1);
            match key {
                "W" => width = Some(parse_dimension(value, "width")?),
                "H" => height = Some(parse_dimension(value, "height")?),
                "C" => colorspace = Colorspace::parse(value)?,
                _ => {}
            }
        }
        let (width, height) = match (width, height) {
            (Some(w), Some(h)) => (w, h),
            _ => return Err(Error::MalformedCarrier("Y4M header lacks W or H".to_string())),
        };

        let frame_len = colorspace.frame_len(width as u64, height as u64);
        let mut frames = Vec::new();
        while pos < region.len() {
            let (line, data_start) = read_line(&mut region, pos)?;
            if !line.as_bytes().starts_with(FRAME_MAGIC) {
                return Err(Error::MalformedCarrier(format!(
                    "expected FRAME header at offset {}",
                    pos
                )));
            }
            if data_start + frame_len > region.len() {
                return Err(Error::MalformedCarrier(format!(
                    "frame {} truncated",
                    frames.len()
                )));
            }
            frames.push(data_start);
            pos = data_start + frame_len;
        }

        log::trace!(
            "y4m: {}x{} {:?}, {} frames of {} bytes",
            width,
            height,
            colorspace,
            frames.len(),
            frame_len
        );

        Ok(Self {
            region,
            width,
            height,
            colorspace,
            frame_len,
            frames,
        })
    }

    /// Frame dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn colorspace(&self) -> Colorspace {
        self.colorspace
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn byte_offset(&self, unit: u64) -> u64 {
        let frame = (unit / self.frame_len) as usize;
        self.frames[frame] + unit % self.frame_len
    }
}

fn parse_dimension(value: &str, what: &str) -> Result<u32> {
    match value.parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(Error::MalformedCarrier(format!("invalid Y4M {} '{}'", what, value))),
    }
}

/// Read a header line starting at `offset`. Returns the line without its
/// terminator and the offset just past the newline.
fn read_line(region: &mut ChunkedRegion, offset: u64) -> Result<(String, u64)> {
    let mut buf = vec![0u8; MAX_HEADER_LINE];
    let n = region.read_at(offset, &mut buf)?;
    let end = buf[..n]
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| Error::MalformedCarrier(format!("unterminated Y4M header at offset {}", offset)))?;
    let line = String::from_utf8(buf[..end].to_vec())
        .map_err(|_| Error::MalformedCarrier("Y4M header is not ASCII".to_string()))?;
    Ok((line, offset + end as u64 + 1))
}

impl CarrierAdapter for VideoCarrier {
    fn media_kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn unit_count(&self) -> u64 {
        self.frames.len() as u64 * self.frame_len
    }

    fn read_bit(&mut self, index: u64) -> Result<u8> {
        check_index(index, self.unit_count())?;
        Ok(self.region.byte(self.byte_offset(index))? & 1)
    }

    fn write_bit(&mut self, index: u64, bit: u8) -> Result<()> {
        check_index(index, self.unit_count())?;
        let offset = self.byte_offset(index);
        let current = self.region.byte(offset)?;
        self.region.set_byte(offset, (current & 0xFE) | (bit & 1))
    }

    fn sizing_guidance(&self, required_units: u64) -> SizingGuidance {
        SizingGuidance::VideoFrames {
            min_frames: required_units.div_ceil(self.frame_len.max(1)),
            width: self.width,
            height: self.height,
        }
    }

    fn save_to(&mut self, out: &mut dyn Write) -> Result<()> {
        self.region.copy_to(out)
    }
}
