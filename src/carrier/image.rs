//! LSB carrier over lossless raster images (PNG, BMP).
//!
//! Units are the colour channels of each pixel in row-major order. Alpha
//! channels are never touched. The image is re-encoded in its source format
//! with its original colour type. For PNG the original chunk sequence is kept
//! and only the image header and pixel data are replaced.

use crate::carrier::{check_index, CarrierAdapter, MediaKind, ReadSeek, SizingGuidance};
use crate::error::{Error, Result};
use ::image::{ColorType, ImageFormat};
use std::io::{Cursor, Read, Write};

/// Image carrier holding decoded 8-bit samples.
pub struct ImageCarrier {
    samples: Vec<u8>,
    width: u32,
    height: u32,
    color: ColorType,
    format: ImageFormat,
    /// Samples per pixel, including alpha.
    channels: usize,
    /// Samples per pixel that carry data.
    color_channels: usize,
    /// Chunk sequence of a PNG source, spliced back around the new pixel data.
    png_chunks: Option<Vec<PngChunk>>,
}

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// Chunks tied to the source colour type or bit depth.
const COLOR_DEPENDENT: [&[u8; 4]; 5] = [b"PLTE", b"tRNS", b"sBIT", b"bKGD", b"hIST"];

/// Animation chunks; the re-encoded stream holds a single frame.
const ANIMATION: [&[u8; 4]; 3] = [b"acTL", b"fcTL", b"fdAT"];

/// One raw PNG chunk: length, type, data and CRC, byte for byte.
#[derive(Debug, Clone)]
struct PngChunk {
    kind: [u8; 4],
    raw: Vec<u8>,
}

impl PngChunk {
    fn data(&self) -> &[u8] {
        &self.raw[8..self.raw.len() - 4]
    }
}

/// Split a PNG stream into its chunks, stopping after `IEND`.
fn parse_png_chunks(bytes: &[u8]) -> Result<Vec<PngChunk>> {
    if !bytes.starts_with(PNG_SIGNATURE) {
        return Err(Error::MalformedCarrier("missing PNG signature".to_string()));
    }

    let mut chunks = Vec::new();
    let mut pos = PNG_SIGNATURE.len();
    while pos + 12 <= bytes.len() {
        let len = u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]]) as usize;
        let end = pos
            .checked_add(12)
            .and_then(|n| n.checked_add(len))
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| Error::MalformedCarrier("PNG chunk runs past end of file".to_string()))?;

        let mut kind = [0u8; 4];
        kind.copy_from_slice(&bytes[pos + 4..pos + 8]);
        chunks.push(PngChunk {
            kind,
            raw: bytes[pos..end].to_vec(),
        });
        pos = end;
        if &kind == b"IEND" {
            return Ok(chunks);
        }
    }
    Err(Error::MalformedCarrier("PNG has no IEND chunk".to_string()))
}

/// Rebuild a PNG from the source chunks with the header and pixel data of
/// `encoded`.
fn splice_png(original: &[PngChunk], encoded: &[u8]) -> Result<Vec<u8>> {
    let fresh = parse_png_chunks(encoded)?;
    let header = fresh
        .iter()
        .find(|c| &c.kind == b"IHDR")
        .ok_or_else(|| Error::MalformedCarrier("encoder produced no IHDR".to_string()))?;
    let pixels: Vec<&PngChunk> = fresh.iter().filter(|c| &c.kind == b"IDAT").collect();

    // Bit depth and colour type live at bytes 8..10 of the IHDR data.
    let same_layout = original
        .iter()
        .find(|c| &c.kind == b"IHDR")
        .map_or(false, |c| c.data().get(8..10) == header.data().get(8..10));

    let mut out = PNG_SIGNATURE.to_vec();
    let mut pixels_written = false;
    for chunk in original {
        match &chunk.kind {
            b"IHDR" => out.extend_from_slice(&header.raw),
            b"IDAT" => {
                if !pixels_written {
                    for idat in &pixels {
                        out.extend_from_slice(&idat.raw);
                    }
                    pixels_written = true;
                }
            }
            kind if ANIMATION.contains(&kind) => {}
            kind if !same_layout && COLOR_DEPENDENT.contains(&kind) => {}
            _ => out.extend_from_slice(&chunk.raw),
        }
    }
    Ok(out)
}

impl ImageCarrier {
    /// Decode an image from encoded bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let format = ::image::guess_format(bytes)
            .map_err(|e| Error::UnsupportedCarrierFormat(e.to_string()))?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Bmp) {
            return Err(Error::UnsupportedCarrierFormat(format!(
                "{:?} images are not lossless",
                format
            )));
        }

        let decoded = ::image::load_from_memory_with_format(bytes, format)
            .map_err(|e| Error::MalformedCarrier(e.to_string()))?;

        let color = decoded.color();
        let (channels, color_channels) = match color {
            ColorType::L8 => (1, 1),
            ColorType::La8 => (2, 1),
            ColorType::Rgb8 => (3, 3),
            ColorType::Rgba8 => (4, 3),
            other => {
                return Err(Error::UnsupportedCarrierFormat(format!(
                    "{:?} images (only 8-bit samples are supported)",
                    other
                )))
            }
        };

        let png_chunks = match format {
            ImageFormat::Png => Some(parse_png_chunks(bytes)?),
            _ => None,
        };

        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            samples: decoded.into_bytes(),
            color,
            format,
            channels,
            color_channels,
            png_chunks,
        })
    }

    /// Decode an image from a seekable source.
    pub fn from_reader(source: &mut Box<dyn ReadSeek>) -> Result<Self> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Image dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Encoded format the image will be saved in.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    fn sample_index(&self, unit: u64) -> usize {
        let pixel = unit as usize / self.color_channels;
        let channel = unit as usize % self.color_channels;
        pixel * self.channels + channel
    }
}

impl CarrierAdapter for ImageCarrier {
    fn media_kind(&self) -> MediaKind {
        MediaKind::Image
    }

    fn unit_count(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.color_channels as u64
    }

    fn read_bit(&mut self, index: u64) -> Result<u8> {
        check_index(index, self.unit_count())?;
        Ok(self.samples[self.sample_index(index)] & 1)
    }

    fn write_bit(&mut self, index: u64, bit: u8) -> Result<()> {
        check_index(index, self.unit_count())?;
        let at = self.sample_index(index);
        self.samples[at] = (self.samples[at] & 0xFE) | (bit & 1);
        Ok(())
    }

    fn sizing_guidance(&self, required_units: u64) -> SizingGuidance {
        let min_pixels = required_units.div_ceil(self.color_channels as u64);
        let mut side = (min_pixels as f64).sqrt().ceil() as u64;
        while side * side < min_pixels {
            side += 1;
        }
        SizingGuidance::ImageResolution {
            min_pixels,
            min_square_side: side.min(u32::MAX as u64) as u32,
        }
    }

    fn save_to(&mut self, out: &mut dyn Write) -> Result<()> {
        let mut encoded = Cursor::new(Vec::new());
        ::image::write_buffer_with_format(
            &mut encoded,
            &self.samples,
            self.width,
            self.height,
            self.color,
            self.format,
        )
        .map_err(|e| Error::MalformedCarrier(e.to_string()))?;

        match &self.png_chunks {
            Some(chunks) => out.write_all(&splice_png(chunks, encoded.get_ref())?)?,
            None => out.write_all(encoded.get_ref())?,
        }
        Ok(())
    }
}
