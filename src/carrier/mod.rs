//! Carrier adapters: media files seen as ordered sequences of bit-carrying units.
//!
//! Each media family implements [`CarrierAdapter`]. The family is chosen from
//! the file signature by [`open_reader`], never from the file name.
//!
//! | Family   | Signature        | Elementary unit                    |
//! |----------|------------------|------------------------------------|
//! | Image    | PNG, BMP         | colour channel of a pixel          |
//! | Audio    | RIFF/WAVE PCM    | one sample                         |
//! | Video    | YUV4MPEG2        | one plane byte of a frame          |
//! | Document | UTF-8 text       | one trailing-whitespace slot       |

pub mod bits;
mod audio;
mod chunked;
mod document;
mod image;
mod video;

pub use self::audio::AudioCarrier;
pub use self::document::DocumentCarrier;
pub use self::image::ImageCarrier;
pub use self::video::VideoCarrier;

use crate::config::{DEFAULT_CHUNK_SIZE, MIN_LAYER_BITS};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Bytes inspected when sniffing a signature.
const SNIFF_LEN: usize = 8192;

/// Readable, seekable carrier source.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Media family of a carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Document,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
        };
        f.write_str(name)
    }
}

/// Human-actionable minimum carrier size for a given bit requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SizingGuidance {
    ImageResolution { min_pixels: u64, min_square_side: u32 },
    AudioDuration { min_seconds: f64, sample_rate: u32, channels: u16 },
    VideoFrames { min_frames: u64, width: u32, height: u32 },
    DocumentLines { min_lines: u64 },
}

impl fmt::Display for SizingGuidance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizingGuidance::ImageResolution {
                min_pixels,
                min_square_side,
            } => write!(
                f,
                "use an image with at least {} pixels, e.g. {}x{}",
                min_pixels, min_square_side, min_square_side
            ),
            SizingGuidance::AudioDuration {
                min_seconds,
                sample_rate,
                channels,
            } => write!(
                f,
                "use audio at least {:.1} seconds long at {} Hz with {} channel(s)",
                min_seconds, sample_rate, channels
            ),
            SizingGuidance::VideoFrames {
                min_frames,
                width,
                height,
            } => write!(
                f,
                "use a video with at least {} frames at {}x{}",
                min_frames, width, height
            ),
            SizingGuidance::DocumentLines { min_lines } => {
                write!(f, "use a document with at least {} lines", min_lines)
            }
        }
    }
}

/// Uniform bit access over one media file.
///
/// Implementations must only ever modify payload-bearing units; every
/// structural byte of the container is carried through [`save_to`] unchanged.
///
/// [`save_to`]: CarrierAdapter::save_to
pub trait CarrierAdapter: Send {
    /// Media family of this carrier.
    fn media_kind(&self) -> MediaKind;

    /// Number of elementary units, i.e. raw bit capacity.
    fn unit_count(&self) -> u64;

    /// Read the least-significant bit of a unit.
    fn read_bit(&mut self, index: u64) -> Result<u8>;

    /// Overwrite the least-significant bit of a unit.
    fn write_bit(&mut self, index: u64, bit: u8) -> Result<()>;

    /// Minimum carrier of this family and shape providing `required_units`.
    fn sizing_guidance(&self, required_units: u64) -> SizingGuidance;

    /// Write the (possibly modified) carrier in its original format.
    fn save_to(&mut self, out: &mut dyn Write) -> Result<()>;

    /// Write the carrier to a new file at `path`.
    fn save(&mut self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Check a unit index against the unit count.
pub(crate) fn check_index(index: u64, count: u64) -> Result<()> {
    if index >= count {
        return Err(Error::UnitOutOfRange { index, count });
    }
    Ok(())
}

/// Identify the media family from the first bytes of a file.
pub fn detect_format(head: &[u8]) -> Option<MediaKind> {
    if head.starts_with(b"\x89PNG\r\n\x1a\n") || looks_like_bmp(head) {
        return Some(MediaKind::Image);
    }
    if head.len() >= 12 && &head[0..4] == b"RIFF" && &head[8..12] == b"WAVE" {
        return Some(MediaKind::Audio);
    }
    if head.starts_with(b"YUV4MPEG2 ") {
        return Some(MediaKind::Video);
    }
    if looks_like_text(head) {
        return Some(MediaKind::Document);
    }
    None
}

/// DIB header sizes a BMP file may declare.
const BMP_DIB_SIZES: [u32; 6] = [12, 40, 52, 56, 108, 124];

/// `BM` alone also starts ordinary text, so the file header must be plausible.
fn looks_like_bmp(head: &[u8]) -> bool {
    if head.len() < 26 || !head.starts_with(b"BM") {
        return false;
    }
    if head[6..10] != [0, 0, 0, 0] {
        return false;
    }
    let dib_size = u32::from_le_bytes([head[14], head[15], head[16], head[17]]);
    BMP_DIB_SIZES.contains(&dib_size)
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.is_empty() || head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte character cut off by the sniff window is still text.
        Err(e) => e.error_len().is_none(),
    }
}

/// Open a carrier file.
pub fn open(path: &Path) -> Result<Box<dyn CarrierAdapter>> {
    let file = File::open(path)?;
    open_reader(Box::new(file), DEFAULT_CHUNK_SIZE)
}

/// Open a carrier held in memory.
pub fn open_bytes(bytes: &[u8]) -> Result<Box<dyn CarrierAdapter>> {
    open_reader(Box::new(Cursor::new(bytes.to_vec())), DEFAULT_CHUNK_SIZE)
}

/// Open a carrier from any seekable source, dispatching on its signature.
pub fn open_reader(mut source: Box<dyn ReadSeek>, chunk_size: usize) -> Result<Box<dyn CarrierAdapter>> {
    let head = read_head(&mut source)?;
    let kind = detect_format(&head).ok_or_else(|| {
        Error::UnsupportedCarrierFormat(describe_signature(&head))
    })?;

    let carrier: Box<dyn CarrierAdapter> = match kind {
        MediaKind::Image => Box::new(ImageCarrier::from_reader(&mut source)?),
        MediaKind::Audio => Box::new(AudioCarrier::open(source, chunk_size)?),
        MediaKind::Video => Box::new(VideoCarrier::open(source, chunk_size)?),
        MediaKind::Document => Box::new(DocumentCarrier::from_reader(&mut source)?),
    };

    let units = carrier.unit_count();
    if units < MIN_LAYER_BITS {
        return Err(Error::CarrierTooSmall {
            needed_bits: MIN_LAYER_BITS,
            available_bits: units,
            guidance: carrier.sizing_guidance(MIN_LAYER_BITS),
        });
    }

    log::debug!("opened {} carrier with {} units", kind, units);
    Ok(carrier)
}

fn read_head(source: &mut Box<dyn ReadSeek>) -> Result<Vec<u8>> {
    source.seek(SeekFrom::Start(0))?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    source.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    source.seek(SeekFrom::Start(0))?;
    Ok(head)
}

fn describe_signature(head: &[u8]) -> String {
    if head.is_empty() {
        return "empty file".to_string();
    }
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "JPEG is lossy and cannot carry LSB data".to_string();
    }
    if head.starts_with(b"ID3") || head.starts_with(&[0xFF, 0xFB]) {
        return "MP3 is lossy and cannot carry LSB data".to_string();
    }
    if head.len() >= 8 && &head[4..8] == b"ftyp" {
        return "MP4 is lossy and cannot carry LSB data".to_string();
    }
    let shown = &head[..head.len().min(8)];
    format!("unrecognised signature {}", hex::encode(shown))
}
