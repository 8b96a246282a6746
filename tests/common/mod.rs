//! Carrier fixtures and a cheap engine shared by the integration tests.

#![allow(dead_code)]

use hound::{SampleFormat, WavSpec, WavWriter};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb};
use layered_stego::config::{KdfParams, StegoConfig};
use layered_stego::StegoEngine;
use std::io::Cursor;

/// Argon2 parameters small enough for tests.
pub fn cheap_kdf() -> KdfParams {
    KdfParams {
        memory_cost: 64,
        time_cost: 1,
        parallelism: 1,
    }
}

pub fn cheap_config() -> StegoConfig {
    StegoConfig {
        kdf: cheap_kdf(),
        ..StegoConfig::default()
    }
}

pub fn engine() -> StegoEngine {
    StegoEngine::new(cheap_config()).expect("Failed to create engine")
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("Failed to encode image");
    bytes
}

/// RGB image with a smooth gradient.
pub fn rgb_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 255) / width.max(1)) as u8,
            ((y * 255) / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    });
    encode(DynamicImage::ImageRgb8(img), format)
}

/// Greyscale PNG with exactly `units` elementary units.
pub fn grey_png(units: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(units, 1, |x, _| Luma([(x % 256) as u8]));
    encode(DynamicImage::ImageLuma8(img), ImageFormat::Png)
}

pub fn wav_spec() -> WavSpec {
    WavSpec {
        channels: 2,
        sample_rate: 22_050,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// 16-bit stereo sine tone.
pub fn wav(samples: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), wav_spec()).expect("Failed to create WAV");
        for i in 0..samples {
            let t = (i / 2) as f64 / 22_050.0;
            let value = (f64::sin(2.0 * std::f64::consts::PI * 330.0 * t) * 12_000.0) as i16;
            writer.write_sample(value).expect("Failed to write sample");
        }
        writer.finalize().expect("Failed to finalize WAV");
    }
    bytes
}

/// YUV4MPEG2 stream in 4:2:0.
pub fn y4m(width: u32, height: u32, frames: usize) -> Vec<u8> {
    let luma = (width * height) as usize;
    let chroma = (width.div_ceil(2) * height.div_ceil(2)) as usize;
    let mut out = format!("YUV4MPEG2 W{} H{} F30:1 Ip A1:1 C420jpeg XYSCSS=420JPEG\n", width, height).into_bytes();
    for f in 0..frames {
        out.extend_from_slice(b"FRAME\n");
        out.extend((0..luma).map(|i| ((i + f * 3) % 220 + 16) as u8));
        out.extend(std::iter::repeat(128u8).take(2 * chroma));
    }
    out
}

/// Plain text document with `lines` lines.
pub fn document(lines: usize) -> Vec<u8> {
    (0..lines)
        .map(|i| format!("Paragraph {} of the quarterly report.\n", i))
        .collect::<String>()
        .into_bytes()
}

/// RGB PNG carrying `tEXt` and `iCCP` chunks ahead of the pixel data.
pub fn png_with_metadata(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .add_text_chunk("Copyright".to_string(), "Example Studio 2024".to_string())
            .expect("Failed to add text chunk");
        let mut writer = encoder.write_header().expect("Failed to write header");
        writer
            .write_chunk(png::chunk::iCCP, b"display\0\0icc-profile-bytes")
            .expect("Failed to write iCCP");
        let data: Vec<u8> = (0..width * height * 3).map(|i| (i * 7 % 256) as u8).collect();
        writer.write_image_data(&data).expect("Failed to write pixels");
        writer.finish().expect("Failed to finish PNG");
    }
    bytes
}

/// Whether `bytes` contains `needle` anywhere.
pub fn contains(bytes: &[u8], needle: &[u8]) -> bool {
    bytes.windows(needle.len()).any(|w| w == needle)
}
