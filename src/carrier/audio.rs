//! LSB carrier over uncompressed PCM WAV audio.
//!
//! Units are the interleaved samples of the `data` chunk. The least
//! significant bit of a little-endian sample sits in its first byte, so a
//! write touches exactly one byte per unit. Every other byte of the RIFF file
//! (format chunk, metadata chunks, padding) is streamed through unchanged.

use crate::carrier::chunked::ChunkedRegion;
use crate::carrier::{check_index, CarrierAdapter, MediaKind, ReadSeek, SizingGuidance};
use crate::error::{Error, Result};
use hound::{SampleFormat, WavReader, WavSpec};
use std::io::{Seek, SeekFrom, Write};

/// Location of the sample data inside the RIFF file.
#[derive(Debug, Clone, Copy)]
struct DataLayout {
    offset: u64,
    len: u64,
    block_align: u16,
}

/// WAV carrier backed by a chunked view of the source file.
pub struct AudioCarrier {
    region: ChunkedRegion,
    spec: WavSpec,
    data_offset: u64,
    sample_stride: u64,
    samples: u64,
}

impl AudioCarrier {
    /// Open a WAV source. Only the header is read eagerly.
    pub fn open(mut source: Box<dyn ReadSeek>, chunk_size: usize) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;
        let (spec, declared_samples) = {
            let reader = WavReader::new(&mut source).map_err(|e| Error::MalformedCarrier(e.to_string()))?;
            (reader.spec(), reader.len() as u64)
        };

        if spec.sample_format != SampleFormat::Int {
            return Err(Error::UnsupportedCarrierFormat(
                "floating-point WAV samples are not supported".to_string(),
            ));
        }
        if !matches!(spec.bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(Error::UnsupportedCarrierFormat(format!(
                "{}-bit WAV samples are not supported",
                spec.bits_per_sample
            )));
        }

        let mut region = ChunkedRegion::new(source, chunk_size)?;
        let layout = locate_data(&mut region)?;

        let channels = spec.channels.max(1) as u64;
        let sample_stride = layout.block_align as u64 / channels;
        if sample_stride == 0 {
            return Err(Error::MalformedCarrier("block align smaller than channel count".to_string()));
        }
        let samples = declared_samples.min(layout.len / sample_stride);

        log::trace!(
            "wav: {} Hz, {} ch, {} bit, {} samples at offset {}",
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            samples,
            layout.offset
        );

        Ok(Self {
            region,
            spec,
            data_offset: layout.offset,
            sample_stride,
            samples,
        })
    }

    /// Audio format of the carrier.
    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        let frames = self.samples / self.spec.channels.max(1) as u64;
        frames as f64 / self.spec.sample_rate.max(1) as f64
    }

    fn byte_offset(&self, unit: u64) -> u64 {
        self.data_offset + unit * self.sample_stride
    }
}

fn read_u32_le(region: &mut ChunkedRegion, offset: u64) -> Result<u32> {
    let mut buf = [0u8; 4];
    if region.read_at(offset, &mut buf)? != 4 {
        return Err(Error::MalformedCarrier("truncated RIFF chunk header".to_string()));
    }
    Ok(u32::from_le_bytes(buf))
}

/// Walk the RIFF chunk list for `fmt ` and `data`.
fn locate_data(region: &mut ChunkedRegion) -> Result<DataLayout> {
    let len = region.len();
    let mut pos = 12u64;
    let mut block_align = None;

    while pos + 8 <= len {
        let mut id = [0u8; 4];
        region.read_at(pos, &mut id)?;
        let size = read_u32_le(region, pos + 4)? as u64;
        let body = pos + 8;

        match &id {
            b"fmt " => {
                let mut fmt = [0u8; 16];
                if region.read_at(body, &mut fmt)? < 16 {
                    return Err(Error::MalformedCarrier("truncated fmt chunk".to_string()));
                }
                block_align = Some(u16::from_le_bytes([fmt[12], fmt[13]]));
            }
            b"data" => {
                let block_align = block_align
                    .ok_or_else(|| Error::MalformedCarrier("data chunk before fmt chunk".to_string()))?;
                return Ok(DataLayout {
                    offset: body,
                    len: size.min(len - body),
                    block_align,
                });
            }
            _ => {}
        }

        pos = body + size + (size & 1);
    }

    Err(Error::MalformedCarrier("no data chunk".to_string()))
}

impl CarrierAdapter for AudioCarrier {
    fn media_kind(&self) -> MediaKind {
        MediaKind::Audio
    }

    fn unit_count(&self) -> u64 {
        self.samples
    }

    fn read_bit(&mut self, index: u64) -> Result<u8> {
        check_index(index, self.samples)?;
        Ok(self.region.byte(self.byte_offset(index))? & 1)
    }

    fn write_bit(&mut self, index: u64, bit: u8) -> Result<()> {
        check_index(index, self.samples)?;
        let offset = self.byte_offset(index);
        let current = self.region.byte(offset)?;
        self.region.set_byte(offset, (current & 0xFE) | (bit & 1))
    }

    fn sizing_guidance(&self, required_units: u64) -> SizingGuidance {
        let per_second = self.spec.sample_rate.max(1) as f64 * self.spec.channels.max(1) as f64;
        let seconds = required_units as f64 / per_second;
        SizingGuidance::AudioDuration {
            min_seconds: (seconds * 10.0).ceil() / 10.0,
            sample_rate: self.spec.sample_rate,
            channels: self.spec.channels,
        }
    }

    fn save_to(&mut self, out: &mut dyn Write) -> Result<()> {
        self.region.copy_to(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavWriter;
    use std::io::Cursor;

    fn wav_bytes(spec: WavSpec, sample_count: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for i in 0..sample_count {
                let t = i as f64 / spec.sample_rate as f64;
                let value = (f64::sin(2.0 * std::f64::consts::PI * 440.0 * t) * 16000.0) as i16;
                writer.write_sample(value).unwrap();
            }
            writer.finalize().unwrap();
        }
        bytes
    }

    fn mono16() -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    fn open(bytes: Vec<u8>, chunk: usize) -> AudioCarrier {
        AudioCarrier::open(Box::new(Cursor::new(bytes)), chunk).unwrap()
    }

    #[test]
    fn test_unit_count() {
        let carrier = open(wav_bytes(mono16(), 10_000), 1024);
        assert_eq!(carrier.unit_count(), 10_000);
        assert!((carrier.duration_secs() - 10_000.0 / 44_100.0).abs() < 1e-9);
    }

    #[test]
    fn test_bits_and_header_preserved() {
        let original = wav_bytes(mono16(), 5_000);
        let mut carrier = open(original.clone(), 256);

        for i in 0..1000 {
            carrier.write_bit(i, (i % 2) as u8).unwrap();
        }
        let mut saved = Vec::new();
        carrier.save_to(&mut saved).unwrap();

        assert_eq!(saved.len(), original.len());
        assert_eq!(&saved[..44], &original[..44]);

        let reader = WavReader::new(Cursor::new(&saved)).unwrap();
        assert_eq!(reader.spec(), mono16());
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        let before: Vec<i16> = WavReader::new(Cursor::new(&original))
            .unwrap()
            .into_samples::<i16>()
            .map(|s| s.unwrap())
            .collect();

        for (i, (a, b)) in samples.iter().zip(before.iter()).enumerate() {
            if i < 1000 {
                assert_eq!(a & 1, (i % 2) as i16);
                assert!((a - b).abs() <= 1);
            } else {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_stereo_24_bit() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for i in 0..2000i32 {
                writer.write_sample(i * 100).unwrap();
            }
            writer.finalize().unwrap();
        }

        let mut carrier = open(bytes, 512);
        assert_eq!(carrier.unit_count(), 2000);
        carrier.write_bit(1999, 1).unwrap();
        assert_eq!(carrier.read_bit(1999).unwrap(), 1);
    }

    #[test]
    fn test_float_rejected() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for _ in 0..100 {
                writer.write_sample(0.5f32).unwrap();
            }
            writer.finalize().unwrap();
        }

        let result = AudioCarrier::open(Box::new(Cursor::new(bytes)), 512);
        assert!(matches!(result, Err(Error::UnsupportedCarrierFormat(_))));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = wav_bytes(mono16(), 100)[..20].to_vec();
        let result = AudioCarrier::open(Box::new(Cursor::new(bytes)), 512);
        assert!(matches!(result, Err(Error::MalformedCarrier(_))));
    }

    #[test]
    fn test_sizing_guidance() {
        let carrier = open(wav_bytes(mono16(), 1000), 512);
        match carrier.sizing_guidance(441_000) {
            SizingGuidance::AudioDuration {
                min_seconds,
                sample_rate,
                channels,
            } => {
                assert_eq!(min_seconds, 10.0);
                assert_eq!(sample_rate, 44100);
                assert_eq!(channels, 1);
            }
            other => panic!("unexpected guidance {:?}", other),
        }
    }
}
