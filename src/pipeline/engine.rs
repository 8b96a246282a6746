//! The public engine: capacity, embed, extract, list.

use crate::cancel::CancelToken;
use crate::capacity::Capacity;
use crate::carrier::{self, CarrierAdapter};
use crate::chain::{LayerHeader, LayerRegistry};
use crate::codec::{sanitize_filename, Payload};
use crate::config::StegoConfig;
use crate::crypto::Password;
use crate::error::{Error, Result};
use crate::pipeline::embed::{embed_into, EmbedReport};
use crate::pipeline::extract::{extract_from, list_from};
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Steganographic engine bound to one configuration.
///
/// Every call is independent: the engine holds no per-carrier state, never
/// modifies its inputs and may be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct StegoEngine {
    config: StegoConfig,
    cancel: CancelToken,
}

impl StegoEngine {
    /// Create an engine after validating `config`.
    pub fn new(config: StegoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancelToken::new(),
        })
    }

    /// Attach a caller-owned cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &StegoConfig {
        &self.config
    }

    fn open_bytes(&self, bytes: &[u8]) -> Result<Box<dyn CarrierAdapter>> {
        carrier::open_reader(Box::new(Cursor::new(bytes.to_vec())), self.config.chunk_size)
    }

    fn open_file(&self, path: &Path) -> Result<Box<dyn CarrierAdapter>> {
        carrier::open_reader(Box::new(File::open(path)?), self.config.chunk_size)
    }

    /// Total and safe bits of a carrier.
    pub fn capacity(&self, carrier: &[u8]) -> Result<Capacity> {
        let carrier = self.open_bytes(carrier)?;
        Ok(Capacity::of(carrier.as_ref(), &self.config.reserved))
    }

    pub fn capacity_file(&self, path: &Path) -> Result<Capacity> {
        let carrier = self.open_file(path)?;
        Ok(Capacity::of(carrier.as_ref(), &self.config.reserved))
    }

    /// Largest payload, in bytes, that can still be embedded with the given
    /// filename. 0 when the chain is at its layer bound.
    pub fn remaining_payload_bytes(&self, carrier: &[u8], filename: Option<&str>) -> Result<u64> {
        let filename_len = match filename {
            Some(name) => sanitize_filename(name)?.len(),
            None => 0,
        };

        let mut carrier = self.open_bytes(carrier)?;
        let capacity = Capacity::of(carrier.as_ref(), &self.config.reserved);
        let mut registry = LayerRegistry::new(carrier.as_mut(), capacity, self.config.max_layers)
            .with_cancel(self.cancel.clone());
        let state = registry.chain_state()?;

        if state.layer_count >= self.config.max_layers {
            return Ok(0);
        }
        Ok(capacity.max_payload_bytes(state.end_bits, filename_len))
    }

    /// Embed `payload` into an in-memory carrier and return the new artifact.
    ///
    /// The carrier is copied once on open and the artifact is built in
    /// memory. For large audio or video use [`embed_file`](Self::embed_file),
    /// which streams the source in chunks.
    pub fn embed(
        &self,
        carrier: &[u8],
        payload: &Payload,
        password: impl TryInto<Password, Error = Error>,
    ) -> Result<Vec<u8>> {
        let password = password.try_into()?;
        let mut carrier = self.open_bytes(carrier)?;
        embed_into(carrier.as_mut(), payload, &password, &self.config, &self.cancel)?;

        let mut out = Vec::new();
        carrier.save_to(&mut out)?;
        Ok(out)
    }

    /// Embed `payload` into the carrier at `source` and write the artifact to
    /// `output`. The source file is never modified and `output` only appears
    /// once the artifact is complete.
    pub fn embed_file(
        &self,
        source: &Path,
        output: &Path,
        payload: &Payload,
        password: impl TryInto<Password, Error = Error>,
    ) -> Result<EmbedReport> {
        let password = password.try_into()?;
        if same_file(source, output)? {
            return Err(Error::OutputIsSource(output.to_path_buf()));
        }

        let mut carrier = self.open_file(source)?;
        let report = embed_into(carrier.as_mut(), payload, &password, &self.config, &self.cancel)?;

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(staged.as_file_mut());
            carrier.save_to(&mut writer)?;
            writer.flush()?;
        }
        self.cancel.check()?;
        staged.persist(output).map_err(|e| Error::Io(e.error))?;

        log::debug!("wrote layer {} to {}", report.layer.index, output.display());
        Ok(report)
    }

    /// Extract the first layer that verifies under `password`.
    ///
    /// The carrier is copied once on open; [`extract_file`](Self::extract_file)
    /// reads large audio or video in chunks instead.
    pub fn extract(&self, carrier: &[u8], password: impl TryInto<Password, Error = Error>) -> Result<Payload> {
        let password = password.try_into()?;
        let mut carrier = self.open_bytes(carrier)?;
        let (_, payload) = extract_from(carrier.as_mut(), &password, &self.config, &self.cancel)?;
        Ok(payload)
    }

    pub fn extract_file(&self, path: &Path, password: impl TryInto<Password, Error = Error>) -> Result<Payload> {
        let password = password.try_into()?;
        let mut carrier = self.open_file(path)?;
        let (_, payload) = extract_from(carrier.as_mut(), &password, &self.config, &self.cancel)?;
        Ok(payload)
    }

    /// Metadata of every layer, in chain order. No password is needed.
    pub fn list_layers(&self, carrier: &[u8]) -> Result<Vec<LayerHeader>> {
        let mut carrier = self.open_bytes(carrier)?;
        list_from(carrier.as_mut(), &self.config, &self.cancel)
    }

    pub fn list_layers_file(&self, path: &Path) -> Result<Vec<LayerHeader>> {
        let mut carrier = self.open_file(path)?;
        list_from(carrier.as_mut(), &self.config, &self.cancel)
    }
}

/// Resolve `path` as far as the filesystem allows: the file itself when it
/// exists, otherwise its parent directory joined with the file name.
fn resolve(path: &Path) -> Result<PathBuf> {
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return Ok(resolved);
    }
    let name = path
        .file_name()
        .ok_or_else(|| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, "output has no file name")))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok(std::fs::canonicalize(parent)?.join(name))
}

fn same_file(source: &Path, output: &Path) -> Result<bool> {
    Ok(std::fs::canonicalize(source)? == resolve(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KdfParams;

    fn engine() -> StegoEngine {
        StegoEngine::new(StegoConfig {
            kdf: KdfParams {
                memory_cost: 64,
                time_cost: 1,
                parallelism: 1,
            },
            ..StegoConfig::default()
        })
        .unwrap()
    }

    fn document(lines: usize) -> Vec<u8> {
        (0..lines)
            .map(|i| format!("line number {}\n", i))
            .collect::<String>()
            .into_bytes()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = StegoConfig {
            max_layers: 0,
            ..StegoConfig::default()
        };
        assert!(matches!(StegoEngine::new(config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_document_roundtrip() {
        let engine = engine();
        let carrier = document(400);

        let stego = engine.embed(&carrier, &Payload::text("hello"), "a").unwrap();
        let payload = engine.extract(&stego, "a").unwrap();
        assert_eq!(payload.as_text(), Some("hello"));

        let visible: Vec<&str> = std::str::from_utf8(&stego).unwrap().lines().map(str::trim_end).collect();
        let original: Vec<&str> = std::str::from_utf8(&carrier).unwrap().lines().collect();
        assert_eq!(visible, original);
    }

    #[test]
    fn test_remaining_payload_bytes() {
        let engine = engine();
        let carrier = document(400);
        let capacity = engine.capacity(&carrier).unwrap();
        assert_eq!(capacity.total_bits, 1600);
        assert_eq!(capacity.safe_bits, 1440);

        let before = engine.remaining_payload_bytes(&carrier, None).unwrap();
        assert_eq!(before, 180 - 44);
        assert_eq!(engine.remaining_payload_bytes(&carrier, Some("a/b.txt")).unwrap(), before - 5);

        let stego = engine.embed(&carrier, &Payload::text("0123456789"), "a").unwrap();
        assert_eq!(engine.remaining_payload_bytes(&stego, None).unwrap(), 180 - 54 - 44);
    }

    #[test]
    fn test_empty_password_rejected() {
        let engine = engine();
        let result = engine.embed(&document(400), &Payload::text("x"), "");
        assert!(matches!(result, Err(Error::InvalidPassword(_))));
    }

    #[test]
    fn test_cancelled_embed() {
        let cancel = CancelToken::new();
        let engine = engine().with_cancel(cancel.clone());
        cancel.cancel();

        let result = engine.embed(&document(400), &Payload::text("x"), "a");
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
