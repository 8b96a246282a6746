//! Payload model: content bytes, optional filename, content type.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of content carried by a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ContentType {
    Text = 1,
    File = 2,
    Binary = 3,
}

impl ContentType {
    /// Wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ContentType::Text),
            2 => Some(ContentType::File),
            3 => Some(ContentType::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentType::Text => "text",
            ContentType::File => "file",
            ContentType::Binary => "binary",
        };
        f.write_str(name)
    }
}

/// Content hidden in one layer.
///
/// The filename is an explicit option: a layer without a name resolves to a
/// default through [`Payload::resolved_filename`].
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    pub content: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: ContentType,
}

impl Payload {
    /// A UTF-8 text message without a filename.
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            content: message.into().into_bytes(),
            filename: None,
            content_type: ContentType::Text,
        }
    }

    /// A named file. The name is reduced to its final path component.
    ///
    /// # Example
    ///
    /// ```
    /// use layered_stego::codec::Payload;
    ///
    /// let payload = Payload::file("../reports/q3.pdf", vec![1, 2, 3]).unwrap();
    /// assert_eq!(payload.filename.as_deref(), Some("q3.pdf"));
    /// ```
    pub fn file(name: &str, content: Vec<u8>) -> Result<Self> {
        Ok(Self {
            content,
            filename: Some(sanitize_filename(name)?),
            content_type: ContentType::File,
        })
    }

    /// Unnamed binary data.
    pub fn binary(content: Vec<u8>) -> Self {
        Self {
            content,
            filename: None,
            content_type: ContentType::Binary,
        }
    }

    /// The content as text, for text payloads holding valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self.content_type {
            ContentType::Text => std::str::from_utf8(&self.content).ok(),
            _ => None,
        }
    }

    /// The stored filename, or a default derived from the content type.
    pub fn resolved_filename(&self) -> String {
        if let Some(name) = &self.filename {
            return name.clone();
        }
        match self.content_type {
            ContentType::Text => "extracted_message.txt".to_string(),
            ContentType::File => format!("extracted_file.{}", sniff_extension(&self.content)),
            ContentType::Binary => format!("extracted_data.{}", sniff_extension(&self.content)),
        }
    }

    /// Validated filename bytes for the wire.
    pub(crate) fn filename_bytes(&self) -> Result<&[u8]> {
        match &self.filename {
            None => Ok(&[]),
            Some(name) => {
                validate_filename(name)?;
                Ok(name.as_bytes())
            }
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("content_len", &self.content.len())
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .finish()
    }
}

fn validate_filename(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidPayload("filename is empty".to_string()));
    }
    if name.contains('\0') {
        return Err(Error::InvalidPayload("filename contains NUL".to_string()));
    }
    if name.len() > u16::MAX as usize {
        return Err(Error::InvalidPayload(format!(
            "filename is {} bytes, limit is {}",
            name.len(),
            u16::MAX
        )));
    }
    Ok(())
}

/// Reduce a name to its final path component, treating both `/` and `\` as
/// separators.
pub fn sanitize_filename(name: &str) -> Result<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let base = match base {
        "." | ".." => "",
        other => other,
    };
    validate_filename(base)?;
    Ok(base.to_string())
}

/// Guess a file extension from the content signature.
pub fn sniff_extension(content: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "png"),
        (b"\xFF\xD8\xFF", "jpg"),
        (b"GIF87a", "gif"),
        (b"GIF89a", "gif"),
        (b"%PDF", "pdf"),
        (b"PK\x03\x04", "zip"),
        (b"ID3", "mp3"),
        (b"\xFF\xFB", "mp3"),
        (b"BM", "bmp"),
    ];

    if content.len() >= 12 && &content[0..4] == b"RIFF" && &content[8..12] == b"WAVE" {
        return "wav";
    }
    if content.len() >= 8 && &content[4..8] == b"ftyp" {
        return "mp4";
    }
    SIGNATURES
        .iter()
        .find(|(magic, _)| content.starts_with(magic))
        .map(|(_, ext)| *ext)
        .unwrap_or("bin")
}
