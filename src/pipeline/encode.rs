//! Payload encoding: turn a [`PendingInput`] into the first request part.
//!
//! Files travel as base64 inline data tagged with their MIME type, which is
//! what the Gemini `generateContent` API expects for PDFs and images. Text is
//! not byte-encoded at all; it is prefixed with [`crate::prompts::TEXT_LEAD_IN`].

use crate::error::Doc2HtmlError;
use crate::pipeline::input::{BlobSource, FileBlob, PendingInput};
use crate::prompts::wrap_pasted_text;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, RgbaImage};
use serde::Serialize;
use std::io::Cursor;
use tracing::debug;

/// A file ready for the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedFile {
    /// Standard base64, no data-URI prefix.
    pub data: String,
    pub media_type: String,
}

/// The document part of a conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    InlineData(EncodedFile),
    Text(String),
}

impl Payload {
    /// Size of the encoded part, for logging and stats.
    pub fn len(&self) -> usize {
        match self {
            Payload::InlineData(f) => f.data.len(),
            Payload::Text(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read a file blob to the end and base64-encode it.
pub async fn encode_file(blob: &FileBlob) -> Result<EncodedFile, Doc2HtmlError> {
    let bytes = match &blob.source {
        BlobSource::Path(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|source| Doc2HtmlError::FileRead {
                    path: path.clone(),
                    source,
                })?
        }
        BlobSource::Bytes(bytes) => bytes.clone(),
    };

    let data = STANDARD.encode(&bytes);
    debug!(
        "Encoded {} → {} bytes base64 ({})",
        blob.display_name,
        data.len(),
        blob.media_type
    );

    Ok(EncodedFile {
        data,
        media_type: blob.media_type.mime().to_string(),
    })
}

/// Encode whatever input is pending.
///
/// # Errors
/// [`Doc2HtmlError::NoInput`] when nothing is selected, or an I/O error when
/// the file cannot be read.
pub async fn encode_input(input: &PendingInput) -> Result<Payload, Doc2HtmlError> {
    match input {
        PendingInput::None => Err(Doc2HtmlError::NoInput),
        PendingInput::FileBlob(blob) => Ok(Payload::InlineData(encode_file(blob).await?)),
        PendingInput::PastedText(text) if text.is_empty() => Err(Doc2HtmlError::NoInput),
        PendingInput::PastedText(text) => Ok(Payload::Text(wrap_pasted_text(text))),
    }
}

/// PNG-encode raw RGBA pixels, as handed out by the system clipboard.
pub fn rgba_to_png(width: u32, height: u32, rgba: Vec<u8>) -> Result<Vec<u8>, Doc2HtmlError> {
    let img = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        Doc2HtmlError::ImageEncode(format!("pixel buffer does not match {width}x{height}"))
    })?;

    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| Doc2HtmlError::ImageEncode(e.to_string()))?;

    debug!("Encoded {}x{} clipboard image → {} bytes PNG", width, height, buf.len());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::MediaType;
    use crate::prompts::TEXT_LEAD_IN;

    #[test]
    fn encode_in_memory_blob() {
        let blob = FileBlob {
            source: BlobSource::Bytes(b"%PDF-1.7".to_vec()),
            media_type: MediaType::Pdf,
            display_name: "a.pdf".into(),
        };
        let encoded = tokio_test::block_on(encode_file(&blob)).expect("encode should succeed");
        assert_eq!(encoded.media_type, "application/pdf");
        assert_eq!(STANDARD.decode(&encoded.data).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let blob = FileBlob {
            source: BlobSource::Path("/no/such/scan.png".into()),
            media_type: MediaType::Png,
            display_name: "scan.png".into(),
        };
        let err = encode_file(&blob).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }

    #[tokio::test]
    async fn text_is_wrapped_not_encoded() {
        let payload = encode_input(&PendingInput::PastedText("a < b".into()))
            .await
            .unwrap();
        assert_eq!(payload, Payload::Text(format!("{TEXT_LEAD_IN}a < b")));
    }

    #[tokio::test]
    async fn nothing_selected_is_validation_error() {
        let err = encode_input(&PendingInput::None).await.unwrap_err();
        assert!(matches!(err, Doc2HtmlError::NoInput));
    }

    #[test]
    fn rgba_round_trips_to_png_signature() {
        let png = rgba_to_png(2, 2, vec![255; 16]).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn rgba_size_mismatch_rejected() {
        assert!(rgba_to_png(4, 4, vec![0; 3]).is_err());
    }
}
