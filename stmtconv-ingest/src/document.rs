//! Uploaded statement document and the checks it must pass before extraction.

use std::fs;
use std::path::Path;

use crate::error::IntakeError;

pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;
pub const PDF_MIME: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// A PDF that passed type and size checks.
#[derive(Debug, Clone)]
pub struct StatementDocument {
    name: String,
    bytes: Vec<u8>,
}

impl StatementDocument {
    /// Accept raw bytes under a display name.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, IntakeError> {
        check_size(bytes.len() as u64)?;
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(IntakeError::NotPdf);
        }
        Ok(Self {
            name: name.into(),
            bytes,
        })
    }

    /// Read and check a file. The size is checked from metadata first so an
    /// oversize file is never read into memory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IntakeError> {
        let path = path.as_ref();
        let read_err = |source| IntakeError::Read {
            path: path.display().to_string(),
            source,
        };

        let meta = fs::metadata(path).map_err(read_err)?;
        check_size(meta.len())?;

        let bytes = fs::read(path).map_err(read_err)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let doc = Self::from_bytes(name, bytes)?;
        log::info!("accepted {} ({} bytes)", doc.name, doc.len());
        Ok(doc)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        PDF_MIME
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn check_size(size: u64) -> Result<(), IntakeError> {
    if size == 0 {
        return Err(IntakeError::Empty);
    }
    if size > MAX_DOCUMENT_BYTES {
        return Err(IntakeError::TooLarge {
            size,
            limit_mib: MAX_DOCUMENT_BYTES / (1024 * 1024),
        });
    }
    Ok(())
}
