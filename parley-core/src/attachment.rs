//! Pending attachment intake and encoding.
//!
//! An uploaded file is spooled to a private temp file as soon as it is
//! selected. The spool file lives exactly as long as its
//! [`PendingAttachment`]: replacing, clearing or sending the attachment drops
//! it and the file is removed.
//!
//! Images get their preview computed up front as an inline data URL, so the
//! user message that later references it needs no separate lifetime
//! tracking. Encoding for the provider re-reads the spool file at send time.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use tempfile::TempPath;
use tracing::debug;

use crate::error::{AttachmentError, ChatError};
use crate::payload::ContentPart;
use crate::store::AttachmentMeta;

/// Default upload cap when none is configured (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

const OCTET_STREAM: &str = "application/octet-stream";

/// Document types accepted besides images.
const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt"];
const ACCEPTED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// Limits applied when a file is offered as the pending attachment.
#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    /// Largest accepted upload, in bytes.
    pub max_bytes: u64,
    /// Directory that holds spooled uploads.
    pub spool_dir: PathBuf,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            spool_dir: std::env::temp_dir(),
        }
    }
}

impl AttachmentPolicy {
    /// Whether a file with this name and (derived) mime type may be attached.
    pub fn accepts(&self, name: &str, mime_type: &str) -> bool {
        if is_image(mime_type) || ACCEPTED_MIME_TYPES.contains(&mime_type) {
            return true;
        }
        extension_of(name).is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
    }
}

/// The one file waiting to go out with the next send.
#[derive(Debug)]
pub struct PendingAttachment {
    name: String,
    mime_type: String,
    size_bytes: u64,
    preview: Option<String>,
    file: TempPath,
}

impl PendingAttachment {
    /// Validate an upload against `policy` and spool it to disk.
    pub async fn spool(
        name: impl Into<String>,
        declared_mime: Option<&str>,
        bytes: Bytes,
        policy: &AttachmentPolicy,
    ) -> Result<Self, AttachmentError> {
        let name = name.into();
        let mime_type = derive_mime_type(&name, declared_mime);

        if !policy.accepts(&name, &mime_type) {
            return Err(AttachmentError::Unsupported { name, mime_type });
        }

        let size_bytes = bytes.len() as u64;
        if size_bytes > policy.max_bytes {
            return Err(AttachmentError::TooLarge {
                size: size_bytes,
                max: policy.max_bytes,
            });
        }

        let file = tempfile::Builder::new()
            .prefix("parley_upload_")
            .tempfile_in(&policy.spool_dir)?
            .into_temp_path();
        tokio::fs::write(&file, &bytes).await?;

        let preview = is_image(&mime_type).then(|| data_url(&mime_type, &bytes));

        debug!(
            name = %name,
            mime_type = %mime_type,
            size_bytes,
            spool = %file.display(),
            "attachment spooled"
        );

        Ok(Self {
            name,
            mime_type,
            size_bytes,
            preview,
            file,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Inline `data:` URL preview; only present for images.
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    /// Location of the spool file.
    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn is_image(&self) -> bool {
        is_image(&self.mime_type)
    }

    /// Display metadata captured into the user message.
    pub fn meta(&self) -> AttachmentMeta {
        AttachmentMeta {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes,
            preview: self.preview.clone(),
        }
    }
}

/// Turn the pending attachment into the content part sent upstream.
///
/// Images are read back from the spool file and inlined as a base64 data URL.
/// Other files are never transmitted; the model only gets a text marker
/// naming the file.
pub async fn encode(attachment: &PendingAttachment) -> Result<ContentPart, ChatError> {
    if !attachment.is_image() {
        return Ok(ContentPart::text(format!(
            "user attached file: {}",
            attachment.name()
        )));
    }

    let bytes = tokio::fs::read(attachment.path())
        .await
        .map_err(|source| ChatError::AttachmentRead {
            name: attachment.name().to_owned(),
            source,
        })?;

    Ok(ContentPart::image_data(data_url(attachment.mime_type(), &bytes)))
}

/// `data:<mime>;base64,<payload>`
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

pub fn is_image(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

/// Pick the mime type for an upload.
///
/// A declared content type wins unless it is missing or the generic
/// `application/octet-stream`, in which case the type is guessed from the
/// file name.
pub fn derive_mime_type(name: &str, declared: Option<&str>) -> String {
    let declared = declared
        .and_then(|d| d.split(';').next())
        .map(|d| d.trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty() && d != OCTET_STREAM);

    match declared {
        Some(mime) => mime,
        None => mime_guess::from_path(name)
            .first_or_octet_stream()
            .essence_str()
            .to_owned(),
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
