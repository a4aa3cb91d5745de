//! Attachment uploads.
//!
//! Uploaded files land in `<workspace>/attachments/`; the returned suffix
//! is a block of `@`-prefixed workspace-relative paths appended to the
//! prompt. The child CLI resolves those references against its working
//! directory, which is the workspace.

use std::io;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

/// How an attachment body is encoded on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentEncoding {
    /// UTF-8 text, written verbatim.
    #[default]
    Text,
    /// Standard base64, decoded before writing.
    Base64,
}

/// One uploaded file.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// File name; path components are stripped.
    pub name: String,
    /// File body in the given encoding.
    pub content: String,
    /// Body encoding; defaults to text.
    #[serde(default)]
    pub encoding: AttachmentEncoding,
}

/// Write attachments into the workspace and return the prompt suffix, a
/// newline-prefixed block of `@attachments/<name>` references. Empty input
/// yields an empty suffix.
pub fn save_attachments(workspace_dir: &Path, attachments: &[Attachment]) -> io::Result<String> {
    if attachments.is_empty() {
        return Ok(String::new());
    }
    let dir = workspace_dir.join("attachments");
    std::fs::create_dir_all(&dir)?;

    let mut references = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        let name = safe_file_name(&attachment.name);
        let bytes = match attachment.encoding {
            AttachmentEncoding::Text => attachment.content.as_bytes().to_vec(),
            AttachmentEncoding::Base64 => BASE64
                .decode(attachment.content.as_bytes())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
        };
        std::fs::write(dir.join(&name), bytes)?;
        references.push(format!("@attachments/{name}"));
    }
    Ok(format!("\n\n{}", references.join("\n")))
}

/// Reduce an uploaded name to a safe flat file name.
fn safe_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "attachment".to_owned()
    } else {
        trimmed.to_owned()
    }
}
