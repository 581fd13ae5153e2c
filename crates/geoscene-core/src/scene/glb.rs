//! Binary GLB container parsing.
//!
//! The scene assembler emits a GLB: a 12-byte header (`glTF` magic,
//! version 2, total length) followed by chunks, each an 8-byte header
//! (length, type) and that many payload bytes. The JSON chunk becomes the
//! empty-tagged document part and the BIN chunk becomes the `bin` part.
//! Chunk bytes are carried verbatim so payload integrity survives the
//! split.

use bytes::Bytes;

use super::{PayloadPart, SceneError, ScenePayload, BIN_TAG, DOC_TAG};

const GLB_MAGIC: u32 = 0x46546C67; // "glTF"
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F534A; // "JSON"
const CHUNK_BIN: u32 = 0x004E4942; // "BIN\0"

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

fn read_u32(data: &[u8], offset: usize) -> Result<u32, SceneError> {
    let bytes: [u8; 4] = data
        .get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or(SceneError::Truncated)?;
    Ok(u32::from_le_bytes(bytes))
}

/// Parses a GLB container into a two-part [`ScenePayload`].
///
/// # Errors
///
/// Returns [`SceneError`] when the magic or version is wrong, the buffer
/// is shorter than its headers claim, or the container does not hold
/// exactly one JSON chunk and one BIN chunk.
pub fn parse_glb(data: &[u8]) -> Result<ScenePayload, SceneError> {
    if read_u32(data, 0)? != GLB_MAGIC {
        return Err(SceneError::BadMagic);
    }
    let version = read_u32(data, 4)?;
    if version != GLB_VERSION {
        return Err(SceneError::UnsupportedVersion(version));
    }
    let declared_len = read_u32(data, 8)? as usize;
    if declared_len > data.len() {
        return Err(SceneError::Truncated);
    }

    let mut parts = Vec::with_capacity(2);
    let mut offset = HEADER_LEN;
    while offset < declared_len {
        let chunk_len = read_u32(data, offset)? as usize;
        let chunk_type = read_u32(data, offset + 4)?;
        let start = offset + CHUNK_HEADER_LEN;
        let end = start.checked_add(chunk_len).ok_or(SceneError::Truncated)?;
        if end > declared_len {
            return Err(SceneError::Truncated);
        }

        let tag = match chunk_type {
            CHUNK_JSON => DOC_TAG,
            CHUNK_BIN => BIN_TAG,
            other => {
                return Err(SceneError::Malformed(format!("unknown chunk type {other:#010x}")))
            }
        };
        parts.push(PayloadPart {
            tag: tag.to_string(),
            data: Bytes::copy_from_slice(&data[start..end]),
        });
        offset = end;
    }

    ScenePayload::from_parts(parts)
}

#[cfg(test)]
pub(crate) fn encode_glb(doc: &[u8], bin: &[u8]) -> Vec<u8> {
    let total = HEADER_LEN + CHUNK_HEADER_LEN + doc.len() + CHUNK_HEADER_LEN + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&u32::try_from(total).unwrap().to_le_bytes());
    out.extend_from_slice(&u32::try_from(doc.len()).unwrap().to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(doc);
    out.extend_from_slice(&u32::try_from(bin.len()).unwrap().to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(bin);
    out
}
