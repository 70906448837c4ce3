// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Legacy binary container decoder.
//!
//! Early releases persisted documents in a framed binary container instead
//! of bare JSON: a 2-byte magic, a little-endian u16 schema version, a
//! little-endian u32 payload length, then the JSON body. The decoder only
//! unwraps the frame; the payload enters the same migration chain as plain
//! JSON documents. The header version is authoritative and overrides any
//! `version` field inside the body.

use std::fmt;

use serde_json::Value;

pub const BINARY_MAGIC: [u8; 2] = *b"WB";
const HEADER_LEN: usize = 8;

/// Auto-detection by magic prefix.
pub fn is_binary_document(bytes: &[u8]) -> bool {
    bytes.len() >= BINARY_MAGIC.len() && bytes[..BINARY_MAGIC.len()] == BINARY_MAGIC
}

#[derive(Debug)]
pub enum BinaryDecodeError {
    TooShort { len: usize },
    BadMagic { found: [u8; 2] },
    LengthMismatch { declared: usize, available: usize },
    Payload { source: serde_json::Error },
    NotAnObject,
}

impl fmt::Display for BinaryDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => {
                write!(f, "binary document header is truncated ({len} bytes)")
            }
            Self::BadMagic { found } => write!(f, "bad binary document magic {found:?}"),
            Self::LengthMismatch { declared, available } => write!(
                f,
                "binary document payload length mismatch (declared {declared}, available {available})"
            ),
            Self::Payload { source } => write!(f, "binary document payload is not valid JSON: {source}"),
            Self::NotAnObject => f.write_str("binary document payload is not a JSON object"),
        }
    }
}

impl std::error::Error for BinaryDecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Payload { source } => Some(source),
            _ => None,
        }
    }
}

pub fn decode(bytes: &[u8]) -> Result<Value, BinaryDecodeError> {
    if bytes.len() < HEADER_LEN {
        return Err(BinaryDecodeError::TooShort { len: bytes.len() });
    }
    let magic = [bytes[0], bytes[1]];
    if magic != BINARY_MAGIC {
        return Err(BinaryDecodeError::BadMagic { found: magic });
    }

    let version = u16::from_le_bytes([bytes[2], bytes[3]]);
    let declared = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let available = bytes.len() - HEADER_LEN;
    if declared != available {
        return Err(BinaryDecodeError::LengthMismatch { declared, available });
    }

    let mut value: Value = serde_json::from_slice(&bytes[HEADER_LEN..])
        .map_err(|source| BinaryDecodeError::Payload { source })?;
    let Some(map) = value.as_object_mut() else {
        return Err(BinaryDecodeError::NotAnObject);
    };
    map.insert("version".to_owned(), Value::from(u64::from(version)));
    Ok(value)
}
