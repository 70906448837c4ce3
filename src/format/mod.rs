// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persisted document formats.
//!
//! Entry point for turning raw persisted bytes into the current object
//! graph: format auto-detection (plain JSON vs the legacy binary container),
//! the version-gated migration chain, and the terminal typed conversion with
//! attachment extraction.

pub mod binary;
pub mod convert;
pub mod migrate;

pub use binary::{is_binary_document, BinaryDecodeError, BINARY_MAGIC};
pub use convert::{
    convert_document, document_to_value, AttachmentSource, ConvertError, MemoryAttachments,
    MigratedDocument, NoAttachments,
};
pub use migrate::{document_version, migrate_value, CURRENT_VERSION};

use std::fmt;

use serde_json::Value;

#[derive(Debug)]
pub enum LoadError {
    Json { source: serde_json::Error },
    Binary { source: BinaryDecodeError },
    Convert { source: ConvertError },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json { source } => write!(f, "cannot parse document JSON: {source}"),
            Self::Binary { source } => write!(f, "cannot decode binary document: {source}"),
            Self::Convert { source } => write!(f, "cannot convert document: {source}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json { source } => Some(source),
            Self::Binary { source } => Some(source),
            Self::Convert { source } => Some(source),
        }
    }
}

/// Parses persisted bytes into a raw JSON document, auto-detecting the
/// legacy binary container by its magic prefix.
pub fn parse_document(bytes: &[u8]) -> Result<Value, LoadError> {
    if is_binary_document(bytes) {
        binary::decode(bytes).map_err(|source| LoadError::Binary { source })
    } else {
        serde_json::from_slice(bytes).map_err(|source| LoadError::Json { source })
    }
}

/// Full load pipeline: parse, migrate to the current version, construct the
/// object graph and extract attachments.
///
/// The returned stage still holds pending references; run
/// `ops::resolve::update_references` after bulk insertion.
pub fn load_document(
    bytes: &[u8],
    attachments: &mut dyn AttachmentSource,
) -> Result<MigratedDocument, LoadError> {
    let mut value = parse_document(bytes)?;
    migrate_value(&mut value);
    convert_document(value, attachments).map_err(|source| LoadError::Convert { source })
}

#[cfg(test)]
mod tests {
    use super::{load_document, parse_document, LoadError, NoAttachments, BINARY_MAGIC};

    fn binary_frame(version: u16, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&BINARY_MAGIC);
        bytes.extend_from_slice(&version.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn plain_json_and_binary_frames_load_the_same_graph() {
        let body = br#"{"nodes":[{"uuid":"n1","text":"hi"}],"links":[]}"#;

        let from_json =
            load_document(body, &mut NoAttachments).expect("load json");
        let from_binary = load_document(&binary_frame(1, body), &mut NoAttachments)
            .expect("load binary");

        assert_eq!(from_json.stage, from_binary.stage);
        assert_eq!(from_json.stage.entity_count(), 1);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_document(b"{not json").unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[test]
    fn truncated_binary_frame_is_a_decode_error() {
        let mut bytes = binary_frame(2, b"{}");
        bytes.pop();
        let err = load_document(&bytes, &mut NoAttachments).unwrap_err();
        assert!(matches!(err, LoadError::Binary { .. }));
    }
}
