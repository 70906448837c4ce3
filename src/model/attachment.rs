// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

const SCHEME: &str = "sha256:";
const DIGEST_HEX_LEN: usize = 64;

/// Content-addressed attachment identifier: `sha256:<64 hex digits>`.
///
/// Migration replaces file-relative paths on image/svg entities with one of
/// these; the payload itself lives in the document's attachments map and is
/// persisted separately from the JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttachmentId {
    value: String,
}

impl AttachmentId {
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hasher.finalize();
        Self {
            value: format!("{SCHEME}{}", hex::encode(digest)),
        }
    }

    pub fn new(value: impl Into<String>) -> Result<Self, AttachmentIdError> {
        let value = value.into();
        let Some(digest) = value.strip_prefix(SCHEME) else {
            return Err(AttachmentIdError::MissingScheme { value });
        };
        if digest.len() != DIGEST_HEX_LEN
            || !digest.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
        {
            return Err(AttachmentIdError::MalformedDigest { value });
        }
        Ok(Self { value })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The bare hex digest, used as the on-disk blob filename.
    pub fn digest_hex(&self) -> &str {
        &self.value[SCHEME.len()..]
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for AttachmentId {
    type Err = AttachmentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentIdError {
    MissingScheme { value: String },
    MalformedDigest { value: String },
}

impl fmt::Display for AttachmentIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingScheme { value } => {
                write!(f, "attachment id must start with {SCHEME:?}: {value:?}")
            }
            Self::MalformedDigest { value } => {
                write!(f, "attachment id digest must be {DIGEST_HEX_LEN} lowercase hex digits: {value:?}")
            }
        }
    }
}

impl std::error::Error for AttachmentIdError {}
