// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! On-disk layout of a document folder:
//!
//! - `document.json` — the current-version (v17) document
//! - `document.wb` — a legacy binary container, read as a fallback
//! - `attachments/<digest>` — content-addressed binary payloads
//!
//! Writes are atomic (temp file + rename) with a durability knob; paths are
//! confined to the folder root and writes through symlinks are refused.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;

use crate::format::{self, AttachmentSource, LoadError, MigratedDocument};
use crate::model::{AttachmentId, Entity, Stage};
use crate::ops::resolve::update_references;

const DOCUMENT_FILENAME: &str = "document.json";
const LEGACY_DOCUMENT_FILENAME: &str = "document.wb";
const ATTACHMENTS_DIRNAME: &str = "attachments";

#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    Load {
        path: PathBuf,
        source: LoadError,
    },
    InvalidRelativePath {
        field: &'static str,
        value: PathBuf,
    },
    PathOutsideFolder {
        folder: PathBuf,
        path: PathBuf,
    },
    SymlinkRefused {
        path: PathBuf,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
            Self::Load { path, source } => write!(f, "cannot load document from {path:?}: {source}"),
            Self::InvalidRelativePath { field, value } => {
                write!(f, "invalid relative path for {field}: {value:?}")
            }
            Self::PathOutsideFolder { folder, path } => {
                write!(f, "path is outside document folder: folder={folder:?} path={path:?}")
            }
            Self::SymlinkRefused { path } => {
                write!(f, "refusing to write through symlink at {path:?}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Load { source, .. } => Some(source),
            Self::InvalidRelativePath { .. } => None,
            Self::PathOutsideFolder { .. } => None,
            Self::SymlinkRefused { .. } => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush written file contents and rename operations to
    /// stable storage where possible. Exact guarantees are
    /// platform/filesystem-dependent.
    Durable,
}

#[derive(Debug, Clone)]
pub struct DocumentFolder {
    root: PathBuf,
    durability: WriteDurability,
}

impl DocumentFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durability: WriteDurability::default(),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self) -> PathBuf {
        self.root.join(DOCUMENT_FILENAME)
    }

    fn legacy_document_path(&self) -> PathBuf {
        self.root.join(LEGACY_DOCUMENT_FILENAME)
    }

    pub fn attachment_path(&self, attachment_id: &AttachmentId) -> PathBuf {
        self.root.join(ATTACHMENTS_DIRNAME).join(attachment_id.digest_hex())
    }

    /// Saves the stage as a current-version document plus its attachment
    /// blobs, then garbage-collects blobs no longer referenced.
    pub fn save(
        &self,
        stage: &Stage,
        attachments: &BTreeMap<AttachmentId, Vec<u8>>,
    ) -> Result<(), StoreError> {
        let document_path = self.document_path();
        let value = format::document_to_value(stage);
        let document_str =
            serde_json::to_string_pretty(&value).map_err(|source| StoreError::Json {
                path: document_path.clone(),
                source,
            })?;

        write_atomic_in_folder(
            self.root(),
            &document_path,
            format!("{document_str}\n").as_bytes(),
            self.durability,
        )?;

        for (attachment_id, bytes) in attachments {
            let path = self.attachment_path(attachment_id);
            // Content-addressed blobs never change; skip existing files.
            if path.is_file() {
                continue;
            }
            write_atomic_in_folder(self.root(), &path, bytes, self.durability)?;
        }

        self.garbage_collect_attachments(stage)?;

        let legacy_path = self.legacy_document_path();
        match fs::remove_file(&legacy_path) {
            Ok(()) => {}
            Err(source) if source.kind() == io::ErrorKind::NotFound => {}
            Err(_source) => {}
        }

        Ok(())
    }

    /// Loads the document (current JSON, or the legacy binary container as a
    /// fallback), runs it through migration, hydrates attachment blobs and
    /// resolves references. Ready for mutation on return.
    pub fn load(&self) -> Result<MigratedDocument, StoreError> {
        let document_path = self.document_path();
        let (document_path, bytes) = match fs::read(&document_path) {
            Ok(bytes) => (document_path, bytes),
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                let legacy_path = self.legacy_document_path();
                match fs::read(&legacy_path) {
                    Ok(bytes) => (legacy_path, bytes),
                    Err(legacy_source) if legacy_source.kind() == io::ErrorKind::NotFound => {
                        return Err(StoreError::Io { path: document_path, source });
                    }
                    Err(legacy_source) => {
                        return Err(StoreError::Io { path: legacy_path, source: legacy_source });
                    }
                }
            }
            Err(source) => {
                return Err(StoreError::Io { path: document_path, source });
            }
        };

        let mut source = FolderAttachments { folder: self };
        let mut loaded =
            format::load_document(&bytes, &mut source).map_err(|source| StoreError::Load {
                path: document_path,
                source,
            })?;

        self.hydrate_attachments(&mut loaded);
        update_references(&mut loaded.stage);
        Ok(loaded)
    }

    /// Reads blobs for attachment references the conversion did not extract
    /// itself (current-format documents reference blobs by id only).
    fn hydrate_attachments(&self, loaded: &mut MigratedDocument) {
        let referenced: Vec<AttachmentId> = referenced_attachments(&loaded.stage);
        for attachment_id in referenced {
            if loaded.attachments.contains_key(&attachment_id) {
                continue;
            }
            let path = self.attachment_path(&attachment_id);
            match fs::read(&path) {
                Ok(bytes) => {
                    loaded.attachments.insert(attachment_id, bytes);
                }
                Err(err) => {
                    warn!("missing attachment blob {attachment_id} at {path:?}: {err}");
                }
            }
        }
    }

    fn garbage_collect_attachments(&self, stage: &Stage) -> Result<(), StoreError> {
        let keep: BTreeSet<String> = referenced_attachments(stage)
            .into_iter()
            .map(|attachment_id| attachment_id.digest_hex().to_owned())
            .collect();

        let attachments_dir = self.root.join(ATTACHMENTS_DIRNAME);
        let entries = match fs::read_dir(&attachments_dir) {
            Ok(entries) => entries,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(StoreError::Io { path: attachments_dir, source });
            }
        };

        for entry in entries.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if keep.contains(file_name) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(source) if source.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(StoreError::Io { path, source });
                }
            }
        }

        Ok(())
    }
}

fn referenced_attachments(stage: &Stage) -> Vec<AttachmentId> {
    stage
        .entities()
        .values()
        .filter_map(|entity| match entity {
            Entity::Image(node) => Some(node.attachment_id().clone()),
            Entity::Svg(node) => Some(node.attachment_id().clone()),
            _ => None,
        })
        .collect()
}

/// Reads payload paths relative to the folder root, refusing escapes.
struct FolderAttachments<'a> {
    folder: &'a DocumentFolder,
}

impl AttachmentSource for FolderAttachments<'_> {
    fn read(&mut self, relative_path: &str) -> io::Result<Vec<u8>> {
        let relative = Path::new(relative_path);
        let escapes = relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::RootDir | Component::Prefix(_)
                )
            });
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("payload path escapes the document folder: {relative_path:?}"),
            ));
        }
        fs::read(self.folder.root().join(relative))
    }
}

fn validate_relative_path(field: &'static str, path: &Path) -> Result<(), StoreError> {
    if path.as_os_str().is_empty() || path.is_absolute() {
        return Err(StoreError::InvalidRelativePath { field, value: path.to_path_buf() });
    }

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => {
                return Err(StoreError::InvalidRelativePath { field, value: path.to_path_buf() });
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}

fn to_relative_path(
    folder: &Path,
    path: &Path,
    field: &'static str,
) -> Result<PathBuf, StoreError> {
    let relative = if path.is_absolute() {
        path.strip_prefix(folder)
            .map(PathBuf::from)
            .map_err(|_| StoreError::PathOutsideFolder {
                folder: folder.to_path_buf(),
                path: path.to_path_buf(),
            })?
    } else {
        path.to_path_buf()
    };

    validate_relative_path(field, &relative)?;
    Ok(relative)
}

fn create_dir_all_safe(folder: &Path, relative: &Path) -> Result<(), StoreError> {
    if relative.as_os_str().is_empty() {
        return Ok(());
    }

    validate_relative_path("dir", relative)?;

    let mut current = folder.to_path_buf();
    for component in relative.components() {
        let Component::Normal(part) = component else {
            continue;
        };

        current.push(part);

        match fs::symlink_metadata(&current) {
            Ok(metadata) => {
                if metadata.file_type().is_symlink() {
                    return Err(StoreError::SymlinkRefused { path: current });
                }
                if !metadata.is_dir() {
                    return Err(StoreError::Io {
                        path: current,
                        source: io::Error::new(io::ErrorKind::AlreadyExists, "expected directory"),
                    });
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir(&current).map_err(|source| StoreError::Io {
                    path: current.clone(),
                    source,
                })?;
            }
            Err(source) => {
                return Err(StoreError::Io { path: current, source });
            }
        }
    }

    Ok(())
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

fn write_atomic_in_folder(
    folder: &Path,
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), StoreError> {
    fs::create_dir_all(folder).map_err(|source| StoreError::Io {
        path: folder.to_path_buf(),
        source,
    })?;

    let relative = to_relative_path(folder, path, "path")?;
    let parent_rel = relative.parent().unwrap_or_else(|| Path::new(""));
    create_dir_all_safe(folder, parent_rel)?;

    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => {
            return Err(StoreError::SymlinkRefused { path: path.to_path_buf() });
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(StoreError::Io { path: path.to_path_buf(), source });
        }
    }

    let Some(parent) = path.parent() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no parent"),
        });
    };

    let Some(file_name) = path.file_name() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp_path = parent.join(format!(
        ".proteus.tmp.{}.{}",
        file_name.to_string_lossy(),
        nanos
    ));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;

    file.write_all(contents)
        .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;

    if durability == WriteDurability::Durable {
        file.sync_all()
            .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;
    }
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io { path: path.to_path_buf(), source });
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
            dir.sync_all().map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
