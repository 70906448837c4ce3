// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rstest::{fixture, rstest};

use super::{DocumentFolder, StoreError};
use crate::format::BINARY_MAGIC;
use crate::model::{AttachmentId, Rectangle, Stage, Vector};
use crate::ops;
use crate::ops::resolve::update_references;

static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

struct TempDir {
    path: std::path::PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut path = env::temp_dir();
        path.push(format!("proteus-{prefix}-{}-{nanos}-{counter}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

struct FolderTestCtx {
    tmp: TempDir,
    folder: DocumentFolder,
}

impl FolderTestCtx {
    fn new(prefix: &str) -> Self {
        let tmp = TempDir::new(prefix);
        let root = tmp.path().join("my-document");
        std::fs::create_dir_all(&root).unwrap();
        let folder = DocumentFolder::new(&root);
        Self { tmp, folder }
    }
}

#[fixture]
fn ctx() -> FolderTestCtx {
    FolderTestCtx::new("document-folder")
}

fn bounds(x: f64, y: f64) -> Rectangle {
    Rectangle::new(Vector::new(x, y), Vector::new(80.0, 40.0))
}

#[rstest]
fn save_and_load_round_trip(ctx: FolderTestCtx) {
    let folder = &ctx.folder;

    let mut stage = Stage::new();
    let a = ops::add_text_node(&mut stage, bounds(0.0, 0.0), "alpha").unwrap();
    let b = ops::add_url_node(&mut stage, bounds(200.0, 0.0), "https://example.com").unwrap();
    ops::connect_entities(&mut stage, &a, &b, &crate::model::Settings::new()).unwrap();
    ops::pack_entities_to_section(&mut stage, &[a.clone()], "Group").unwrap();

    let attachment_bytes = b"image-bytes".to_vec();
    let attachment_id = AttachmentId::from_bytes(&attachment_bytes);
    ops::add_image_node(&mut stage, bounds(400.0, 0.0), attachment_id.clone()).unwrap();

    let mut attachments = BTreeMap::new();
    attachments.insert(attachment_id.clone(), attachment_bytes);

    update_references(&mut stage);
    folder.save(&stage, &attachments).unwrap();

    assert!(folder.document_path().is_file());
    assert!(folder.attachment_path(&attachment_id).is_file());

    let loaded = folder.load().unwrap();
    assert_eq!(loaded.stage, stage);
    assert_eq!(loaded.attachments, attachments);
}

#[rstest]
fn save_garbage_collects_orphaned_attachments(ctx: FolderTestCtx) {
    let folder = &ctx.folder;

    let mut stage = Stage::new();
    let attachment_bytes = b"payload".to_vec();
    let attachment_id = AttachmentId::from_bytes(&attachment_bytes);
    let image = ops::add_image_node(&mut stage, bounds(0.0, 0.0), attachment_id.clone()).unwrap();

    let mut attachments = BTreeMap::new();
    attachments.insert(attachment_id.clone(), attachment_bytes);
    folder.save(&stage, &attachments).unwrap();
    assert!(folder.attachment_path(&attachment_id).is_file());

    ops::delete_entities(&mut stage, std::slice::from_ref(&image));
    attachments.clear();
    folder.save(&stage, &attachments).unwrap();

    assert!(!folder.attachment_path(&attachment_id).is_file());
}

#[rstest]
fn legacy_binary_container_loads_through_migration(ctx: FolderTestCtx) {
    let folder = &ctx.folder;

    let payload = br#"{"nodes":[{"uuid":"n1","text":"hi"}],"links":[]}"#;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&BINARY_MAGIC);
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    bytes.extend_from_slice(payload);
    std::fs::write(folder.root().join("document.wb"), bytes).unwrap();

    let loaded = folder.load().unwrap();
    assert_eq!(loaded.stage.entity_count(), 1);
    let id = "n1".parse().unwrap();
    assert_eq!(
        loaded.stage.entity(&id).and_then(|entity| entity.as_text()).map(|node| node.text()),
        Some("hi")
    );
}

#[rstest]
fn save_replaces_the_legacy_container(ctx: FolderTestCtx) {
    let folder = &ctx.folder;
    let legacy_path = folder.root().join("document.wb");
    std::fs::write(&legacy_path, b"WB old").unwrap();

    folder.save(&Stage::new(), &BTreeMap::new()).unwrap();

    assert!(folder.document_path().is_file());
    assert!(!legacy_path.exists());
}

#[rstest]
fn missing_document_is_an_io_error(ctx: FolderTestCtx) {
    let err = ctx.folder.load().unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
}

#[rstest]
fn payload_paths_cannot_escape_the_folder(ctx: FolderTestCtx) {
    let folder = &ctx.folder;

    // A secret outside the document folder must stay unreachable.
    std::fs::write(ctx.tmp.path().join("secret.bin"), b"secret").unwrap();

    let document = serde_json::json!({
        "version": 17,
        "entities": [
            { "uuid": "img", "type": "core:image_node", "filePath": "../secret.bin" },
            { "uuid": "n1", "type": "core:text_node", "text": "safe" }
        ],
        "associations": [],
        "tags": []
    });
    std::fs::write(
        folder.document_path(),
        serde_json::to_string_pretty(&document).unwrap(),
    )
    .unwrap();

    let loaded = folder.load().unwrap();
    // The escaping image entity was dropped; the rest of the load survived.
    assert_eq!(loaded.stage.entity_count(), 1);
    assert!(loaded.attachments.is_empty());
}

#[cfg(unix)]
#[rstest]
fn save_refuses_to_write_through_a_symlink(ctx: FolderTestCtx) {
    let folder = &ctx.folder;
    let target = ctx.tmp.path().join("elsewhere.json");
    std::fs::write(&target, b"{}").unwrap();
    std::os::unix::fs::symlink(&target, folder.document_path()).unwrap();

    let err = folder.save(&Stage::new(), &BTreeMap::new()).unwrap_err();
    assert!(matches!(err, StoreError::SymlinkRefused { .. }));
}
