// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use proteus::model::{
    Association, AssociationId, Edge, Entity, EntityId, EntityRef, Rectangle, Section, Stage,
    TextNode, Vector,
};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut path = std::env::temp_dir();
        path.push(format!("proteus_bench_{prefix}_{pid}_{nanos}_{counter}"));
        std::fs::create_dir_all(&path).expect("create bench temp dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Case {
    StageSmall,
    StageMedium,
}

impl Case {
    fn node_count(self) -> usize {
        match self {
            Self::StageSmall => 24,
            Self::StageMedium => 240,
        }
    }
}

fn node_id(index: usize) -> EntityId {
    EntityId::new(format!("n{index:04}")).expect("bench node id")
}

fn edge_id(index: usize) -> AssociationId {
    AssociationId::new(format!("e{index:04}")).expect("bench edge id")
}

fn section_id(index: usize) -> EntityId {
    EntityId::new(format!("s{index:04}")).expect("bench section id")
}

/// A grid of text nodes chained by edges, grouped into sections of eight.
pub fn stage(case: Case) -> Stage {
    let node_count = case.node_count();
    let mut stage = Stage::new();

    for index in 0..node_count {
        let x = (index % 12) as f64 * 120.0;
        let y = (index / 12) as f64 * 80.0;
        let bounds = Rectangle::new(Vector::new(x, y), Vector::new(100.0, 40.0));
        stage
            .add_entity(Entity::Text(TextNode::new(
                node_id(index),
                bounds,
                format!("node {index}"),
            )))
            .expect("add bench node");
    }

    for index in 1..node_count {
        stage
            .add_association(Association::Edge(Edge::new(
                edge_id(index),
                EntityRef::Pending(node_id(index - 1)),
                EntityRef::Pending(node_id(index)),
            )))
            .expect("add bench edge");
    }

    for (group, chunk_start) in (0..node_count).step_by(8).enumerate() {
        let mut section = Section::new(
            section_id(group),
            Rectangle::new(Vector::new(0.0, 0.0), Vector::new(1.0, 1.0)),
            format!("group {group}"),
        );
        for index in chunk_start..(chunk_start + 8).min(node_count) {
            section.child_ids_mut().push(node_id(index));
        }
        stage.add_entity(Entity::Section(section)).expect("add bench section");
    }

    stage
}

/// The same board as a version-1 JSON file.
pub fn v1_document_bytes(case: Case) -> Vec<u8> {
    let node_count = case.node_count();
    let nodes: Vec<serde_json::Value> = (0..node_count)
        .map(|index| {
            serde_json::json!({
                "uuid": format!("n{index:04}"),
                "x": (index % 12) as f64 * 120.0,
                "y": (index / 12) as f64 * 80.0,
                "w": 100.0,
                "h": 40.0,
                "text": format!("node {index}")
            })
        })
        .collect();
    let links: Vec<serde_json::Value> = (1..node_count)
        .map(|index| {
            serde_json::json!({
                "uuid": format!("e{index:04}"),
                "source": format!("n{:04}", index - 1),
                "target": format!("n{index:04}")
            })
        })
        .collect();

    serde_json::to_vec(&serde_json::json!({ "nodes": nodes, "links": links }))
        .expect("serialize bench document")
}
