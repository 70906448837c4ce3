// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Chat-node execution gate.
//!
//! Enforces at-most-one in-flight generation per document. In-flight network
//! reads are never forcibly aborted; once a node's membership is cleared via
//! `reset`, their eventual writes are simply ignored by the caller.

use std::collections::BTreeSet;
use std::fmt;

use crate::model::{Entity, EntityId, Stage};

/// Why a generation request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRefusal {
    NotFound { id: EntityId },
    NotExecutable { id: EntityId },
    Busy { executing: EntityId },
    AlreadyCompleted { id: EntityId },
    ParentIncomplete { id: EntityId, parent: EntityId },
}

impl fmt::Display for GateRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "entity not found: {id}"),
            Self::NotExecutable { id } => write!(f, "entity is not a chat node: {id}"),
            Self::Busy { executing } => write!(f, "a generation is already running on {executing}"),
            Self::AlreadyCompleted { id } => {
                write!(f, "node already completed in this pass: {id}")
            }
            Self::ParentIncomplete { id, parent } => {
                write!(f, "node {id} is blocked on incomplete parent {parent}")
            }
        }
    }
}

impl std::error::Error for GateRefusal {}

/// Membership-set scheduler for chat-node generations.
#[derive(Debug, Clone, Default)]
pub struct GenerationGate {
    executing: BTreeSet<EntityId>,
    completed: BTreeSet<EntityId>,
}

impl GenerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_executing(&self, id: &EntityId) -> bool {
        self.executing.contains(id)
    }

    pub fn is_completed(&self, id: &EntityId) -> bool {
        self.completed.contains(id)
    }

    pub fn executing_node(&self) -> Option<&EntityId> {
        self.executing.iter().next()
    }

    /// True iff the node may start generating right now: it exists and is a
    /// text node, is not itself executing, has not completed this pass, no
    /// other node is mid-execution, and every upstream parent has completed.
    pub fn can_execute(&self, stage: &Stage, id: &EntityId) -> Result<(), GateRefusal> {
        let Some(entity) = stage.entity(id) else {
            return Err(GateRefusal::NotFound { id: id.clone() });
        };
        if !matches!(entity, Entity::Text(_)) {
            return Err(GateRefusal::NotExecutable { id: id.clone() });
        }
        if self.executing.contains(id) {
            return Err(GateRefusal::Busy { executing: id.clone() });
        }
        if self.completed.contains(id) {
            return Err(GateRefusal::AlreadyCompleted { id: id.clone() });
        }
        if let Some(other) = self.executing_node() {
            return Err(GateRefusal::Busy { executing: other.clone() });
        }
        for parent in upstream_parents(stage, id) {
            if !self.completed.contains(&parent) {
                return Err(GateRefusal::ParentIncomplete { id: id.clone(), parent });
            }
        }
        Ok(())
    }

    /// Acquires the node's generation slot and raises its visual flag.
    pub fn begin(&mut self, stage: &mut Stage, id: &EntityId) -> Result<(), GateRefusal> {
        self.can_execute(stage, id)?;
        self.executing.insert(id.clone());
        set_generating(stage, id, true);
        Ok(())
    }

    pub fn complete(&mut self, stage: &mut Stage, id: &EntityId) {
        if self.executing.remove(id) {
            self.completed.insert(id.clone());
        }
        set_generating(stage, id, false);
    }

    pub fn fail(&mut self, stage: &mut Stage, id: &EntityId) {
        self.executing.remove(id);
        set_generating(stage, id, false);
    }

    /// `stopChatNodeExecution`: drops the node from both sets and clears its
    /// generating flag unconditionally.
    pub fn reset(&mut self, stage: &mut Stage, id: &EntityId) {
        self.executing.remove(id);
        self.completed.remove(id);
        set_generating(stage, id, false);
    }

    /// Starts a fresh pass: completed nodes become eligible again.
    pub fn reset_pass(&mut self) {
        self.completed.clear();
    }
}

fn set_generating(stage: &mut Stage, id: &EntityId, generating: bool) {
    if let Some(node) = stage.entity_mut(id).and_then(Entity::as_text_mut) {
        node.set_generating(generating);
    }
}

/// Upstream chat parents of `id`: sources of resolved edges targeting it.
fn upstream_parents(stage: &Stage, id: &EntityId) -> Vec<EntityId> {
    let mut parents = Vec::new();
    for association in stage.associations().values() {
        let Some(edge) = association.as_edge() else {
            continue;
        };
        if edge.target().is_pending() || edge.target().entity_id() != id {
            continue;
        }
        let source_id = edge.source().entity_id();
        let is_chat_parent = stage
            .entity(source_id)
            .is_some_and(|entity| matches!(entity, Entity::Text(_)));
        if is_chat_parent && source_id != id && !parents.contains(source_id) {
            parents.push(source_id.clone());
        }
    }
    parents
}
