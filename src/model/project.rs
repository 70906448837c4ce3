// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The enclosing document object.
//!
//! One `Project` per open document window: it owns the stage, the settings,
//! the generation gate and the attachment blobs, and exposes the store API
//! surface consumed by rendering/UI collaborators. Multiple open projects
//! each own an independent store; nothing here is global.

use std::collections::BTreeMap;
use std::fmt;

use crate::exec::{GateRefusal, GenerationGate};
use crate::format::MigratedDocument;
use crate::ops;
use crate::query;

use super::association::Association;
use super::attachment::AttachmentId;
use super::entity::Entity;
use super::geometry::{Rectangle, Vector};
use super::ids::{AssociationId, EntityId};
use super::settings::Settings;
use super::stage::{Stage, StageObject};

/// The undo/redo history collaborator, invoked as a black box once per
/// logical mutation.
pub trait HistoryRecorder {
    fn record_step(&mut self, label: &str);
}

/// Recorder that drops every step, for headless and test use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHistory;

impl HistoryRecorder for NoopHistory {
    fn record_step(&mut self, _label: &str) {}
}

pub struct Project {
    stage: Stage,
    settings: Settings,
    gate: GenerationGate,
    attachments: BTreeMap<AttachmentId, Vec<u8>>,
    history: Box<dyn HistoryRecorder>,
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("stage", &self.stage)
            .field("settings", &self.settings)
            .field("gate", &self.gate)
            .field("attachments", &self.attachments.len())
            .finish()
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Project {
    pub fn new() -> Self {
        Self::with_history(Box::new(NoopHistory))
    }

    pub fn with_history(history: Box<dyn HistoryRecorder>) -> Self {
        Self {
            stage: Stage::new(),
            settings: Settings::new(),
            gate: GenerationGate::new(),
            attachments: BTreeMap::new(),
            history,
        }
    }

    /// Adopts a migrated document and resolves its pending references.
    pub fn from_migrated(loaded: MigratedDocument) -> Self {
        let mut project = Self::new();
        project.stage = loaded.stage;
        project.attachments = loaded.attachments;
        ops::resolve::update_references(&mut project.stage);
        project
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn attachments(&self) -> &BTreeMap<AttachmentId, Vec<u8>> {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut BTreeMap<AttachmentId, Vec<u8>> {
        &mut self.attachments
    }

    pub fn entities(&self) -> &BTreeMap<EntityId, Entity> {
        self.stage.entities()
    }

    pub fn associations(&self) -> &BTreeMap<AssociationId, Association> {
        self.stage.associations()
    }

    pub fn selected_entities(&self) -> Vec<&Entity> {
        self.stage.selected_entities()
    }

    pub fn stage_object_by_uuid(&self, raw: &str) -> Option<StageObject<'_>> {
        self.stage.stage_object_by_uuid(raw)
    }

    pub fn find_entity_by_location(&self, point: Vector) -> Option<EntityId> {
        query::find_entity_by_location(&self.stage, point)
    }

    /// Re-runs the resolver fixup passes (§ reference resolution).
    pub fn update_references(&mut self) {
        ops::resolve::update_references(&mut self.stage);
    }

    pub fn add_text_node(&mut self, bounds: Rectangle, text: impl Into<String>) -> EntityId {
        let id = ops::add_text_node(&mut self.stage, bounds, text)
            .expect("freshly generated v4 id is unique");
        self.history.record_step("add text node");
        id
    }

    pub fn delete_entities(&mut self, ids: &[EntityId]) {
        ops::delete_entities(&mut self.stage, ids);
        ops::resolve::update_references(&mut self.stage);
        self.history.record_step("delete entities");
    }

    /// Connects two entities with a directed edge. Invalid operations
    /// (missing endpoint, disallowed self-loop) are a no-op returning `None`.
    pub fn connect_entity(&mut self, from: &EntityId, to: &EntityId) -> Option<AssociationId> {
        match ops::connect_entities(&mut self.stage, from, to, &self.settings) {
            Ok(id) => {
                ops::resolve::update_references(&mut self.stage);
                self.history.record_step("connect entities");
                Some(id)
            }
            Err(_) => None,
        }
    }

    /// Wraps the listed entities into a fresh section. Returns `None` when
    /// none of them exist.
    pub fn pack_entities_to_section(&mut self, ids: &[EntityId]) -> Option<EntityId> {
        match ops::pack_entities_to_section(&mut self.stage, ids, "Section") {
            Ok(section_id) => {
                ops::resolve::update_references(&mut self.stage);
                self.history.record_step("pack entities to section");
                Some(section_id)
            }
            Err(_) => None,
        }
    }

    /// Value-semantics snapshot of the store for portal sub-stages.
    pub fn portal_snapshot(&self) -> Stage {
        self.stage.clone()
    }

    pub fn begin_generation(&mut self, id: &EntityId) -> Result<(), GateRefusal> {
        self.gate.begin(&mut self.stage, id)
    }

    pub fn complete_generation(&mut self, id: &EntityId) {
        self.gate.complete(&mut self.stage, id);
    }

    pub fn fail_generation(&mut self, id: &EntityId) {
        self.gate.fail(&mut self.stage, id);
    }

    pub fn stop_chat_node_execution(&mut self, id: &EntityId) {
        self.gate.reset(&mut self.stage, id);
    }

    pub fn gate(&self) -> &GenerationGate {
        &self.gate
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{HistoryRecorder, Project};
    use crate::exec::GateRefusal;
    use crate::format::{load_document, NoAttachments};
    use crate::model::{Rectangle, SettingFlag, Vector};

    struct CountingHistory {
        steps: Rc<RefCell<Vec<String>>>,
    }

    impl HistoryRecorder for CountingHistory {
        fn record_step(&mut self, label: &str) {
            self.steps.borrow_mut().push(label.to_owned());
        }
    }

    fn counting_project() -> (Project, Rc<RefCell<Vec<String>>>) {
        let steps = Rc::new(RefCell::new(Vec::new()));
        let project = Project::with_history(Box::new(CountingHistory { steps: steps.clone() }));
        (project, steps)
    }

    fn bounds(x: f64, y: f64) -> Rectangle {
        Rectangle::new(Vector::new(x, y), Vector::new(60.0, 30.0))
    }

    #[test]
    fn each_logical_mutation_records_one_history_step() {
        let (mut project, steps) = counting_project();

        let a = project.add_text_node(bounds(0.0, 0.0), "a");
        let b = project.add_text_node(bounds(100.0, 0.0), "b");
        project.connect_entity(&a, &b).expect("connect");
        project.pack_entities_to_section(&[a.clone(), b.clone()]).expect("pack");
        project.delete_entities(std::slice::from_ref(&b));

        assert_eq!(steps.borrow().len(), 5);
    }

    #[test]
    fn refused_connect_is_a_silent_no_op() {
        let (mut project, steps) = counting_project();
        let a = project.add_text_node(bounds(0.0, 0.0), "a");
        let recorded = steps.borrow().len();

        // Self-loops are disabled by default.
        assert_eq!(project.connect_entity(&a, &a), None);
        assert_eq!(project.associations().len(), 0);
        assert_eq!(steps.borrow().len(), recorded);

        project.settings_mut().set(SettingFlag::AllowAddCycleEdge, true);
        assert!(project.connect_entity(&a, &a).is_some());
    }

    #[test]
    fn opposite_connects_set_shift_flags() {
        let (mut project, _) = counting_project();
        let a = project.add_text_node(bounds(0.0, 0.0), "a");
        let b = project.add_text_node(bounds(100.0, 0.0), "b");

        let ab = project.connect_entity(&a, &b).expect("connect");
        let ba = project.connect_entity(&b, &a).expect("connect");

        for id in [&ab, &ba] {
            let edge = project
                .associations()
                .get(id)
                .and_then(|association| association.as_edge())
                .expect("edge");
            assert!(edge.is_shifting());
        }
    }

    #[test]
    fn portal_snapshot_is_independent() {
        let (mut project, _) = counting_project();
        let a = project.add_text_node(bounds(0.0, 0.0), "a");

        let snapshot = project.portal_snapshot();
        project.delete_entities(std::slice::from_ref(&a));

        assert!(project.entities().is_empty());
        assert!(snapshot.entity(&a).is_some());
    }

    #[test]
    fn from_migrated_resolves_references() {
        let bytes = br#"{"nodes":[{"uuid":"n1"},{"uuid":"n2"}],"links":[{"uuid":"l1","source":"n1","target":"n2"}]}"#;
        let loaded = load_document(bytes, &mut NoAttachments).expect("load");
        let project = Project::from_migrated(loaded);

        let edge = project
            .associations()
            .values()
            .next()
            .and_then(|association| association.as_edge())
            .expect("edge");
        assert!(!edge.source().is_pending());
        assert!(!edge.target().is_pending());
    }

    #[test]
    fn generation_gate_is_wired_to_the_stage() {
        let (mut project, _) = counting_project();
        let a = project.add_text_node(bounds(0.0, 0.0), "a");
        let b = project.add_text_node(bounds(100.0, 0.0), "b");

        project.begin_generation(&a).expect("begin");
        let err = project.begin_generation(&b).unwrap_err();
        assert_eq!(err, GateRefusal::Busy { executing: a.clone() });

        project.stop_chat_node_execution(&a);
        project.begin_generation(&b).expect("begin after stop");
    }
}
