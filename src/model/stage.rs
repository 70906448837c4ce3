// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::fmt;

use super::association::Association;
use super::entity::{Entity, Section};
use super::ids::{AssociationId, EntityId};

/// The document's object store: entities and associations keyed by id, plus
/// the lazily garbage-collected tag list.
///
/// Ids are unique across the combined entity+association namespace. Removal
/// here never cascades; dependent-association cleanup is the deletion
/// cascade's job (`ops::delete_entities`). The store is `Clone` with full
/// value semantics so portal/sub-stage snapshots are independent of the
/// original.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stage {
    entities: BTreeMap<EntityId, Entity>,
    associations: BTreeMap<AssociationId, Association>,
    tags: Vec<String>,
}

/// Either kind of stored object, for raw-id lookups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageObject<'a> {
    Entity(&'a Entity),
    Association(&'a Association),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    DuplicateIdentity { uuid: String },
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateIdentity { uuid } => {
                write!(f, "uuid already present in the document: {uuid:?}")
            }
        }
    }
}

impl std::error::Error for StageError {}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entities(&self) -> &BTreeMap<EntityId, Entity> {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut BTreeMap<EntityId, Entity> {
        &mut self.entities
    }

    pub fn associations(&self) -> &BTreeMap<AssociationId, Association> {
        &self.associations
    }

    pub fn associations_mut(&mut self) -> &mut BTreeMap<AssociationId, Association> {
        &mut self.associations
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut Vec<String> {
        &mut self.tags
    }

    /// Whether the raw id is taken by either container.
    pub fn contains_id(&self, raw: &str) -> bool {
        self.entities.contains_key(raw) || self.associations.contains_key(raw)
    }

    pub fn add_entity(&mut self, entity: Entity) -> Result<(), StageError> {
        if self.contains_id(entity.id().as_str()) {
            return Err(StageError::DuplicateIdentity {
                uuid: entity.id().as_str().to_owned(),
            });
        }
        self.entities.insert(entity.id().clone(), entity);
        Ok(())
    }

    pub fn add_association(&mut self, association: Association) -> Result<(), StageError> {
        if self.contains_id(association.id().as_str()) {
            return Err(StageError::DuplicateIdentity {
                uuid: association.id().as_str().to_owned(),
            });
        }
        self.associations.insert(association.id().clone(), association);
        Ok(())
    }

    /// Removes the keyed entry only; associations touching the entity are
    /// untouched (see the deletion cascade).
    pub fn remove_entity(&mut self, id: &EntityId) -> Option<Entity> {
        self.entities.remove(id)
    }

    pub fn remove_association(&mut self, id: &AssociationId) -> Option<Association> {
        self.associations.remove(id)
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn association(&self, id: &AssociationId) -> Option<&Association> {
        self.associations.get(id)
    }

    pub fn association_mut(&mut self, id: &AssociationId) -> Option<&mut Association> {
        self.associations.get_mut(id)
    }

    pub fn stage_object_by_uuid(&self, raw: &str) -> Option<StageObject<'_>> {
        if let Some(entity) = self.entities.get(raw) {
            return Some(StageObject::Entity(entity));
        }
        self.associations.get(raw).map(StageObject::Association)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&EntityId, &Section)> {
        self.entities
            .iter()
            .filter_map(|(id, entity)| entity.as_section().map(|section| (id, section)))
    }

    pub fn selected_entities(&self) -> Vec<&Entity> {
        self.entities.values().filter(|entity| entity.is_selected()).collect()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn association_count(&self) -> usize {
        self.associations.len()
    }
}
