// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Deletion-cascade and packing helpers used by the public ops.
/// Keeps `ops::mod` focused on the public surface.
fn delete_entity_cascading(
    stage: &mut Stage,
    id: &EntityId,
    visited: &mut BTreeSet<AssociationId>,
) {
    let Some(entity) = stage.entity(id) else {
        return;
    };

    match entity {
        Entity::Section(section) => {
            let child_ids = section.child_ids().to_vec();
            let is_collapsed = section.is_collapsed();

            remove_associations_touching(stage, id, visited);

            if is_collapsed {
                // Children are logically inside the collapsed section and go
                // with it.
                stage.remove_entity(id);
                for child_id in &child_ids {
                    delete_entity_cascading(stage, child_id, visited);
                }
            } else {
                // Just removing the wrapper: hand the children to whichever
                // section(s) contained this one, so they are not orphaned.
                let parents = parent_sections_of(stage, id);
                reparent_children(stage, id, &child_ids, &parents);
                stage.remove_entity(id);
            }
        }
        _ => {
            remove_associations_touching(stage, id, visited);
            stage.remove_entity(id);
        }
    }
}

/// One scan over the association store collecting every edge whose source or
/// target equals the entity and every hyperedge whose member list contains
/// it, then removing them. `visited` prevents double deletion across the
/// recursion.
fn remove_associations_touching(
    stage: &mut Stage,
    entity_id: &EntityId,
    visited: &mut BTreeSet<AssociationId>,
) {
    let mut touched: SmallVec<[AssociationId; 8]> = SmallVec::new();
    for (association_id, association) in stage.associations() {
        if visited.contains(association_id) {
            continue;
        }
        if association.touches(entity_id) {
            touched.push(association_id.clone());
        }
    }

    for association_id in touched {
        stage.remove_association(&association_id);
        visited.insert(association_id);
    }
}

/// Sections whose child list contains `id` (excluding `id` itself).
fn parent_sections_of(stage: &Stage, id: &EntityId) -> Vec<EntityId> {
    stage
        .sections()
        .filter(|(section_id, section)| *section_id != id && section.child_ids().contains(id))
        .map(|(section_id, _)| section_id.clone())
        .collect()
}

/// Replaces the deleted section's slot in each parent's child list with the
/// section's own children, preserving order and skipping ids the parent
/// already lists. With no parents the children simply become top-level.
fn reparent_children(
    stage: &mut Stage,
    section_id: &EntityId,
    child_ids: &[EntityId],
    parents: &[EntityId],
) {
    for parent_id in parents {
        let Some(parent) = stage.entity_mut(parent_id).and_then(Entity::as_section_mut) else {
            continue;
        };
        let list = parent.child_ids_mut();
        let Some(position) = list.iter().position(|child| child == section_id) else {
            continue;
        };
        list.remove(position);

        let existing: BTreeSet<EntityId> = list.iter().cloned().collect();
        let mut insert_at = position;
        for child_id in child_ids {
            if child_id == parent_id || existing.contains(child_id) {
                continue;
            }
            list.insert(insert_at, child_id.clone());
            insert_at += 1;
        }
    }
}

/// Moves freshly packed entities out of every other section's child list.
fn detach_from_parents(stage: &mut Stage, members: &[EntityId], new_parent: &EntityId) {
    let section_ids: Vec<EntityId> = stage
        .sections()
        .map(|(section_id, _)| section_id.clone())
        .filter(|section_id| section_id != new_parent)
        .collect();

    for section_id in section_ids {
        let Some(section) = stage.entity_mut(&section_id).and_then(Entity::as_section_mut)
        else {
            continue;
        };
        section.child_ids_mut().retain(|child| !members.contains(child));
    }
}
