// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Reference resolution.
//!
//! Runs after any bulk load, and whenever placeholders may exist. Promotes
//! pending entity references to resolved ones, rebuilds section child caches
//! and geometry (bottom-most sections first so enclosing sections see final
//! child bounds), recomputes edge shift flags and garbage-collects the tag
//! list.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::model::{Association, Entity, EntityId, Stage};

pub fn update_references(stage: &mut Stage) {
    resolve_association_endpoints(stage);
    resolve_sections(stage);
    refresh_shift_flags(stage);
    garbage_collect_tags(stage);
}

fn resolve_association_endpoints(stage: &mut Stage) {
    let present: BTreeSet<EntityId> = stage.entities().keys().cloned().collect();

    for association in stage.associations_mut().values_mut() {
        match association {
            Association::Edge(edge) => {
                if edge.source().is_pending() && present.contains(edge.source().entity_id()) {
                    let resolved = edge.source().resolved();
                    edge.set_source(resolved);
                }
                if edge.target().is_pending() && present.contains(edge.target().entity_id()) {
                    let resolved = edge.target().resolved();
                    edge.set_target(resolved);
                }
            }
            Association::Hyperedge(hyperedge) => {
                for member in hyperedge.members_mut() {
                    if member.entity().is_pending()
                        && present.contains(member.entity().entity_id())
                    {
                        let resolved = member.entity().resolved();
                        member.set_entity(resolved);
                    }
                }
            }
        }
    }
}

fn resolve_sections(stage: &mut Stage) {
    // Bottom-most (innermost) sections first, so a section's auto-resize sees
    // already-finalized child geometry before an enclosing section computes
    // its own bounds.
    let mut order = stage
        .sections()
        .map(|(id, section)| (section.core().bounds().bottom(), id.clone()))
        .collect::<Vec<_>>();
    order.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    for (_, section_id) in order {
        let Some(section) = stage.entity(&section_id).and_then(Entity::as_section) else {
            continue;
        };
        let child_ids = section.child_ids().to_vec();
        let is_collapsed = section.is_collapsed();
        let inherited_hidden = section.core().is_hidden_by_collapse();

        let mut resolved = Vec::new();
        let mut child_bounds = Vec::new();
        for child_id in child_ids {
            if child_id == section_id {
                continue;
            }
            let Some(child) = stage.entity(&child_id) else {
                // Entity not found: dropped from the cache, non-fatal.
                continue;
            };
            child_bounds.push(child.rectangle());
            resolved.push(child_id);
        }

        let Some(section) = stage.entity_mut(&section_id).and_then(Entity::as_section_mut)
        else {
            continue;
        };
        section.set_resolved_children(resolved);
        if !is_collapsed {
            section.adjust_location_and_size(&child_bounds);
        }

        let mut seen = BTreeSet::new();
        apply_collapse_state(stage, &section_id, inherited_hidden, &mut seen);
    }
}

fn apply_collapse_state(
    stage: &mut Stage,
    section_id: &EntityId,
    inherited_hidden: bool,
    seen: &mut BTreeSet<EntityId>,
) {
    if !seen.insert(section_id.clone()) {
        return;
    }
    let Some(section) = stage.entity(section_id).and_then(Entity::as_section) else {
        return;
    };
    let hidden = inherited_hidden || section.is_collapsed();
    let children = section.resolved_children().to_vec();

    for child_id in children {
        let Some(child) = stage.entity_mut(&child_id) else {
            continue;
        };
        child.set_hidden_by_collapse(hidden);
        if child.as_section().is_some() {
            apply_collapse_state(stage, &child_id, hidden, seen);
        }
    }
}

fn refresh_shift_flags(stage: &mut Stage) {
    let pairs: BTreeSet<(EntityId, EntityId)> = stage
        .associations()
        .values()
        .filter_map(Association::as_edge)
        .map(|edge| {
            (edge.source().entity_id().clone(), edge.target().entity_id().clone())
        })
        .collect();

    for association in stage.associations_mut().values_mut() {
        if let Association::Edge(edge) = association {
            let source = edge.source().entity_id().clone();
            let target = edge.target().entity_id().clone();
            let shifting = source != target && pairs.contains(&(target, source));
            edge.set_shifting(shifting);
        }
    }
}

fn garbage_collect_tags(stage: &mut Stage) {
    let keep: Vec<String> = stage
        .tags()
        .iter()
        .filter(|raw| stage.contains_id(raw.as_str()))
        .cloned()
        .collect();
    *stage.tags_mut() = keep;
}
