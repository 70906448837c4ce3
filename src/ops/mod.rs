// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mutation operations for the document stage.
//!
//! Factories mint fresh ids; the deletion cascade guarantees no association
//! outlives any of its endpoints. The enclosing `Project` records one
//! history step per logical mutation; operations here only mutate the stage.

use std::collections::BTreeSet;
use std::fmt;

use smallvec::SmallVec;

use crate::model::{
    Association, AssociationId, AttachmentId, Color, ConnectPoint, Edge, Entity, EntityId,
    EntityRef, Hyperedge, HyperedgeMember, ImageNode, PenStroke, PortalNode, Rectangle, Section,
    Settings, Stage, StageError, SvgNode, TextNode, UrlNode, Vector, SECTION_PADDING,
};

pub mod resolve;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpError {
    MissingEntity { id: EntityId },
    SelfLoopDisallowed { id: EntityId },
    EmptySelection,
    DuplicateIdentity { uuid: String },
    TooFewMembers { found: usize },
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEntity { id } => write!(f, "entity not found: {id}"),
            Self::SelfLoopDisallowed { id } => {
                write!(f, "self-loop edges are disabled (entity {id})")
            }
            Self::EmptySelection => f.write_str("no existing entities in selection"),
            Self::DuplicateIdentity { uuid } => {
                write!(f, "uuid already present in the document: {uuid:?}")
            }
            Self::TooFewMembers { found } => {
                write!(f, "hyperedge needs at least 2 members, found {found}")
            }
        }
    }
}

impl std::error::Error for OpError {}

fn duplicate_identity(err: StageError) -> OpError {
    match err {
        StageError::DuplicateIdentity { uuid } => OpError::DuplicateIdentity { uuid },
    }
}

pub fn add_text_node(
    stage: &mut Stage,
    bounds: Rectangle,
    text: impl Into<String>,
) -> Result<EntityId, OpError> {
    let id = EntityId::generate();
    stage
        .add_entity(Entity::Text(TextNode::new(id.clone(), bounds, text)))
        .map_err(duplicate_identity)?;
    Ok(id)
}

pub fn add_section(
    stage: &mut Stage,
    bounds: Rectangle,
    title: impl Into<String>,
) -> Result<EntityId, OpError> {
    let id = EntityId::generate();
    stage
        .add_entity(Entity::Section(Section::new(id.clone(), bounds, title)))
        .map_err(duplicate_identity)?;
    Ok(id)
}

pub fn add_connect_point(stage: &mut Stage, bounds: Rectangle) -> Result<EntityId, OpError> {
    let id = EntityId::generate();
    stage
        .add_entity(Entity::ConnectPoint(ConnectPoint::new(id.clone(), bounds)))
        .map_err(duplicate_identity)?;
    Ok(id)
}

pub fn add_image_node(
    stage: &mut Stage,
    bounds: Rectangle,
    attachment_id: AttachmentId,
) -> Result<EntityId, OpError> {
    let id = EntityId::generate();
    stage
        .add_entity(Entity::Image(ImageNode::new(id.clone(), bounds, attachment_id)))
        .map_err(duplicate_identity)?;
    Ok(id)
}

pub fn add_portal_node(
    stage: &mut Stage,
    bounds: Rectangle,
    viewport: Rectangle,
) -> Result<EntityId, OpError> {
    let id = EntityId::generate();
    stage
        .add_entity(Entity::Portal(PortalNode::new(id.clone(), bounds, viewport)))
        .map_err(duplicate_identity)?;
    Ok(id)
}

pub fn add_pen_stroke(
    stage: &mut Stage,
    points: Vec<Vector>,
    stroke_color: Color,
    stroke_width: f64,
) -> Result<EntityId, OpError> {
    let id = EntityId::generate();
    stage
        .add_entity(Entity::Pen(PenStroke::new(
            id.clone(),
            points,
            stroke_color,
            stroke_width,
        )))
        .map_err(duplicate_identity)?;
    Ok(id)
}

pub fn add_url_node(
    stage: &mut Stage,
    bounds: Rectangle,
    url: impl Into<String>,
) -> Result<EntityId, OpError> {
    let id = EntityId::generate();
    stage
        .add_entity(Entity::Url(UrlNode::new(id.clone(), bounds, url)))
        .map_err(duplicate_identity)?;
    Ok(id)
}

pub fn add_svg_node(
    stage: &mut Stage,
    bounds: Rectangle,
    attachment_id: AttachmentId,
) -> Result<EntityId, OpError> {
    let id = EntityId::generate();
    stage
        .add_entity(Entity::Svg(SvgNode::new(id.clone(), bounds, attachment_id)))
        .map_err(duplicate_identity)?;
    Ok(id)
}

/// Creates a directed edge between two existing entities.
///
/// A self-loop is refused while the `allowAddCycleEdge` toggle is off.
pub fn connect_entities(
    stage: &mut Stage,
    from: &EntityId,
    to: &EntityId,
    settings: &Settings,
) -> Result<AssociationId, OpError> {
    if stage.entity(from).is_none() {
        return Err(OpError::MissingEntity { id: from.clone() });
    }
    if stage.entity(to).is_none() {
        return Err(OpError::MissingEntity { id: to.clone() });
    }
    if from == to && !settings.allow_add_cycle_edge() {
        return Err(OpError::SelfLoopDisallowed { id: from.clone() });
    }

    let id = AssociationId::generate();
    let edge = Edge::new(
        id.clone(),
        EntityRef::Resolved(from.clone()),
        EntityRef::Resolved(to.clone()),
    );
    stage
        .add_association(Association::Edge(edge))
        .map_err(duplicate_identity)?;
    Ok(id)
}

/// Creates an undirected hyperedge over two or more existing entities.
pub fn connect_many_entities(
    stage: &mut Stage,
    members: &[EntityId],
) -> Result<AssociationId, OpError> {
    let mut unique: Vec<EntityId> = Vec::new();
    for member in members {
        if stage.entity(member).is_none() {
            return Err(OpError::MissingEntity { id: member.clone() });
        }
        if !unique.contains(member) {
            unique.push(member.clone());
        }
    }
    if unique.len() < 2 {
        return Err(OpError::TooFewMembers { found: unique.len() });
    }

    let id = AssociationId::generate();
    let hyperedge = Hyperedge::new(
        id.clone(),
        unique
            .into_iter()
            .map(|member| HyperedgeMember::new(EntityRef::Resolved(member), Edge::DEFAULT_RATE))
            .collect(),
    );
    stage
        .add_association(Association::Hyperedge(hyperedge))
        .map_err(duplicate_identity)?;
    Ok(id)
}

/// Deletes the listed entities and every association touching them.
///
/// Collapsed sections take their children with them; expanded sections hand
/// their children over to their own parent section(s) so nothing is
/// orphaned.
pub fn delete_entities(stage: &mut Stage, ids: &[EntityId]) {
    let mut visited = BTreeSet::new();
    for id in ids {
        delete_entity_cascading(stage, id, &mut visited);
    }
}

/// Removes an association after verifying every referenced entity still
/// exists (defensive check against stale calls during iteration). Returns
/// whether the association was removed; never panics.
pub fn delete_association(stage: &mut Stage, id: &AssociationId) -> bool {
    let Some(association) = stage.association(id) else {
        return false;
    };
    let endpoints: SmallVec<[EntityId; 4]> = match association {
        Association::Edge(edge) => SmallVec::from_iter([
            edge.source().entity_id().clone(),
            edge.target().entity_id().clone(),
        ]),
        Association::Hyperedge(hyperedge) => hyperedge.member_ids().cloned().collect(),
    };
    if endpoints.iter().any(|endpoint| stage.entity(endpoint).is_none()) {
        return false;
    }
    stage.remove_association(id).is_some()
}

/// `delete_association` restricted to directed edges.
pub fn delete_edge(stage: &mut Stage, id: &AssociationId) -> bool {
    match stage.association(id) {
        Some(Association::Edge(_)) => delete_association(stage, id),
        _ => false,
    }
}

/// Wraps the listed entities into a fresh section sized to fit them.
pub fn pack_entities_to_section(
    stage: &mut Stage,
    ids: &[EntityId],
    title: impl Into<String>,
) -> Result<EntityId, OpError> {
    let mut members: Vec<EntityId> = Vec::new();
    let mut member_bounds = Vec::new();
    for id in ids {
        if members.contains(id) {
            continue;
        }
        if let Some(entity) = stage.entity(id) {
            member_bounds.push(entity.rectangle());
            members.push(id.clone());
        }
    }
    if members.is_empty() {
        return Err(OpError::EmptySelection);
    }

    let bounds = Rectangle::bounding(&member_bounds)
        .unwrap_or_default()
        .inflate(SECTION_PADDING);

    let section_id = EntityId::generate();
    let mut section = Section::new(section_id.clone(), bounds, title);
    *section.child_ids_mut() = members.clone();
    section.set_resolved_children(members.clone());
    stage
        .add_entity(Entity::Section(section))
        .map_err(duplicate_identity)?;

    detach_from_parents(stage, &members, &section_id);
    Ok(section_id)
}

// Extracted cascade/packing implementation helpers.
include!("ops_impl.rs");
