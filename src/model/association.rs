// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use super::geometry::Color;
use super::ids::{AssociationId, EntityId};

/// A reference to an entity by id, with its resolution state.
///
/// Immediately after bulk deserialization every reference is `Pending`; the
/// reference resolver promotes it to `Resolved` once the entity is confirmed
/// present in the store. A `Pending` reference either resolves on the next
/// pass or is dropped by a later deletion cascade.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Resolved(EntityId),
    Pending(EntityId),
}

impl EntityRef {
    pub fn entity_id(&self) -> &EntityId {
        match self {
            Self::Resolved(id) | Self::Pending(id) => id,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn resolved(&self) -> Self {
        Self::Resolved(self.entity_id().clone())
    }
}

/// A directed, binary connection between two entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    id: AssociationId,
    source: EntityRef,
    target: EntityRef,
    text: String,
    color: Color,
    source_rate: f64,
    target_rate: f64,
    is_shifting: bool,
}

impl Edge {
    pub const DEFAULT_RATE: f64 = 0.5;

    pub fn new(id: AssociationId, source: EntityRef, target: EntityRef) -> Self {
        Self {
            id,
            source,
            target,
            text: String::new(),
            color: Color::TRANSPARENT,
            source_rate: Self::DEFAULT_RATE,
            target_rate: Self::DEFAULT_RATE,
            is_shifting: false,
        }
    }

    pub fn id(&self) -> &AssociationId {
        &self.id
    }

    pub fn source(&self) -> &EntityRef {
        &self.source
    }

    pub fn set_source(&mut self, source: EntityRef) {
        self.source = source;
    }

    pub fn target(&self) -> &EntityRef {
        &self.target
    }

    pub fn set_target(&mut self, target: EntityRef) {
        self.target = target;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn source_rate(&self) -> f64 {
        self.source_rate
    }

    pub fn set_source_rate(&mut self, rate: f64) {
        self.source_rate = rate;
    }

    pub fn target_rate(&self) -> f64 {
        self.target_rate
    }

    pub fn set_target_rate(&mut self, rate: f64) {
        self.target_rate = rate;
    }

    /// Derived rendering offset flag for opposite-direction edge pairs.
    /// Recomputed on every resolver pass, never persisted.
    pub fn is_shifting(&self) -> bool {
        self.is_shifting
    }

    pub fn set_shifting(&mut self, shifting: bool) {
        self.is_shifting = shifting;
    }

    pub fn touches(&self, entity_id: &EntityId) -> bool {
        self.source.entity_id() == entity_id || self.target.entity_id() == entity_id
    }
}

/// Arrow decoration of a hyperedge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HyperedgeArrow {
    Inner,
    Outer,
    #[default]
    None,
}

impl HyperedgeArrow {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Outer => "outer",
            Self::None => "none",
        }
    }
}

impl fmt::Display for HyperedgeArrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseHyperedgeArrowError {
    pub value: String,
}

impl fmt::Display for ParseHyperedgeArrowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hyperedge arrow {:?}", self.value)
    }
}

impl std::error::Error for ParseHyperedgeArrowError {}

impl FromStr for HyperedgeArrow {
    type Err = ParseHyperedgeArrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inner" => Ok(Self::Inner),
            "outer" => Ok(Self::Outer),
            "none" => Ok(Self::None),
            _ => Err(ParseHyperedgeArrowError { value: s.to_owned() }),
        }
    }
}

/// One endpoint of a hyperedge: the referenced entity plus its perimeter
/// attachment rate.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperedgeMember {
    entity: EntityRef,
    rate: f64,
}

impl HyperedgeMember {
    pub fn new(entity: EntityRef, rate: f64) -> Self {
        Self { entity, rate }
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn set_entity(&mut self, entity: EntityRef) {
        self.entity = entity;
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }
}

/// An undirected association connecting two or more entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperedge {
    id: AssociationId,
    members: Vec<HyperedgeMember>,
    arrow: HyperedgeArrow,
    text: String,
    color: Color,
}

impl Hyperedge {
    pub fn new(id: AssociationId, members: Vec<HyperedgeMember>) -> Self {
        Self {
            id,
            members,
            arrow: HyperedgeArrow::None,
            text: String::new(),
            color: Color::TRANSPARENT,
        }
    }

    pub fn id(&self) -> &AssociationId {
        &self.id
    }

    pub fn members(&self) -> &[HyperedgeMember] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut Vec<HyperedgeMember> {
        &mut self.members
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.members.iter().map(|member| member.entity().entity_id())
    }

    pub fn arrow(&self) -> HyperedgeArrow {
        self.arrow
    }

    pub fn set_arrow(&mut self, arrow: HyperedgeArrow) {
        self.arrow = arrow;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn touches(&self, entity_id: &EntityId) -> bool {
        self.member_ids().any(|id| id == entity_id)
    }
}

/// A relationship object connecting entities.
#[derive(Debug, Clone, PartialEq)]
pub enum Association {
    Edge(Edge),
    Hyperedge(Hyperedge),
}

impl Association {
    pub fn id(&self) -> &AssociationId {
        match self {
            Self::Edge(edge) => edge.id(),
            Self::Hyperedge(hyperedge) => hyperedge.id(),
        }
    }

    pub fn touches(&self, entity_id: &EntityId) -> bool {
        match self {
            Self::Edge(edge) => edge.touches(entity_id),
            Self::Hyperedge(hyperedge) => hyperedge.touches(entity_id),
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Self::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    pub fn as_edge_mut(&mut self) -> Option<&mut Edge> {
        match self {
            Self::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    pub fn as_hyperedge(&self) -> Option<&Hyperedge> {
        match self {
            Self::Hyperedge(hyperedge) => Some(hyperedge),
            _ => None,
        }
    }

    pub fn as_hyperedge_mut(&mut self) -> Option<&mut Hyperedge> {
        match self {
            Self::Hyperedge(hyperedge) => Some(hyperedge),
            _ => None,
        }
    }
}
