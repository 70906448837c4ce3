// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A document is a `Stage` of typed entities and associations keyed by UUID,
//! owned by a `Project` together with its settings, attachments and the
//! generation gate.

pub mod association;
pub mod attachment;
pub mod entity;
pub mod geometry;
pub mod ids;
pub mod project;
pub mod rich_text;
pub mod settings;
pub mod stage;

pub use association::{
    Association, Edge, EntityRef, Hyperedge, HyperedgeArrow, HyperedgeMember,
    ParseHyperedgeArrowError,
};
pub use attachment::{AttachmentId, AttachmentIdError};
pub use entity::{
    ConnectPoint, Entity, EntityCore, EntityKind, ImageNode, ParseEntityKindError, PenStroke,
    PortalNode, Section, SvgNode, TextNode, UrlNode, PEN_HIT_SLOP, SECTION_PADDING,
};
pub use geometry::{segment_distance, Color, Rectangle, Vector};
pub use ids::{AssociationId, EntityId, Id, IdError};
pub use project::{HistoryRecorder, NoopHistory, Project};
pub use rich_text::{Block, Inline, RichTextDoc};
pub use settings::{SettingFlag, Settings};
pub use stage::{Stage, StageError, StageObject};
