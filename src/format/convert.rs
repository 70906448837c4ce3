// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The terminal "any-version → current" object-graph constructor, and the
//! mirror serializer for the current schema.
//!
//! Works on migration-normalized (v17) JSON. Entities are converted
//! children-first with a memo cache so an entity referenced from several
//! places converts exactly once; associations convert after all entities so
//! broken references can be dropped instead of failing the load. Unknown
//! variant tags are skipped with a warning. The only fatal entity error is a
//! missing or empty uuid, since identity cannot be synthesized safely.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::warn;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::model::{
    Association, AssociationId, AttachmentId, Color, ConnectPoint, Edge, Entity, EntityId,
    EntityKind, EntityRef, Hyperedge, HyperedgeArrow, HyperedgeMember, IdError, ImageNode,
    PenStroke, PortalNode, Rectangle, RichTextDoc, Section, Stage, SvgNode, TextNode, UrlNode,
    Vector,
};

use super::migrate::CURRENT_VERSION;

/// Supplies binary payloads for file paths stored relative to the document.
pub trait AttachmentSource {
    fn read(&mut self, relative_path: &str) -> io::Result<Vec<u8>>;
}

/// A source with no backing files; every read fails with `NotFound`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAttachments;

impl AttachmentSource for NoAttachments {
    fn read(&mut self, relative_path: &str) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no attachment source for {relative_path:?}"),
        ))
    }
}

/// In-memory attachment source keyed by relative path.
#[derive(Debug, Default, Clone)]
pub struct MemoryAttachments {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, relative_path: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(relative_path.into(), bytes);
    }
}

impl AttachmentSource for MemoryAttachments {
    fn read(&mut self, relative_path: &str) -> io::Result<Vec<u8>> {
        self.files.get(relative_path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("attachment not found: {relative_path:?}"),
            )
        })
    }
}

/// The loaded object graph plus the binary payloads extracted on the way.
///
/// The caller persists attachments separately from the JSON document.
#[derive(Debug, Clone)]
pub struct MigratedDocument {
    pub stage: Stage,
    pub attachments: BTreeMap<AttachmentId, Vec<u8>>,
}

#[derive(Debug)]
pub enum ConvertError {
    Json { source: serde_json::Error },
    MissingIdentity { kind: String },
    InvalidIdentity { value: String, source: IdError },
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json { source } => write!(f, "document does not match the schema: {source}"),
            Self::MissingIdentity { kind } => {
                write!(f, "entity of type {kind:?} has no uuid; identity cannot be synthesized")
            }
            Self::InvalidIdentity { value, source } => {
                write!(f, "invalid entity uuid {value:?}: {source}")
            }
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json { source } => Some(source),
            Self::InvalidIdentity { source, .. } => Some(source),
            Self::MissingIdentity { .. } => None,
        }
    }
}

fn default_rate() -> f64 {
    Edge::DEFAULT_RATE
}

fn default_stroke_width() -> f64 {
    2.0
}

fn default_association_kind() -> String {
    "edge".to_owned()
}

fn default_arrow() -> String {
    "none".to_owned()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentJson {
    #[serde(default)]
    entities: Vec<Value>,
    #[serde(default)]
    associations: Vec<Value>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityJson {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    location: [f64; 2],
    #[serde(default)]
    size: [f64; 2],
    #[serde(default)]
    color: [u8; 4],
    #[serde(default)]
    text: String,
    #[serde(default)]
    details: String,
    #[serde(default)]
    children: Vec<String>,
    #[serde(default)]
    is_collapsed: bool,
    #[serde(default)]
    is_hidden: bool,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    attachment: Option<String>,
    #[serde(default)]
    natural_size: Option<[f64; 2]>,
    #[serde(default)]
    points: Vec<[f64; 2]>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default = "default_stroke_width")]
    stroke_width: f64,
    #[serde(default)]
    viewport: Option<[[f64; 2]; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssociationJson {
    #[serde(default = "default_association_kind")]
    kind: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    targets: Vec<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    color: [u8; 4],
    #[serde(default = "default_rate")]
    source_rate: f64,
    #[serde(default = "default_rate")]
    target_rate: f64,
    #[serde(default)]
    rates: Vec<f64>,
    #[serde(default = "default_arrow")]
    arrow: String,
}

struct ConvertCtx<'a> {
    raw: BTreeMap<EntityId, EntityJson>,
    converted: BTreeMap<EntityId, Entity>,
    in_progress: BTreeSet<EntityId>,
    attachments: BTreeMap<AttachmentId, Vec<u8>>,
    source: &'a mut dyn AttachmentSource,
}

/// Builds the current object graph from migration-normalized JSON.
pub fn convert_document(
    value: Value,
    attachments: &mut dyn AttachmentSource,
) -> Result<MigratedDocument, ConvertError> {
    let doc: DocumentJson =
        serde_json::from_value(value).map_err(|source| ConvertError::Json { source })?;

    let mut raw_entities: BTreeMap<EntityId, EntityJson> = BTreeMap::new();
    let mut order: Vec<EntityId> = Vec::new();
    for raw in doc.entities {
        let kind_hint = raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_owned();
        let Some(uuid_str) = raw.get("uuid").and_then(Value::as_str) else {
            return Err(ConvertError::MissingIdentity { kind: kind_hint });
        };
        let id = EntityId::new(uuid_str).map_err(|source| ConvertError::InvalidIdentity {
            value: uuid_str.to_owned(),
            source,
        })?;

        let entity: EntityJson = match serde_json::from_value(raw) {
            Ok(entity) => entity,
            Err(err) => {
                warn!("skipping malformed entity {id}: {err}");
                continue;
            }
        };
        if raw_entities.contains_key(&id) {
            warn!("duplicate entity uuid {id}, keeping the first occurrence");
            continue;
        }
        order.push(id.clone());
        raw_entities.insert(id, entity);
    }

    let mut ctx = ConvertCtx {
        raw: raw_entities,
        converted: BTreeMap::new(),
        in_progress: BTreeSet::new(),
        attachments: BTreeMap::new(),
        source: attachments,
    };
    for id in &order {
        convert_entity(&mut ctx, id);
    }

    let mut stage = Stage::new();
    for id in &order {
        if let Some(entity) = ctx.converted.remove(id) {
            if let Err(err) = stage.add_entity(entity) {
                warn!("dropping entity {id}: {err}");
            }
        }
    }

    for raw in doc.associations {
        convert_association(&mut stage, raw);
    }

    for tag in doc.tags {
        if tag.is_empty() {
            warn!("skipping empty tag id");
            continue;
        }
        stage.tags_mut().push(tag);
    }

    Ok(MigratedDocument { stage, attachments: ctx.attachments })
}

fn convert_entity(ctx: &mut ConvertCtx<'_>, id: &EntityId) {
    if ctx.converted.contains_key(id) || !ctx.raw.contains_key(id) {
        return;
    }
    if !ctx.in_progress.insert(id.clone()) {
        warn!("cyclic section containment at {id}, skipping nested reference");
        return;
    }
    let Some(raw) = ctx.raw.get(id).cloned() else {
        ctx.in_progress.remove(id);
        return;
    };

    let entity = match raw.kind.parse::<EntityKind>() {
        Ok(kind) => build_entity(ctx, id, kind, &raw),
        Err(err) => {
            warn!("skipping entity {id}: {err}");
            None
        }
    };

    if let Some(entity) = entity {
        ctx.converted.insert(id.clone(), entity);
    }
    ctx.in_progress.remove(id);
}

fn build_entity(
    ctx: &mut ConvertCtx<'_>,
    id: &EntityId,
    kind: EntityKind,
    raw: &EntityJson,
) -> Option<Entity> {
    let bounds = Rectangle::new(
        Vector::new(raw.location[0], raw.location[1]),
        Vector::new(raw.size[0], raw.size[1]),
    );
    let color = Color::from_channels(raw.color);

    match kind {
        EntityKind::Text => {
            let mut node = TextNode::new(id.clone(), bounds, raw.text.clone());
            node.set_details(RichTextDoc::from_markdown(&raw.details));
            node.set_color(color);
            Some(Entity::Text(node))
        }
        EntityKind::Section => {
            let mut child_ids = Vec::new();
            for child in &raw.children {
                match EntityId::new(child.as_str()) {
                    Ok(child_id) => child_ids.push(child_id),
                    Err(err) => warn!("section {id} lists an invalid child id {child:?}: {err}"),
                }
            }
            // Children convert before the parent (post-order); the memo cache
            // keeps an entity referenced from several places converted once.
            for child_id in &child_ids {
                convert_entity(ctx, child_id);
            }

            let mut section = Section::new(id.clone(), bounds, raw.text.clone());
            section.set_color(color);
            *section.child_ids_mut() = child_ids;
            section.set_collapsed(raw.is_collapsed);
            section.set_hidden(raw.is_hidden);
            Some(Entity::Section(section))
        }
        EntityKind::ConnectPoint => Some(Entity::ConnectPoint(ConnectPoint::new(id.clone(), bounds))),
        EntityKind::Image => {
            let attachment_id = extract_attachment(ctx, id, raw)?;
            let mut node = ImageNode::new(id.clone(), bounds, attachment_id);
            if let Some([w, h]) = raw.natural_size {
                node.set_natural_size(Vector::new(w, h));
            }
            Some(Entity::Image(node))
        }
        EntityKind::Svg => {
            let attachment_id = extract_attachment(ctx, id, raw)?;
            let mut node = SvgNode::new(id.clone(), bounds, attachment_id);
            if let Some([w, h]) = raw.natural_size {
                node.set_natural_size(Vector::new(w, h));
            }
            Some(Entity::Svg(node))
        }
        EntityKind::Portal => {
            let viewport = match raw.viewport {
                Some([[x, y], [w, h]]) => Rectangle::new(Vector::new(x, y), Vector::new(w, h)),
                None => bounds,
            };
            let mut node = PortalNode::new(id.clone(), bounds, viewport);
            if let Some(title) = raw.title.clone() {
                node.set_title(title);
            }
            Some(Entity::Portal(node))
        }
        EntityKind::Pen => {
            let points = raw.points.iter().map(|[x, y]| Vector::new(*x, *y)).collect();
            Some(Entity::Pen(PenStroke::new(
                id.clone(),
                points,
                color,
                raw.stroke_width,
            )))
        }
        EntityKind::Url => {
            let mut node = UrlNode::new(id.clone(), bounds, raw.url.clone());
            node.set_title(raw.title.clone());
            Some(Entity::Url(node))
        }
    }
}

/// Resolves the binary payload of an image/svg entity into a
/// content-addressed attachment.
///
/// Already-converted documents carry an `attachment` reference; legacy
/// documents carry a document-relative `filePath` or an inline `data:` url.
/// Any failure is lossy: the entity is skipped, the load continues.
fn extract_attachment(
    ctx: &mut ConvertCtx<'_>,
    id: &EntityId,
    raw: &EntityJson,
) -> Option<AttachmentId> {
    if let Some(reference) = raw.attachment.as_deref() {
        match AttachmentId::new(reference) {
            Ok(attachment_id) => return Some(attachment_id),
            Err(err) => {
                warn!("entity {id} has an invalid attachment reference: {err}");
                return None;
            }
        }
    }

    let Some(path) = raw.file_path.as_deref() else {
        warn!("entity {id} has no payload path, skipping");
        return None;
    };

    let bytes = if let Some(data) = path.strip_prefix("data:") {
        let Some((_, encoded)) = data.split_once(',') else {
            warn!("entity {id} has a malformed data url, skipping");
            return None;
        };
        match STANDARD.decode(encoded.trim()) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("entity {id} has an undecodable data url: {err}");
                return None;
            }
        }
    } else {
        match ctx.source.read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("cannot read payload {path:?} for entity {id}: {err}");
                return None;
            }
        }
    };

    let attachment_id = AttachmentId::from_bytes(&bytes);
    ctx.attachments.insert(attachment_id.clone(), bytes);
    Some(attachment_id)
}

fn convert_association(stage: &mut Stage, raw: Value) {
    let kind_hint = raw
        .get("kind")
        .and_then(Value::as_str)
        .unwrap_or("edge")
        .to_owned();
    let Some(uuid_str) = raw.get("uuid").and_then(Value::as_str) else {
        warn!("skipping {kind_hint} association without uuid");
        return;
    };
    let Ok(id) = AssociationId::new(uuid_str) else {
        warn!("skipping {kind_hint} association with empty uuid");
        return;
    };

    let association: AssociationJson = match serde_json::from_value(raw) {
        Ok(association) => association,
        Err(err) => {
            warn!("skipping malformed association {id}: {err}");
            return;
        }
    };

    match association.kind.as_str() {
        "edge" => {
            let (Some(source), Some(target)) = (association.source, association.target) else {
                warn!("dropping edge {id} with missing endpoint ids");
                return;
            };
            let (Ok(source_id), Ok(target_id)) =
                (EntityId::new(source.as_str()), EntityId::new(target.as_str()))
            else {
                warn!("dropping edge {id} with empty endpoint ids");
                return;
            };
            if !stage.entities().contains_key(source_id.as_str()) {
                warn!("dropping edge {id}: source {source_id} has no converted entity");
                return;
            }
            if !stage.entities().contains_key(target_id.as_str()) {
                warn!("dropping edge {id}: target {target_id} has no converted entity");
                return;
            }

            let mut edge = Edge::new(
                id.clone(),
                EntityRef::Pending(source_id),
                EntityRef::Pending(target_id),
            );
            edge.set_text(association.text);
            edge.set_color(Color::from_channels(association.color));
            edge.set_source_rate(association.source_rate);
            edge.set_target_rate(association.target_rate);
            if let Err(err) = stage.add_association(Association::Edge(edge)) {
                warn!("dropping edge {id}: {err}");
            }
        }
        "hyperedge" => {
            let mut members = Vec::new();
            for (index, target) in association.targets.iter().enumerate() {
                let Ok(member_id) = EntityId::new(target.as_str()) else {
                    warn!("hyperedge {id} lists an empty member id, skipping member");
                    continue;
                };
                if !stage.entities().contains_key(member_id.as_str()) {
                    warn!("dropping member {member_id} of hyperedge {id}: no converted entity");
                    continue;
                }
                let rate = association.rates.get(index).copied().unwrap_or(Edge::DEFAULT_RATE);
                members.push(HyperedgeMember::new(EntityRef::Pending(member_id), rate));
            }
            if members.len() < 2 {
                warn!("dropping hyperedge {id}: fewer than 2 resolvable members");
                return;
            }

            let mut hyperedge = Hyperedge::new(id.clone(), members);
            let arrow = match association.arrow.parse::<HyperedgeArrow>() {
                Ok(arrow) => arrow,
                Err(err) => {
                    warn!("hyperedge {id}: {err}, using none");
                    HyperedgeArrow::None
                }
            };
            hyperedge.set_arrow(arrow);
            hyperedge.set_text(association.text);
            hyperedge.set_color(Color::from_channels(association.color));
            if let Err(err) = stage.add_association(Association::Hyperedge(hyperedge)) {
                warn!("dropping hyperedge {id}: {err}");
            }
        }
        other => warn!("skipping association {id} with unsupported kind {other:?}"),
    }
}

fn vector_json(vector: Vector) -> Value {
    json!([vector.x, vector.y])
}

fn color_json(color: Color) -> Value {
    json!([color.r, color.g, color.b, color.a])
}

/// Serializes the stage back into the current (v17) document schema.
pub fn document_to_value(stage: &Stage) -> Value {
    let entities: Vec<Value> = stage.entities().values().map(entity_to_value).collect();
    let associations: Vec<Value> =
        stage.associations().values().map(association_to_value).collect();
    json!({
        "version": CURRENT_VERSION,
        "entities": entities,
        "associations": associations,
        "tags": stage.tags(),
    })
}

fn entity_to_value(entity: &Entity) -> Value {
    let bounds = entity.rectangle();
    let mut map = Map::new();
    map.insert("uuid".to_owned(), Value::from(entity.id().as_str()));
    map.insert("type".to_owned(), Value::from(entity.kind().as_str()));
    map.insert("location".to_owned(), vector_json(bounds.location));
    map.insert("size".to_owned(), vector_json(bounds.size));

    match entity {
        Entity::Text(node) => {
            map.insert("text".to_owned(), Value::from(node.text()));
            map.insert("details".to_owned(), Value::from(node.details().source()));
            map.insert("detailsFormat".to_owned(), Value::from("markdown"));
            map.insert("color".to_owned(), color_json(node.color()));
        }
        Entity::Section(section) => {
            map.insert("text".to_owned(), Value::from(section.title()));
            map.insert("color".to_owned(), color_json(section.color()));
            map.insert(
                "children".to_owned(),
                Value::Array(
                    section
                        .child_ids()
                        .iter()
                        .map(|child| Value::from(child.as_str()))
                        .collect(),
                ),
            );
            map.insert("isCollapsed".to_owned(), Value::from(section.is_collapsed()));
            map.insert("isHidden".to_owned(), Value::from(section.is_hidden()));
        }
        Entity::ConnectPoint(_) => {}
        Entity::Image(node) => {
            map.insert("attachment".to_owned(), Value::from(node.attachment_id().as_str()));
            map.insert("naturalSize".to_owned(), vector_json(node.natural_size()));
        }
        Entity::Svg(node) => {
            map.insert("attachment".to_owned(), Value::from(node.attachment_id().as_str()));
            map.insert("naturalSize".to_owned(), vector_json(node.natural_size()));
        }
        Entity::Portal(node) => {
            let viewport = node.viewport();
            map.insert(
                "viewport".to_owned(),
                json!([[viewport.location.x, viewport.location.y], [viewport.size.x, viewport.size.y]]),
            );
            map.insert("title".to_owned(), Value::from(node.title()));
        }
        Entity::Pen(stroke) => {
            map.insert(
                "points".to_owned(),
                Value::Array(stroke.points().iter().map(|point| vector_json(*point)).collect()),
            );
            map.insert("color".to_owned(), color_json(stroke.stroke_color()));
            map.insert("strokeWidth".to_owned(), Value::from(stroke.stroke_width()));
        }
        Entity::Url(node) => {
            map.insert("url".to_owned(), Value::from(node.url()));
            map.insert(
                "title".to_owned(),
                node.title().map_or(Value::Null, Value::from),
            );
        }
    }

    Value::Object(map)
}

fn association_to_value(association: &Association) -> Value {
    let mut map = Map::new();
    map.insert("uuid".to_owned(), Value::from(association.id().as_str()));

    match association {
        Association::Edge(edge) => {
            map.insert("kind".to_owned(), Value::from("edge"));
            map.insert("source".to_owned(), Value::from(edge.source().entity_id().as_str()));
            map.insert("target".to_owned(), Value::from(edge.target().entity_id().as_str()));
            map.insert("text".to_owned(), Value::from(edge.text()));
            map.insert("color".to_owned(), color_json(edge.color()));
            map.insert("sourceRate".to_owned(), Value::from(edge.source_rate()));
            map.insert("targetRate".to_owned(), Value::from(edge.target_rate()));
        }
        Association::Hyperedge(hyperedge) => {
            map.insert("kind".to_owned(), Value::from("hyperedge"));
            map.insert(
                "targets".to_owned(),
                Value::Array(
                    hyperedge
                        .member_ids()
                        .map(|member| Value::from(member.as_str()))
                        .collect(),
                ),
            );
            map.insert(
                "rates".to_owned(),
                Value::Array(
                    hyperedge
                        .members()
                        .iter()
                        .map(|member| Value::from(member.rate()))
                        .collect(),
                ),
            );
            map.insert("arrow".to_owned(), Value::from(hyperedge.arrow().as_str()));
            map.insert("text".to_owned(), Value::from(hyperedge.text()));
            map.insert("color".to_owned(), color_json(hyperedge.color()));
        }
    }

    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::{
        convert_document, document_to_value, ConvertError, MemoryAttachments, NoAttachments,
    };
    use crate::format::migrate::migrate_value;
    use crate::model::{AttachmentId, Color, Entity, EntityKind, Stage};
    use crate::ops::resolve::update_references;
    use serde_json::json;

    fn load(value: serde_json::Value) -> super::MigratedDocument {
        let mut value = value;
        migrate_value(&mut value);
        convert_document(value, &mut NoAttachments).expect("convert")
    }

    #[test]
    fn v1_node_becomes_a_default_text_node() {
        let loaded = load(json!({ "nodes": [{ "uuid": "n1" }], "links": [] }));
        let stage = loaded.stage;

        assert_eq!(stage.entity_count(), 1);
        let id = "n1".parse().expect("id");
        let entity = stage.entity(&id).expect("entity");
        assert_eq!(entity.kind(), EntityKind::Text);

        let node = entity.as_text().expect("text node");
        assert_eq!(node.text(), "");
        assert!(node.details().is_empty());
        assert_eq!(node.color(), Color::TRANSPARENT);
    }

    #[test]
    fn missing_uuid_is_fatal() {
        let err = convert_document(
            json!({ "version": 17, "entities": [{ "type": "core:text_node" }] }),
            &mut NoAttachments,
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::MissingIdentity { .. }));

        let err = convert_document(
            json!({ "version": 17, "entities": [{ "uuid": "" }] }),
            &mut NoAttachments,
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidIdentity { .. }));
    }

    #[test]
    fn unknown_entity_types_are_skipped_not_fatal() {
        let loaded = load(json!({
            "version": 17,
            "entities": [
                { "uuid": "n1", "type": "core:text_node", "text": "keep" },
                { "uuid": "x1", "type": "plugin:fancy_node" }
            ],
            "associations": [
                { "uuid": "e1", "kind": "edge", "source": "n1", "target": "x1" }
            ],
            "tags": []
        }));

        assert_eq!(loaded.stage.entity_count(), 1);
        // The edge pointing at the skipped entity is dropped, not an error.
        assert_eq!(loaded.stage.association_count(), 0);
    }

    #[test]
    fn unknown_association_kinds_are_skipped() {
        let loaded = load(json!({
            "version": 17,
            "entities": [
                { "uuid": "n1", "type": "core:text_node" },
                { "uuid": "n2", "type": "core:text_node" }
            ],
            "associations": [
                { "uuid": "a1", "kind": "teleport", "source": "n1", "target": "n2" },
                { "uuid": "a2", "kind": "edge", "source": "n1", "target": "n2" }
            ]
        }));

        assert_eq!(loaded.stage.association_count(), 1);
    }

    #[test]
    fn section_children_convert_before_the_parent_and_only_once() {
        let loaded = load(json!({
            "version": 17,
            "entities": [
                { "uuid": "outer", "type": "core:section_node",
                  "children": ["inner", "leaf"], "isCollapsed": false, "isHidden": false },
                { "uuid": "inner", "type": "core:section_node",
                  "children": ["leaf"], "isCollapsed": false, "isHidden": false },
                { "uuid": "leaf", "type": "core:text_node", "text": "leaf" }
            ]
        }));
        let stage = loaded.stage;

        assert_eq!(stage.entity_count(), 3);
        let outer = stage.entity(&"outer".parse().expect("id")).expect("outer");
        let inner = stage.entity(&"inner".parse().expect("id")).expect("inner");
        assert_eq!(outer.as_section().expect("section").child_ids().len(), 2);
        assert_eq!(inner.as_section().expect("section").child_ids().len(), 1);
    }

    #[test]
    fn cyclic_section_containment_does_not_hang() {
        let loaded = load(json!({
            "version": 17,
            "entities": [
                { "uuid": "a", "type": "core:section_node", "children": ["b"] },
                { "uuid": "b", "type": "core:section_node", "children": ["a"] }
            ]
        }));
        assert_eq!(loaded.stage.entity_count(), 2);
    }

    #[test]
    fn data_url_payload_becomes_a_content_addressed_attachment() {
        let loaded = load(json!({
            "version": 17,
            "entities": [
                { "uuid": "img", "type": "core:image_node",
                  "filePath": "data:image/png;base64,aGVsbG8=", "size": [10.0, 10.0] }
            ]
        }));

        let expected = AttachmentId::from_bytes(b"hello");
        assert_eq!(loaded.attachments.get(&expected).map(Vec::as_slice), Some(&b"hello"[..]));

        let entity = loaded.stage.entity(&"img".parse().expect("id")).expect("image");
        let Entity::Image(node) = entity else {
            panic!("expected image node");
        };
        assert_eq!(node.attachment_id(), &expected);
    }

    #[test]
    fn relative_path_payload_is_read_from_the_source() {
        let mut files = MemoryAttachments::new();
        files.insert("images/cat.png", b"cat-bytes".to_vec());

        let mut value = json!({
            "version": 10,
            "entities": [
                { "uuid": "img", "type": "core:image_node", "src": "images/cat.png",
                  "location": [0.0, 0.0], "size": [32.0, 32.0],
                  "color": [0, 0, 0, 0], "details": "" }
            ],
            "associations": [],
            "tags": []
        });
        migrate_value(&mut value);
        let loaded = convert_document(value, &mut files).expect("convert");

        let expected = AttachmentId::from_bytes(b"cat-bytes");
        assert!(loaded.attachments.contains_key(&expected));
    }

    #[test]
    fn unreadable_payload_skips_the_entity_only() {
        let loaded = load(json!({
            "version": 17,
            "entities": [
                { "uuid": "img", "type": "core:image_node", "filePath": "missing.png" },
                { "uuid": "n1", "type": "core:text_node" }
            ]
        }));

        assert_eq!(loaded.stage.entity_count(), 1);
        assert!(loaded.attachments.is_empty());
    }

    #[test]
    fn hyperedge_members_keep_their_rates_and_drop_broken_refs() {
        let loaded = load(json!({
            "version": 17,
            "entities": [
                { "uuid": "a", "type": "core:text_node" },
                { "uuid": "b", "type": "core:text_node" },
                { "uuid": "c", "type": "core:text_node" }
            ],
            "associations": [
                { "uuid": "h1", "kind": "hyperedge",
                  "targets": ["a", "ghost", "b", "c"],
                  "rates": [0.1, 0.2, 0.3, 0.4], "arrow": "outer" }
            ]
        }));

        let stage = loaded.stage;
        let hyperedge = stage
            .association(&"h1".parse().expect("id"))
            .expect("hyperedge")
            .as_hyperedge()
            .expect("hyperedge");
        // "ghost" was dropped; surviving members keep their own rates.
        assert_eq!(hyperedge.members().len(), 3);
        assert_eq!(hyperedge.members()[0].rate(), 0.1);
        assert_eq!(hyperedge.members()[1].rate(), 0.3);
        assert_eq!(hyperedge.members()[2].rate(), 0.4);
    }

    #[test]
    fn current_schema_round_trips_through_the_serializer() {
        let loaded = load(json!({
            "version": 17,
            "entities": [
                { "uuid": "n1", "type": "core:text_node", "text": "alpha",
                  "details": "# Heading\n\nbody", "color": [1, 2, 3, 4],
                  "location": [10.0, 20.0], "size": [100.0, 40.0] },
                { "uuid": "n2", "type": "core:url_node", "url": "https://example.com",
                  "title": null, "location": [0.0, 0.0], "size": [50.0, 20.0] },
                { "uuid": "s1", "type": "core:section_node", "children": ["n1"],
                  "isCollapsed": false, "isHidden": false,
                  "location": [0.0, 0.0], "size": [200.0, 100.0] }
            ],
            "associations": [
                { "uuid": "e1", "kind": "edge", "source": "n1", "target": "n2",
                  "sourceRate": 0.25, "targetRate": 0.75, "text": "to" }
            ],
            "tags": ["n1", "ghost-tag"]
        }));
        let mut original = loaded.stage;
        update_references(&mut original);

        let serialized = document_to_value(&original);
        let reloaded = convert_document(serialized, &mut NoAttachments).expect("reload");
        let mut reloaded_stage = reloaded.stage;
        update_references(&mut reloaded_stage);

        assert_eq!(reloaded_stage, original);
    }

    #[test]
    fn empty_document_converts_to_an_empty_stage() {
        let loaded = load(json!({}));
        assert_eq!(loaded.stage, Stage::new());
    }
}
