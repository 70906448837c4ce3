// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use super::attachment::AttachmentId;
use super::geometry::{segment_distance, Color, Rectangle, Vector};
use super::ids::EntityId;
use super::rich_text::RichTextDoc;

/// Padding a section adds around the bounding box of its children.
pub const SECTION_PADDING: f64 = 16.0;

/// Extra tolerance around a pen stroke's polyline during hit-testing.
pub const PEN_HIT_SLOP: f64 = 4.0;

/// The persisted `type` tag of each entity variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Text,
    Section,
    ConnectPoint,
    Image,
    Portal,
    Pen,
    Url,
    Svg,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "core:text_node",
            Self::Section => "core:section_node",
            Self::ConnectPoint => "core:connect_point_node",
            Self::Image => "core:image_node",
            Self::Portal => "core:portal_node",
            Self::Pen => "core:pen_node",
            Self::Url => "core:url_node",
            Self::Svg => "core:svg_node",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEntityKindError {
    pub value: String,
}

impl fmt::Display for ParseEntityKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown entity type {:?}", self.value)
    }
}

impl std::error::Error for ParseEntityKindError {}

impl FromStr for EntityKind {
    type Err = ParseEntityKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core:text_node" => Ok(Self::Text),
            "core:section_node" => Ok(Self::Section),
            "core:connect_point_node" => Ok(Self::ConnectPoint),
            "core:image_node" => Ok(Self::Image),
            "core:portal_node" => Ok(Self::Portal),
            "core:pen_node" => Ok(Self::Pen),
            "core:url_node" => Ok(Self::Url),
            "core:svg_node" => Ok(Self::Svg),
            _ => Err(ParseEntityKindError { value: s.to_owned() }),
        }
    }
}

/// State shared by every entity variant.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCore {
    id: EntityId,
    bounds: Rectangle,
    is_selected: bool,
    is_hidden_by_collapse: bool,
}

impl EntityCore {
    pub fn new(id: EntityId, bounds: Rectangle) -> Self {
        Self {
            id,
            bounds,
            is_selected: false,
            is_hidden_by_collapse: false,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn bounds(&self) -> Rectangle {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Rectangle) {
        self.bounds = bounds;
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.is_selected = selected;
    }

    pub fn is_hidden_by_collapse(&self) -> bool {
        self.is_hidden_by_collapse
    }

    pub fn set_hidden_by_collapse(&mut self, hidden: bool) {
        self.is_hidden_by_collapse = hidden;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    core: EntityCore,
    text: String,
    details: RichTextDoc,
    color: Color,
    is_generating: bool,
}

impl TextNode {
    pub fn new(id: EntityId, bounds: Rectangle, text: impl Into<String>) -> Self {
        Self {
            core: EntityCore::new(id, bounds),
            text: text.into(),
            details: RichTextDoc::default(),
            color: Color::TRANSPARENT,
            is_generating: false,
        }
    }

    pub fn core(&self) -> &EntityCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn details(&self) -> &RichTextDoc {
        &self.details
    }

    pub fn set_details(&mut self, details: RichTextDoc) {
        self.details = details;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn is_generating(&self) -> bool {
        self.is_generating
    }

    pub fn set_generating(&mut self, generating: bool) {
        self.is_generating = generating;
    }
}

/// A nestable grouping entity whose bounds auto-fit its children.
///
/// `child_ids` is the persisted source of truth; `resolved_children` is a
/// cache rebuilt by the reference resolver (child ids filtered against
/// current store membership) and must never be edited independently.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    core: EntityCore,
    title: String,
    color: Color,
    child_ids: Vec<EntityId>,
    resolved_children: Vec<EntityId>,
    is_collapsed: bool,
    is_hidden: bool,
}

impl Section {
    pub fn new(id: EntityId, bounds: Rectangle, title: impl Into<String>) -> Self {
        Self {
            core: EntityCore::new(id, bounds),
            title: title.into(),
            color: Color::TRANSPARENT,
            child_ids: Vec::new(),
            resolved_children: Vec::new(),
            is_collapsed: false,
            is_hidden: false,
        }
    }

    pub fn core(&self) -> &EntityCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn child_ids(&self) -> &[EntityId] {
        &self.child_ids
    }

    pub fn child_ids_mut(&mut self) -> &mut Vec<EntityId> {
        &mut self.child_ids
    }

    pub fn resolved_children(&self) -> &[EntityId] {
        &self.resolved_children
    }

    pub fn set_resolved_children(&mut self, children: Vec<EntityId>) {
        self.resolved_children = children;
    }

    pub fn is_collapsed(&self) -> bool {
        self.is_collapsed
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.is_collapsed = collapsed;
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.is_hidden = hidden;
    }

    /// Re-fits the section's bounds around already-finalized child geometry.
    ///
    /// The resolver calls this bottom-most section first so an enclosing
    /// section sees final child bounds. With no resolved children the
    /// current bounds are kept.
    pub fn adjust_location_and_size(&mut self, child_bounds: &[Rectangle]) {
        if let Some(fit) = Rectangle::bounding(child_bounds) {
            self.core.set_bounds(fit.inflate(SECTION_PADDING));
        }
    }
}

/// An edge anchor point placed on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectPoint {
    core: EntityCore,
}

impl ConnectPoint {
    pub fn new(id: EntityId, bounds: Rectangle) -> Self {
        Self { core: EntityCore::new(id, bounds) }
    }

    pub fn core(&self) -> &EntityCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageNode {
    core: EntityCore,
    attachment_id: AttachmentId,
    natural_size: Vector,
}

impl ImageNode {
    pub fn new(id: EntityId, bounds: Rectangle, attachment_id: AttachmentId) -> Self {
        let natural_size = bounds.size;
        Self {
            core: EntityCore::new(id, bounds),
            attachment_id,
            natural_size,
        }
    }

    pub fn core(&self) -> &EntityCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    pub fn attachment_id(&self) -> &AttachmentId {
        &self.attachment_id
    }

    pub fn natural_size(&self) -> Vector {
        self.natural_size
    }

    pub fn set_natural_size(&mut self, natural_size: Vector) {
        self.natural_size = natural_size;
    }
}

/// A live view onto another region of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalNode {
    core: EntityCore,
    viewport: Rectangle,
    title: String,
}

impl PortalNode {
    pub fn new(id: EntityId, bounds: Rectangle, viewport: Rectangle) -> Self {
        Self {
            core: EntityCore::new(id, bounds),
            viewport,
            title: String::new(),
        }
    }

    pub fn core(&self) -> &EntityCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    pub fn viewport(&self) -> Rectangle {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Rectangle) {
        self.viewport = viewport;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PenStroke {
    core: EntityCore,
    points: Vec<Vector>,
    stroke_color: Color,
    stroke_width: f64,
}

impl PenStroke {
    pub fn new(id: EntityId, points: Vec<Vector>, stroke_color: Color, stroke_width: f64) -> Self {
        let bounds = Self::bounds_of(&points);
        Self {
            core: EntityCore::new(id, bounds),
            points,
            stroke_color,
            stroke_width,
        }
    }

    fn bounds_of(points: &[Vector]) -> Rectangle {
        let rects = points
            .iter()
            .map(|p| Rectangle::new(*p, Vector::ZERO))
            .collect::<Vec<_>>();
        Rectangle::bounding(&rects).unwrap_or_default()
    }

    pub fn core(&self) -> &EntityCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    pub fn points(&self) -> &[Vector] {
        &self.points
    }

    pub fn set_points(&mut self, points: Vec<Vector>) {
        let bounds = Self::bounds_of(&points);
        self.points = points;
        self.core.set_bounds(bounds);
    }

    pub fn stroke_color(&self) -> Color {
        self.stroke_color
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.stroke_color = color;
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    pub fn set_stroke_width(&mut self, width: f64) {
        self.stroke_width = width;
    }

    /// Polyline hit-test: within half the stroke width (plus slop) of any
    /// segment. A single-point stroke degenerates to a point distance.
    pub fn hits(&self, point: Vector) -> bool {
        let tolerance = self.stroke_width / 2.0 + PEN_HIT_SLOP;
        match self.points.as_slice() {
            [] => false,
            [only] => only.distance_to(point) <= tolerance,
            points => points
                .windows(2)
                .any(|pair| segment_distance(pair[0], pair[1], point) <= tolerance),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UrlNode {
    core: EntityCore,
    url: String,
    title: Option<String>,
}

impl UrlNode {
    pub fn new(id: EntityId, bounds: Rectangle, url: impl Into<String>) -> Self {
        Self {
            core: EntityCore::new(id, bounds),
            url: url.into(),
            title: None,
        }
    }

    pub fn core(&self) -> &EntityCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgNode {
    core: EntityCore,
    attachment_id: AttachmentId,
    natural_size: Vector,
}

impl SvgNode {
    pub fn new(id: EntityId, bounds: Rectangle, attachment_id: AttachmentId) -> Self {
        let natural_size = bounds.size;
        Self {
            core: EntityCore::new(id, bounds),
            attachment_id,
            natural_size,
        }
    }

    pub fn core(&self) -> &EntityCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    pub fn attachment_id(&self) -> &AttachmentId {
        &self.attachment_id
    }

    pub fn natural_size(&self) -> Vector {
        self.natural_size
    }

    pub fn set_natural_size(&mut self, natural_size: Vector) {
        self.natural_size = natural_size;
    }
}

/// A placeable visual object on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Text(TextNode),
    Section(Section),
    ConnectPoint(ConnectPoint),
    Image(ImageNode),
    Portal(PortalNode),
    Pen(PenStroke),
    Url(UrlNode),
    Svg(SvgNode),
}

impl Entity {
    pub fn core(&self) -> &EntityCore {
        match self {
            Self::Text(node) => node.core(),
            Self::Section(node) => node.core(),
            Self::ConnectPoint(node) => node.core(),
            Self::Image(node) => node.core(),
            Self::Portal(node) => node.core(),
            Self::Pen(node) => node.core(),
            Self::Url(node) => node.core(),
            Self::Svg(node) => node.core(),
        }
    }

    pub fn core_mut(&mut self) -> &mut EntityCore {
        match self {
            Self::Text(node) => node.core_mut(),
            Self::Section(node) => node.core_mut(),
            Self::ConnectPoint(node) => node.core_mut(),
            Self::Image(node) => node.core_mut(),
            Self::Portal(node) => node.core_mut(),
            Self::Pen(node) => node.core_mut(),
            Self::Url(node) => node.core_mut(),
            Self::Svg(node) => node.core_mut(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Text(_) => EntityKind::Text,
            Self::Section(_) => EntityKind::Section,
            Self::ConnectPoint(_) => EntityKind::ConnectPoint,
            Self::Image(_) => EntityKind::Image,
            Self::Portal(_) => EntityKind::Portal,
            Self::Pen(_) => EntityKind::Pen,
            Self::Url(_) => EntityKind::Url,
            Self::Svg(_) => EntityKind::Svg,
        }
    }

    pub fn id(&self) -> &EntityId {
        self.core().id()
    }

    /// The collision box consumed by hit-testing collaborators.
    pub fn rectangle(&self) -> Rectangle {
        self.core().bounds()
    }

    pub fn set_bounds(&mut self, bounds: Rectangle) {
        self.core_mut().set_bounds(bounds);
    }

    pub fn is_selected(&self) -> bool {
        self.core().is_selected()
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.core_mut().set_selected(selected);
    }

    pub fn is_hidden_by_collapse(&self) -> bool {
        self.core().is_hidden_by_collapse()
    }

    pub fn set_hidden_by_collapse(&mut self, hidden: bool) {
        self.core_mut().set_hidden_by_collapse(hidden);
    }

    /// `isContainsPoint` of the collision-box contract. Pen strokes use
    /// their polyline, everything else its rectangle.
    pub fn is_contains_point(&self, point: Vector) -> bool {
        match self {
            Self::Pen(stroke) => stroke.hits(point),
            _ => self.rectangle().contains_point(point),
        }
    }

    /// The primary searchable text of the entity, if it has one.
    pub fn text_content(&self) -> Option<&str> {
        match self {
            Self::Text(node) => Some(node.text()),
            Self::Section(node) => Some(node.title()),
            Self::Url(node) => Some(node.title().unwrap_or_else(|| node.url())),
            Self::Portal(node) => Some(node.title()),
            Self::ConnectPoint(_) | Self::Image(_) | Self::Pen(_) | Self::Svg(_) => None,
        }
    }

    pub fn as_section(&self) -> Option<&Section> {
        match self {
            Self::Section(section) => Some(section),
            _ => None,
        }
    }

    pub fn as_section_mut(&mut self) -> Option<&mut Section> {
        match self {
            Self::Section(section) => Some(section),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Self::Text(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextNode> {
        match self {
            Self::Text(node) => Some(node),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Entity, EntityKind, PenStroke, Section, TextNode};
    use crate::model::geometry::{Color, Rectangle, Vector};
    use crate::model::ids::EntityId;

    #[test]
    fn kind_strings_round_trip() {
        let kinds = [
            EntityKind::Text,
            EntityKind::Section,
            EntityKind::ConnectPoint,
            EntityKind::Image,
            EntityKind::Portal,
            EntityKind::Pen,
            EntityKind::Url,
            EntityKind::Svg,
        ];
        for kind in kinds {
            let parsed: EntityKind = kind.as_str().parse().expect("parse");
            assert_eq!(parsed, kind);
        }
        assert!("legacy:whatever".parse::<EntityKind>().is_err());
    }

    #[test]
    fn section_fits_children_with_padding() {
        let mut section = Section::new(EntityId::generate(), Rectangle::default(), "Group");
        let children = [
            Rectangle::new(Vector::new(10.0, 10.0), Vector::new(20.0, 20.0)),
            Rectangle::new(Vector::new(50.0, 40.0), Vector::new(10.0, 10.0)),
        ];
        section.adjust_location_and_size(&children);

        let bounds = section.core().bounds();
        for child in &children {
            assert!(bounds.contains_rect(child));
        }
        assert_eq!(bounds.location, Vector::new(10.0 - 16.0, 10.0 - 16.0));
    }

    #[test]
    fn section_keeps_bounds_without_children() {
        let initial = Rectangle::new(Vector::new(1.0, 2.0), Vector::new(3.0, 4.0));
        let mut section = Section::new(EntityId::generate(), initial, "Group");
        section.adjust_location_and_size(&[]);
        assert_eq!(section.core().bounds(), initial);
    }

    #[test]
    fn pen_stroke_hit_follows_polyline() {
        let stroke = PenStroke::new(
            EntityId::generate(),
            vec![Vector::new(0.0, 0.0), Vector::new(100.0, 0.0)],
            Color::new(0, 0, 0, 255),
            2.0,
        );
        let entity = Entity::Pen(stroke);

        assert!(entity.is_contains_point(Vector::new(50.0, 3.0)));
        assert!(!entity.is_contains_point(Vector::new(50.0, 20.0)));
        // Inside the bounding rectangle's row but far off the line.
        assert!(!entity.is_contains_point(Vector::new(-30.0, 0.0)));
    }

    #[test]
    fn text_content_prefers_url_title() {
        let id = EntityId::generate();
        let mut node = crate::model::entity::UrlNode::new(
            id,
            Rectangle::default(),
            "https://example.com",
        );
        assert_eq!(Entity::Url(node.clone()).text_content(), Some("https://example.com"));
        node.set_title(Some("Example".to_owned()));
        assert_eq!(Entity::Url(node).text_content(), Some("Example"));
    }

    #[test]
    fn generating_flag_toggles() {
        let mut node = TextNode::new(EntityId::generate(), Rectangle::default(), "hi");
        assert!(!node.is_generating());
        node.set_generating(true);
        assert!(node.is_generating());
    }
}
