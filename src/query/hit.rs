// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use crate::model::{Entity, EntityId, Stage, Vector};

/// Hit-test at `point`.
///
/// Pen strokes take priority over every other entity kind; among equals the
/// later entry in iteration order wins. Entities hidden by a collapsed
/// section (and hidden sections themselves) are not hit.
pub fn find_entity_by_location(stage: &Stage, point: Vector) -> Option<EntityId> {
    let mut pen_hit = None;
    let mut other_hit = None;

    for (id, entity) in stage.entities() {
        if entity.is_hidden_by_collapse() {
            continue;
        }
        if entity.as_section().is_some_and(|section| section.is_hidden()) {
            continue;
        }
        if !entity.is_contains_point(point) {
            continue;
        }
        match entity {
            Entity::Pen(_) => pen_hit = Some(id.clone()),
            _ => other_hit = Some(id.clone()),
        }
    }

    pen_hit.or(other_hit)
}

#[cfg(test)]
mod tests {
    use super::find_entity_by_location;
    use crate::model::{
        Color, Entity, EntityId, PenStroke, Rectangle, Section, Stage, TextNode, Vector,
    };

    fn add_text(stage: &mut Stage, bounds: Rectangle) -> EntityId {
        let id = EntityId::generate();
        stage
            .add_entity(Entity::Text(TextNode::new(id.clone(), bounds, "node")))
            .expect("add entity");
        id
    }

    #[test]
    fn misses_empty_space() {
        let mut stage = Stage::new();
        add_text(
            &mut stage,
            Rectangle::new(Vector::new(0.0, 0.0), Vector::new(10.0, 10.0)),
        );
        assert_eq!(find_entity_by_location(&stage, Vector::new(100.0, 100.0)), None);
    }

    #[test]
    fn hits_entity_under_point() {
        let mut stage = Stage::new();
        let id = add_text(
            &mut stage,
            Rectangle::new(Vector::new(0.0, 0.0), Vector::new(10.0, 10.0)),
        );
        assert_eq!(find_entity_by_location(&stage, Vector::new(5.0, 5.0)), Some(id));
    }

    #[test]
    fn pen_strokes_take_priority() {
        let mut stage = Stage::new();
        add_text(
            &mut stage,
            Rectangle::new(Vector::new(0.0, 0.0), Vector::new(100.0, 100.0)),
        );

        let pen_id = EntityId::generate();
        stage
            .add_entity(Entity::Pen(PenStroke::new(
                pen_id.clone(),
                vec![Vector::new(0.0, 50.0), Vector::new(100.0, 50.0)],
                Color::new(0, 0, 0, 255),
                2.0,
            )))
            .expect("add stroke");

        assert_eq!(
            find_entity_by_location(&stage, Vector::new(50.0, 50.0)),
            Some(pen_id.clone())
        );
        // Away from the stroke's polyline the text node wins again.
        let hit = find_entity_by_location(&stage, Vector::new(50.0, 90.0));
        assert!(hit.is_some());
        assert_ne!(hit, Some(pen_id));
    }

    #[test]
    fn collapsed_children_are_not_hit() {
        let mut stage = Stage::new();
        let id = add_text(
            &mut stage,
            Rectangle::new(Vector::new(0.0, 0.0), Vector::new(10.0, 10.0)),
        );
        stage
            .entity_mut(&id)
            .expect("entity")
            .set_hidden_by_collapse(true);

        assert_eq!(find_entity_by_location(&stage, Vector::new(5.0, 5.0)), None);
    }

    #[test]
    fn hidden_sections_are_not_hit() {
        let mut stage = Stage::new();
        let id = EntityId::generate();
        let mut section = Section::new(
            id,
            Rectangle::new(Vector::new(0.0, 0.0), Vector::new(50.0, 50.0)),
            "Group",
        );
        section.set_hidden(true);
        stage.add_entity(Entity::Section(section)).expect("add section");

        assert_eq!(find_entity_by_location(&stage, Vector::new(25.0, 25.0)), None);
    }
}
