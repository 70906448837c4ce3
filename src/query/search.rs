// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use regex::RegexBuilder;

use crate::model::{Entity, EntityId, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSearchMode {
    Substring,
    Regex,
}

/// Searches entity text content (node text, section/portal titles, url
/// titles). Entities without text content never match.
pub fn entity_text_search<'a>(
    stage: &'a Stage,
    needle: &str,
    mode: TextSearchMode,
    case_insensitive: bool,
) -> Result<Vec<&'a Entity>, regex::Error> {
    match mode {
        TextSearchMode::Substring => {
            if case_insensitive {
                let needle_lower = needle.to_lowercase();
                Ok(stage
                    .entities()
                    .values()
                    .filter(|entity| {
                        entity
                            .text_content()
                            .is_some_and(|text| text.to_lowercase().contains(&needle_lower))
                    })
                    .collect())
            } else {
                Ok(stage
                    .entities()
                    .values()
                    .filter(|entity| {
                        entity.text_content().is_some_and(|text| text.contains(needle))
                    })
                    .collect())
            }
        }
        TextSearchMode::Regex => {
            let regex = RegexBuilder::new(needle)
                .case_insensitive(case_insensitive)
                .build()?;
            Ok(stage
                .entities()
                .values()
                .filter(|entity| entity.text_content().is_some_and(|text| regex.is_match(text)))
                .collect())
        }
    }
}

/// Fuzzy-ranks entities against `needle` for palette-style lookup.
///
/// Returns up to `limit` `(id, score)` pairs, best first; entities without
/// text content are skipped, as are zero-score matches.
pub fn fuzzy_rank(stage: &Stage, needle: &str, limit: usize) -> Vec<(EntityId, f64)> {
    let mut ranked = stage
        .entities()
        .iter()
        .filter_map(|(id, entity)| {
            let text = entity.text_content()?;
            let score = rapidfuzz::fuzz::ratio(needle.chars(), text.chars());
            (score > 0.0).then(|| (id.clone(), score))
        })
        .collect::<Vec<_>>();

    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::{entity_text_search, fuzzy_rank, TextSearchMode};
    use crate::model::{Entity, EntityId, Rectangle, Stage, TextNode};

    fn stage_with_texts(texts: &[&str]) -> (Stage, Vec<EntityId>) {
        let mut stage = Stage::new();
        let mut ids = Vec::new();
        for text in texts {
            let id = EntityId::generate();
            stage
                .add_entity(Entity::Text(TextNode::new(id.clone(), Rectangle::default(), *text)))
                .expect("add entity");
            ids.push(id);
        }
        (stage, ids)
    }

    #[test]
    fn substring_search_respects_case_flag() {
        let (stage, _) = stage_with_texts(&["Authorize request", "fallback path"]);

        let hits = entity_text_search(&stage, "authorize", TextSearchMode::Substring, false)
            .expect("search");
        assert!(hits.is_empty());

        let hits = entity_text_search(&stage, "authorize", TextSearchMode::Substring, true)
            .expect("search");
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn regex_search_matches_patterns() {
        let (stage, _) = stage_with_texts(&["retry x3", "retry x12", "no retries"]);

        let hits = entity_text_search(&stage, r"retry x\d+", TextSearchMode::Regex, false)
            .expect("search");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn regex_search_reports_compile_errors() {
        let (stage, _) = stage_with_texts(&["anything"]);
        entity_text_search(&stage, "(unclosed", TextSearchMode::Regex, false)
            .expect_err("expected regex compile error");
    }

    #[test]
    fn fuzzy_rank_orders_by_similarity() {
        let (stage, ids) = stage_with_texts(&["authorize", "authored", "zebra"]);

        let ranked = fuzzy_rank(&stage, "authorize", 10);
        assert!(!ranked.is_empty());
        assert_eq!(ranked[0].0, ids[0]);
        assert_eq!(ranked[0].1, 100.0);

        let ranked = fuzzy_rank(&stage, "authorize", 1);
        assert_eq!(ranked.len(), 1);
    }
}
