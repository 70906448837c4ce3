// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The version-gated schema upgrade chain.
//!
//! A strictly ordered chain of pure transforms `f_i : Doc(v=i) -> Doc(v=i+1)`
//! over raw JSON. Every step is guarded by a version check, making the whole
//! chain idempotent and safely re-runnable on already-current documents.
//! Steps only add, rename or default fields; they never invent data that
//! cannot be derived from the lower version. Documents without a `version`
//! field are version 1.

use serde_json::{json, Map, Value};

pub const CURRENT_VERSION: u64 = 17;

pub fn document_version(doc: &Value) -> u64 {
    doc.get("version").and_then(Value::as_u64).unwrap_or(1)
}

pub fn migrate_value(doc: &mut Value) {
    let Some(map) = doc.as_object_mut() else {
        return;
    };
    step_to_2(map);
    step_to_3(map);
    step_to_4(map);
    step_to_5(map);
    step_to_6(map);
    step_to_7(map);
    step_to_8(map);
    step_to_9(map);
    step_to_10(map);
    step_to_11(map);
    step_to_12(map);
    step_to_13(map);
    step_to_14(map);
    step_to_15(map);
    step_to_16(map);
    step_to_17(map);
}

fn version(map: &Map<String, Value>) -> u64 {
    map.get("version").and_then(Value::as_u64).unwrap_or(1)
}

fn set_version(map: &mut Map<String, Value>, version: u64) {
    map.insert("version".to_owned(), Value::from(version));
}

fn ensure_array(map: &mut Map<String, Value>, key: &str) {
    map.entry(key).or_insert_with(|| Value::Array(Vec::new()));
}

fn rename_field(map: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = map.remove(from) {
        map.entry(to).or_insert(value);
    }
}

fn default_field(map: &mut Map<String, Value>, key: &str, value: Value) {
    map.entry(key).or_insert(value);
}

fn kind_of(entity: &Map<String, Value>) -> &str {
    entity.get("type").and_then(Value::as_str).unwrap_or("")
}

fn items_mut<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a mut Map<String, Value>> {
    map.get_mut(key)
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

/// v1 had no `version` field and untyped nodes.
fn step_to_2(map: &mut Map<String, Value>) {
    if version(map) >= 2 {
        return;
    }
    ensure_array(map, "nodes");
    for node in items_mut(map, "nodes") {
        default_field(node, "type", Value::from("text"));
    }
    set_version(map, 2);
}

/// `links` became `edges`, and edges gained a label.
fn step_to_3(map: &mut Map<String, Value>) {
    if version(map) >= 3 {
        return;
    }
    rename_field(map, "links", "edges");
    ensure_array(map, "edges");
    for edge in items_mut(map, "edges") {
        default_field(edge, "text", Value::from(""));
    }
    set_version(map, 3);
}

/// Loose `x`/`y`/`w`/`h` scalars became `location`/`size` vectors.
fn step_to_4(map: &mut Map<String, Value>) {
    if version(map) >= 4 {
        return;
    }
    for node in items_mut(map, "nodes") {
        if node.contains_key("location") {
            continue;
        }
        let x = node.remove("x").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let y = node.remove("y").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let w = node.remove("w").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let h = node.remove("h").and_then(|v| v.as_f64()).unwrap_or(0.0);
        node.insert("location".to_owned(), json!([x, y]));
        node.insert("size".to_owned(), json!([w, h]));
    }
    set_version(map, 4);
}

/// Nodes and edges gained a color; missing means transparent black.
fn step_to_5(map: &mut Map<String, Value>) {
    if version(map) >= 5 {
        return;
    }
    for node in items_mut(map, "nodes") {
        default_field(node, "color", json!([0, 0, 0, 0]));
    }
    for edge in items_mut(map, "edges") {
        default_field(edge, "color", json!([0, 0, 0, 0]));
    }
    set_version(map, 5);
}

/// `nodes` became `entities`, and type tags moved to the `core:` namespace.
fn step_to_6(map: &mut Map<String, Value>) {
    if version(map) >= 6 {
        return;
    }
    rename_field(map, "nodes", "entities");
    ensure_array(map, "entities");
    for entity in items_mut(map, "entities") {
        let upgraded = match entity.get("type").and_then(Value::as_str) {
            Some(kind) if kind.starts_with("core:") => None,
            Some(kind) => Some(format!("core:{kind}_node")),
            None => Some("core:text_node".to_owned()),
        };
        if let Some(kind) = upgraded {
            entity.insert("type".to_owned(), Value::from(kind));
        }
    }
    set_version(map, 6);
}

/// Entities gained a free-form `details` body.
fn step_to_7(map: &mut Map<String, Value>) {
    if version(map) >= 7 {
        return;
    }
    for entity in items_mut(map, "entities") {
        default_field(entity, "details", Value::from(""));
    }
    set_version(map, 7);
}

/// Sections arrived: a child list plus the collapsed flag.
fn step_to_8(map: &mut Map<String, Value>) {
    if version(map) >= 8 {
        return;
    }
    for entity in items_mut(map, "entities") {
        if kind_of(entity) != "core:section_node" {
            continue;
        }
        default_field(entity, "children", json!([]));
        default_field(entity, "isCollapsed", Value::from(false));
    }
    set_version(map, 8);
}

/// `edges` became `associations` with a kind tag and attachment rates.
fn step_to_9(map: &mut Map<String, Value>) {
    if version(map) >= 9 {
        return;
    }
    rename_field(map, "edges", "associations");
    ensure_array(map, "associations");
    for association in items_mut(map, "associations") {
        default_field(association, "kind", Value::from("edge"));
        default_field(association, "rates", json!([0.5, 0.5]));
    }
    set_version(map, 9);
}

/// The document-level tag list.
fn step_to_10(map: &mut Map<String, Value>) {
    if version(map) >= 10 {
        return;
    }
    ensure_array(map, "tags");
    set_version(map, 10);
}

/// Image/svg payload paths moved from `src` to `filePath`.
fn step_to_11(map: &mut Map<String, Value>) {
    if version(map) >= 11 {
        return;
    }
    for entity in items_mut(map, "entities") {
        if matches!(kind_of(entity), "core:image_node" | "core:svg_node") {
            rename_field(entity, "src", "filePath");
        }
    }
    set_version(map, 11);
}

/// Hyperedges arrived with a member list and arrow decoration.
fn step_to_12(map: &mut Map<String, Value>) {
    if version(map) >= 12 {
        return;
    }
    for association in items_mut(map, "associations") {
        if association.get("kind").and_then(Value::as_str) != Some("hyperedge") {
            continue;
        }
        default_field(association, "targets", json!([]));
        default_field(association, "arrow", Value::from("none"));
    }
    set_version(map, 12);
}

/// Sections gained the explicit hidden flag.
fn step_to_13(map: &mut Map<String, Value>) {
    if version(map) >= 13 {
        return;
    }
    for entity in items_mut(map, "entities") {
        if kind_of(entity) == "core:section_node" {
            default_field(entity, "isHidden", Value::from(false));
        }
    }
    set_version(map, 13);
}

/// Pen stroke points changed from a flat scalar list to `[x, y]` pairs.
fn step_to_14(map: &mut Map<String, Value>) {
    if version(map) >= 14 {
        return;
    }
    for entity in items_mut(map, "entities") {
        if kind_of(entity) != "core:pen_node" {
            continue;
        }
        let pairs = match entity.get("points").and_then(Value::as_array) {
            Some(points) if !points.is_empty() && points.iter().all(Value::is_number) => {
                let numbers: Vec<f64> = points.iter().filter_map(Value::as_f64).collect();
                Some(
                    numbers
                        .chunks(2)
                        .filter(|chunk| chunk.len() == 2)
                        .map(|chunk| json!([chunk[0], chunk[1]]))
                        .collect::<Vec<Value>>(),
                )
            }
            _ => None,
        };
        if let Some(pairs) = pairs {
            entity.insert("points".to_owned(), Value::Array(pairs));
        }
        default_field(entity, "points", json!([]));
    }
    set_version(map, 14);
}

/// Url cards gained an optional fetched title.
fn step_to_15(map: &mut Map<String, Value>) {
    if version(map) >= 15 {
        return;
    }
    for entity in items_mut(map, "entities") {
        if kind_of(entity) == "core:url_node" {
            default_field(entity, "title", Value::Null);
        }
    }
    set_version(map, 15);
}

/// `details` became declared-markdown.
fn step_to_16(map: &mut Map<String, Value>) {
    if version(map) >= 16 {
        return;
    }
    for entity in items_mut(map, "entities") {
        default_field(entity, "detailsFormat", Value::from("markdown"));
    }
    set_version(map, 16);
}

/// Edge rates split into named `sourceRate`/`targetRate`; hyperedge rates
/// align with the member list.
fn step_to_17(map: &mut Map<String, Value>) {
    if version(map) >= 17 {
        return;
    }
    for association in items_mut(map, "associations") {
        let kind = association
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or("edge")
            .to_owned();
        if kind == "edge" {
            let rates = association.remove("rates");
            let (source_rate, target_rate) = match rates.as_ref().and_then(Value::as_array) {
                Some(rates) => (
                    rates.first().and_then(Value::as_f64).unwrap_or(0.5),
                    rates.get(1).and_then(Value::as_f64).unwrap_or(0.5),
                ),
                None => (0.5, 0.5),
            };
            default_field(association, "sourceRate", json!(source_rate));
            default_field(association, "targetRate", json!(target_rate));
        } else if kind == "hyperedge" {
            let member_count = association
                .get("targets")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            let mut rates: Vec<f64> = association
                .get("rates")
                .and_then(Value::as_array)
                .map(|rates| rates.iter().filter_map(Value::as_f64).collect())
                .unwrap_or_default();
            rates.resize(member_count, 0.5);
            association.insert("rates".to_owned(), json!(rates));
        }
    }
    set_version(map, 17);
}
