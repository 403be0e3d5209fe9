//! Transforms the raw nested preview response into flat, per-type groups.
//!
//! The server may split one logical group across sections, nest sub-groups,
//! and nest entities under different-typed parents. The page wants one group
//! per entity type with the hierarchy rebuilt from parent references, so the
//! transform merges, flattens, re-buckets and re-parents in that order.

use crate::models::{
    Aspect, EntityGroup, EntityRow, RawAspectDelta, RawPreviewEntity, RawPreviewGroup,
    StatusCounts,
};
use std::collections::{BTreeMap, BTreeSet};

pub(crate) fn transform_preview(raw: Vec<RawPreviewGroup>) -> Vec<EntityGroup> {
    let merged = merge_raw_groups(raw);

    // A row without a server urn gets a placeholder, unique within this
    // transform. Placeholders are list keys only; they are never submitted.
    let mut pending = 0usize;

    let mut buckets: Vec<Bucket> = Vec::new();
    for group in merged {
        let mut rows = Vec::new();
        collect_rows(group.entities, group.groups, &mut rows, &mut pending);

        buckets.push(Bucket {
            key: group.key,
            label: group.label,
            server_total: group.total,
            server_counts: group.counts,
            rows,
        });
    }

    // Re-bucket every row (children flattened) by the row's own entity type.
    let mut flat = Vec::new();
    for bucket in &mut buckets {
        flatten_rows(std::mem::take(&mut bucket.rows), None, &mut flat);
    }
    for row in flat {
        let key = normalize_key(&row.entity_type);
        match buckets.iter().position(|b| b.key == key) {
            Some(i) => buckets[i].rows.push(row),
            None => buckets.push(Bucket {
                key,
                label: None,
                server_total: 0,
                server_counts: StatusCounts::default(),
                rows: vec![row],
            }),
        }
    }

    buckets
        .into_iter()
        .filter(|b| !b.rows.is_empty() || b.server_total > 0)
        .map(|bucket| {
            let rows = rebuild_hierarchy(bucket.rows);

            let counts = if bucket.server_counts.any_nonzero() {
                bucket.server_counts
            } else {
                let mut tallied = StatusCounts::default();
                tally(&rows, &mut tallied);
                tallied
            };
            let total = if bucket.server_total > 0 {
                bucket.server_total
            } else {
                row_count(&rows)
            };

            EntityGroup {
                label: bucket
                    .label
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| display_label(&bucket.key)),
                key: bucket.key,
                total,
                counts,
                rows,
            }
        })
        .collect()
}

/// Flat lookup of every row (any depth) by urn. This is the comparison
/// baseline for drafts and the patch compiler; children are cleared so each
/// entity appears exactly once.
pub(crate) fn baseline_index(groups: &[EntityGroup]) -> BTreeMap<String, EntityRow> {
    let mut index = BTreeMap::new();
    for group in groups {
        index_rows(&group.rows, &mut index);
    }
    index
}

struct Bucket {
    key: String,
    label: Option<String>,
    server_total: u32,
    server_counts: StatusCounts,
    rows: Vec<EntityRow>,
}

struct MergedGroup {
    key: String,
    label: Option<String>,
    total: u32,
    counts: StatusCounts,
    entities: Vec<RawPreviewEntity>,
    groups: Vec<RawPreviewGroup>,
}

/// Merge raw groups sharing a normalized key, preserving first-seen
/// order. Totals and status counts sum; entity and sub-group lists concat.
fn merge_raw_groups(raw: Vec<RawPreviewGroup>) -> Vec<MergedGroup> {
    let mut merged: Vec<MergedGroup> = Vec::new();
    let mut position: BTreeMap<String, usize> = BTreeMap::new();

    for group in raw {
        let key = normalize_key(
            group
                .entity_type
                .as_deref()
                .or(group.display_name.as_deref())
                .unwrap_or_default(),
        );

        match position.get(&key) {
            Some(&i) => {
                let target = &mut merged[i];
                target.total = target.total.saturating_add(group.total);
                target.counts.add(&group.counts);
                target.entities.extend(group.entities);
                target.groups.extend(group.groups);
                if target.label.is_none() {
                    target.label = group.display_name;
                }
            }
            None => {
                position.insert(key.clone(), merged.len());
                merged.push(MergedGroup {
                    key,
                    label: group.display_name,
                    total: group.total,
                    counts: group.counts,
                    entities: group.entities,
                    groups: group.groups,
                });
            }
        }
    }

    merged
}

fn normalize_key(key: &str) -> String {
    let key = key.trim();
    if key.is_empty() {
        "UNKNOWN".to_string()
    } else {
        key.to_ascii_uppercase()
    }
}

fn display_label(key: &str) -> String {
    let lower = key.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => lower,
    }
}

/// Convert entities and pull any nested sub-groups' rows up into
/// the same list.
fn collect_rows(
    entities: Vec<RawPreviewEntity>,
    sub_groups: Vec<RawPreviewGroup>,
    out: &mut Vec<EntityRow>,
    pending: &mut usize,
) {
    for entity in entities {
        out.push(to_row(entity, pending));
    }
    for sub in sub_groups {
        collect_rows(sub.entities, sub.groups, out, pending);
    }
}

fn to_row(entity: RawPreviewEntity, pending: &mut usize) -> EntityRow {
    let urn = match entity.urn {
        Some(urn) if !urn.trim().is_empty() => urn,
        _ => {
            *pending += 1;
            format!("urn:pending:{pending}")
        }
    };

    EntityRow {
        urn,
        entity_type: entity.entity_type,
        name: entity.name,
        original_name: entity.original_name,
        description: entity.description,
        original_description: entity.original_description,
        status: entity.status,
        path: entity.path,
        parent_urn: entity.parent_urn,
        children: entity
            .children
            .into_iter()
            .map(|child| to_row(child, pending))
            .collect(),
        aspects: entity.aspects.into_iter().map(to_aspect).collect(),
    }
}

fn to_aspect(delta: RawAspectDelta) -> Aspect {
    Aspect {
        label: delta
            .display_name
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| delta.aspect_name.clone()),
        name: delta.aspect_name,
        description: delta.description,
        value: delta.new_value,
        original: delta.previous_value,
        change_type: delta.change_type,
    }
}

/// Depth-first flatten. Nested children whose parent reference the server
/// left blank inherit the structural parent's urn, so re-parenting can find
/// them again.
fn flatten_rows(rows: Vec<EntityRow>, parent_urn: Option<&str>, out: &mut Vec<EntityRow>) {
    for mut row in rows {
        if row.parent_urn.is_none() {
            row.parent_urn = parent_urn.map(str::to_string);
        }
        let children = std::mem::take(&mut row.children);
        let urn = row.urn.clone();
        out.push(row);
        flatten_rows(children, Some(&urn), out);
    }
}

/// Rows whose parent urn resolves within the bucket become that
/// parent's children; everything else is a root. Unattachable rows (cycles)
/// fall back to roots rather than being dropped.
fn rebuild_hierarchy(rows: Vec<EntityRow>) -> Vec<EntityRow> {
    let present: BTreeSet<String> = rows.iter().map(|r| r.urn.clone()).collect();

    let mut roots: Vec<EntityRow> = Vec::new();
    let mut children_of: BTreeMap<String, Vec<EntityRow>> = BTreeMap::new();
    for row in rows {
        match row.parent_urn.clone() {
            Some(parent) if parent != row.urn && present.contains(&parent) => {
                children_of.entry(parent).or_default().push(row);
            }
            _ => roots.push(row),
        }
    }

    for root in &mut roots {
        attach_children(root, &mut children_of);
    }
    while let Some((_, orphans)) = children_of.pop_first() {
        for mut orphan in orphans {
            attach_children(&mut orphan, &mut children_of);
            roots.push(orphan);
        }
    }

    roots
}

fn attach_children(row: &mut EntityRow, children_of: &mut BTreeMap<String, Vec<EntityRow>>) {
    row.children = children_of.remove(&row.urn).unwrap_or_default();
    for child in &mut row.children {
        attach_children(child, children_of);
    }
}

fn tally(rows: &[EntityRow], counts: &mut StatusCounts) {
    for row in rows {
        counts.bump(row.status);
        tally(&row.children, counts);
    }
}

fn row_count(rows: &[EntityRow]) -> u32 {
    let mut count = 0u32;
    for row in rows {
        count = count.saturating_add(1).saturating_add(row_count(&row.children));
    }
    count
}

fn index_rows(rows: &[EntityRow], index: &mut BTreeMap<String, EntityRow>) {
    for row in rows {
        let mut flat = row.clone();
        flat.children = Vec::new();
        index.insert(flat.urn.clone(), flat);
        index_rows(&row.children, index);
    }
}
