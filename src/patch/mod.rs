//! Compiles the minimal set of patch operations for an entity.
//!
//! The comparison baseline is always the entity's untouched *original* state,
//! never the server-proposed preview: a server-proposed change the user left
//! alone is still part of the diff, and a user edit that restores the original
//! value produces no operation at all.

use crate::drafts::{Draft, DraftStore};
use crate::models::{EntityPatch, EntityRow, PatchOp, PatchOperation};
use crate::normalize::{normalize_for_comparison, resolve_value, ResolvedValue};
use std::collections::BTreeMap;

/// Ordered ops for one entity: name, then description, then aspects.
/// Aspect order follows the baseline aspect list, draft-only names after.
pub(crate) fn compile_patch(draft: &Draft, baseline: &EntityRow) -> Vec<PatchOperation> {
    let mut ops = Vec::new();

    // Name: draft override, else the displayed preview value.
    let effective_name = draft.name.as_deref().unwrap_or(&baseline.name);
    if normalize_for_comparison(Some(effective_name))
        != normalize_for_comparison(baseline.original_name.as_deref())
    {
        ops.push(PatchOperation {
            op: PatchOp::Replace,
            path: "/name".to_string(),
            value: Some(serde_json::Value::String(effective_name.to_string())),
        });
    }

    // Description: same pattern, with absent treated as empty.
    let effective_description = draft
        .description
        .as_deref()
        .or(baseline.description.as_deref());
    let ours = normalize_for_comparison(effective_description).unwrap_or_default();
    let theirs =
        normalize_for_comparison(baseline.original_description.as_deref()).unwrap_or_default();
    if ours != theirs {
        ops.push(PatchOperation {
            op: PatchOp::Replace,
            path: "/description".to_string(),
            value: Some(serde_json::Value::String(
                effective_description.unwrap_or_default().to_string(),
            )),
        });
    }

    for aspect_name in aspect_union(draft, baseline) {
        // Effective target: draft override wins, else the baseline preview
        // value. `None` means "clear the aspect"; a name in neither place is
        // unset and skipped.
        let target: Option<&str> = match draft.aspects.get(aspect_name) {
            Some(override_value) => override_value.as_deref(),
            None => match baseline.aspect(aspect_name) {
                Some(aspect) => aspect.value.as_deref(),
                None => continue,
            },
        };

        let normalized_original = normalize_for_comparison(
            baseline
                .aspect(aspect_name)
                .and_then(|a| a.original.as_deref()),
        );
        if normalize_for_comparison(target) == normalized_original {
            continue;
        }

        let path = format!("/aspects/{aspect_name}");
        match target.map(|text| resolve_value(Some(text))) {
            None => ops.push(PatchOperation {
                op: PatchOp::Remove,
                path,
                value: None,
            }),
            Some(ResolvedValue::Value(value)) if value.is_null() => ops.push(PatchOperation {
                op: PatchOp::Remove,
                path,
                value: None,
            }),
            Some(ResolvedValue::Value(value)) => ops.push(PatchOperation {
                op: PatchOp::Replace,
                path,
                value: Some(value),
            }),
            Some(ResolvedValue::Unset) => {}
        }
    }

    ops
}

/// Union of aspect names: baseline list order first, then draft-only names.
/// Deterministic per input; not contractually sorted.
fn aspect_union<'a>(draft: &'a Draft, baseline: &'a EntityRow) -> Vec<&'a str> {
    let mut names: Vec<&str> = baseline.aspects.iter().map(|a| a.name.as_str()).collect();
    for name in draft.aspects.keys() {
        if !names.iter().any(|n| *n == name) {
            names.push(name);
        }
    }
    names
}

/// The full diff set: every baseline entity with a non-empty patch, drafts
/// overlaid where present. This is what the submit button sends.
pub(crate) fn compile_all(
    baseline: &BTreeMap<String, EntityRow>,
    drafts: &DraftStore,
) -> Vec<EntityPatch> {
    let empty = Draft::default();
    baseline
        .values()
        .filter_map(|row| {
            let draft = drafts.get(&row.urn).unwrap_or(&empty);
            let operations = compile_patch(draft, row);
            if operations.is_empty() {
                None
            } else {
                Some(EntityPatch {
                    urn: row.urn.clone(),
                    entity_type: row.entity_type.clone(),
                    operations,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Aspect, EntityStatus};

    fn baseline_row() -> EntityRow {
        EntityRow {
            urn: "urn:ds:1".to_string(),
            entity_type: "DATASET".to_string(),
            name: "users_table".to_string(),
            original_name: Some("users_table".to_string()),
            description: None,
            original_description: None,
            status: EntityStatus::Ready,
            path: vec![],
            parent_urn: None,
            children: vec![],
            aspects: vec![],
        }
    }

    fn aspect(name: &str, value: Option<&str>, original: Option<&str>) -> Aspect {
        Aspect {
            name: name.to_string(),
            label: name.to_string(),
            description: None,
            value: value.map(str::to_string),
            original: original.map(str::to_string),
            change_type: None,
        }
    }

    fn op_paths(ops: &[PatchOperation]) -> Vec<&str> {
        ops.iter().map(|o| o.path.as_str()).collect()
    }

    #[test]
    fn test_empty_draft_on_unchanged_baseline_yields_nothing() {
        let ops = compile_patch(&Draft::default(), &baseline_row());
        assert!(ops.is_empty());
    }

    #[test]
    fn test_server_proposed_rename_emits_without_user_edit() {
        let mut row = baseline_row();
        row.name = "Users Table".to_string();
        let ops = compile_patch(&Draft::default(), &row);
        assert_eq!(op_paths(&ops), vec!["/name"]);
        assert_eq!(ops[0].op, PatchOp::Replace);
        assert_eq!(ops[0].value, Some(serde_json::json!("Users Table")));
    }

    #[test]
    fn test_draft_restoring_original_name_suppresses_op() {
        // Preview proposes "Users Table"; the user types the original back in.
        let mut row = baseline_row();
        row.name = "Users Table".to_string();
        let draft = Draft {
            name: Some("users_table".to_string()),
            ..Draft::default()
        };
        assert!(compile_patch(&draft, &row).is_empty());
    }

    #[test]
    fn test_description_absent_equals_empty_original() {
        let mut row = baseline_row();
        row.original_description = Some(String::new());
        assert!(compile_patch(&Draft::default(), &row).is_empty());
    }

    #[test]
    fn test_description_draft_emits_replace() {
        let row = baseline_row();
        let draft = Draft {
            description: Some("fact table of users".to_string()),
            ..Draft::default()
        };
        let ops = compile_patch(&draft, &row);
        assert_eq!(op_paths(&ops), vec!["/description"]);
        assert_eq!(ops[0].value, Some(serde_json::json!("fact table of users")));
    }

    #[test]
    fn test_aspect_override_emits_replace() {
        let mut row = baseline_row();
        row.aspects.push(aspect("documentation", Some("old"), Some("old")));
        let draft = Draft {
            aspects: [("documentation".to_string(), Some("new".to_string()))]
                .into_iter()
                .collect(),
            ..Draft::default()
        };
        let ops = compile_patch(&draft, &row);
        assert_eq!(op_paths(&ops), vec!["/aspects/documentation"]);
        assert_eq!(ops[0].op, PatchOp::Replace);
        assert_eq!(ops[0].value, Some(serde_json::json!("new")));
    }

    #[test]
    fn test_aspect_empty_string_is_replace_not_remove() {
        // The empty string is a valid value; only a resolved null removes.
        let mut row = baseline_row();
        row.aspects.push(aspect("documentation", Some("old"), Some("old")));
        let draft = Draft {
            aspects: [("documentation".to_string(), Some(String::new()))]
                .into_iter()
                .collect(),
            ..Draft::default()
        };
        let ops = compile_patch(&draft, &row);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].op, PatchOp::Replace);
        assert_eq!(ops[0].value, Some(serde_json::json!("")));
    }

    #[test]
    fn test_aspect_null_text_and_explicit_clear_both_remove() {
        let mut row = baseline_row();
        row.aspects.push(aspect("documentation", Some("old"), Some("old")));
        row.aspects.push(aspect("ownership", Some("team-a"), Some("team-a")));

        let draft = Draft {
            aspects: [
                ("documentation".to_string(), Some("null".to_string())),
                ("ownership".to_string(), None),
            ]
            .into_iter()
            .collect(),
            ..Draft::default()
        };
        let mut ops = compile_patch(&draft, &row);
        ops.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            op_paths(&ops),
            vec!["/aspects/documentation", "/aspects/ownership"]
        );
        assert!(ops.iter().all(|o| o.op == PatchOp::Remove));
        assert!(ops.iter().all(|o| o.value.is_none()));
    }

    #[test]
    fn test_preexisting_aspect_change_included_without_draft() {
        let mut row = baseline_row();
        row.aspects.push(aspect("documentation", Some("new"), Some("old")));
        let ops = compile_patch(&Draft::default(), &row);
        assert_eq!(op_paths(&ops), vec!["/aspects/documentation"]);
        assert_eq!(ops[0].value, Some(serde_json::json!("new")));
    }

    #[test]
    fn test_server_proposed_aspect_delete_emits_remove() {
        // Preview carries no value where an original existed.
        let mut row = baseline_row();
        row.aspects.push(aspect("deprecated_note", None, Some("keep me")));
        let ops = compile_patch(&Draft::default(), &row);
        assert_eq!(op_paths(&ops), vec!["/aspects/deprecated_note"]);
        assert_eq!(ops[0].op, PatchOp::Remove);
    }

    #[test]
    fn test_structured_values_compare_and_resolve_structurally() {
        let mut row = baseline_row();
        row.aspects.push(aspect(
            "schema",
            Some(r#"{"cols": 3, "pk": "id"}"#),
            Some(r#"{ "pk":"id", "cols":3 }"#),
        ));
        // Same structure, different formatting: no op.
        assert!(compile_patch(&Draft::default(), &row).is_empty());

        // A real structural change submits the parsed form, not the string.
        let draft = Draft {
            aspects: [(
                "schema".to_string(),
                Some(r#"{"cols": 4, "pk": "id"}"#.to_string()),
            )]
            .into_iter()
            .collect(),
            ..Draft::default()
        };
        let ops = compile_patch(&draft, &row);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].value, Some(serde_json::json!({"cols": 4, "pk": "id"})));
    }

    #[test]
    fn test_new_aspect_from_draft_only() {
        let row = baseline_row();
        let draft = Draft {
            aspects: [("tags".to_string(), Some(r#"["pii"]"#.to_string()))]
                .into_iter()
                .collect(),
            ..Draft::default()
        };
        let ops = compile_patch(&draft, &row);
        assert_eq!(op_paths(&ops), vec!["/aspects/tags"]);
        assert_eq!(ops[0].op, PatchOp::Replace);
        assert_eq!(ops[0].value, Some(serde_json::json!(["pii"])));
    }

    #[test]
    fn test_field_ops_precede_aspect_ops() {
        let mut row = baseline_row();
        row.name = "Users Table".to_string();
        row.description = Some("desc".to_string());
        row.aspects.push(aspect("documentation", Some("new"), Some("old")));

        let ops = compile_patch(&Draft::default(), &row);
        assert_eq!(
            op_paths(&ops),
            vec!["/name", "/description", "/aspects/documentation"]
        );
    }

    #[test]
    fn test_compile_all_skips_clean_entities() {
        let mut changed = baseline_row();
        changed.name = "Users Table".to_string();
        let clean = EntityRow {
            urn: "urn:ds:2".to_string(),
            ..baseline_row()
        };

        let baseline: BTreeMap<String, EntityRow> = [changed, clean]
            .into_iter()
            .map(|r| (r.urn.clone(), r))
            .collect();

        let patches = compile_all(&baseline, &DraftStore::default());
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].urn, "urn:ds:1");
        assert_eq!(patches[0].entity_type, "DATASET");
    }
}
