use serde::{Deserialize, Serialize};

/// Review status of a single previewed entity.
///
/// The backend sends the uppercase string form (`READY`, `CONFLICT`, ...).
/// Unknown values collapse to `Skipped` so a newer backend cannot break the
/// whole preview parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub(crate) enum EntityStatus {
    Ready,
    Conflict,
    New,
    Skipped,
}

impl From<String> for EntityStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "READY" => Self::Ready,
            "CONFLICT" => Self::Conflict,
            "NEW" => Self::New,
            _ => Self::Skipped,
        }
    }
}

impl<'de> Deserialize<'de> for EntityStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self::from(String::deserialize(deserializer)?))
    }
}

impl Default for EntityStatus {
    fn default() -> Self {
        Self::Skipped
    }
}

/// Per-status row tally for a group. All four keys always exist; a missing
/// server value is a zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct StatusCounts {
    pub ready: u32,
    pub conflict: u32,
    pub new: u32,
    pub skipped: u32,
}

impl StatusCounts {
    pub fn any_nonzero(&self) -> bool {
        self.ready > 0 || self.conflict > 0 || self.new > 0 || self.skipped > 0
    }

    pub fn add(&mut self, other: &Self) {
        self.ready = self.ready.saturating_add(other.ready);
        self.conflict = self.conflict.saturating_add(other.conflict);
        self.new = self.new.saturating_add(other.new);
        self.skipped = self.skipped.saturating_add(other.skipped);
    }

    pub fn bump(&mut self, status: EntityStatus) {
        match status {
            EntityStatus::Ready => self.ready = self.ready.saturating_add(1),
            EntityStatus::Conflict => self.conflict = self.conflict.saturating_add(1),
            EntityStatus::New => self.new = self.new.saturating_add(1),
            EntityStatus::Skipped => self.skipped = self.skipped.saturating_add(1),
        }
    }
}

/// One aspect delta attached to a previewed entity.
///
/// `value` is the server-proposed value, `original` the value before the
/// import. Both are stringified structured values or plain strings; we never
/// interpret them beyond best-effort JSON parsing at compare/submit time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Aspect {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub original: Option<String>,
    /// Freeform server tag (e.g. upsert/delete). Display only.
    #[serde(default)]
    pub change_type: Option<String>,
}

/// A single previewed entity, after transformation. Children are tree-owned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct EntityRow {
    pub urn: String,
    pub entity_type: String,
    /// Server-proposed (preview) name; may already differ from the original.
    pub name: String,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub original_description: Option<String>,
    pub status: EntityStatus,
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub parent_urn: Option<String>,
    #[serde(default)]
    pub children: Vec<EntityRow>,
    #[serde(default)]
    pub aspects: Vec<Aspect>,
}

impl EntityRow {
    pub fn aspect(&self, name: &str) -> Option<&Aspect> {
        self.aspects.iter().find(|a| a.name == name)
    }
}

/// One displayed group of rows, keyed by normalized entity type.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EntityGroup {
    pub key: String,
    pub label: String,
    pub total: u32,
    pub counts: StatusCounts,
    pub rows: Vec<EntityRow>,
}

/// Field-level patch instruction, JSON-pointer-like path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PatchOp {
    Add,
    Replace,
    Remove,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EntityPatch {
    pub urn: String,
    pub entity_type: String,
    pub operations: Vec<PatchOperation>,
}

// --- wire types for the preview query -------------------------------------

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PreviewRequest {
    pub start: u32,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct RawAspectDelta {
    pub aspect_name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub new_value: Option<String>,
    pub previous_value: Option<String>,
    pub change_type: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct RawPreviewEntity {
    pub urn: Option<String>,
    pub entity_type: String,
    pub name: String,
    pub original_name: Option<String>,
    pub description: Option<String>,
    pub original_description: Option<String>,
    pub status: EntityStatus,
    pub path: Vec<String>,
    pub parent_urn: Option<String>,
    pub children: Vec<RawPreviewEntity>,
    pub aspects: Vec<RawAspectDelta>,
}

/// Raw server group. The same logical group can arrive split across
/// pages/sections and may nest both entities and sub-groups.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct RawPreviewGroup {
    pub entity_type: Option<String>,
    pub display_name: Option<String>,
    pub total: u32,
    pub counts: StatusCounts,
    pub entities: Vec<RawPreviewEntity>,
    pub groups: Vec<RawPreviewGroup>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct PreviewResponse {
    pub start: u32,
    pub count: u32,
    pub total: u32,
    pub groups: Vec<RawPreviewGroup>,
}

// --- wire types for the submit mutation -----------------------------------

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitPatchesRequest {
    pub patches: Vec<EntityPatch>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct SubmitPatchesResponse {
    pub status: String,
    pub message: Option<String>,
}

impl SubmitPatchesResponse {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success") || self.status.eq_ignore_ascii_case("ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_uppercase_and_unknown() {
        assert_eq!(EntityStatus::from("READY".to_string()), EntityStatus::Ready);
        assert_eq!(
            EntityStatus::from(" conflict ".to_string()),
            EntityStatus::Conflict
        );
        assert_eq!(
            EntityStatus::from("SOMETHING_NEW".to_string()),
            EntityStatus::Skipped
        );
    }

    #[test]
    fn test_preview_response_contract_deserialize() {
        let json = r#"{
            "start": 0,
            "count": 10,
            "total": 2,
            "groups": [{
                "entityType": "DATASET",
                "displayName": "Datasets",
                "total": 2,
                "counts": {"ready": 1, "conflict": 1},
                "entities": [{
                    "urn": "urn:ds:1",
                    "entityType": "DATASET",
                    "name": "Users Table",
                    "originalName": "users_table",
                    "status": "READY",
                    "aspects": [{
                        "aspectName": "documentation",
                        "displayName": "Documentation",
                        "newValue": "new",
                        "previousValue": "old",
                        "changeType": "upsert"
                    }]
                }]
            }]
        }"#;
        let parsed: PreviewResponse = serde_json::from_str(json).expect("preview should parse");
        assert_eq!(parsed.total, 2);
        let group = &parsed.groups[0];
        assert_eq!(group.entity_type.as_deref(), Some("DATASET"));
        assert_eq!(group.counts.ready, 1);
        assert_eq!(group.counts.skipped, 0);
        let entity = &group.entities[0];
        assert_eq!(entity.status, EntityStatus::Ready);
        assert_eq!(entity.aspects[0].aspect_name, "documentation");
        assert_eq!(entity.aspects[0].previous_value.as_deref(), Some("old"));
    }

    #[test]
    fn test_preview_response_tolerates_sparse_payloads() {
        // Server may omit everything except what it knows.
        let json = r#"{"groups": [{"entities": [{"name": "x", "entityType": "chart"}]}]}"#;
        let parsed: PreviewResponse = serde_json::from_str(json).expect("sparse should parse");
        let entity = &parsed.groups[0].entities[0];
        assert!(entity.urn.is_none());
        assert_eq!(entity.status, EntityStatus::Skipped);
        assert!(entity.children.is_empty());
    }

    #[test]
    fn test_patch_operation_serialization_omits_absent_value() {
        let replace = PatchOperation {
            op: PatchOp::Replace,
            path: "/name".to_string(),
            value: Some(serde_json::json!("users_table")),
        };
        let v = serde_json::to_value(&replace).expect("should serialize");
        assert_eq!(v["op"], "replace");
        assert_eq!(v["path"], "/name");
        assert_eq!(v["value"], "users_table");

        let remove = PatchOperation {
            op: PatchOp::Remove,
            path: "/aspects/documentation".to_string(),
            value: None,
        };
        let v = serde_json::to_value(&remove).expect("should serialize");
        assert_eq!(v["op"], "remove");
        assert!(v.get("value").is_none());
    }

    #[test]
    fn test_submit_response_success_markers() {
        let ok: SubmitPatchesResponse =
            serde_json::from_str(r#"{"status": "SUCCESS"}"#).expect("should parse");
        assert!(ok.is_success());

        let failed: SubmitPatchesResponse =
            serde_json::from_str(r#"{"status": "FAILED", "message": "boom"}"#)
                .expect("should parse");
        assert!(!failed.is_success());
        assert_eq!(failed.message.as_deref(), Some("boom"));
    }
}
