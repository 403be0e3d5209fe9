//! Pending user edits, keyed by entity urn.
//!
//! The store only ever holds meaningful diffs against the *displayed*
//! (preview) values: every update renormalizes the entry from scratch and an
//! entry with nothing left is deleted. Mutating methods return `None` when the
//! result is identical, so callers can skip signal writes (and re-renders)
//! on no-op edits.

use crate::models::EntityRow;
use crate::normalize::normalize_for_comparison;
use std::collections::BTreeMap;

/// Per-entity pending overrides. An aspect override of `None` means
/// "remove this aspect".
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Draft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub aspects: BTreeMap<String, Option<String>>,
}

impl Draft {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.aspects.is_empty()
    }
}

/// Partial update applied to one entity's draft. `None` fields are left
/// untouched; the aspect map is shallow-merged, last write wins per name.
#[derive(Clone, Debug, Default)]
pub(crate) struct DraftUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub aspects: BTreeMap<String, Option<String>>,
}

impl DraftUpdate {
    pub fn name(value: impl Into<String>) -> Self {
        Self {
            name: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn description(value: impl Into<String>) -> Self {
        Self {
            description: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn aspect(name: impl Into<String>, value: Option<String>) -> Self {
        let mut aspects = BTreeMap::new();
        aspects.insert(name.into(), value);
        Self {
            aspects,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct DraftStore {
    entries: BTreeMap<String, Draft>,
}

impl DraftStore {
    pub fn get(&self, urn: &str) -> Option<&Draft> {
        self.entries.get(urn)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Merge `update` into the entity's draft, then renormalize against the
    /// baseline. Unknown urns are rejected. Returns the next store, or `None`
    /// when the result is identical to `self`.
    pub fn updated(
        &self,
        baseline: &BTreeMap<String, EntityRow>,
        urn: &str,
        update: DraftUpdate,
    ) -> Option<Self> {
        let row = baseline.get(urn)?;

        let mut draft = self.entries.get(urn).cloned().unwrap_or_default();
        if let Some(name) = update.name {
            draft.name = Some(name);
        }
        if let Some(description) = update.description {
            draft.description = Some(description);
        }
        for (aspect_name, value) in update.aspects {
            draft.aspects.insert(aspect_name, value);
        }

        let draft = renormalize(draft, row);

        let mut next = self.entries.clone();
        if draft.is_empty() {
            next.remove(urn);
        } else {
            next.insert(urn.to_string(), draft);
        }

        if next == self.entries {
            None
        } else {
            Some(Self { entries: next })
        }
    }

    /// Drop entries whose entity no longer exists in the baseline. Called
    /// after every fetch.
    pub fn pruned(&self, baseline: &BTreeMap<String, EntityRow>) -> Option<Self> {
        let mut next = self.entries.clone();
        next.retain(|urn, _| baseline.contains_key(urn));
        if next == self.entries {
            None
        } else {
            Some(Self { entries: next })
        }
    }

    /// Drop entries for the given urns. Called after a successful submit.
    pub fn without(&self, urns: &[String]) -> Option<Self> {
        let mut next = self.entries.clone();
        next.retain(|urn, _| !urns.iter().any(|u| u == urn));
        if next == self.entries {
            None
        } else {
            Some(Self { entries: next })
        }
    }
}

/// Recompute the effective override set: anything that matches the displayed
/// preview value is not a diff and is dropped.
fn renormalize(mut draft: Draft, row: &EntityRow) -> Draft {
    if let Some(name) = &draft.name {
        if normalize_for_comparison(Some(name)) == normalize_for_comparison(Some(&row.name)) {
            draft.name = None;
        }
    }

    if let Some(description) = &draft.description {
        let ours = normalize_for_comparison(Some(description)).unwrap_or_default();
        let theirs = normalize_for_comparison(row.description.as_deref()).unwrap_or_default();
        if ours == theirs {
            draft.description = None;
        }
    }

    draft.aspects.retain(|aspect_name, value| {
        let preview = row.aspect(aspect_name).and_then(|a| a.value.as_deref());
        normalize_for_comparison(value.as_deref()) != normalize_for_comparison(preview)
    });

    draft
}
