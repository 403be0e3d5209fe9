use crate::api::ApiClient;
use crate::drafts::DraftStore;
use crate::models::{EntityGroup, EntityRow};
use leptos::prelude::*;
use std::collections::BTreeMap;

/// How many entities one preview page requests.
pub(crate) const PREVIEW_PAGE_SIZE: u32 = 25;

#[derive(Clone, Copy)]
pub(crate) struct AppState {
    pub api_client: RwSignal<ApiClient>,

    /// Latest preview snapshot, rebuilt fresh on every fetch.
    pub groups: RwSignal<Vec<EntityGroup>>,
    /// Flat urn lookup derived from `groups`; the drafts/patch baseline.
    pub baseline: RwSignal<BTreeMap<String, EntityRow>>,

    /// Pending user edits. Only ever holds meaningful diffs.
    pub drafts: RwSignal<DraftStore>,

    pub preview_loading: RwSignal<bool>,
    pub preview_error: RwSignal<Option<String>>,

    /// Monotonic fetch counter; late responses from superseded fetches are
    /// dropped instead of overwriting the displayed baseline.
    pub preview_request_id: RwSignal<u64>,

    pub submitting: RwSignal<bool>,
    pub submit_error: RwSignal<Option<String>>,

    pub search_query: RwSignal<String>,

    pub page_start: RwSignal<u32>,
    pub page_total: RwSignal<u32>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            api_client: RwSignal::new(ApiClient::from_env()),
            groups: RwSignal::new(vec![]),
            baseline: RwSignal::new(BTreeMap::new()),
            drafts: RwSignal::new(DraftStore::default()),
            preview_loading: RwSignal::new(false),
            preview_error: RwSignal::new(None),
            preview_request_id: RwSignal::new(0),
            submitting: RwSignal::new(false),
            submit_error: RwSignal::new(None),
            search_query: RwSignal::new(String::new()),
            page_start: RwSignal::new(0),
            page_total: RwSignal::new(0),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
pub(crate) struct AppContext(pub AppState);
