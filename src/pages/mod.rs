use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent,
    CardDescription, CardHeader, CardTitle, Input, Label, Spinner, StatusBadge,
};
use crate::drafts::DraftUpdate;
use crate::models::{Aspect, EntityGroup, EntityRow, EntityStatus, PreviewRequest};
use crate::patch::compile_all;
use crate::preview::{baseline_index, transform_preview};
use crate::state::{AppContext, PREVIEW_PAGE_SIZE};
use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;
use wasm_bindgen::JsCast;

/// Quiescence window before a search keystroke triggers a re-fetch.
const SEARCH_DEBOUNCE_MS: i32 = 300;

/// Fetch one preview page and replace the displayed snapshot.
///
/// Responses from superseded fetches are dropped via the request-id guard;
/// drafts whose entity vanished from the new baseline are pruned.
fn load_preview(app_state: AppContext, start: u32) {
    let query = {
        let q = app_state.0.search_query.get_untracked();
        let q = q.trim().to_string();
        if q.is_empty() {
            None
        } else {
            Some(q)
        }
    };

    let req_id = app_state
        .0
        .preview_request_id
        .get_untracked()
        .saturating_add(1);
    app_state.0.preview_request_id.set(req_id);

    app_state.0.preview_loading.set(true);
    app_state.0.preview_error.set(None);

    let api_client = app_state.0.api_client.get_untracked();
    spawn_local(async move {
        let result = api_client
            .fetch_preview(&PreviewRequest {
                start,
                count: PREVIEW_PAGE_SIZE,
                query,
            })
            .await;

        // Ignore stale responses.
        if app_state.0.preview_request_id.get_untracked() != req_id {
            return;
        }

        match result {
            Ok(response) => {
                let groups = transform_preview(response.groups);
                let baseline = baseline_index(&groups);

                if let Some(pruned) = app_state.0.drafts.get_untracked().pruned(&baseline) {
                    app_state.0.drafts.set(pruned);
                }

                app_state.0.page_start.set(response.start);
                app_state.0.page_total.set(response.total);
                app_state.0.groups.set(groups);
                app_state.0.baseline.set(baseline);
            }
            Err(e) => {
                app_state.0.preview_error.set(Some(e.to_string()));
            }
        }
        app_state.0.preview_loading.set(false);
    });
}

fn apply_draft_update(app_state: AppContext, urn: &str, update: DraftUpdate) {
    let baseline = app_state.0.baseline.get_untracked();
    let drafts = app_state.0.drafts.get_untracked();
    // No-op edits (typing the displayed value back in) leave the signal alone.
    if let Some(next) = drafts.updated(&baseline, urn, update) {
        app_state.0.drafts.set(next);
    }
}

#[component]
pub fn ImportPreviewPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let search_debounce_timer_id: RwSignal<Option<i32>> = RwSignal::new(None);

    // Initial load. No tracked reads: runs once.
    Effect::new(move |_| {
        load_preview(app_state, 0);
    });

    // Pending edits would be lost on navigation; ask first.
    let beforeunload = window_event_listener(ev::beforeunload, move |ev| {
        if !app_state.0.drafts.get_untracked().is_empty() {
            ev.prevent_default();
            ev.set_return_value("Pending edits will be lost.");
        }
    });
    on_cleanup(move || beforeunload.remove());

    let on_search_input = move |q: String| {
        app_state.0.search_query.set(q);

        if let Some(tid) = search_debounce_timer_id.get_untracked() {
            let _ = window().clear_timeout_with_handle(tid);
        }

        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            // A new search always starts from the first page.
            load_preview(app_state, 0);
        });
        let tid = window()
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                SEARCH_DEBOUNCE_MS,
            )
            .unwrap_or(0);
        search_debounce_timer_id.set(Some(tid));
    };

    // The diff set, recomputed whenever the baseline or a draft changes.
    let patches = Memo::new(move |_| {
        compile_all(
            &app_state.0.baseline.get(),
            &app_state.0.drafts.get(),
        )
    });
    let patch_count = move || patches.with(|p| p.len());

    let on_submit = move |_| {
        let batch = patches.get_untracked();
        if batch.is_empty() || app_state.0.submitting.get_untracked() {
            return;
        }
        let urns: Vec<String> = batch.iter().map(|p| p.urn.clone()).collect();

        app_state.0.submitting.set(true);
        app_state.0.submit_error.set(None);

        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            match api_client.submit_patches(batch).await {
                Ok(_) => {
                    if let Some(next) = app_state.0.drafts.get_untracked().without(&urns) {
                        app_state.0.drafts.set(next);
                    }
                    load_preview(app_state, app_state.0.page_start.get_untracked());
                }
                Err(e) => {
                    // Drafts stay put so the user can retry.
                    app_state.0.submit_error.set(Some(e.to_string()));
                }
            }
            app_state.0.submitting.set(false);
        });
    };

    let groups = app_state.0.groups;
    let loading = app_state.0.preview_loading;
    let submitting = app_state.0.submitting;

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto w-full max-w-[1080px] px-4 py-8">
                <div class="mb-4 flex items-center justify-between">
                    <div class="space-y-1">
                        <h1 class="text-xl font-semibold">"Metaport"</h1>
                        <p class="text-xs text-muted-foreground">"Import preview"</p>
                    </div>

                    <div class="flex items-center gap-2">
                        <Show
                            when=move || !app_state.0.drafts.get().is_empty()
                            fallback=|| ().into_view()
                        >
                            <span class="text-xs text-muted-foreground">
                                {move || {
                                    let n = app_state.0.drafts.get().len();
                                    format!("{} entit{} edited", n, if n == 1 { "y" } else { "ies" })
                                }}
                            </span>
                        </Show>

                        <Button
                            variant=ButtonVariant::Outline
                            size=ButtonSize::Sm
                            attr:disabled=move || loading.get()
                            on:click=move |_| load_preview(app_state, app_state.0.page_start.get_untracked())
                        >
                            "Refresh"
                        </Button>

                        <Button
                            size=ButtonSize::Sm
                            attr:disabled=move || submitting.get() || patch_count() == 0
                            on:click=on_submit
                        >
                            <span class="inline-flex items-center gap-2">
                                <Show when=move || submitting.get() fallback=|| ().into_view()>
                                    <Spinner />
                                </Show>
                                {move || {
                                    let n = patch_count();
                                    if submitting.get() {
                                        "Importing...".to_string()
                                    } else if n == 0 {
                                        "Nothing to import".to_string()
                                    } else {
                                        format!("Import {} change{}", n, if n == 1 { "" } else { "s" })
                                    }
                                }}
                            </span>
                        </Button>
                    </div>
                </div>

                <div class="mb-4 flex flex-col gap-1.5">
                    <Label html_for="preview-search" class="text-xs">"Filter entities"</Label>
                    <Input
                        id="preview-search"
                        placeholder="Search by name..."
                        class="max-w-sm"
                        value=app_state.0.search_query
                        on_change=on_search_input
                    />
                </div>

                <Show
                    when=move || app_state.0.preview_error.get().is_some()
                    fallback=|| ().into_view()
                >
                    {move || {
                        app_state.0.preview_error.get().map(|e| view! {
                            <Alert class="mb-4 border-destructive/30">
                                <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                            </Alert>
                        })
                    }}
                </Show>

                <Show
                    when=move || app_state.0.submit_error.get().is_some()
                    fallback=|| ().into_view()
                >
                    {move || {
                        app_state.0.submit_error.get().map(|e| view! {
                            <Alert class="mb-4 border-destructive/30">
                                <AlertDescription class="text-destructive text-xs">
                                    {format!("Import failed: {e}")}
                                </AlertDescription>
                            </Alert>
                        })
                    }}
                </Show>

                <Show
                    when=move || !groups.get().is_empty()
                    fallback=move || view! {
                        <div class="py-12 text-center text-xs text-muted-foreground">
                            {move || if loading.get() {
                                "Loading preview..."
                            } else {
                                "No pending changes for this import."
                            }}
                        </div>
                    }
                >
                    <div class="flex flex-col gap-4">
                        {move || {
                            groups
                                .get()
                                .into_iter()
                                .map(|group| view! { <EntityGroupCard group=group /> })
                                .collect_view()
                        }}
                    </div>
                </Show>

                <PaginationFooter />
            </div>
        </div>
    }
}

#[component]
fn EntityGroupCard(group: EntityGroup) -> impl IntoView {
    let counts = group.counts;
    let rows = group.rows.clone();

    view! {
        <Card>
            <CardHeader>
                <div class="flex w-full items-center justify-between">
                    <CardTitle class="text-base">{group.label.clone()}</CardTitle>
                    <div class="flex items-center gap-1.5">
                        <StatusBadge status=EntityStatus::Ready count=counts.ready />
                        <StatusBadge status=EntityStatus::Conflict count=counts.conflict />
                        <StatusBadge status=EntityStatus::New count=counts.new />
                        <StatusBadge status=EntityStatus::Skipped count=counts.skipped />
                    </div>
                </div>
                <CardDescription class="text-xs">
                    {format!("{} total", group.total)}
                </CardDescription>
            </CardHeader>

            <CardContent class="flex flex-col gap-2">
                {rows
                    .into_iter()
                    .map(|row| view! { <EntityRowItem row=row depth=0 /> }.into_any())
                    .collect_view()}
            </CardContent>
        </Card>
    }
}

#[component]
fn EntityRowItem(row: EntityRow, depth: usize) -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let urn = row.urn.clone();
    let children = row.children.clone();
    let aspects = row.aspects.clone();

    let edited = {
        let urn = urn.clone();
        move || app_state.0.drafts.get().get(&urn).is_some()
    };

    let name_value = {
        let urn = urn.clone();
        let preview = row.name.clone();
        Signal::derive(move || {
            app_state
                .0
                .drafts
                .get()
                .get(&urn)
                .and_then(|d| d.name.clone())
                .unwrap_or_else(|| preview.clone())
        })
    };
    let on_name = {
        let urn = urn.clone();
        Callback::new(move |v: String| {
            apply_draft_update(app_state, &urn, DraftUpdate::name(v));
        })
    };

    let description_value = {
        let urn = urn.clone();
        let preview = row.description.clone().unwrap_or_default();
        Signal::derive(move || {
            app_state
                .0
                .drafts
                .get()
                .get(&urn)
                .and_then(|d| d.description.clone())
                .unwrap_or_else(|| preview.clone())
        })
    };
    let on_description = {
        let urn = urn.clone();
        Callback::new(move |v: String| {
            apply_draft_update(app_state, &urn, DraftUpdate::description(v));
        })
    };

    let path = row.path.join(" / ");
    let indent = format!("margin-left: {}rem", depth as f32 * 1.25);

    view! {
        <div class="rounded-md border" style=indent>
            <div class="flex items-center gap-3 px-3 py-2">
                <div class="flex min-w-0 flex-1 flex-col gap-1">
                    <div class="flex items-center gap-2">
                        <Input
                            class="max-w-xs font-medium"
                            value=name_value
                            on_change=on_name
                        />
                        <Show when=edited.clone() fallback=|| ().into_view()>
                            <span
                                class="size-1.5 shrink-0 rounded-full bg-primary"
                                title="Edited"
                            ></span>
                        </Show>
                        <StatusBadge status=row.status />
                    </div>
                    <Show when={let p = path.clone(); move || !p.is_empty()} fallback=|| ().into_view()>
                        <div class="truncate text-[11px] text-muted-foreground">{path.clone()}</div>
                    </Show>
                    <Input
                        class="max-w-lg text-muted-foreground"
                        placeholder="No description"
                        value=description_value
                        on_change=on_description
                    />
                </div>
            </div>

            <Show when={let has = !aspects.is_empty(); move || has} fallback=|| ().into_view()>
                <div class="flex flex-col gap-1 border-t px-3 py-2">
                    {aspects
                        .clone()
                        .into_iter()
                        .map(|aspect| view! { <AspectRow urn=urn.clone() aspect=aspect /> })
                        .collect_view()}
                </div>
            </Show>

            {children
                .into_iter()
                .map(|child| {
                    view! { <EntityRowItem row=child depth=depth + 1 /> }.into_any()
                })
                .collect_view()}
        </div>
    }
}

#[component]
fn AspectRow(urn: String, aspect: Aspect) -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let name = aspect.name.clone();
    let value = {
        let urn = urn.clone();
        let name = name.clone();
        let preview = aspect.value.clone().unwrap_or_default();
        Signal::derive(move || {
            match app_state
                .0
                .drafts
                .get()
                .get(&urn)
                .and_then(|d| d.aspects.get(&name).cloned())
            {
                Some(Some(text)) => text,
                // Explicit removal renders as an empty field.
                Some(None) => String::new(),
                None => preview.clone(),
            }
        })
    };
    let on_value = {
        let urn = urn.clone();
        let name = name.clone();
        Callback::new(move |v: String| {
            apply_draft_update(app_state, &urn, DraftUpdate::aspect(name.clone(), Some(v)));
        })
    };
    let on_clear = {
        let urn = urn.clone();
        let name = name.clone();
        move |_| {
            apply_draft_update(app_state, &urn, DraftUpdate::aspect(name.clone(), None));
        }
    };

    view! {
        <div class="flex items-center gap-2">
            <div class="w-40 shrink-0 truncate text-xs text-muted-foreground" title=aspect.description.clone().unwrap_or_default()>
                {aspect.label.clone()}
            </div>
            <Input class="max-w-md text-xs" value=value on_change=on_value />
            {aspect.change_type.clone().map(|tag| view! {
                <span class="rounded bg-muted px-1.5 py-0.5 text-[10px] uppercase text-muted-foreground">{tag}</span>
            })}
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Sm
                attr:title="Remove this aspect"
                on:click=on_clear
            >
                "Unset"
            </Button>
        </div>
    }
}

#[component]
fn PaginationFooter() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let start = app_state.0.page_start;
    let total = app_state.0.page_total;
    let loading = app_state.0.preview_loading;

    let shown_range = move || {
        let s = start.get();
        let t = total.get();
        if t == 0 {
            "0 of 0".to_string()
        } else {
            let end = (s.saturating_add(PREVIEW_PAGE_SIZE)).min(t);
            format!("{}-{} of {}", s.saturating_add(1), end, t)
        }
    };
    let has_prev = move || start.get() > 0;
    let has_next = move || start.get().saturating_add(PREVIEW_PAGE_SIZE) < total.get();

    view! {
        <div class="mt-4 flex items-center justify-between">
            <div class="text-xs text-muted-foreground">{shown_range}</div>
            <div class="flex items-center gap-2">
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Sm
                    attr:disabled=move || loading.get() || !has_prev()
                    on:click=move |_| {
                        let prev = app_state.0.page_start.get_untracked().saturating_sub(PREVIEW_PAGE_SIZE);
                        load_preview(app_state, prev);
                    }
                >
                    "Previous"
                </Button>
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Sm
                    attr:disabled=move || loading.get() || !has_next()
                    on:click=move |_| {
                        let next = app_state.0.page_start.get_untracked().saturating_add(PREVIEW_PAGE_SIZE);
                        load_preview(app_state, next);
                    }
                >
                    "Next"
                </Button>
            </div>
        </div>
    }
}
