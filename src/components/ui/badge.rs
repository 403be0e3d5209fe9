use crate::models::EntityStatus;
use leptos::prelude::*;
use tw_merge::tw_merge;

/// Status pill for a previewed entity or a group tally.
#[component]
pub fn StatusBadge(
    #[prop(into, optional)] class: String,
    status: EntityStatus,
    #[prop(into, optional)] count: Option<u32>,
) -> impl IntoView {
    let tone = match status {
        EntityStatus::Ready => "border-transparent bg-emerald-100 text-emerald-800",
        EntityStatus::Conflict => "border-transparent bg-amber-100 text-amber-800",
        EntityStatus::New => "border-transparent bg-sky-100 text-sky-800",
        EntityStatus::Skipped => "border-transparent bg-muted text-muted-foreground",
    };
    let merged_class = tw_merge!(
        "inline-flex items-center gap-1 rounded-full border px-2 py-0.5 text-xs font-medium whitespace-nowrap",
        tone,
        class
    );

    view! {
        <span data-name="StatusBadge" class=merged_class>
            {status.as_ref().to_string()}
            {count.map(|c| view! { <span class="opacity-70">{c}</span> })}
        </span>
    }
}
