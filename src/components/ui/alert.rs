use leptos::prelude::*;
use leptos_ui::clx;

mod components {
    use super::*;
    clx! {Alert, div, "relative w-full rounded-md border px-4 py-3 text-sm"}
    clx! {AlertTitle, h4, "mb-1 font-medium leading-none tracking-tight"}
    clx! {AlertDescription, p, "text-sm [&_p]:leading-relaxed"}
}

#[allow(unused_imports)]
pub use components::*;
