use super::make_path;
use common::{GenerationRecord, Toast, ToolTab};
use leptos::either::Either;
use leptos::prelude::*;
use templates::{collapsible_block, html_escape, info_table, InfoRow, NavLink, Page, Tab};

use crate::dashboard::{DashboardState, LastResult};
use crate::session::SessionContext;

const SIDEBAR_GENERATIONS: usize = 5;

fn generate_form(base: &str, tab: ToolTab, prompt: &str, generating: bool) -> String {
    let (disabled, label) = if generating {
        (" disabled", "Generating...")
    } else {
        ("", "Generate")
    };
    format!(
        r#"<form method="POST" action="{action}" class="generate-form">
<input type="hidden" name="tab" value="{tab}">
<textarea name="prompt" placeholder="Enter your {tab} generation prompt..." required>{prompt}</textarea>
<p><button type="submit"{disabled}>{label}</button></p>
</form>"#,
        action = html_escape(&make_path(base, "/dashboard/generate")),
        tab = tab.as_str(),
        prompt = html_escape(prompt),
        disabled = disabled,
        label = label,
    )
}

fn result_html(last: &LastResult) -> String {
    let mut html = String::new();
    if let Some(text) = &last.result.text {
        html.push_str(&collapsible_block(text, "result-text"));
    }
    if let Some(url) = &last.result.url {
        let url = html_escape(url);
        if last.tab == ToolTab::Image {
            html.push_str(&format!(
                r#"<img src="{}" alt="Generated image" style="max-width:100%">"#,
                url
            ));
        } else {
            html.push_str(&format!(
                r#"<p><a href="{}" target="_blank" rel="noopener" download>Download Result</a></p>"#,
                url
            ));
        }
    }
    html.push_str(&format!(
        r#"<p class="muted">Credits used: {}</p>"#,
        last.result.credits_used
    ));
    html
}

fn recent_generations(records: &[GenerationRecord]) -> impl IntoView {
    if records.is_empty() {
        return Either::Left(view! { <p class="muted">"No generations yet"</p> });
    }
    let items = records
        .iter()
        .take(SIDEBAR_GENERATIONS)
        .map(|g| {
            let status_cls = format!("status status-{}", g.status.as_str());
            let credits = format!("{} credits", g.credits_used);
            view! {
                <li>
                    <strong>{g.kind.clone()}</strong>" "
                    <span class={status_cls}>{g.status.as_str()}</span>
                    <div>{g.prompt.clone()}</div>
                    <div class="muted">{credits}</div>
                </li>
            }
        })
        .collect::<Vec<_>>();
    Either::Right(view! { <ul class="generations">{items}</ul> })
}

pub fn render(
    base: &str,
    ctx: &SessionContext,
    state: &DashboardState,
    prompt: &str,
    toasts: Vec<Toast>,
) -> String {
    let tab = state.active_tab;
    let form_html = generate_form(base, tab, prompt, state.generating);
    let result = state.result.as_ref().map(|last| {
        let html = result_html(last);
        view! {
            <div class="card">
                <h3>"Result"</h3>
                <div inner_html={html}></div>
            </div>
        }
    });
    let purchase_html = r#"<button type="button" class="purchase">Purchase Credits</button>"#;
    let heading = format!("{} Generation", tab.label());

    let content = view! {
        <div class="grid">
            <div>
                <div class="card">
                    <h2>{heading}</h2>
                    <div inner_html={form_html}></div>
                </div>
                {result}
            </div>
            <div>
                <div class="card">
                    <h3>"Account Overview"</h3>
                    {info_table(vec![
                        InfoRow::new("Email", &ctx.user.email),
                        InfoRow::new("Credits", &ctx.credits().to_string()),
                        InfoRow::new("Tier", ctx.tier_label()),
                    ])}
                    <p inner_html={purchase_html}></p>
                </div>
                <div class="card">
                    <h3>"Recent Generations"</h3>
                    {recent_generations(state.generations())}
                </div>
            </div>
        </div>
    };

    let mut nav_links = Vec::new();
    if ctx.is_admin() {
        nav_links.push(NavLink::new("Admin", make_path(base, "/admin")));
    }
    nav_links.push(NavLink::new("Logout", make_path(base, "/logout")));

    Page {
        title: "AI Platform".to_string(),
        badges: vec![format!("{} Credits", ctx.credits())],
        nav_links,
        tabs: ToolTab::ALL
            .iter()
            .map(|t| {
                Tab::new(
                    t.label(),
                    make_path(base, &format!("/dashboard?tab={}", t.as_str())),
                    *t == tab,
                )
                .with_note(format!("{} credits", t.cost()))
            })
            .collect(),
        toasts,
        content,
    }
    .render()
}
