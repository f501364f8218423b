use common::{Toast, ToastLevel};
use leptos::either::Either;
use leptos::prelude::*;

pub const APP_TITLE: &str = "AI SaaS Platform";
pub const APP_DESCRIPTION: &str =
    "Access multiple AI models through unified credit-based platform";

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const COLLAPSE_THRESHOLD: usize = 200;

pub fn collapsible_block(content: &str, css_class: &str) -> String {
    let escaped = html_escape(content);
    if content.len() <= COLLAPSE_THRESHOLD {
        if content.contains('\n') {
            return format!(r#"<pre class="{}">{}</pre>"#, css_class, escaped);
        } else {
            return format!(r#"<div class="{}">{}</div>"#, css_class, escaped);
        }
    }
    let preview: String = content.chars().take(COLLAPSE_THRESHOLD).collect();
    let preview_escaped = html_escape(&preview);
    format!(
        r#"<details class="collapsible"><summary><span class="preview-text {cls}">{preview}...</span> <span class="show-more">show more</span><span class="show-less">show less</span></summary><div class="collapsible-full {cls}">{full}</div></details>"#,
        cls = css_class,
        preview = preview_escaped,
        full = escaped
    )
}

/// A form whose only control is a submit button, optionally carrying hidden fields.
pub fn post_button(action: &str, label: &str, hidden: &[(&str, &str)], css_class: &str) -> String {
    let fields: String = hidden
        .iter()
        .map(|(name, value)| {
            format!(
                r#"<input type="hidden" name="{}" value="{}">"#,
                html_escape(name),
                html_escape(value)
            )
        })
        .collect();
    format!(
        r#"<form method="POST" action="{action}">{fields}<button type="submit" class="{cls}">{label}</button></form>"#,
        action = html_escape(action),
        fields = fields,
        cls = html_escape(css_class),
        label = html_escape(label),
    )
}

pub fn toast_host(toasts: &[Toast]) -> String {
    let items: String = toasts
        .iter()
        .map(|t| {
            let cls = match t.level {
                ToastLevel::Success => "toast toast-success",
                ToastLevel::Error => "toast toast-error",
            };
            format!(
                r#"<div class="{}" role="status">{}</div>"#,
                cls,
                html_escape(&t.message)
            )
        })
        .collect();
    format!(r#"<div id="toasts" class="toast-host">{}</div>"#, items)
}

/// Root layout shared by every page: document head, toast host, body.
pub fn page_layout(title: &str, toasts: &[Toast], body_html: String) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<meta name="description" content="{description}">
<style>
body {{ font-family: system-ui, sans-serif; margin: 0; background: #f9fafb; color: #111827; }}
header {{ background: #fff; border-bottom: 1px solid #e5e7eb; padding: 16px 32px; display: flex; align-items: center; justify-content: space-between; }}
header h1 {{ font-size: 1.5em; margin: 0; }}
header nav {{ display: flex; gap: 12px; align-items: center; }}
main {{ max-width: 1200px; margin: 0 auto; padding: 32px; }}
a {{ color: #4f46e5; }}
table {{ width: 100%; border-collapse: collapse; background: #fff; }}
th {{ text-align: left; padding: 8px 12px; border-bottom: 1px solid #e5e7eb; font-size: 0.75em; text-transform: uppercase; color: #6b7280; }}
td {{ padding: 12px; border-bottom: 1px solid #f3f4f6; vertical-align: top; }}
pre {{ white-space: pre-wrap; }}
form {{ display: inline; }}
button {{ cursor: pointer; padding: 8px 16px; border: 0; border-radius: 8px; background: #4f46e5; color: #fff; }}
button[disabled] {{ opacity: 0.5; cursor: not-allowed; }}
textarea {{ width: 100%; height: 8em; box-sizing: border-box; }}
.badge {{ background: #eef2ff; color: #312e81; padding: 8px 16px; border-radius: 8px; font-weight: 600; }}
.tabs {{ display: flex; gap: 8px; margin-bottom: 24px; flex-wrap: wrap; }}
.tab {{ padding: 10px 16px; border-radius: 8px; background: #f3f4f6; text-decoration: none; color: #374151; }}
.tab.active {{ background: #4f46e5; color: #fff; }}
.tab .note {{ font-size: 0.75em; opacity: 0.75; margin-left: 4px; }}
.card {{ background: #fff; border-radius: 12px; padding: 24px; margin-bottom: 24px; box-shadow: 0 1px 2px rgba(0,0,0,0.05); }}
.grid {{ display: grid; grid-template-columns: 2fr 1fr; gap: 32px; }}
.stats {{ display: grid; grid-template-columns: repeat(4, 1fr); gap: 24px; }}
.stat-value {{ font-size: 2em; font-weight: 700; }}
.status {{ padding: 2px 8px; border-radius: 4px; font-size: 0.75em; }}
.status-completed {{ background: #dcfce7; color: #15803d; }}
.status-failed {{ background: #fee2e2; color: #b91c1c; }}
.status-pending {{ background: #fef9c3; color: #a16207; }}
.muted {{ color: #6b7280; font-size: 0.85em; }}
.active-key {{ color: #16a34a; font-size: 0.75em; }}
.modal {{ position: fixed; inset: 0; background: rgba(0,0,0,0.5); display: flex; align-items: center; justify-content: center; }}
.modal .card {{ width: 420px; }}
.toast-host {{ position: fixed; top: 16px; right: 16px; display: flex; flex-direction: column; gap: 8px; z-index: 100; }}
.toast {{ background: #fff; padding: 12px 16px; border-radius: 8px; box-shadow: 0 4px 12px rgba(0,0,0,0.15); border-left: 4px solid; }}
.toast-success {{ border-color: #16a34a; }}
.toast-error {{ border-color: #dc2626; }}
.collapsible-full {{ white-space: pre-wrap; word-break: break-word; }}
</style>
</head>
<body>
{toasts_html}
{body_html}
<script>
setTimeout(function(){{var h=document.getElementById('toasts');if(h)h.innerHTML='';}},4000);
</script>
</body>
</html>"#,
        title = html_escape(title),
        description = html_escape(APP_DESCRIPTION),
        toasts_html = toast_host(toasts),
        body_html = body_html
    )
}

pub struct NavLink {
    pub label: String,
    pub href: String,
}

impl NavLink {
    pub fn new(label: impl ToString, href: impl ToString) -> Self {
        Self {
            label: label.to_string(),
            href: href.to_string(),
        }
    }
}

pub struct InfoRow {
    pub label: String,
    pub value: String,
}

impl InfoRow {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: html_escape(value),
        }
    }

    pub fn raw(label: &str, value: impl ToString) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

pub struct Tab {
    pub label: String,
    pub href: String,
    pub active: bool,
    pub note: Option<String>,
}

impl Tab {
    pub fn new(label: impl ToString, href: impl ToString, active: bool) -> Self {
        Self {
            label: label.to_string(),
            href: href.to_string(),
            active,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl ToString) -> Self {
        self.note = Some(note.to_string());
        self
    }
}

pub fn info_table(rows: Vec<InfoRow>) -> impl IntoView {
    view! {
        <table>
            {rows.into_iter().map(|row| {
                view! { <tr><td>{row.label}</td><td inner_html={row.value}></td></tr> }
            }).collect::<Vec<_>>()}
        </table>
    }
}

pub struct Page<C: IntoView = ()> {
    pub title: String,
    pub badges: Vec<String>,
    pub nav_links: Vec<NavLink>,
    pub tabs: Vec<Tab>,
    pub toasts: Vec<Toast>,
    pub content: C,
}

impl Default for Page {
    fn default() -> Self {
        Page {
            title: String::new(),
            badges: Vec::new(),
            nav_links: Vec::new(),
            tabs: Vec::new(),
            toasts: Vec::new(),
            content: (),
        }
    }
}

impl<C: IntoView> Page<C> {
    pub fn render(self) -> String {
        let Page {
            title,
            badges,
            nav_links,
            tabs,
            toasts,
            content,
        } = self;

        let document_title = if title.is_empty() {
            APP_TITLE.to_string()
        } else {
            format!("{} - {}", title, APP_TITLE)
        };

        let body = view! {
            <header>
                <h1>{title}</h1>
                <nav>
                    {badges.into_iter().map(|b| view! { <span class="badge">{b}</span> }).collect::<Vec<_>>()}
                    {nav_links.into_iter().map(|link| {
                        view! { <a href={link.href}>{link.label}</a> }
                    }).collect::<Vec<_>>()}
                </nav>
            </header>
            <main>
                {if !tabs.is_empty() {
                    Either::Left(view! {
                        <div class="tabs">
                            {tabs.into_iter().map(|tab| {
                                let cls = if tab.active { "tab active" } else { "tab" };
                                let note = tab.note.map(|n| view! { <span class="note">{format!("({})", n)}</span> });
                                view! { <a class={cls} href={tab.href}>{tab.label}{note}</a> }
                            }).collect::<Vec<_>>()}
                        </div>
                    })
                } else {
                    Either::Right(())
                }}
                {content}
            </main>
        };

        page_layout(&document_title, &toasts, body.to_html())
    }
}
