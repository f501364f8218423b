use super::make_path;
use common::{AdminStats, AdminUser, ApiService, Toast};
use leptos::either::{Either, EitherOf3};
use leptos::prelude::*;
use templates::{html_escape, post_button, NavLink, Page, Tab};

use crate::admin::{AdminState, AdminTab};

fn stats_cards(stats: &AdminStats) -> impl IntoView {
    let cards = [
        ("Total Users", stats.total_users.to_string()),
        ("Total Generations", stats.total_generations.to_string()),
        ("Total Revenue", stats.revenue_display()),
        ("Active Subscriptions", stats.active_subscriptions.to_string()),
    ];
    view! {
        <div class="stats">
            {cards.into_iter().map(|(label, value)| view! {
                <div class="card">
                    <div class="muted">{label}</div>
                    <div class="stat-value">{value}</div>
                </div>
            }).collect::<Vec<_>>()}
        </div>
    }
}

fn users_table(base: &str, users: &[AdminUser]) -> impl IntoView {
    if users.is_empty() {
        return Either::Left(view! { <p>"No users found."</p> });
    }
    let rows = users
        .iter()
        .map(|u| {
            let edit = post_button(
                &make_path(base, &format!("/admin/users/{}/edit", u.id)),
                "Edit Credits",
                &[],
                "edit",
            );
            view! {
                <tr>
                    <td title={u.id.clone()}>{u.short_id()}</td>
                    <td>{u.credits.to_string()}</td>
                    <td>{u.tier_label().to_string()}</td>
                    <td>{u.role.clone()}</td>
                    <td inner_html={edit}></td>
                </tr>
            }
        })
        .collect::<Vec<_>>();
    Either::Right(view! {
        <table>
            <tr>
                <th>"User ID"</th>
                <th>"Credits"</th>
                <th>"Tier"</th>
                <th>"Role"</th>
                <th>"Actions"</th>
            </tr>
            {rows}
        </table>
    })
}

fn credits_modal(base: &str, user: &AdminUser, input: &str) -> String {
    format!(
        r#"<div class="modal"><div class="card">
<h3>Update User Credits</h3>
<p class="muted">User ID: {id}</p>
<p>Current Credits: {credits}</p>
<form method="POST" action="{action}">
<p><label>New Credits<br><input type="number" name="credits" value="{input}" placeholder="Enter new credit amount" required></label></p>
<p><button type="submit">Update</button></p>
</form>
{cancel}
</div></div>"#,
        id = html_escape(&user.id),
        credits = user.credits,
        action = html_escape(&make_path(base, "/admin/users/credits")),
        input = html_escape(input),
        cancel = post_button(&make_path(base, "/admin/users/cancel"), "Cancel", &[], "cancel"),
    )
}

fn api_key_cards(base: &str, state: &AdminState) -> String {
    let action = html_escape(&make_path(base, "/admin/api-keys"));
    ApiService::ALL
        .iter()
        .map(|service| {
            let status = state
                .api_key(*service)
                .map(|k| {
                    format!(
                        r#"<span class="active-key">Active (Last used: {})</span>"#,
                        html_escape(&k.last_used_display())
                    )
                })
                .unwrap_or_default();
            format!(
                r#"<div class="card">
<h3>{label} {status}</h3>
<p class="muted">{description}</p>
<form method="POST" action="{action}">
<input type="hidden" name="service" value="{service}">
<input type="password" name="api_key" placeholder="Enter {label} API key" autocomplete="off" required>
<button type="submit">Save</button>
</form>
</div>"#,
                label = service.label(),
                status = status,
                description = service.description(),
                action = action,
                service = service.as_str(),
            )
        })
        .collect()
}

pub fn render(base: &str, state: &AdminState, toasts: Vec<Toast>) -> String {
    let tab = state.active_tab;
    let refresh_html = post_button(
        &make_path(base, "/admin/refresh"),
        "Refresh",
        &[("tab", tab.as_str())],
        "refresh",
    );
    let loading = view! { <p class="muted">"Loading..."</p> };

    let body = match tab {
        AdminTab::Stats => EitherOf3::A(match state.stats.data() {
            Some(stats) => Either::Left(stats_cards(stats)),
            None => Either::Right(loading),
        }),
        AdminTab::Users => EitherOf3::B(match state.users.data() {
            Some(users) => {
                let modal = state
                    .selected_user
                    .as_ref()
                    .map(|u| credits_modal(base, u, &state.credit_input))
                    .unwrap_or_default();
                Either::Left(view! {
                    <div class="card">
                        <h2>"User Management"</h2>
                        {users_table(base, users)}
                    </div>
                    <div inner_html={modal}></div>
                })
            }
            None => Either::Right(loading),
        }),
        AdminTab::ApiKeys => {
            let cards = api_key_cards(base, state);
            EitherOf3::C(view! {
                <h2>"API Key Management"</h2>
                <div inner_html={cards}></div>
            })
        }
    };

    let content = view! {
        <div class="toolbar" inner_html={refresh_html}></div>
        {body}
    };

    Page {
        title: "Admin Panel".to_string(),
        badges: vec![],
        nav_links: vec![
            NavLink::new("Back to Dashboard", make_path(base, "/dashboard")),
            NavLink::new("Logout", make_path(base, "/logout")),
        ],
        tabs: AdminTab::ALL
            .iter()
            .map(|t| {
                Tab::new(
                    t.label(),
                    make_path(base, &format!("/admin?tab={}", t.as_str())),
                    *t == tab,
                )
            })
            .collect(),
        toasts,
        content,
    }
    .render()
}
