use super::make_path;
use common::Toast;
use leptos::prelude::*;
use templates::{html_escape, Page, APP_DESCRIPTION};

pub fn render(base: &str, email: &str, toasts: Vec<Toast>) -> String {
    let form_html = format!(
        r#"<form method="POST" action="{action}" class="login-form">
<p><label>Email<br><input type="email" name="email" value="{email}" required autofocus></label></p>
<p><label>Password<br><input type="password" name="password" required></label></p>
<p><button type="submit">Sign In</button></p>
</form>"#,
        action = html_escape(&make_path(base, "/login")),
        email = html_escape(email),
    );

    let content = view! {
        <div class="card">
            <h2>"Sign In"</h2>
            <p class="muted">{APP_DESCRIPTION}</p>
            <div inner_html={form_html}></div>
        </div>
    };

    Page {
        title: "Sign In".to_string(),
        badges: vec![],
        nav_links: vec![],
        tabs: vec![],
        toasts,
        content,
    }
    .render()
}
