//! Server-rendered login page

use sa_core::html::escape_html;

use crate::redirects::LOGIN_PATH;

/// Values rendered into the login form
#[derive(Debug, Default)]
pub struct LoginPage<'a> {
    pub csrf_token: &'a str,
    pub return_to: &'a str,
    pub error: Option<&'a str>,
}

impl LoginPage<'_> {
    pub fn render(&self) -> String {
        let banner = self
            .error
            .map(|e| format!(r#"<div class="alert" role="alert">{}</div>"#, escape_html(e)))
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Sign in</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #f4f5f7; display: flex; justify-content: center; padding-top: 10vh; }}
form {{ background: #fff; padding: 2rem; border-radius: 8px; width: 20rem; box-shadow: 0 1px 4px rgba(0,0,0,.1); }}
label {{ display: block; margin-top: 1rem; font-size: .9rem; }}
input[type=email], input[type=password] {{ width: 100%; padding: .5rem; margin-top: .25rem; box-sizing: border-box; }}
button {{ margin-top: 1.5rem; width: 100%; padding: .6rem; }}
.alert {{ background: #fdecea; color: #611a15; padding: .75rem; border-radius: 4px; }}
</style>
</head>
<body>
<form method="post" action="{action}">
<h1>Sign in</h1>
{banner}
<input type="hidden" name="csrf_token" value="{csrf_token}">
<input type="hidden" name="return_to" value="{return_to}">
<label>Email<input type="email" name="email" autocomplete="username" required></label>
<label>Password<input type="password" name="password" autocomplete="current-password" required></label>
<button type="submit">Sign in</button>
</form>
</body>
</html>
"#,
            action = LOGIN_PATH,
            banner = banner,
            csrf_token = escape_html(self.csrf_token),
            return_to = escape_html(self.return_to),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_values() {
        let html = LoginPage {
            csrf_token: "tok\"en",
            return_to: "/api/v1/oauth/authorize?client_id=a&redirect_uri=x",
            error: Some("<script>alert(1)</script>"),
        }
        .render();

        assert!(html.contains(r#"value="tok&quot;en""#));
        assert!(html.contains("client_id=a&amp;redirect_uri=x"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"action="/api/v1/oauth/login""#));
    }

    #[test]
    fn test_render_without_error() {
        let html = LoginPage {
            csrf_token: "t",
            return_to: "",
            error: None,
        }
        .render();
        assert!(!html.contains("role=\"alert\""));
    }
}
