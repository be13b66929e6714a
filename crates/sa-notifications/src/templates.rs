//! Mail templates for password reset and email verification

use sa_core::html::escape_html;

use crate::email::{EmailAddress, EmailMessage};

/// Renders the account mails sent by the auth service
#[derive(Debug, Clone)]
pub struct AuthMailer {
    from: EmailAddress,
    app_url: String,
    frontend_url: String,
}

impl AuthMailer {
    pub fn new(
        from: EmailAddress,
        app_url: impl Into<String>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            from,
            app_url: app_url.into().trim_end_matches('/').to_string(),
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `<frontend>/reset-password?token=<token>`
    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.frontend_url, token)
    }

    /// `<app>/api/v1/auth/email/verify/<token>`
    pub fn verify_link(&self, token: &str) -> String {
        format!("{}/api/v1/auth/email/verify/{}", self.app_url, token)
    }

    pub fn password_reset(&self, to_email: &str, to_name: &str, token: &str) -> EmailMessage {
        let link = self.reset_link(token);
        let text = format!(
            "Hello {},\n\n\
             We received a request to reset your password. Open the link below to choose a new one:\n\n\
             {}\n\n\
             The link expires in 60 minutes. If you did not request a reset, ignore this email.\n",
            to_name, link
        );
        let html = self.render_html(
            "Reset your password",
            to_name,
            "We received a request to reset your password. Click the button below to choose a new one.",
            "Reset password",
            &link,
            "The link expires in 60 minutes. If you did not request a reset, ignore this email.",
        );

        EmailMessage::new(
            self.from.clone(),
            EmailAddress::new(to_email).with_name(to_name),
            "Reset Password",
            text,
        )
        .with_html(html)
    }

    pub fn verify_email(&self, to_email: &str, to_name: &str, token: &str) -> EmailMessage {
        let link = self.verify_link(token);
        let text = format!(
            "Hello {},\n\n\
             Please confirm your email address by opening the link below:\n\n\
             {}\n\n\
             The link expires in 15 minutes.\n",
            to_name, link
        );
        let html = self.render_html(
            "Verify your email address",
            to_name,
            "Please confirm your email address by clicking the button below.",
            "Verify email",
            &link,
            "The link expires in 15 minutes.",
        );

        EmailMessage::new(
            self.from.clone(),
            EmailAddress::new(to_email).with_name(to_name),
            "Verify Email Address",
            text,
        )
        .with_html(html)
    }

    fn render_html(
        &self,
        title: &str,
        name: &str,
        intro: &str,
        action: &str,
        link: &str,
        footer: &str,
    ) -> String {
        let link = escape_html(link);
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>
    body {{ font-family: sans-serif; color: #333; }}
    .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
    .button {{ display: inline-block; padding: 10px 20px; background: #1a67a3; color: #fff; text-decoration: none; border-radius: 4px; }}
    .footer {{ margin-top: 20px; font-size: 12px; color: #666; }}
  </style>
</head>
<body>
  <div class="container">
    <p>Hello {name},</p>
    <p>{intro}</p>
    <p><a class="button" href="{link}">{action}</a></p>
    <p>Or copy this link into your browser:<br>{link}</p>
    <div class="footer">{footer}</div>
  </div>
</body>
</html>"#,
            title = escape_html(title),
            name = escape_html(name),
            intro = escape_html(intro),
            action = escape_html(action),
            link = link,
            footer = escape_html(footer),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> AuthMailer {
        AuthMailer::new(
            EmailAddress::new("noreply@x").with_name("SuperApp"),
            "https://api.example.edu/",
            "https://app.example.edu",
        )
    }

    #[test]
    fn test_links() {
        let m = mailer();
        assert_eq!(
            m.reset_link("abc"),
            "https://app.example.edu/reset-password?token=abc"
        );
        assert_eq!(
            m.verify_link("abc"),
            "https://api.example.edu/api/v1/auth/email/verify/abc"
        );
    }

    #[test]
    fn test_password_reset_message() {
        let msg = mailer().password_reset("alice@x", "Alice", "tok123");
        assert_eq!(msg.to.to_rfc5322(), "Alice <alice@x>");
        assert!(msg.text_body.contains("reset-password?token=tok123"));
        let html = msg.html_body.unwrap();
        assert!(html.contains("href=\"https://app.example.edu/reset-password?token=tok123\""));
    }

    #[test]
    fn test_names_are_escaped() {
        let msg = mailer().verify_email("eve@x", "<b>Eve</b>", "t");
        let html = msg.html_body.unwrap();
        assert!(html.contains("Hello &lt;b&gt;Eve&lt;/b&gt;"));
        assert!(!html.contains("<b>Eve</b>"));
    }
}
