//! Branded HTML templates for transactional email.
//!
//! [`EmailRenderer`] turns a recipient plus the event's payload into an
//! [`OutboundEmailMessage`]. Every interpolated value is HTML-escaped.

use ddb_core::EnvironmentConfig;
use ddb_db::models::{HouseholdInvitation, MealPlan, PasswordResetToken, User};

use crate::messages::OutboundEmailMessage;

/// A call to action rendered as a button.
struct Action<'a> {
    label: &'a str,
    url: String,
}

/// Body of one email before it is wrapped in the layout.
struct Body<'a> {
    greeting: String,
    intros: Vec<String>,
    action: Option<Action<'a>>,
    outros: Vec<&'a str>,
}

/// Who receives an email.
pub struct Recipient<'a> {
    pub address: &'a str,
    pub name: String,
    /// The user the email is about; empty for non-users such as invitees.
    pub user_id: &'a str,
}

impl<'a> From<&'a User> for Recipient<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            address: &user.email_address,
            name: user.full_name(),
            user_id: &user.id,
        }
    }
}

pub struct EmailRenderer {
    env: &'static EnvironmentConfig,
}

impl EmailRenderer {
    pub fn new(env: &'static EnvironmentConfig) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &'static EnvironmentConfig {
        self.env
    }

    pub fn verify_email_address(&self, user: &User, token: &str) -> OutboundEmailMessage {
        let body = Body {
            greeting: format!("Hi {},", user.full_name()),
            intros: vec![format!(
                "Welcome to {}! Please confirm this is your email address.",
                self.env.company_name
            )],
            action: Some(Action {
                label: "Verify email address",
                url: format!("{}/verify_email_address?t={}", self.env.base_url, urlencoding::encode(token)),
            }),
            outros: vec!["If you did not create an account, you can ignore this email."],
        };
        self.message(user.into(), "Please verify your email address", body)
    }

    pub fn meal_plan_created(&self, member: &User, meal_plan: &MealPlan) -> OutboundEmailMessage {
        let body = Body {
            greeting: format!("Hi {},", member.full_name()),
            intros: vec![format!(
                "A new meal plan is open for voting until {}.",
                meal_plan.voting_deadline.format("%B %-d, %Y %H:%M UTC")
            )],
            action: Some(Action {
                label: "Cast your votes",
                url: format!("{}/meal_plans/{}", self.env.base_url, meal_plan.id),
            }),
            outros: vec![],
        };
        self.message(member.into(), "A new meal plan was created", body)
    }

    pub fn password_reset(&self, user: &User, token: &PasswordResetToken) -> OutboundEmailMessage {
        let body = Body {
            greeting: format!("Hi {},", user.full_name()),
            intros: vec!["Someone asked to reset the password for your account.".into()],
            action: Some(Action {
                label: "Reset your password",
                url: format!("{}/reset_password?t={}", self.env.base_url, urlencoding::encode(&token.token)),
            }),
            outros: vec!["If you did not request a reset, no further action is required."],
        };
        self.message(user.into(), "Password reset requested", body)
    }

    pub fn username_reminder(&self, user: &User) -> OutboundEmailMessage {
        let body = Body {
            greeting: format!("Hi {},", user.full_name()),
            intros: vec![format!("Your username is: {}", user.username)],
            action: Some(Action {
                label: "Log in",
                url: format!("{}/login", self.env.base_url),
            }),
            outros: vec![],
        };
        self.message(user.into(), "Username reminder", body)
    }

    pub fn password_reset_confirmation(&self, user: &User) -> OutboundEmailMessage {
        let body = Body {
            greeting: format!("Hi {},", user.full_name()),
            intros: vec!["Your password was reset successfully.".into()],
            action: None,
            outros: vec!["If this was not you, please contact support right away."],
        };
        self.message(user.into(), "Your password was reset", body)
    }

    pub fn password_changed(&self, user: &User) -> OutboundEmailMessage {
        let body = Body {
            greeting: format!("Hi {},", user.full_name()),
            intros: vec!["The password for your account was changed.".into()],
            action: None,
            outros: vec!["If this was not you, please reset your password immediately."],
        };
        self.message(user.into(), "Your password was changed", body)
    }

    pub fn household_invitation(&self, invitation: &HouseholdInvitation, sender: &User) -> OutboundEmailMessage {
        let to_name = if invitation.to_name.trim().is_empty() {
            invitation.to_email.clone()
        } else {
            invitation.to_name.clone()
        };
        let mut intros = vec![format!(
            "{} invited you to join their household on {}.",
            sender.full_name(),
            self.env.company_name
        )];
        if !invitation.note.trim().is_empty() {
            intros.push(format!("They wrote: \"{}\"", invitation.note.trim()));
        }
        let body = Body {
            greeting: format!("Hi {to_name},"),
            intros,
            action: Some(Action {
                label: "Accept invitation",
                url: format!(
                    "{}/accept_invitation?i={}&t={}",
                    self.env.base_url,
                    urlencoding::encode(&invitation.id),
                    urlencoding::encode(&invitation.token)
                ),
            }),
            outros: vec!["If you were not expecting this invitation, you can ignore this email."],
        };
        let recipient = Recipient {
            address: &invitation.to_email,
            name: to_name,
            user_id: "",
        };
        self.message(recipient, "You have been invited to a household", body)
    }

    fn message(&self, to: Recipient<'_>, subject: &str, body: Body<'_>) -> OutboundEmailMessage {
        OutboundEmailMessage {
            to_address: to.address.to_string(),
            to_name: to.name,
            from_address: self.env.outbound_emails_from_address.to_string(),
            from_name: self.env.outbound_emails_from_name.to_string(),
            subject: subject.to_string(),
            html_content: self.layout(&body),
            user_id: to.user_id.to_string(),
        }
    }

    fn layout(&self, body: &Body<'_>) -> String {
        let mut html = String::with_capacity(1024);
        html.push_str("<!DOCTYPE html><html><body style=\"font-family:sans-serif\">");
        html.push_str(&format!(
            "<p><img src=\"{}\" alt=\"{}\" height=\"48\"></p>",
            escape(self.env.logo_url),
            escape(self.env.company_name)
        ));
        html.push_str(&format!("<p>{}</p>", escape(&body.greeting)));
        for intro in &body.intros {
            html.push_str(&format!("<p>{}</p>", escape(intro)));
        }
        if let Some(action) = &body.action {
            html.push_str(&format!(
                "<p><a href=\"{}\" style=\"padding:8px 16px;background:#2f855a;color:#fff;text-decoration:none\">{}</a></p>",
                escape(&action.url),
                escape(action.label)
            ));
        }
        for outro in &body.outros {
            html.push_str(&format!("<p>{}</p>", escape(outro)));
        }
        html.push_str(&format!(
            "<p>Thanks,<br>The {} team</p></body></html>",
            escape(self.env.company_name)
        ));
        html
    }
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> EmailRenderer {
        EmailRenderer::new(EnvironmentConfig::for_environment("testing").unwrap())
    }

    fn user() -> User {
        User {
            id: "U1".into(),
            username: "chef".into(),
            email_address: "chef@example.com".into(),
            first_name: "Julia".into(),
            ..Default::default()
        }
    }

    #[test]
    fn escape_handles_markup() {
        assert_eq!(escape("<b>\"Tom & Jerry's\"</b>"), "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;");
    }

    #[test]
    fn verify_email_links_token_and_uses_environment_sender() {
        let msg = renderer().verify_email_address(&user(), "tok123");
        assert_eq!(msg.to_address, "chef@example.com");
        assert_eq!(msg.user_id, "U1");
        assert_eq!(msg.from_address, "noreply@dinnerdonebetter.dev");
        assert!(msg.html_content.contains("https://www.dinnerdonebetter.dev/verify_email_address?t=tok123"));
    }

    #[test]
    fn link_tokens_are_percent_encoded() {
        let msg = renderer().verify_email_address(&user(), "ab+c&x=1#frag");
        assert!(msg.html_content.contains("/verify_email_address?t=ab%2Bc%26x%3D1%23frag"));

        let token = PasswordResetToken {
            token: "a/b c".into(),
            ..Default::default()
        };
        let msg = renderer().password_reset(&user(), &token);
        assert!(msg.html_content.contains("/reset_password?t=a%2Fb%20c"));
    }

    #[test]
    fn user_supplied_text_is_escaped() {
        let mut u = user();
        u.first_name = "<script>".into();
        let msg = renderer().password_changed(&u);
        assert!(!msg.html_content.contains("<script>"));
        assert!(msg.html_content.contains("&lt;script&gt;"));
    }

    #[test]
    fn invitation_goes_to_invitee() {
        let invitation = HouseholdInvitation {
            id: "I1".into(),
            to_email: "friend@example.com".into(),
            token: "t0k".into(),
            note: "join us".into(),
            ..Default::default()
        };
        let msg = renderer().household_invitation(&invitation, &user());
        assert_eq!(msg.to_address, "friend@example.com");
        assert_eq!(msg.to_name, "friend@example.com");
        assert!(msg.user_id.is_empty());
        assert!(msg.html_content.contains("accept_invitation?i=I1&amp;t=t0k"));
        assert!(msg.html_content.contains("join us"));
    }
}
