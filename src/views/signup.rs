use super::{BannerKind, Element, Page};

/// Outcome of the last sign-up attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum SignUpStatus {
    Idle,
    Failed(String),
    /// Account created; `confirmed` is false while the email awaits confirmation
    Created { confirmed: bool },
}

pub(super) fn page(status: &SignUpStatus) -> Page {
    let mut page = Page::new("Sign Up");
    page.push(Element::heading("Create an Account"));

    match status {
        SignUpStatus::Idle => {}
        SignUpStatus::Failed(message) => {
            page.push(Element::banner(BannerKind::Error, message.clone()));
        }
        SignUpStatus::Created { confirmed: true } => {
            page.push(Element::banner(
                BannerKind::Success,
                "Account created. You are signed in.",
            ));
        }
        SignUpStatus::Created { confirmed: false } => {
            page.push(Element::banner(
                BannerKind::Success,
                "Account created. Check your email for the confirmation link.",
            ));
        }
    }

    page.push(Element::field("email", "Email"))
        .push(Element::secret_field("password", "Password"))
        .push(Element::field("username", "Username"))
        .push(Element::button(
            "Sign Up",
            "signup <email> <password> <username>",
        ))
        .push(Element::text("Already have an account?"))
        .push(Element::link("Sign In", "/login"));
    page
}
