use super::{BannerKind, Element, Page};
use crate::session::SessionSnapshot;

pub(super) fn page(snapshot: &SessionSnapshot, error: Option<&str>) -> Page {
    let mut page = Page::new("Home");
    page.push(Element::heading(
        "Improve Your Chess Skills with Spaced Repetition",
    ))
    .push(Element::text(
        "Train your tactical vision and calculation with curated chess puzzles, \
         scheduled for efficient learning with spaced repetition.",
    ));

    match &snapshot.user {
        Some(_) => {
            let greeting = snapshot
                .profile
                .as_ref()
                .map(|profile| format!("Welcome back, {}!", profile.label()))
                .unwrap_or_else(|| "Welcome back!".to_string());
            page.push(Element::text(greeting))
                .push(Element::link("Start Solving Puzzles", "/puzzle"));
        }
        None => {
            page.push(Element::heading("Welcome Back"));
            if let Some(error) = error {
                page.push(Element::banner(BannerKind::Error, error));
            }
            sign_in_form(&mut page);
            page.push(Element::link("Create an Account", "/signup"));
        }
    }

    page.push(Element::text("Tactical Training: pattern recognition and calculation."))
        .push(Element::text("Spaced Repetition: puzzles return at the right interval."))
        .push(Element::text("Progress Tracking: statistics on every attempt."));
    page
}

/// Email, password and Google sign-in controls shared with the login page
pub(super) fn sign_in_form(page: &mut Page) {
    page.push(Element::field("email", "Email"))
        .push(Element::secret_field("password", "Password"))
        .push(Element::button(
            "Sign in with Email",
            "signin <email> <password>",
        ))
        .push(Element::text("OR"))
        .push(Element::button("Sign in with Google", "google"));
}
