use chrono::{Datelike, Utc};

use super::{Element, Page};
use crate::session::SessionSnapshot;

const APP_NAME: &str = "Chess Puzzle App";

/// Navbar above and footer below `body`
pub(super) fn wrap(snapshot: &SessionSnapshot, body: Page) -> Page {
    let mut page = Page::new(&body.title);
    for element in navbar(snapshot) {
        page.push(element);
    }
    page.push(Element::Rule);
    page.elements.extend(body.elements);
    page.push(Element::Rule);
    for element in footer(snapshot) {
        page.push(element);
    }
    page
}

fn navbar(snapshot: &SessionSnapshot) -> Vec<Element> {
    let mut items = vec![
        Element::heading("Chess Puzzles"),
        Element::link("Home", "/"),
    ];
    if snapshot.is_signed_in() {
        items.push(Element::link("Puzzles", "/puzzle"));
    }
    items.push(Element::link("Puzzle Test", "/puzzle-test"));

    match &snapshot.user {
        Some(user) => {
            items.push(Element::link("Profile", "/profile"));
            items.push(Element::text(format!(
                "Signed in as {}",
                user.email.as_deref().unwrap_or(&user.id)
            )));
            items.push(Element::button("Sign Out", "signout"));
        }
        None => {
            items.push(Element::link("Sign In", "/login"));
            items.push(Element::link("Sign Up", "/signup"));
        }
    }
    items
}

fn footer(snapshot: &SessionSnapshot) -> Vec<Element> {
    let mut items = vec![Element::link("Home", "/")];
    if snapshot.is_signed_in() {
        items.push(Element::link("Puzzles", "/puzzle"));
    }
    items.push(Element::text(format!(
        "(c) {} {}. All rights reserved.",
        Utc::now().year(),
        APP_NAME
    )));
    items
}

/// Shown for every route while the session check runs
pub(super) fn loading_page() -> Page {
    let mut page = Page::new("Loading");
    page.push(Element::Spinner);
    page
}
