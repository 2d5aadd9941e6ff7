use super::{Element, Page};

pub(super) fn page(path: &str) -> Page {
    let mut page = Page::new("Not Found");
    page.push(Element::heading("404 - Page Not Found"))
        .push(Element::text(format!(
            "The page {} does not exist or has been moved.",
            path
        )))
        .push(Element::link("Go back home", "/"));
    page
}
