use super::{home, BannerKind, Element, Page};

pub(super) fn page(error: Option<&str>, oauth_url: Option<&str>) -> Page {
    let mut page = Page::new("Sign In");
    page.push(Element::heading("Sign In"));
    if let Some(error) = error {
        page.push(Element::banner(BannerKind::Error, error));
    }
    home::sign_in_form(&mut page);

    if let Some(url) = oauth_url {
        page.push(Element::banner(
            BannerKind::Info,
            format!("Open this address to continue with Google: {}", url),
        ))
        .push(Element::field("code", "Code from the redirect"))
        .push(Element::button("Finish Google sign-in", "code <code>"));
    }

    page.push(Element::text("Don't have an account?"))
        .push(Element::link("Sign Up", "/signup"));
    page
}
