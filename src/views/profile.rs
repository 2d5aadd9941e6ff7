use super::{BannerKind, Element, Page};
use crate::models::ProgressStats;
use crate::session::SessionSnapshot;

pub(super) fn page(
    snapshot: &SessionSnapshot,
    stats: Option<&ProgressStats>,
    notice: Option<(BannerKind, &str)>,
) -> Page {
    let mut page = Page::new("Profile");
    let Some(user) = &snapshot.user else {
        return page;
    };
    let email = user.email.as_deref().unwrap_or("User");

    page.push(Element::heading("Your Profile"))
        .push(Element::text(format!(
            "Hello, {}! Here's your chess puzzle progress.",
            email
        )));
    if let Some((kind, text)) = notice {
        page.push(Element::banner(kind, text));
    }

    let member_since = user.created_at.get(..10).unwrap_or("Unknown");
    page.push(Element::heading("Account Information"))
        .push(Element::text(format!("Email: {}", email)))
        .push(Element::text(format!("User ID: {}", user.id)))
        .push(Element::text(format!("Member since: {}", member_since)));

    match &snapshot.profile {
        Some(profile) => {
            page.push(Element::text(format!(
                "Username: {}",
                profile.username.as_deref().unwrap_or("-")
            )))
            .push(Element::text(format!(
                "Display name: {}",
                profile.display_name.as_deref().unwrap_or("-")
            )))
            .push(Element::text(format!(
                "Bio: {}",
                profile.bio.as_deref().unwrap_or("-")
            )))
            .push(Element::heading("Statistics"))
            .push(Element::text(format!("Rating: {:.0}", profile.rating)))
            .push(Element::text(format!(
                "Puzzles solved: {}",
                profile.puzzles_solved
            )))
            .push(Element::text(format!(
                "Puzzles attempted: {}",
                profile.puzzles_attempted
            )));
        }
        None => {
            page.push(Element::banner(
                BannerKind::Info,
                "Your profile has not been created yet.",
            ));
        }
    }

    if let Some(stats) = stats {
        page.push(Element::heading("Training Progress"))
            .push(Element::text(format!(
                "Solved {} of {} attempted ({:.0}% success)",
                stats.total_solved,
                stats.total_attempted,
                stats.success_rate * 100.0
            )))
            .push(Element::text(format!(
                "Average time: {}",
                stats
                    .average_time
                    .map(|secs| format!("{:.0}s", secs))
                    .unwrap_or_else(|| "-".to_string())
            )))
            .push(Element::text(format!(
                "Average attempts: {}",
                stats
                    .average_attempts
                    .map(|n| format!("{:.1}", n))
                    .unwrap_or_else(|| "-".to_string())
            )))
            .push(Element::text(format!(
                "Due for review: {}",
                stats.due_for_review
            )));
    }

    page.push(Element::field("bio", "Bio"))
        .push(Element::button("Save Bio", "bio <text>"))
        .push(Element::field("display_name", "Display name"))
        .push(Element::button("Save Display Name", "name <text>"))
        .push(Element::button("Sign Out", "signout"));
    page
}
