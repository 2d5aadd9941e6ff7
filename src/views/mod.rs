//! Terminal view layer
//!
//! Pages are built as a flat list of [`Element`]s and printed as text. The
//! [`App`] owns the session context and the services, keeps per-page state
//! and turns [`Action`]s typed at the prompt into service calls.

mod app;
mod debug;
mod home;
mod layout;
mod login;
mod not_found;
mod profile;
mod puzzle;
mod router;
mod signup;

pub use app::{Action, App};
pub use router::Route;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Info,
    Success,
    Error,
}

impl BannerKind {
    fn tag(&self) -> &'static str {
        match self {
            BannerKind::Info => "info",
            BannerKind::Success => "success",
            BannerKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Heading(String),
    Text(String),
    /// Input the user supplies as an argument of a button's command
    Field {
        name: String,
        label: String,
        secret: bool,
    },
    /// `command` is what to type at the prompt to press it
    Button {
        label: String,
        command: String,
    },
    Link {
        label: String,
        to: String,
    },
    Banner {
        kind: BannerKind,
        text: String,
    },
    Board(Vec<String>),
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Spinner,
    Rule,
}

impl Element {
    pub fn heading(text: impl Into<String>) -> Self {
        Element::Heading(text.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Element::Text(text.into())
    }

    pub fn field(name: &str, label: &str) -> Self {
        Element::Field {
            name: name.to_string(),
            label: label.to_string(),
            secret: false,
        }
    }

    pub fn secret_field(name: &str, label: &str) -> Self {
        Element::Field {
            name: name.to_string(),
            label: label.to_string(),
            secret: true,
        }
    }

    pub fn button(label: &str, command: &str) -> Self {
        Element::Button {
            label: label.to_string(),
            command: command.to_string(),
        }
    }

    pub fn link(label: &str, to: &str) -> Self {
        Element::Link {
            label: label.to_string(),
            to: to.to_string(),
        }
    }

    pub fn banner(kind: BannerKind, text: impl Into<String>) -> Self {
        Element::Banner {
            kind,
            text: text.into(),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Heading(text) => write!(f, "== {} ==", text),
            Element::Text(text) => write!(f, "{}", text),
            Element::Field {
                name,
                label,
                secret,
            } => {
                let placeholder = if *secret { "********" } else { "________" };
                write!(f, "{}: [{}] <{}>", label, placeholder, name)
            }
            Element::Button { label, command } => write!(f, "( {} )  > {}", label, command),
            Element::Link { label, to } => write!(f, "-> {} [{}]", label, to),
            Element::Banner { kind, text } => write!(f, "[{}] {}", kind.tag(), text),
            Element::Board(rows) => write!(f, "{}", rows.join("\n")),
            Element::Table { headers, rows } => {
                write!(f, "{}", headers.join(" | "))?;
                for row in rows {
                    write!(f, "\n{}", row.join(" | "))?;
                }
                Ok(())
            }
            Element::Spinner => write!(f, "Loading..."),
            Element::Rule => write!(f, "{}", "-".repeat(40)),
        }
    }
}

/// A rendered screen
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub title: String,
    pub elements: Vec<Element>,
}

impl Page {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: Element) -> &mut Self {
        self.elements.push(element);
        self
    }

    /// Targets of every link on the page
    pub fn links(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|element| match element {
                Element::Link { to, .. } => Some(to.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_link_to(&self, path: &str) -> bool {
        self.links().contains(&path)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.elements
            .iter()
            .any(|element| matches!(element, Element::Field { name, .. } if name == field))
    }

    pub fn has_button(&self, button: &str) -> bool {
        self.elements
            .iter()
            .any(|element| matches!(element, Element::Button { label, .. } if label == button))
    }

    pub fn banners(&self, kind: BannerKind) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|element| match element {
                Element::Banner { kind: k, text } if *k == kind => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.elements
            .iter()
            .any(|element| element.to_string().contains(needle))
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.elements.iter().map(Element::to_string).collect();
        write!(f, "{}", lines.join("\n"))
    }
}
