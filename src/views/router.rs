use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    /// `/puzzle` picks the next puzzle, `/puzzle/:id` a given one
    Puzzle(Option<String>),
    Profile,
    SignUp,
    Login,
    ProfileTest,
    PuzzleTest,
    NotFound(String),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim();
        let path = trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');

        match path {
            "" => Route::Home,
            "/puzzle" => Route::Puzzle(None),
            "/profile" => Route::Profile,
            "/signup" => Route::SignUp,
            "/login" => Route::Login,
            "/profile-test" => Route::ProfileTest,
            "/puzzle-test" => Route::PuzzleTest,
            other => match other.strip_prefix("/puzzle/") {
                Some(id) if !id.is_empty() && !id.contains('/') => {
                    Route::Puzzle(Some(id.to_string()))
                }
                _ => Route::NotFound(trimmed.to_string()),
            },
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Puzzle(None) => "/puzzle".to_string(),
            Route::Puzzle(Some(id)) => format!("/puzzle/{}", id),
            Route::Profile => "/profile".to_string(),
            Route::SignUp => "/signup".to_string(),
            Route::Login => "/login".to_string(),
            Route::ProfileTest => "/profile-test".to_string(),
            Route::PuzzleTest => "/puzzle-test".to_string(),
            Route::NotFound(path) => path.clone(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/puzzle"), Route::Puzzle(None));
        assert_eq!(
            Route::parse("/puzzle/42"),
            Route::Puzzle(Some("42".to_string()))
        );
        assert_eq!(Route::parse("/profile/"), Route::Profile);
        assert_eq!(Route::parse("/profile?code=abc"), Route::Profile);
        assert_eq!(Route::parse("/puzzle-test"), Route::PuzzleTest);
        assert_eq!(
            Route::parse("/puzzle/1/extra"),
            Route::NotFound("/puzzle/1/extra".to_string())
        );
        assert_eq!(Route::parse("/nowhere"), Route::NotFound("/nowhere".to_string()));
    }

    #[test]
    fn test_path_round_trips() {
        for path in ["/", "/puzzle", "/puzzle/7", "/profile", "/signup", "/login"] {
            assert_eq!(Route::parse(path).path(), path);
        }
    }
}
