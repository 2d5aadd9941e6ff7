//! Rows of the trainer's tables and the values derived from them

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A user's profile row from `profiles`, one per authenticated user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub puzzles_solved: i64,
    #[serde(default)]
    pub puzzles_attempted: i64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Name to greet the user with
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("Player")
    }
}

/// Partial profile update. Only fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub puzzles_solved: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub puzzles_attempted: Option<i64>,
}

impl ProfileUpdate {
    pub fn bio(bio: &str) -> Self {
        Self {
            bio: Some(bio.to_string()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A read-only puzzle row from `puzzles`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Puzzle {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub fen: String,
    /// Expected move, origin square followed by target square (`d2d4`)
    pub moves: String,
    #[serde(default)]
    pub difficulty: u8,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A user's record for one puzzle in `user_progress`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProgress {
    pub id: i64,
    pub user_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub puzzle_id: String,
    pub solved: bool,
    /// Seconds
    #[serde(default)]
    pub time_taken: Option<i64>,
    #[serde(default)]
    pub attempts: Option<i64>,
    #[serde(default)]
    pub next_review_date: Option<NaiveDate>,
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    /// Days
    #[serde(default = "default_interval")]
    pub interval: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProgress {
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review_date.map_or(false, |date| date <= today)
    }
}

/// Outcome of one attempt at a puzzle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAttempt {
    pub puzzle_id: String,
    pub solved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<i64>,
}

/// Summary of a user's progress rows
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ProgressStats {
    pub total_attempted: usize,
    pub total_solved: usize,
    /// Between 0 and 1
    pub success_rate: f64,
    pub average_time: Option<f64>,
    pub average_attempts: Option<f64>,
    pub due_for_review: usize,
}

impl ProgressStats {
    pub fn from_progress(entries: &[UserProgress], today: NaiveDate) -> Self {
        let total_attempted = entries.len();
        let total_solved = entries.iter().filter(|entry| entry.solved).count();
        let success_rate = if total_attempted == 0 {
            0.0
        } else {
            total_solved as f64 / total_attempted as f64
        };

        Self {
            total_attempted,
            total_solved,
            success_rate,
            average_time: average(entries.iter().filter_map(|entry| entry.time_taken)),
            average_attempts: average(entries.iter().filter_map(|entry| entry.attempts)),
            due_for_review: entries.iter().filter(|entry| entry.is_due(today)).count(),
        }
    }
}

fn average(values: impl Iterator<Item = i64>) -> Option<f64> {
    let (sum, count) = values.fold((0i64, 0usize), |(sum, count), value| {
        (sum + value, count + 1)
    });
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

fn default_ease_factor() -> f64 {
    2.5
}

fn default_interval() -> i64 {
    1
}

// Puzzle keys are integers in some deployments and text in others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Key {
        Number(i64),
        Text(String),
    }

    Ok(match Key::deserialize(deserializer)? {
        Key::Number(n) => n.to_string(),
        Key::Text(s) => s,
    })
}
