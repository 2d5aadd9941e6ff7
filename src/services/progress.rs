use std::sync::Arc;

use chess_trainer_postgrest::SortOrder;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, error, info};

use super::PROGRESS_TABLE;
use crate::client::Backend;
use crate::models::{NewAttempt, ProgressStats, UserProgress};
use crate::spaced_rep::{next_review, quality_from_performance, IntervalBounds};

/// Per-user puzzle history in `user_progress`, scheduled with SM-2
#[derive(Clone)]
pub struct ProgressService {
    backend: Arc<Backend>,
}

impl ProgressService {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    /// Most recently updated entries first, optionally for one puzzle only
    pub async fn get_progress(&self, user_id: &str, puzzle_id: Option<&str>) -> Vec<UserProgress> {
        let mut query = self
            .backend
            .from(PROGRESS_TABLE)
            .await
            .select("*")
            .eq("user_id", user_id);
        if let Some(puzzle_id) = puzzle_id {
            query = query.eq("puzzle_id", puzzle_id);
        }

        let result = query
            .order("updated_at", SortOrder::Descending)
            .limit(self.backend.config().max_puzzle_limit)
            .execute::<UserProgress>()
            .await;

        match result {
            Ok(entries) => entries,
            Err(e) => {
                error!("error fetching progress for {}: {}", user_id, e);
                Vec::new()
            }
        }
    }

    pub async fn get_progress_for_puzzle(
        &self,
        user_id: &str,
        puzzle_id: &str,
    ) -> Option<UserProgress> {
        let result = self
            .backend
            .from(PROGRESS_TABLE)
            .await
            .select("*")
            .eq("user_id", user_id)
            .eq("puzzle_id", puzzle_id)
            .execute_one::<UserProgress>()
            .await;

        match result {
            Ok(entry) => entry,
            Err(e) => {
                error!(
                    "error fetching progress of {} on puzzle {}: {}",
                    user_id, puzzle_id, e
                );
                None
            }
        }
    }

    /// Store an attempt. A first attempt is due again after the minimum interval;
    /// later ones are rescheduled from the stored ease factor and interval.
    pub async fn record_attempt(
        &self,
        user_id: &str,
        attempt: &NewAttempt,
        today: NaiveDate,
    ) -> Option<UserProgress> {
        let config = self.backend.config();
        let now = Utc::now().to_rfc3339();

        let result = match self.get_progress_for_puzzle(user_id, &attempt.puzzle_id).await {
            Some(existing) => {
                let quality = quality_from_performance(
                    attempt.solved,
                    attempt.attempts.unwrap_or(1),
                    attempt.time_taken,
                );
                let bounds = IntervalBounds {
                    min_days: config.min_interval_days,
                    max_days: config.max_interval_days,
                };
                let review = next_review(
                    existing.ease_factor,
                    existing.interval,
                    quality,
                    today,
                    bounds,
                );
                debug!(
                    "rescheduling puzzle {} for {}: quality {}, next review {}",
                    attempt.puzzle_id, user_id, quality, review.next_review_date
                );

                self.backend
                    .from(PROGRESS_TABLE)
                    .await
                    .eq("id", existing.id)
                    .update(json!({
                        "solved": attempt.solved,
                        "time_taken": attempt.time_taken,
                        "attempts": attempt.attempts,
                        "next_review_date": review.next_review_date,
                        "ease_factor": review.ease_factor,
                        "interval": review.interval,
                        "updated_at": now,
                    }))
                    .await
            }
            None => {
                debug!("first attempt of {} on puzzle {}", user_id, attempt.puzzle_id);
                self.backend
                    .from(PROGRESS_TABLE)
                    .await
                    .insert(json!({
                        "user_id": user_id,
                        "puzzle_id": attempt.puzzle_id,
                        "solved": attempt.solved,
                        "time_taken": attempt.time_taken,
                        "attempts": attempt.attempts,
                        "next_review_date": today + Duration::days(config.min_interval_days),
                        "ease_factor": config.default_ease_factor,
                        "interval": config.min_interval_days,
                        "created_at": now,
                        "updated_at": now,
                    }))
                    .await
            }
        };

        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                error!("error recording attempt for {}: {}", user_id, e);
                return None;
            }
        };

        match serde_json::from_value::<Vec<UserProgress>>(rows) {
            Ok(entries) => entries.into_iter().next(),
            Err(e) => {
                error!("unexpected progress response for {}: {}", user_id, e);
                None
            }
        }
    }

    /// Whether an entry owned by `user_id` was removed
    pub async fn delete_progress(&self, user_id: &str, progress_id: i64) -> bool {
        let result = self
            .backend
            .from(PROGRESS_TABLE)
            .await
            .eq("id", progress_id)
            .eq("user_id", user_id)
            .delete()
            .await;

        match result {
            Ok(rows) => {
                let deleted = rows.as_array().map_or(false, |rows| !rows.is_empty());
                if !deleted {
                    info!("no progress entry {} for {}", progress_id, user_id);
                }
                deleted
            }
            Err(e) => {
                error!("error deleting progress {}: {}", progress_id, e);
                false
            }
        }
    }

    /// Entries whose review date is today or earlier, oldest first
    pub async fn due_for_review(&self, user_id: &str, today: NaiveDate) -> Vec<UserProgress> {
        let result = self
            .backend
            .from(PROGRESS_TABLE)
            .await
            .select("*")
            .eq("user_id", user_id)
            .lte("next_review_date", today)
            .order("next_review_date", SortOrder::Ascending)
            .limit(self.backend.config().max_puzzle_limit)
            .execute::<UserProgress>()
            .await;

        match result {
            Ok(entries) => entries,
            Err(e) => {
                error!("error fetching reviews for {}: {}", user_id, e);
                Vec::new()
            }
        }
    }

    pub async fn stats(&self, user_id: &str, today: NaiveDate) -> ProgressStats {
        let result = self
            .backend
            .from(PROGRESS_TABLE)
            .await
            .select("*")
            .eq("user_id", user_id)
            .execute::<UserProgress>()
            .await;

        match result {
            Ok(entries) => ProgressStats::from_progress(&entries, today),
            Err(e) => {
                error!("error computing stats for {}: {}", user_id, e);
                ProgressStats::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::Value;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn entry_json(id: i64, ease: f64, interval: i64, review: &str) -> Value {
        json!({
            "id": id,
            "user_id": "user-1",
            "puzzle_id": 3,
            "solved": true,
            "time_taken": 12,
            "attempts": 1,
            "next_review_date": review,
            "ease_factor": ease,
            "interval": interval
        })
    }

    fn service(server: &MockServer) -> ProgressService {
        let config = AppConfig::new(&server.uri(), "anon").unwrap();
        ProgressService::new(Arc::new(Backend::new(config).unwrap()))
    }

    #[tokio::test]
    async fn test_first_attempt_is_inserted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_progress"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_progress"))
            .and(body_partial_json(json!({
                "user_id": "user-1",
                "puzzle_id": "3",
                "solved": false,
                "next_review_date": "2024-05-02",
                "ease_factor": 2.5,
                "interval": 1
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!([entry_json(9, 2.5, 1, "2024-05-02")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let attempt = NewAttempt {
            puzzle_id: "3".to_string(),
            solved: false,
            time_taken: Some(40),
            attempts: Some(1),
        };
        let stored = service(&server)
            .record_attempt("user-1", &attempt, today())
            .await
            .unwrap();
        assert_eq!(stored.id, 9);
    }

    #[tokio::test]
    async fn test_first_review_follows_minimum_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_progress"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_progress"))
            .and(body_partial_json(json!({
                "next_review_date": "2024-05-04",
                "interval": 3
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!([entry_json(4, 2.5, 3, "2024-05-04")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = AppConfig::new(&server.uri(), "anon")
            .unwrap()
            .with_interval_bounds(3, 365);
        let service = ProgressService::new(Arc::new(Backend::new(config).unwrap()));
        let attempt = NewAttempt {
            puzzle_id: "3".to_string(),
            solved: true,
            time_taken: Some(10),
            attempts: Some(1),
        };
        let stored = service
            .record_attempt("user-1", &attempt, today())
            .await
            .unwrap();
        assert_eq!(stored.interval, 3);
    }

    #[tokio::test]
    async fn test_repeat_attempt_is_rescheduled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_progress"))
            .and(query_param("puzzle_id", "eq.3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([entry_json(9, 2.5, 1, "2024-05-01")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/user_progress"))
            .and(query_param("id", "eq.9"))
            .and(body_partial_json(json!({
                "solved": true,
                "next_review_date": "2024-05-07",
                "interval": 6
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([entry_json(9, 2.6, 6, "2024-05-07")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let attempt = NewAttempt {
            puzzle_id: "3".to_string(),
            solved: true,
            time_taken: Some(12),
            attempts: Some(1),
        };
        let stored = service(&server)
            .record_attempt("user-1", &attempt, today())
            .await
            .unwrap();
        assert_eq!(stored.interval, 6);
    }

    #[tokio::test]
    async fn test_due_for_review_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_progress"))
            .and(query_param("user_id", "eq.user-1"))
            .and(query_param("next_review_date", "lte.2024-05-01"))
            .and(query_param("order", "next_review_date.asc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([entry_json(1, 2.5, 1, "2024-04-30")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let due = service(&server).due_for_review("user-1", today()).await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].puzzle_id, "3");
    }

    #[tokio::test]
    async fn test_stats_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_progress"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                entry_json(1, 2.5, 1, "2024-04-30"),
                entry_json(2, 2.5, 6, "2024-05-09")
            ])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/user_progress"))
            .and(query_param("id", "eq.2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([entry_json(2, 2.5, 6, "2024-05-09")])),
            )
            .mount(&server)
            .await;

        let service = service(&server);
        let stats = service.stats("user-1", today()).await;
        assert_eq!(stats.total_attempted, 2);
        assert_eq!(stats.total_solved, 2);
        assert_eq!(stats.due_for_review, 1);
        assert!(service.delete_progress("user-1", 2).await);
    }

    #[tokio::test]
    async fn test_failures_degrade() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_progress"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_progress"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let service = service(&server);
        assert!(service.get_progress("user-1", None).await.is_empty());
        assert_eq!(service.stats("user-1", today()).await, ProgressStats::default());
        let attempt = NewAttempt {
            puzzle_id: "3".to_string(),
            solved: true,
            time_taken: None,
            attempts: None,
        };
        assert!(service.record_attempt("user-1", &attempt, today()).await.is_none());
    }
}
