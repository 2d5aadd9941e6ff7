use std::sync::Arc;

use chess_trainer_postgrest::SortOrder;
use tracing::{debug, error, info, warn};

use super::PUZZLES_TABLE;
use crate::client::Backend;
use crate::models::Puzzle;

/// Reads from the `puzzles` table
#[derive(Clone)]
pub struct PuzzleService {
    backend: Arc<Backend>,
}

impl PuzzleService {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    /// One page of puzzles ordered by id. `limit` defaults to the configured
    /// page size and is clamped to the configured maximum.
    pub async fn get_puzzles(&self, limit: Option<usize>, offset: usize) -> Vec<Puzzle> {
        let limit = self.backend.config().puzzle_limit(limit);
        debug!("fetching puzzles (limit {}, offset {})", limit, offset);

        let result = self
            .backend
            .from(PUZZLES_TABLE)
            .await
            .select("*")
            .order("id", SortOrder::Ascending)
            .range(offset, offset + limit - 1)
            .execute::<Puzzle>()
            .await;

        match result {
            Ok(puzzles) => {
                if puzzles.is_empty() {
                    info!("no puzzles returned at offset {}", offset);
                }
                puzzles
            }
            Err(e) => {
                error!("error fetching puzzles: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn get_puzzle_by_id(&self, id: &str) -> Option<Puzzle> {
        debug!("fetching puzzle {}", id);
        let result = self
            .backend
            .from(PUZZLES_TABLE)
            .await
            .select("*")
            .eq("id", id)
            .execute_one::<Puzzle>()
            .await;

        match result {
            Ok(Some(puzzle)) => Some(puzzle),
            Ok(None) => {
                info!("no puzzle with id {}", id);
                None
            }
            Err(e) => {
                error!("error fetching puzzle {}: {}", id, e);
                None
            }
        }
    }

    pub async fn get_puzzles_by_difficulty(
        &self,
        difficulty: u8,
        limit: Option<usize>,
        offset: usize,
    ) -> Vec<Puzzle> {
        let limit = self.backend.config().puzzle_limit(limit);
        debug!("fetching puzzles with difficulty {}", difficulty);

        let result = self
            .backend
            .from(PUZZLES_TABLE)
            .await
            .select("*")
            .eq("difficulty", difficulty)
            .order("id", SortOrder::Ascending)
            .range(offset, offset + limit - 1)
            .execute::<Puzzle>()
            .await;

        match result {
            Ok(puzzles) => {
                if puzzles.is_empty() {
                    info!("no puzzles with difficulty {}", difficulty);
                }
                puzzles
            }
            Err(e) => {
                error!("error fetching puzzles by difficulty {}: {}", difficulty, e);
                Vec::new()
            }
        }
    }

    /// Whether the puzzles table answers a minimal select
    pub async fn check_table_access(&self) -> bool {
        debug!(
            "checking puzzles table access at {}",
            self.backend.config().url
        );
        let result = self
            .backend
            .from(PUZZLES_TABLE)
            .await
            .select("id")
            .limit(1)
            .execute::<serde_json::Value>()
            .await;

        match result {
            Ok(rows) => {
                info!("puzzles table reachable, {} row(s) sampled", rows.len());
                true
            }
            Err(e) => {
                error!("error accessing puzzles table: {}", e);
                false
            }
        }
    }

    /// [`check_table_access`](Self::check_table_access) raced against the
    /// configured check timeout. `None` means the check timed out.
    pub async fn check_table_access_with_timeout(&self) -> Option<bool> {
        let timeout = self.backend.config().table_check_timeout;
        match tokio::time::timeout(timeout, self.check_table_access()).await {
            Ok(accessible) => Some(accessible),
            Err(_) => {
                warn!("puzzles table access check timed out after {:?}", timeout);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn puzzle_json(id: i64, difficulty: u8) -> serde_json::Value {
        json!({
            "id": id,
            "fen": "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
            "moves": "d2d4",
            "difficulty": difficulty,
            "theme": "opening"
        })
    }

    fn service_with(server: &MockServer, config: impl FnOnce(AppConfig) -> AppConfig) -> PuzzleService {
        let config = config(AppConfig::new(&server.uri(), "anon").unwrap());
        PuzzleService::new(Arc::new(Backend::new(config).unwrap()))
    }

    fn service(server: &MockServer) -> PuzzleService {
        service_with(server, |config| config)
    }

    #[tokio::test]
    async fn test_get_puzzles_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/puzzles"))
            .and(query_param("order", "id.asc"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "10"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([puzzle_json(1, 2), puzzle_json(2, 3)])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let puzzles = service(&server).get_puzzles(None, 0).await;
        assert_eq!(puzzles.len(), 2);
        assert_eq!(puzzles[1].id, "2");
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/puzzles"))
            .and(query_param("offset", "20"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        assert!(service(&server).get_puzzles(Some(1000), 20).await.is_empty());
    }

    #[tokio::test]
    async fn test_get_puzzle_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/puzzles"))
            .and(query_param("id", "eq.7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([puzzle_json(7, 4)])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/puzzles"))
            .and(query_param("id", "eq.8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let service = service(&server);
        assert_eq!(service.get_puzzle_by_id("7").await.unwrap().difficulty, 4);
        assert!(service.get_puzzle_by_id("8").await.is_none());
    }

    #[tokio::test]
    async fn test_error_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/puzzles"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "code": "XX000",
                "message": "internal error"
            })))
            .mount(&server)
            .await;

        let service = service(&server);
        assert!(service.get_puzzles(None, 0).await.is_empty());
        assert!(service.get_puzzles_by_difficulty(3, None, 0).await.is_empty());
        assert!(service.get_puzzle_by_id("1").await.is_none());
        assert!(!service.check_table_access().await);
    }

    #[tokio::test]
    async fn test_table_access_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/puzzles"))
            .and(query_param("select", "id"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
            .mount(&server)
            .await;

        assert_eq!(
            service(&server).check_table_access_with_timeout().await,
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_table_access_check_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/puzzles"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let service = service_with(&server, |config| {
            config.with_table_check_timeout(Duration::from_millis(100))
        });
        assert_eq!(service.check_table_access_with_timeout().await, None);
    }
}
