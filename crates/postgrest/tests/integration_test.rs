#![cfg(feature = "integration-tests")]

// Runs against a live project; needs SUPABASE_URL and SUPABASE_ANON_KEY and a
// seeded `puzzles` table.

use chess_trainer_postgrest::{PostgrestClient, SortOrder};
use dotenvy::dotenv;
use reqwest::Client;
use serde_json::Value;
use std::env;

fn puzzles_client() -> PostgrestClient {
    dotenv().ok();
    let url = env::var("SUPABASE_URL").expect("SUPABASE_URL must be set for integration tests");
    let key = env::var("SUPABASE_ANON_KEY")
        .expect("SUPABASE_ANON_KEY must be set for integration tests");
    PostgrestClient::new(&url, &key, "puzzles", Client::new())
}

#[tokio::test]
async fn test_puzzles_table_is_readable() {
    let result = puzzles_client()
        .select("id")
        .limit(1)
        .execute::<Value>()
        .await;

    assert!(result.is_ok(), "select on puzzles failed: {:?}", result.err());
}

#[tokio::test]
async fn test_difficulty_filter_matches_rows() {
    let rows = puzzles_client()
        .select("*")
        .eq("difficulty", 3)
        .order("id", SortOrder::Ascending)
        .range(0, 9)
        .execute::<Value>()
        .await
        .expect("filtered select failed");

    for row in rows {
        assert_eq!(row["difficulty"], 3);
    }
}
