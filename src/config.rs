use std::{collections::HashSet, time::Duration};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub source_base_url: String,
    pub signin_path: String,
    pub fetch_retries: u32,
    pub fetch_timeout: Duration,
    pub fetch_rps: u32,
    pub excluded_title_ids: HashSet<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://crewgraph.db?mode=rwc".to_string());

        let source_base_url = std::env::var("SOURCE_BASE_URL")
            .unwrap_or_else(|_| "https://www.imdb.com".to_string());

        let signin_path =
            std::env::var("SIGNIN_PATH").unwrap_or_else(|_| "/registration/signin".to_string());

        let fetch_retries: u32 = match std::env::var("FETCH_RETRIES") {
            Ok(s) => s.parse().context("FETCH_RETRIES")?,
            Err(_) => 5,
        };

        let fetch_timeout_secs: u64 =
            std::env::var("FETCH_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let fetch_rps: u32 =
            std::env::var("FETCH_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(1);

        let excluded_title_ids = std::env::var("EXCLUDED_TITLE_IDS")
            .map(|s| parse_id_list(&s))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            source_base_url,
            signin_path,
            fetch_retries: fetch_retries.max(1),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            fetch_rps,
            excluded_title_ids,
        })
    }

    pub fn signin_url(&self) -> String {
        format!("{}{}", self.source_base_url.trim_end_matches('/'), self.signin_path)
    }
}

fn parse_id_list(raw: &str) -> HashSet<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_ignores_blanks_and_whitespace() {
        let ids = parse_id_list(" tt0000001, ,tt0000002 ,");
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("tt0000001"));
        assert!(ids.contains("tt0000002"));
    }
}
