//! Test doubles shared by the async tests.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    fetcher::PageFetcher,
    models::Genre,
    pages::SourceUrls,
    store::{GraphStore, SqlGraphStore},
};

pub const BASE: &str = "https://source.test";

pub fn urls() -> SourceUrls {
    SourceUrls::new(BASE)
}

/// Serves canned pages by URL and records every request.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_page(mut self, url: String, html: impl Into<String>) -> Self {
        self.pages.insert(url, html.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn authenticate(&mut self) -> AppResult<()> {
        Ok(())
    }

    async fn fetch(&self, url: &str) -> AppResult<String> {
        self.calls.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::TransientFetch { url: url.to_string(), attempts: 1 })
    }
}

pub async fn seeded_store() -> SqlGraphStore {
    let store = SqlGraphStore::open("sqlite::memory:").await.unwrap();
    for g in Genre::ALL {
        store.upsert_genre(g).await.unwrap();
    }
    store
}

/// An episode listing index page with a season picker.
pub fn season_picker(seasons: &[u16], selected: u16) -> String {
    let options: String = seasons
        .iter()
        .map(|s| {
            let flag = if *s == selected { " selected" } else { "" };
            format!(r#"<option value="{s}"{flag}>{s}</option>"#)
        })
        .collect();
    format!(
        r#"<html><body><div><label for="bySeason">Season:</label>
        <select id="bySeason">{options}</select></div></body></html>"#
    )
}

/// A listing sub-page; each entry is (episode id, season, episode, air date).
pub fn listing_page(items: &[(&str, u16, u16, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(id, season, number, air)| {
            format!(
                r#"<div class="list_item">
                <div class="image"><div data-const="{id}"><div>S{season}, Ep{number}</div></div></div>
                <div class="info"><div class="airdate">{air}</div>
                <strong><a itemprop="name" href="/title/{id}/">Episode {number}</a></strong></div>
                </div>"#
            )
        })
        .collect();
    format!(r#"<html><body><div class="list detail eplist">{body}</div></body></html>"#)
}

pub fn title_page(genres: &[&str]) -> String {
    let genres = serde_json::to_string(genres).unwrap();
    format!(
        r#"<html><head><script type="application/ld+json">{{"@type":"TVSeries","genre":{genres}}}</script></head><body></body></html>"#
    )
}
