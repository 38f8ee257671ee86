//! Extraction of typed records from source pages.

pub mod episodes;
pub mod name;
pub mod title;

use std::{collections::BTreeSet, sync::OnceLock};

use regex::Regex;
use scraper::{Html, Selector};

use crate::models::{Genre, genres_from_names};

/// Builds page URLs for a given source site.
#[derive(Clone, Debug)]
pub struct SourceUrls {
    base: String,
}

impl SourceUrls {
    pub fn new(base: &str) -> Self {
        Self { base: base.trim_end_matches('/').to_string() }
    }

    pub fn person(&self, person_id: &str) -> String {
        format!("{}/name/{}/", self.base, person_id)
    }

    pub fn title(&self, title_id: &str) -> String {
        format!("{}/title/{}/", self.base, title_id)
    }

    pub fn episode_list(&self, show_id: &str) -> String {
        format!("{}/title/{}/episodes", self.base, show_id)
    }

    pub fn episode_list_page(&self, show_id: &str, layout: &str, index: u16) -> String {
        format!("{}/title/{}/episodes?{}={}", self.base, show_id, layout, index)
    }
}

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Invalid selector defined in code")
}

/// The page's embedded `application/ld+json` metadata, if any.
pub(crate) fn ld_json(doc: &Html) -> Option<serde_json::Value> {
    let sel = selector(r#"script[type="application/ld+json"]"#);
    let script = doc.select(&sel).next()?;
    let raw = script.text().collect::<String>();
    serde_json::from_str(&raw).ok()
}

/// Reads `genre`, which is either a single string or a list of strings.
pub(crate) fn ld_genres(data: &serde_json::Value) -> BTreeSet<Genre> {
    match data.get("genre") {
        Some(serde_json::Value::String(name)) => genres_from_names(&[name.as_str()]),
        Some(serde_json::Value::Array(items)) => {
            let names: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            genres_from_names(&names)
        },
        _ => BTreeSet::new(),
    }
}

pub(crate) fn ld_string(data: &serde_json::Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(|v| v.as_str())
        .map(|s| html_escape::decode_html_entities(s).trim().to_string())
        .filter(|s| !s.is_empty())
}

/// First title id (`tt` followed by 7 to 10 digits) found in `text`.
pub(crate) fn title_id_in(text: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re =
        RE.get_or_init(|| Regex::new(r"tt[0-9]{7,10}").expect("Invalid regex pattern defined in code"));
    re.find(text).map(|m| m.as_str())
}
