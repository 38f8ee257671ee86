//! Title pages: show genres and single-episode details.

use std::collections::BTreeSet;

use scraper::Html;
use tracing::debug;

use super::{SourceUrls, ld_genres, ld_json, ld_string, selector};
use crate::{
    dates::parse_date,
    error::AppResult,
    fetcher::PageFetcher,
    models::{EpisodeDraft, Genre},
};

pub async fn fetch_show_genres<F: PageFetcher>(
    fetcher: &F,
    urls: &SourceUrls,
    show_id: &str,
) -> AppResult<BTreeSet<Genre>> {
    let html = fetcher.fetch(&urls.title(show_id)).await?;
    Ok(parse_show_genres(&html))
}

/// Genres from the page metadata; a page without metadata has none.
pub fn parse_show_genres(html: &str) -> BTreeSet<Genre> {
    let doc = Html::parse_document(html);
    ld_json(&doc).map(|data| ld_genres(&data)).unwrap_or_default()
}

pub async fn fetch_episode<F: PageFetcher>(
    fetcher: &F,
    urls: &SourceUrls,
    episode_id: &str,
    show_id: &str,
) -> AppResult<EpisodeDraft> {
    let html = fetcher.fetch(&urls.title(episode_id)).await?;
    let draft = parse_episode_page(&html, episode_id, show_id);
    debug!(
        episode_id = %episode_id,
        season = ?draft.season_number,
        episode = ?draft.episode_number,
        air_date = ?draft.air_date,
        "parsed episode page"
    );
    Ok(draft)
}

pub fn parse_episode_page(html: &str, episode_id: &str, show_id: &str) -> EpisodeDraft {
    let doc = Html::parse_document(html);
    let mut draft = EpisodeDraft::new(episode_id, show_id);

    if let Some(data) = ld_json(&doc) {
        draft.title = ld_string(&data, "name");
        draft.genres = ld_genres(&data);
    }

    let numbers_sel =
        selector(r#"ul[data-testid="hero-subnav-bar-season-episode-numbers-section"] li"#);
    for li in doc.select(&numbers_sel) {
        let text = li.text().collect::<String>();
        let text = text.trim();
        if let Some(n) = text.strip_prefix('S') {
            draft.season_number = n.trim().parse().ok();
        } else if let Some(n) = text.strip_prefix('E') {
            draft.episode_number = n.trim().parse().ok();
        }
    }

    let li_sel = selector("li");
    let air_text = doc
        .select(&li_sel)
        .map(|li| li.text().collect::<String>())
        .find(|text| text.contains("Episode air"));
    if let Some(text) = air_text {
        let text = text.trim();
        let date_text = text
            .strip_prefix("Episode aired ")
            .or_else(|| text.strip_prefix("Episode airs "))
            .unwrap_or(text);
        draft.air_date = parse_date(date_text).map(|d| d.date);
    }

    draft
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn show_genres_from_metadata() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type":"TVSeries","name":"Breaking Bad","genre":["Crime","Drama","Thriller"]}
            </script></head><body></body></html>"#;
        let genres = parse_show_genres(html);
        assert_eq!(
            genres.into_iter().collect::<Vec<_>>(),
            vec![Genre::Drama, Genre::Crime, Genre::Thriller]
        );
    }

    #[test]
    fn missing_metadata_means_no_genres() {
        assert!(parse_show_genres("<html><body><h1>Nothing</h1></body></html>").is_empty());
    }

    #[test]
    fn episode_page_fields() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type":"TVEpisode","name":"Gray Matter","genre":"Drama"}
            </script></head><body>
            <ul data-testid="hero-subnav-bar-season-episode-numbers-section">
              <li>S1</li><li>E5</li>
            </ul>
            <ul><li>Episode aired Feb 24, 2008</li></ul>
            </body></html>"#;
        let draft = parse_episode_page(html, "tt1054724", "tt0903747");
        assert_eq!(draft.title.as_deref(), Some("Gray Matter"));
        assert_eq!(draft.season_number, Some(1));
        assert_eq!(draft.episode_number, Some(5));
        assert_eq!(draft.air_date, Some(date(2008, 2, 24)));
        assert!(draft.genres.contains(&Genre::Drama));
        assert_eq!(draft.show_id, "tt0903747");
    }

    #[test]
    fn episode_without_numbers_stays_partial() {
        let html = "<html><body><ul><li>Episode airs 2031</li></ul></body></html>";
        let draft = parse_episode_page(html, "tt9999999", "tt0903747");
        assert_eq!(draft.season_number, None);
        assert_eq!(draft.air_date, Some(date(2031, 1, 1)));
        assert!(draft.build().is_err());
    }
}
