//! Episode listing pages, organised either by season or by year.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;

use super::{SourceUrls, selector};
use crate::{dates::parse_date, error::AppResult, fetcher::PageFetcher, models::EpisodeDraft};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListingLayout {
    Season,
    Year,
}

impl ListingLayout {
    fn label_for(self) -> &'static str {
        match self {
            ListingLayout::Season => "bySeason",
            ListingLayout::Year => "byYear",
        }
    }

    pub fn query_key(self) -> &'static str {
        match self {
            ListingLayout::Season => "season",
            ListingLayout::Year => "year",
        }
    }
}

/// The season (or year) picker of a listing page.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListingIndex {
    pub layout: ListingLayout,
    pub values: Vec<u16>,
    pub selected: Option<u16>,
}

impl ListingIndex {
    /// Positive values up to the currently selected one. Later values are
    /// announced but not yet aired.
    pub fn to_fetch(&self) -> Vec<u16> {
        self.values
            .iter()
            .copied()
            .filter(|v| *v > 0)
            .filter(|v| self.selected.is_none_or(|s| *v <= s))
            .collect()
    }
}

/// Season layout is tried first, year layout second.
pub fn parse_listing_index(html: &str) -> Option<ListingIndex> {
    let doc = Html::parse_document(html);
    [ListingLayout::Season, ListingLayout::Year]
        .into_iter()
        .find_map(|layout| parse_picker(&doc, layout))
}

fn parse_picker(doc: &Html, layout: ListingLayout) -> Option<ListingIndex> {
    let label_sel = selector(&format!(r#"label[for="{}"]"#, layout.label_for()));
    let label = doc.select(&label_sel).next()?;
    let container = label.parent().and_then(ElementRef::wrap)?;

    let option_sel = selector("option[value]");
    let mut values = Vec::new();
    let mut selected = None;
    for option in container.select(&option_sel) {
        let Some(value) = option.value().attr("value").and_then(|v| v.trim().parse::<u16>().ok())
        else {
            continue;
        };
        if value == 0 {
            continue;
        }
        values.push(value);
        if option.value().attr("selected").is_some() {
            selected = Some(value);
        }
    }

    (!values.is_empty()).then_some(ListingIndex { layout, values, selected })
}

/// One draft per listed item. Items numbered `Unknown` are skipped.
pub fn parse_listing_items(html: &str, show_id: &str) -> Vec<EpisodeDraft> {
    let doc = Html::parse_document(html);
    let item_sel = selector("div.list_item");
    let title_sel = selector(r#"a[itemprop="name"]"#);
    let const_sel = selector("div[data-const]");
    let numbers_sel = selector("div");
    let airdate_sel = selector("div.airdate");

    let mut out = Vec::new();
    for item in doc.select(&item_sel) {
        let Some(data) = item.select(&const_sel).next() else {
            continue;
        };
        let Some(episode_id) = data.value().attr("data-const").filter(|id| !id.is_empty()) else {
            continue;
        };

        let mut draft = EpisodeDraft::new(episode_id, show_id);
        draft.title = item
            .select(&title_sel)
            .next()
            .map(|a| a.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        if let Some(numbers) = data.select(&numbers_sel).next() {
            let text = numbers.text().collect::<String>();
            let text = text.trim();
            if text == "Unknown" {
                continue;
            }
            let (season, episode) = parse_numbering(text);
            draft.season_number = season;
            draft.episode_number = episode;
        }

        if let Some(airdate) = item.select(&airdate_sel).next() {
            let text = airdate.text().collect::<String>().replace('.', "");
            draft.air_date = parse_date(&text).map(|d| d.date);
        }

        out.push(draft);
    }
    out
}

/// `S2, Ep7` style numbering.
fn parse_numbering(text: &str) -> (Option<u16>, Option<u16>) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new("[0-9]{1,4}").expect("Invalid regex pattern defined in code"));
    let number = |part: &str| re.find(part).and_then(|m| m.as_str().parse().ok());
    match text.split_once(", ") {
        Some((season, episode)) => (number(season), number(episode)),
        None => (None, None),
    }
}

/// Every listed episode of a show, across all aired seasons or years.
pub async fn fetch_listing<F: PageFetcher>(
    fetcher: &F,
    urls: &SourceUrls,
    show_id: &str,
) -> AppResult<Vec<EpisodeDraft>> {
    let html = fetcher.fetch(&urls.episode_list(show_id)).await?;
    let Some(index) = parse_listing_index(&html) else {
        debug!(show_id = %show_id, "episode listing has no season or year picker");
        return Ok(Vec::new());
    };

    let mut drafts = Vec::new();
    for value in index.to_fetch() {
        let url = urls.episode_list_page(show_id, index.layout.query_key(), value);
        let page = fetcher.fetch(&url).await?;
        let items = parse_listing_items(&page, show_id);
        debug!(show_id = %show_id, layout = index.layout.query_key(), value = value, items = items.len(), "parsed listing page");
        drafts.extend(items);
    }
    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    fn picker(label: &str, options: &str) -> String {
        format!(
            r#"<html><body><div class="episode-list-select">
            <label for="{label}">Season:</label>
            <select id="{label}">{options}</select>
            </div></body></html>"#
        )
    }

    #[test]
    fn season_picker_stops_at_selected() {
        let html = picker(
            "bySeason",
            r#"<option value="1">1</option><option value="2" selected="selected">2</option>
               <option value="3">3</option><option value="-1">Unknown</option>"#,
        );
        let index = parse_listing_index(&html).unwrap();
        assert_eq!(index.layout, ListingLayout::Season);
        assert_eq!(index.selected, Some(2));
        assert_eq!(index.to_fetch(), vec![1, 2]);
    }

    #[test]
    fn year_picker_is_the_fallback() {
        let html = picker(
            "byYear",
            r#"<option value="2019">2019</option><option value="2020" selected>2020</option>"#,
        );
        let index = parse_listing_index(&html).unwrap();
        assert_eq!(index.layout, ListingLayout::Year);
        assert_eq!(index.to_fetch(), vec![2019, 2020]);
    }

    #[test]
    fn no_picker() {
        assert_eq!(parse_listing_index("<html><body></body></html>"), None);
    }

    #[test]
    fn listing_items() {
        let html = r#"<html><body><div class="list detail eplist">
        <div class="list_item odd">
          <div class="image"><div data-const="tt1232249"><div>S1, Ep1</div></div></div>
          <div class="info">
            <div class="airdate">20 Jan. 2008</div>
            <strong><a itemprop="name" href="/title/tt1232249/">Pilot</a></strong>
          </div>
        </div>
        <div class="list_item even">
          <div class="image"><div data-const="tt1232250"><div>Unknown</div></div></div>
          <div class="info"><div class="airdate">2008</div></div>
        </div>
        <div class="list_item odd">
          <div class="image"><div data-const="tt1232251"><div>S1, Ep3</div></div></div>
          <div class="info"><div class="airdate"></div>
            <strong><a itemprop="name" href="/title/tt1232251/">...And the Bag's in the River</a></strong>
          </div>
        </div>
        </div></body></html>"#;

        let drafts = parse_listing_items(html, "tt0903747");
        assert_eq!(drafts.len(), 2);

        assert_eq!(drafts[0].external_id, "tt1232249");
        assert_eq!(drafts[0].title.as_deref(), Some("Pilot"));
        assert_eq!(drafts[0].season_number, Some(1));
        assert_eq!(drafts[0].episode_number, Some(1));
        assert_eq!(drafts[0].air_date, Some(date(2008, 1, 20)));

        assert_eq!(drafts[1].episode_number, Some(3));
        assert_eq!(drafts[1].air_date, None);
    }

    #[test]
    fn numbering_text() {
        assert_eq!(parse_numbering("S12, Ep104"), (Some(12), Some(104)));
        assert_eq!(parse_numbering("S1"), (None, None));
    }
}
