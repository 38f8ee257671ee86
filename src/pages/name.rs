//! Person pages: the display name and the filmography credit blocks.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;

use super::{SourceUrls, ld_json, ld_string, selector, title_id_in};
use crate::{
    error::AppResult,
    fetcher::PageFetcher,
    models::{
        CINEMATOGRAPHER, Credit, DIRECTOR_OF_PHOTOGRAPHY, EpisodeStub, ShowType, YearRange,
    },
};

/// One filmography row, still as text.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CreditBlock {
    pub job_class: String,
    pub show_id: Option<String>,
    pub show_title: String,
    /// Free text after the title, e.g. `(TV Series) (key grip)`.
    pub chunk: String,
    pub years: String,
    pub episodes: Vec<EpisodeLink>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EpisodeLink {
    pub href: String,
    /// Full text of the episode entry the link sits in.
    pub text: String,
}

pub struct PersonPage {
    pub name: Option<String>,
    pub blocks: Vec<CreditBlock>,
}

pub async fn fetch_person_page<F: PageFetcher>(
    fetcher: &F,
    urls: &SourceUrls,
    person_id: &str,
) -> AppResult<PersonPage> {
    let html = fetcher.fetch(&urls.person(person_id)).await?;
    let page = parse_person_page(&html);
    debug!(person_id = %person_id, blocks = page.blocks.len(), "parsed person page");
    Ok(page)
}

pub fn parse_person_page(html: &str) -> PersonPage {
    let doc = Html::parse_document(html);
    let name = ld_json(&doc).and_then(|data| ld_string(&data, "name"));

    let row_sel = selector("div.filmo-row");
    let blocks = doc.select(&row_sel).map(parse_block).collect();

    PersonPage { name, blocks }
}

fn parse_block(row: ElementRef<'_>) -> CreditBlock {
    let (job_class, id_part) = match row.value().attr("id").and_then(|id| id.split_once('-')) {
        Some((class, rest)) => (class.replace('_', " "), Some(rest)),
        None => (String::new(), None),
    };

    let title_sel = selector("b a");
    let title_link = row.select(&title_sel).next();
    let show_title =
        title_link.map(|a| a.text().collect::<String>().trim().to_string()).unwrap_or_default();

    let show_id = id_part
        .and_then(title_id_in)
        .or_else(|| title_link.and_then(|a| a.value().attr("href")).and_then(title_id_in))
        .map(str::to_string);

    let bold_sel = selector("b");
    let chunk = row
        .select(&bold_sel)
        .next()
        .and_then(|b| b.next_sibling())
        .and_then(|node| node.value().as_text().map(|t| t.trim().to_string()))
        .unwrap_or_default();

    let year_sel = selector("span.year_column");
    let years = row
        .select(&year_sel)
        .next()
        .map(|s| s.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let episode_sel = selector("div.filmo-episodes");
    let link_sel = selector("a[href]");
    let mut episodes = Vec::new();
    for div in row.select(&episode_sel) {
        let text = div.text().collect::<String>();
        for link in div.select(&link_sel) {
            if let Some(href) = link.value().attr("href") {
                episodes.push(EpisodeLink { href: href.to_string(), text: text.clone() });
            }
        }
    }

    CreditBlock { job_class, show_id, show_title, chunk, years, episodes }
}

/// What a parenthesised fragment of a credit chunk describes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChunkKind {
    ShowType,
    JobTitle,
}

struct ChunkRule {
    kind: ChunkKind,
    matches: fn(&str) -> bool,
}

/// Evaluated top to bottom; the first matching rule classifies the fragment.
const CHUNK_RULES: &[ChunkRule] = &[
    ChunkRule { kind: ChunkKind::ShowType, matches: looks_like_show_type },
    ChunkRule { kind: ChunkKind::JobTitle, matches: looks_like_job_title },
];

pub fn classify_fragment(fragment: &str) -> Option<ChunkKind> {
    CHUNK_RULES.iter().find(|rule| (rule.matches)(fragment)).map(|rule| rule.kind)
}

fn looks_like_show_type(fragment: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("TV|Docu|Short|Video").expect("Invalid regex pattern defined in code"))
        .is_match(fragment)
}

pub fn looks_like_job_title(fragment: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"camera|\bac\b|operator|photo|cinematograph|clapper|imag|loader|puller|data|utility|dit|jib|tech|media|pov|assistant|steadicam|video|light|electric|gaffer|grip",
        )
        .expect("Invalid regex pattern defined in code")
    })
    .is_match(&fragment.to_lowercase())
}

fn strip_parens(text: &str) -> String {
    text.chars().filter(|c| *c != '(' && *c != ')').collect::<String>().trim().to_string()
}

/// Splits the free-text chunk into a job title and a show type. Feature films
/// never state their type, so it is the default.
pub fn disambiguate_chunk(chunk: &str) -> (Option<String>, ShowType) {
    let chunk = chunk.trim();
    if chunk.is_empty() {
        return (None, ShowType::FeatureFilm);
    }

    if !chunk.contains(") (") {
        return match classify_fragment(chunk) {
            Some(ChunkKind::ShowType) => (None, ShowType::from_label(&strip_parens(chunk))),
            _ => (Some(strip_parens(chunk)), ShowType::FeatureFilm),
        };
    }

    let mut job = None;
    let mut show_type = None;
    for fragment in chunk.split(") (") {
        match classify_fragment(fragment) {
            Some(ChunkKind::ShowType) => show_type = Some(strip_parens(fragment)),
            Some(ChunkKind::JobTitle) => job = Some(strip_parens(fragment)),
            // status markers such as "(completed)"
            None => {},
        }
    }

    let job = job.map(|j| match j.split_once(" - ") {
        Some((head, _)) => head.trim().to_string(),
        None => j,
    });
    let show_type = show_type.map_or(ShowType::FeatureFilm, |label| ShowType::from_label(&label));
    (job, show_type)
}

/// Reads the year column: `2015-2017` (hyphen or en dash), `2019`, `2019/I`,
/// or empty.
pub fn parse_year_column(text: &str) -> Option<YearRange> {
    let cleaned: String = text.chars().filter(|c| *c != '/' && *c != 'I').collect();
    let cleaned = cleaned.trim();
    let (first, last) = match cleaned.split_once(['-', '\u{2013}']) {
        Some((first, last)) => (first.trim(), last.trim()),
        None => (cleaned, cleaned),
    };
    let first: i16 = first.parse().ok()?;
    let last: i16 = last.parse().unwrap_or(first);
    Some(YearRange::new(first, last))
}

/// Job credited on a single episode, written as `... (job)` after the
/// episode title. Titles may end in `...` themselves, so the last marker wins.
fn episode_job(text: &str) -> Option<String> {
    let (_, after) = text.rsplit_once("... (")?;
    let job = after.trim().trim_end_matches(')').trim();
    (looks_like_job_title(job) && !job.is_empty()).then(|| job.to_string())
}

/// Turns one credit block into a [`Credit`]. Blocks without a resolvable
/// title reference are dropped.
pub fn extract_credit(block: &CreditBlock) -> Option<Credit> {
    let Some(show_id) = block.show_id.clone() else {
        debug!(title = %block.show_title, "credit block without title reference");
        return None;
    };

    let (job, show_type) = disambiguate_chunk(&block.chunk);

    let mut episodes: Vec<EpisodeStub> = Vec::new();
    for link in &block.episodes {
        let Some(episode_id) = title_id_in(&link.href) else {
            continue;
        };
        if episodes.iter().any(|e| e.external_id == episode_id) {
            continue;
        }
        episodes.push(EpisodeStub { external_id: episode_id.to_string(), job_title: episode_job(&link.text) });
    }

    let mut credit = Credit {
        show_id,
        show_title: block.show_title.clone(),
        job_class: block.job_class.clone(),
        job_title: job.unwrap_or_default(),
        show_type,
        years: parse_year_column(&block.years),
        episodes,
    };

    if credit.job_class.eq_ignore_ascii_case(CINEMATOGRAPHER) {
        credit.job_title = DIRECTOR_OF_PHOTOGRAPHY.to_string();
    }

    Some(credit)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSON_PAGE: &str = r#"
<html><head>
<script type="application/ld+json">{"@type":"Person","name":"Jane Doe"}</script>
</head><body>
<div class="filmo-row odd" id="camera_department-tt0903747">
<span class="year_column">&nbsp;2008-2010</span>
<b><a href="/title/tt0903747/">Breaking Bad</a></b>
(TV Series) (first assistant camera - 2nd unit)
<br/>
<div class="filmo-episodes">
- <a href="/title/tt1232249/">Pilot</a> (2008)
... (first assistant camera)
</div>
<div class="filmo-episodes">
- <a href="/title/tt1232250/">Cat's in the Bag...</a> (2008)
</div>
</div>
<div class="filmo-row even" id="cinematographer-tt1234567">
<span class="year_column">2019/I</span>
<b><a href="/title/tt1234567/">Some Film</a></b>
(completed)
</div>
<div class="filmo-row odd" id="camera_department">
<span class="year_column">2001</span>
<b><a href="/list/ls000001/">Not a title</a></b>
</div>
</body></html>"#;

    #[test]
    fn person_page_blocks() {
        let page = parse_person_page(PERSON_PAGE);
        assert_eq!(page.name.as_deref(), Some("Jane Doe"));
        assert_eq!(page.blocks.len(), 3);

        let first = &page.blocks[0];
        assert_eq!(first.job_class, "camera department");
        assert_eq!(first.show_id.as_deref(), Some("tt0903747"));
        assert_eq!(first.show_title, "Breaking Bad");
        assert_eq!(first.chunk, "(TV Series) (first assistant camera - 2nd unit)");
        assert_eq!(first.episodes.len(), 2);
    }

    #[test]
    fn series_credit_with_episodes() {
        let page = parse_person_page(PERSON_PAGE);
        let credit = extract_credit(&page.blocks[0]).unwrap();
        assert_eq!(credit.show_type, ShowType::TvSeries);
        assert_eq!(credit.job_title, "first assistant camera");
        assert_eq!(credit.years, Some(YearRange::new(2008, 2010)));
        assert_eq!(credit.episodes.len(), 2);
        assert_eq!(credit.episodes[0].external_id, "tt1232249");
        assert_eq!(credit.episodes[0].job_title.as_deref(), Some("first assistant camera"));
        assert_eq!(credit.episodes[1].job_title, None);
    }

    #[test]
    fn cinematographer_is_always_director_of_photography() {
        let page = parse_person_page(PERSON_PAGE);
        let credit = extract_credit(&page.blocks[1]).unwrap();
        assert_eq!(credit.job_title, DIRECTOR_OF_PHOTOGRAPHY);
        assert_eq!(credit.show_type, ShowType::FeatureFilm);
        assert_eq!(credit.years, Some(YearRange::new(2019, 2019)));
    }

    #[test]
    fn blocks_without_title_reference_are_dropped() {
        let page = parse_person_page(PERSON_PAGE);
        assert_eq!(extract_credit(&page.blocks[2]), None);
    }

    #[test]
    fn show_type_rule_wins_over_job_rule() {
        assert_eq!(classify_fragment("Video short"), Some(ChunkKind::ShowType));
        assert_eq!(classify_fragment("video assist"), Some(ChunkKind::JobTitle));
        assert_eq!(classify_fragment("completed"), None);
        assert_eq!(classify_fragment("2nd AC"), Some(ChunkKind::JobTitle));
        assert_eq!(
            disambiguate_chunk("(TV Series) (2nd AC)"),
            (Some("2nd AC".to_string()), ShowType::TvSeries)
        );
    }

    #[test]
    fn single_fragment_chunks() {
        assert_eq!(disambiguate_chunk("(TV Movie)"), (None, ShowType::TvMovie));
        assert_eq!(
            disambiguate_chunk("(drone pilot)"),
            (Some("drone pilot".to_string()), ShowType::FeatureFilm)
        );
        assert_eq!(disambiguate_chunk(""), (None, ShowType::FeatureFilm));
    }

    #[test]
    fn multi_fragment_keeps_last_of_each_kind() {
        let (job, show_type) =
            disambiguate_chunk("(TV Mini Series) (camera operator) (key grip - splinter unit)");
        assert_eq!(job.as_deref(), Some("key grip"));
        assert_eq!(show_type, ShowType::TvMiniSeries);

        let (job, show_type) = disambiguate_chunk("(post-production) (loader)");
        assert_eq!(job.as_deref(), Some("loader"));
        assert_eq!(show_type, ShowType::FeatureFilm);
    }

    #[test]
    fn year_column_forms() {
        assert_eq!(parse_year_column("2015-2017"), Some(YearRange::new(2015, 2017)));
        assert_eq!(parse_year_column("2015\u{2013}2017"), Some(YearRange::new(2015, 2017)));
        assert_eq!(parse_year_column(" 2012/II "), Some(YearRange::new(2012, 2012)));
        assert_eq!(parse_year_column(""), None);
    }

    #[test]
    fn episode_job_after_title_ending_in_ellipsis() {
        let text = "\n- Cat's in the Bag... (2008)\n... (camera operator)\n";
        assert_eq!(episode_job(text).as_deref(), Some("camera operator"));
        assert_eq!(episode_job("\n- Cat's in the Bag... (2008)\n"), None);
        assert_eq!(episode_job("\n- Pilot (2008)\n... (key grip)\n").as_deref(), Some("key grip"));
    }
}
