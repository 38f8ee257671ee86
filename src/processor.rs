use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::{
    csv::format_list,
    error::AppResult,
    fetcher::PageFetcher,
    models::{Credit, Genre, Person, Season},
    normalize::title_case,
    pages::{
        SourceUrls,
        name::{extract_credit, fetch_person_page},
        title::fetch_show_genres,
    },
    seasons::{aggregate_seasons, resolve_episodes},
    store::GraphStore,
};

pub const RESULT_HEADER: [&str; 11] = [
    "name",
    "name_id",
    "job_class",
    "job_title",
    "first_year",
    "last_year",
    "show_title",
    "title_id",
    "season",
    "show_type",
    "show_genres",
];

/// A credit with the seasons its episodes fall into.
#[derive(Clone, Debug)]
pub struct CreditSeasons {
    pub credit: Credit,
    pub seasons: Vec<Season>,
    /// Title page genres, only looked up for series credits without seasons.
    pub genres: BTreeSet<Genre>,
}

/// Reads every credit of one person. A credit that fails is logged and left
/// out; the rest of the page is still processed.
pub async fn process<S, F>(
    store: &S,
    fetcher: &F,
    urls: &SourceUrls,
    person: &Person,
) -> AppResult<(Person, Vec<CreditSeasons>)>
where
    S: GraphStore,
    F: PageFetcher,
{
    let page = fetch_person_page(fetcher, urls, &person.external_id).await?;
    let person = Person {
        external_id: person.external_id.clone(),
        full_name: if person.full_name.trim().is_empty() {
            page.name.clone().unwrap_or_default()
        } else {
            person.full_name.clone()
        },
    };

    let credits: Vec<Credit> = page.blocks.iter().filter_map(extract_credit).collect();
    debug!(person_id = %person.external_id, blocks = page.blocks.len(), credits = credits.len(), "extracted credits");

    let mut out = Vec::with_capacity(credits.len());
    for credit in credits {
        let result: AppResult<CreditSeasons> = async {
            let episodes =
                resolve_episodes(store, fetcher, urls, &credit.show_id, &credit.episodes).await?;
            let seasons = aggregate_seasons(
                &credit.show_id,
                &credit.show_title,
                episodes,
                credit.is_cinematographer(),
            );

            let genres = if seasons.is_empty() && credit.show_type.is_series() {
                fetch_show_genres(fetcher, urls, &credit.show_id).await?
            } else {
                BTreeSet::new()
            };

            debug!(show_id = %credit.show_id, seasons = seasons.len(), genres = genres.len(), "credit resolved");
            Ok(CreditSeasons { credit: credit.clone(), seasons, genres })
        }
        .await;

        match result {
            Ok(resolved) => out.push(resolved),
            Err(err) => {
                warn!(show_id = %credit.show_id, error = %err, "failed to process credit");
            },
        }
    }

    info!(person = %person.full_name, credits = out.len(), "person processed");
    Ok((person, out))
}

/// Output rows for the series credits of one person.
pub fn result_rows(person: &Person, credits: &[CreditSeasons]) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for entry in credits {
        let credit = &entry.credit;
        if !credit.show_type.is_series() {
            continue;
        }

        let (first_year, last_year) = credit
            .years
            .map(|y| (y.first.to_string(), y.last.to_string()))
            .unwrap_or_default();
        let row = |job: &str, season: String, genres: &BTreeSet<Genre>| {
            let names: Vec<&str> = genres.iter().map(|g| g.as_str()).collect();
            vec![
                person.full_name.clone(),
                person.external_id.clone(),
                title_case(&credit.job_class),
                title_case(job),
                first_year.clone(),
                last_year.clone(),
                credit.show_title.clone(),
                credit.show_id.clone(),
                season,
                credit.show_type.as_str().to_string(),
                format_list(&names),
            ]
        };

        for season in &entry.seasons {
            let dated = season.first_air_date.is_some() && season.last_air_date.is_some();
            if credit.years.is_some() || dated {
                for job in &season.job_titles {
                    rows.push(row(job, season.key.number.to_string(), &season.genres));
                }
            } else {
                let genres = if season.genres.is_empty() { &entry.genres } else { &season.genres };
                rows.push(row(&credit.job_title, String::new(), genres));
            }
        }
    }
    rows
}
