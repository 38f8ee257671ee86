//! The batch jobs behind each subcommand. Every job treats one input row as
//! the unit of work: a failing row is logged and the job moves on.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::{
    cooccur,
    csv::{SEP, cell, parse_list, read_rows, write_row},
    error::{AppError, AppResult},
    fetcher::PageFetcher,
    models::{Genre, Person, Show, YearRange, genres_from_names},
    pages::SourceUrls,
    processor::{self, RESULT_HEADER},
    store::GraphStore,
    sync::{SyncEngine, SyncOutcome, WorkedOnInput},
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Reads `path`, asking on `answers` for another path while the file does
/// not exist. An empty answer gives up with [`AppError::NotFound`].
pub async fn read_input<R>(path: &Path, answers: &mut R) -> AppResult<(PathBuf, Vec<Vec<String>>)>
where
    R: AsyncBufRead + Unpin,
{
    let mut path = path.to_path_buf();
    loop {
        match read_rows(&path).await {
            Ok(rows) => return Ok((path, rows)),
            Err(AppError::NotFound(missing)) => {
                warn!(path = %missing.display(), "file not found");
                print!("File not found: {}. Enter another path (empty to abort): ", missing.display());
                std::io::stdout().flush()?;

                let mut line = String::new();
                answers.read_line(&mut line).await?;
                let answer = line.trim();
                if answer.is_empty() {
                    return Err(AppError::NotFound(missing));
                }
                path = PathBuf::from(answer);
            },
            Err(err) => return Err(err),
        }
    }
}

pub async fn seed_genres<S: GraphStore>(store: &S) -> AppResult<usize> {
    for genre in Genre::ALL {
        store.upsert_genre(genre).await?;
    }
    info!(genres = Genre::ALL.len(), "genres seeded");
    Ok(Genre::ALL.len())
}

/// Imports `external_person_id, full_name` rows. The first row is a header.
pub async fn add_people<S: GraphStore>(store: &S, rows: &[Vec<String>]) -> AppResult<RunSummary> {
    let mut summary = RunSummary::default();
    for row in rows.iter().skip(1) {
        let person =
            Person { external_id: cell(row, 0).to_string(), full_name: cell(row, 1).to_string() };
        if person.external_id.is_empty() {
            summary.skipped += 1;
            continue;
        }
        debug!(person_id = %person.external_id, name = %person.full_name, "adding person");
        match store.upsert_person(&person).await {
            Ok(()) => summary.processed += 1,
            Err(err) => {
                warn!(person_id = %person.external_id, error = %err, "failed to add person");
                summary.failed += 1;
            },
        }
    }
    info!(added = summary.processed, skipped = summary.skipped, failed = summary.failed, "people imported");
    Ok(summary)
}

/// `people.csv` becomes `people_results.csv` next to it.
pub fn results_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    input.with_file_name(format!("{stem}_results.csv"))
}

/// Scrapes every listed person's credits and writes the series seasons they
/// worked on.
pub async fn extract_credits<S, F>(
    store: &S,
    fetcher: &F,
    urls: &SourceUrls,
    input: &Path,
    rows: &[Vec<String>],
    skip: usize,
) -> AppResult<(PathBuf, RunSummary)>
where
    S: GraphStore,
    F: PageFetcher,
{
    let out_path = results_path(input);
    let mut out = BufWriter::new(File::create(&out_path)?);
    write_row(&mut out, &RESULT_HEADER, SEP)?;

    let mut summary = RunSummary { skipped: skip.min(rows.len()), ..Default::default() };
    for row in rows.iter().skip(skip) {
        let crew = Person { external_id: cell(row, 0).to_string(), full_name: cell(row, 1).to_string() };
        if crew.external_id.is_empty() {
            summary.skipped += 1;
            continue;
        }

        info!(person_id = %crew.external_id, name = %crew.full_name, "processing person");
        match processor::process(store, fetcher, urls, &crew).await {
            Ok((person, credits)) => {
                for line in processor::result_rows(&person, &credits) {
                    write_row(&mut out, &line, SEP)?;
                }
                out.flush()?;
                summary.processed += 1;
            },
            Err(err) => {
                warn!(person_id = %crew.external_id, error = %err, "failed to process person");
                summary.failed += 1;
            },
        }
    }

    info!(output = %out_path.display(), processed = summary.processed, failed = summary.failed, "credits extracted");
    Ok((out_path, summary))
}

/// Reads one person-season row: `full_name, person_id, job_class, job_title,
/// first_year, last_year, show_title, show_id, season, show_type, genres`.
pub fn parse_worked_on_row(row: &[String]) -> Option<WorkedOnInput> {
    let person_id = cell(row, 1);
    let show_id = cell(row, 7);
    if person_id.is_empty() || show_id.is_empty() {
        return None;
    }

    let first = cell(row, 4).parse::<i16>().ok();
    let last = cell(row, 5).parse::<i16>().ok();
    let years = match (first, last) {
        (Some(first), Some(last)) => Some(YearRange::new(first, last)),
        (Some(year), None) | (None, Some(year)) => Some(YearRange::new(year, year)),
        (None, None) => None,
    };

    Some(WorkedOnInput {
        person: Person { external_id: person_id.to_string(), full_name: cell(row, 0).to_string() },
        show: Show {
            external_id: show_id.to_string(),
            title: cell(row, 6).to_string(),
            genres: genres_from_names(&parse_list(cell(row, 10))),
        },
        season_number: cell(row, 8).parse().ok().filter(|n| *n > 0),
        job_title: cell(row, 3).to_string(),
        years,
    })
}

pub async fn add_worked_on<S, F>(
    engine: &SyncEngine<'_, S, F>,
    rows: &[Vec<String>],
    skip: usize,
) -> AppResult<RunSummary>
where
    S: GraphStore,
    F: PageFetcher,
{
    let mut summary = RunSummary { skipped: skip.min(rows.len()), ..Default::default() };
    for (index, row) in rows.iter().enumerate().skip(skip) {
        let Some(input) = parse_worked_on_row(row) else {
            debug!(row = index, "row without person or show id");
            summary.skipped += 1;
            continue;
        };

        info!(
            row = index,
            show_id = %input.show.external_id,
            show = %input.show.title,
            person = %input.person.full_name,
            "processing row"
        );
        match engine.sync_worked_on(&input).await {
            Ok(SyncOutcome::Excluded) => summary.skipped += 1,
            Ok(SyncOutcome::Linked { seasons, fetched }) => {
                debug!(row = index, seasons = seasons, fetched = fetched, "row synced");
                summary.processed += 1;
            },
            Err(err) => {
                warn!(row = index, show_id = %input.show.external_id, error = %err, "failed to sync row");
                summary.failed += 1;
            },
        }
    }
    info!(processed = summary.processed, skipped = summary.skipped, failed = summary.failed, "worked-on rows loaded");
    Ok(summary)
}

pub async fn derive_worked_with<S: GraphStore>(store: &S, refresh: bool) -> AppResult<usize> {
    let linked = cooccur::derive_all(store, refresh).await?;
    info!(links = linked, refresh = refresh, "worked-with derivation finished");
    Ok(linked)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::testing::{FakeFetcher, seeded_store, urls};

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("crewgraph-{}-{}", std::process::id(), name))
    }

    #[test]
    fn worked_on_row_fields() {
        let input = parse_worked_on_row(&row(&[
            "Jane Doe",
            "nm0000001",
            "Camera Department",
            "Key Grip",
            "2015",
            "",
            "The Show",
            "tt0000001",
            "",
            "TV Series",
            "['Drama', 'Crime', 'Space Opera']",
        ]))
        .unwrap();
        assert_eq!(input.person.external_id, "nm0000001");
        assert_eq!(input.season_number, None);
        assert_eq!(input.years, Some(YearRange::new(2015, 2015)));
        assert_eq!(input.show.genres.len(), 2);
        assert_eq!(input.job_title, "Key Grip");

        assert!(parse_worked_on_row(&row(&["Jane Doe", "nm0000001"])).is_none());
    }

    #[test]
    fn results_file_sits_next_to_input() {
        assert_eq!(results_path(Path::new("/data/crew.csv")), PathBuf::from("/data/crew_results.csv"));
    }

    #[tokio::test]
    async fn people_import_skips_header_and_blank_ids() {
        let store = seeded_store().await;
        let rows = vec![
            row(&["external_person_id", "full_name"]),
            row(&["nm1", "Jane Doe"]),
            row(&["", "Nobody"]),
        ];
        let summary = add_people(&store, &rows).await.unwrap();
        assert_eq!(summary, RunSummary { processed: 1, skipped: 1, failed: 0 });
        assert_eq!(store.people().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn seeding_is_repeatable() {
        let store = seeded_store().await;
        assert_eq!(seed_genres(&store).await.unwrap(), 28);
    }

    #[tokio::test]
    async fn missing_input_asks_for_another_path() {
        let real = temp_path("people.csv");
        std::fs::write(&real, "id,name\nnm1,Jane\n").unwrap();

        let mut answers = format!("{}\n", real.display()).into_bytes();
        let mut reader = answers.as_slice();
        let (path, rows) = read_input(Path::new("/nonexistent/people.csv"), &mut reader).await.unwrap();
        assert_eq!(path, real);
        assert_eq!(rows.len(), 2);

        answers = b"\n".to_vec();
        let mut reader = answers.as_slice();
        let err = read_input(Path::new("/nonexistent/people.csv"), &mut reader).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        std::fs::remove_file(real).unwrap();
    }

    #[tokio::test]
    async fn worked_on_rows_continue_past_failures() {
        let store = seeded_store().await;
        let fetcher = FakeFetcher::default();
        let urls = urls();
        let excluded = HashSet::from(["tt0000009".to_string()]);
        let engine = SyncEngine::new(&store, &fetcher, &urls, &excluded);

        let header = row(&["full_name", "person_id"]);
        // show fetch fails: nothing is served
        let failing = row(&["A", "nm1", "", "Grip", "", "", "Show", "tt0000001", "1", "TV Series", "[]"]);
        let excluded_row = row(&["B", "nm2", "", "Grip", "", "", "Other", "tt0000009", "", "TV Series", "[]"]);
        let summary = add_worked_on(&engine, &[header, failing, excluded_row], 1).await.unwrap();
        assert_eq!(summary, RunSummary { processed: 0, skipped: 2, failed: 1 });
    }

    #[tokio::test]
    async fn extraction_writes_header_for_empty_pages() {
        let store = seeded_store().await;
        let urls = urls();
        let fetcher = FakeFetcher::default()
            .with_page(urls.person("nm1"), "<html><body></body></html>");
        let input = temp_path("crew.csv");

        let rows = vec![row(&["external_person_id", "full_name"]), row(&["nm1", "Jane"]), row(&["nm2", "Gone"])];
        let (out, summary) = extract_credits(&store, &fetcher, &urls, &input, &rows, 1).await.unwrap();
        assert_eq!(summary, RunSummary { processed: 1, skipped: 1, failed: 1 });

        let written = std::fs::read_to_string(&out).unwrap();
        let parsed = crate::csv::parse_rows(&written, SEP);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0][0], "name");
        std::fs::remove_file(out).unwrap();
    }
}
