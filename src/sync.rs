//! Store synchronisation: decides per input whether the store already knows
//! enough, fetches the show when it does not, and writes idempotently.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info, warn};

use crate::{
    error::AppResult,
    fetcher::PageFetcher,
    models::{
        Person, Provenance, Season, SeasonKey, Show, StoredSeason, TargetKind, WorkedOnTarget,
        YearRange,
    },
    pages::{SourceUrls, episodes::fetch_listing, title::fetch_show_genres},
    seasons::{aggregate_seasons, complete_episodes},
    store::GraphStore,
};

/// One person-season row.
#[derive(Clone, Debug)]
pub struct WorkedOnInput {
    pub person: Person,
    pub show: Show,
    pub season_number: Option<u16>,
    pub job_title: String,
    pub years: Option<YearRange>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SyncOutcome {
    Excluded,
    /// Linked to the show and to `seasons` of its seasons.
    Linked { seasons: usize, fetched: bool },
}

pub struct SyncEngine<'a, S, F> {
    store: &'a S,
    fetcher: &'a F,
    urls: &'a SourceUrls,
    excluded: &'a HashSet<String>,
}

impl<'a, S, F> SyncEngine<'a, S, F>
where
    S: GraphStore,
    F: PageFetcher,
{
    pub fn new(
        store: &'a S,
        fetcher: &'a F,
        urls: &'a SourceUrls,
        excluded: &'a HashSet<String>,
    ) -> Self {
        Self { store, fetcher, urls, excluded }
    }

    pub async fn sync_worked_on(&self, input: &WorkedOnInput) -> AppResult<SyncOutcome> {
        let show_id = input.show.external_id.as_str();
        if self.excluded.contains(show_id) {
            debug!(show_id = %show_id, "show is excluded, skipping");
            return Ok(SyncOutcome::Excluded);
        }

        self.store.upsert_person(&input.person).await?;

        let mut fetched = false;
        let (provenance, seasons) = match (input.season_number, input.years) {
            (Some(number), _) => {
                let key = SeasonKey::new(show_id, number);
                if self.store.find_season(&key).await?.is_none() {
                    self.fetch_show(&input.show).await?;
                    fetched = true;
                }
                match self.store.find_season(&key).await? {
                    Some(season) => (Provenance::Exact, vec![season]),
                    None => {
                        warn!(season_id = %key, "season not found at source");
                        (Provenance::Exact, Vec::new())
                    },
                }
            },
            (None, Some(years)) => {
                let (mut covering, mut complete) = self.coverage(show_id, years).await?;
                if !complete {
                    debug!(show_id = %show_id, first = years.first, last = years.last, "stored seasons do not cover years");
                    self.fetch_show(&input.show).await?;
                    fetched = true;
                    (covering, complete) = self.coverage(show_id, years).await?;
                    if !complete {
                        warn!(show_id = %show_id, seasons = covering.len(), "years only partly covered after fetch");
                    }
                }
                (Provenance::Inferred, covering)
            },
            (None, None) => {
                if !self.store.show_exists(show_id).await? {
                    self.fetch_show(&input.show).await?;
                    fetched = true;
                }
                (Provenance::Inferred, Vec::new())
            },
        };

        let person_id = input.person.external_id.as_str();
        for season in &seasons {
            let target = WorkedOnTarget { kind: TargetKind::Season, id: season.key.to_string() };
            self.store.upsert_worked_on(person_id, &target, &input.job_title, provenance).await?;
        }

        self.store.upsert_show(&input.show, provenance).await?;
        let target = WorkedOnTarget { kind: TargetKind::Show, id: show_id.to_string() };
        self.store.upsert_worked_on(person_id, &target, &input.job_title, provenance).await?;

        Ok(SyncOutcome::Linked { seasons: seasons.len(), fetched })
    }

    /// Stored seasons of the show that overlap `years`, and whether together
    /// they account for every year of it.
    async fn coverage(&self, show_id: &str, years: YearRange) -> AppResult<(Vec<StoredSeason>, bool)> {
        let required: BTreeSet<i16> = years.years().collect();
        let mut covered = BTreeSet::new();
        let mut seasons = Vec::new();

        for season in self.store.seasons_of_show(show_id).await? {
            let Some(range) = season.years() else {
                continue;
            };
            let overlap: Vec<i16> = range.years().filter(|y| required.contains(y)).collect();
            if overlap.is_empty() {
                continue;
            }
            covered.extend(overlap);
            seasons.push(season);
        }

        let complete = !seasons.is_empty() && covered.is_superset(&required);
        Ok((seasons, complete))
    }

    /// Reads the whole episode listing of a show and stores the show, its
    /// seasons and every complete episode.
    pub async fn fetch_show(&self, show: &Show) -> AppResult<Vec<Season>> {
        let show_id = show.external_id.as_str();
        info!(show_id = %show_id, title = %show.title, "fetching show from source");

        let drafts = fetch_listing(self.fetcher, self.urls, show_id).await?;
        let listed = drafts.len();
        let episodes = complete_episodes(drafts);
        let seasons = aggregate_seasons(show_id, &show.title, episodes.clone(), false);

        let mut stored_show = show.clone();
        if stored_show.genres.is_empty() {
            stored_show.genres = fetch_show_genres(self.fetcher, self.urls, show_id).await?;
        }
        self.store.upsert_show(&stored_show, Provenance::Exact).await?;

        for season in &seasons {
            debug!(season_id = %season.key, episodes = season.episode_ids.len(), "storing season");
            self.store.upsert_season(season, Provenance::Exact).await?;
        }
        for episode in &episodes {
            self.store.upsert_episode(episode).await?;
        }

        info!(
            show_id = %show_id,
            listed = listed,
            episodes = episodes.len(),
            seasons = seasons.len(),
            "show stored"
        );
        Ok(seasons)
    }
}
