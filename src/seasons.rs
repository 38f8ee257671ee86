//! Grouping of episodes into seasons.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::{
    error::AppResult,
    fetcher::PageFetcher,
    models::{DIRECTOR_OF_PHOTOGRAPHY, Episode, EpisodeDraft, EpisodeStub, Season, SeasonKey},
    normalize::normalize_job_titles,
    pages::{SourceUrls, title::fetch_episode},
    store::GraphStore,
};

/// Episodes of one show, owned in insertion order and indexed by external id,
/// with the seasons they fall into.
#[derive(Debug)]
pub struct ShowCatalog {
    show_id: String,
    show_title: String,
    episodes: Vec<Episode>,
    index: HashMap<String, usize>,
    seasons: BTreeMap<u16, Season>,
}

impl ShowCatalog {
    pub fn new(show_id: impl Into<String>, show_title: impl Into<String>) -> Self {
        Self {
            show_id: show_id.into(),
            show_title: show_title.into(),
            episodes: Vec::new(),
            index: HashMap::new(),
            seasons: BTreeMap::new(),
        }
    }

    /// Adds an episode to its season. Returns `false` for an episode already
    /// in the catalog or one that belongs to another show.
    pub fn insert(&mut self, episode: Episode) -> bool {
        if episode.show_id != self.show_id || self.index.contains_key(&episode.external_id) {
            return false;
        }

        let season = self.seasons.entry(episode.season_number).or_insert_with(|| {
            Season::new(SeasonKey::new(self.show_id.clone(), episode.season_number), &self.show_title)
        });
        season.first_air_date =
            Some(season.first_air_date.map_or(episode.air_date, |d| d.min(episode.air_date)));
        season.last_air_date =
            Some(season.last_air_date.map_or(episode.air_date, |d| d.max(episode.air_date)));
        season.genres.extend(episode.genres.iter().copied());
        if let Some(job) = &episode.credited_job {
            if !season.job_titles.contains(job) {
                season.job_titles.push(job.clone());
            }
        }
        season.episode_ids.push(episode.external_id.clone());

        self.index.insert(episode.external_id.clone(), self.episodes.len());
        self.episodes.push(episode);
        true
    }

    pub fn episode(&self, external_id: &str) -> Option<&Episode> {
        self.index.get(external_id).map(|&i| &self.episodes[i])
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    /// Normalises each season's job titles and returns the seasons in number
    /// order. Cinematographer credits default an empty list to director of
    /// photography.
    pub fn into_seasons(self, cinematographer: bool) -> Vec<Season> {
        self.seasons
            .into_values()
            .map(|mut season| {
                season.job_titles = normalize_job_titles(&season.job_titles);
                if season.job_titles.is_empty() && cinematographer {
                    season.job_titles.push(DIRECTOR_OF_PHOTOGRAPHY.to_string());
                }
                season
            })
            .collect()
    }
}

/// Builds the seasons for a set of complete episodes of one show.
pub fn aggregate_seasons(
    show_id: &str,
    show_title: &str,
    episodes: impl IntoIterator<Item = Episode>,
    cinematographer: bool,
) -> Vec<Season> {
    let mut catalog = ShowCatalog::new(show_id, show_title);
    for episode in episodes {
        catalog.insert(episode);
    }
    catalog.into_seasons(cinematographer)
}

/// Promotes drafts that have every mandatory field; the rest are logged and
/// dropped.
pub fn complete_episodes(drafts: impl IntoIterator<Item = EpisodeDraft>) -> Vec<Episode> {
    drafts
        .into_iter()
        .filter_map(|draft| {
            let id = draft.external_id.clone();
            match draft.build() {
                Ok(episode) => Some(episode),
                Err(missing) => {
                    debug!(episode_id = %id, missing = %missing, "discarding incomplete episode");
                    None
                },
            }
        })
        .collect()
}

/// Fills in the episodes a credit refers to, from the store when it already
/// has them and from the source otherwise. Newly fetched episodes are stored
/// once complete.
pub async fn resolve_episodes<S, F>(
    store: &S,
    fetcher: &F,
    urls: &SourceUrls,
    show_id: &str,
    stubs: &[EpisodeStub],
) -> AppResult<Vec<Episode>>
where
    S: GraphStore,
    F: PageFetcher,
{
    let mut out = Vec::new();
    for stub in stubs {
        let mut draft = EpisodeDraft::new(stub.external_id.clone(), show_id);
        draft.credited_job = stub.job_title.clone();

        let stored = store.find_episode(&stub.external_id).await?;
        let from_store = stored.is_some();
        match stored {
            Some(known) => {
                debug!(episode_id = %stub.external_id, "episode found in store");
                draft.fill_from(known);
            },
            None => {
                let fetched = fetch_episode(fetcher, urls, &stub.external_id, show_id).await?;
                draft.fill_from(fetched);
            },
        }

        let episode = match draft.build() {
            Ok(episode) => episode,
            Err(missing) => {
                debug!(episode_id = %stub.external_id, missing = %missing, "discarding incomplete episode");
                continue;
            },
        };

        if !from_store {
            store.upsert_episode(&episode).await?;
        }
        out.push(episode);
    }
    Ok(out)
}
