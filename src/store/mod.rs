//! The graph store capability: merge-on-key node and relationship writes
//! plus the handful of pattern reads the sync engine needs.

mod sql;

pub use sql::SqlGraphStore;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        Episode, EpisodeDraft, Genre, Person, Provenance, Season, SeasonKey, Show, StoredSeason,
        WorkedOnTarget, WorkedWith,
    },
};

#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn upsert_genre(&self, genre: Genre) -> AppResult<()>;

    /// Creates the person, or back-fills the name when the stored one is empty.
    async fn upsert_person(&self, person: &Person) -> AppResult<()>;

    /// Creates the show and adds any genres it does not have yet.
    async fn upsert_show(&self, show: &Show, source: Provenance) -> AppResult<()>;

    /// Creates the season with its SEASON_OF edge, or widens the stored date
    /// range to cover `season`. Links already stored member episodes.
    async fn upsert_season(&self, season: &Season, source: Provenance) -> AppResult<()>;

    /// Creates the episode with its genres, plus EPISODE_OF when the season
    /// exists.
    async fn upsert_episode(&self, episode: &Episode) -> AppResult<()>;

    /// Returns `true` when a new edge was created.
    async fn upsert_worked_on(
        &self,
        person_id: &str,
        target: &WorkedOnTarget,
        job_title: &str,
        source: Provenance,
    ) -> AppResult<bool>;

    /// Returns `true` when the pair was written. Existing pairs are only
    /// rewritten with `overwrite`.
    async fn upsert_worked_with(&self, link: &WorkedWith, overwrite: bool) -> AppResult<bool>;

    async fn show_exists(&self, show_id: &str) -> AppResult<bool>;

    async fn find_season(&self, key: &SeasonKey) -> AppResult<Option<StoredSeason>>;

    async fn seasons_of_show(&self, show_id: &str) -> AppResult<Vec<StoredSeason>>;

    async fn find_episode(&self, episode_id: &str) -> AppResult<Option<EpisodeDraft>>;

    async fn people(&self) -> AppResult<Vec<Person>>;

    /// Every (other person, season) pair where both people worked on the
    /// season. Never includes `person_id` itself.
    async fn shared_seasons(&self, person_id: &str) -> AppResult<Vec<(String, StoredSeason)>>;

    async fn worked_with_exists(&self, a: &str, b: &str) -> AppResult<bool>;
}
