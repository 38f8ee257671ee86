use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use jiff::civil::Date;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::OnConflict,
};
use tracing::debug;

use super::GraphStore;
use crate::{
    dates, db,
    entities::{
        episode, episode_of, genre, has_genre, person, season, season_of, show, worked_on,
        worked_with,
    },
    error::AppResult,
    models::{
        Episode, EpisodeDraft, Genre, Person, Provenance, Season, SeasonKey, Show, StoredSeason,
        TargetKind, WorkedOnTarget, WorkedWith,
    },
};

const OWNER_SHOW: &str = "show";
const OWNER_SEASON: &str = "season";
const OWNER_EPISODE: &str = "episode";

/// [`GraphStore`] over a relational database: one table per node label and
/// per relationship type, with unique indexes on the identity columns.
#[derive(Clone)]
pub struct SqlGraphStore {
    db: DatabaseConnection,
}

impl SqlGraphStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn open(database_url: &str) -> AppResult<Self> {
        Ok(Self::new(db::connect_and_migrate(database_url).await?))
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

fn parse_stored_date(raw: Option<&str>) -> Option<Date> {
    raw.and_then(|s| s.parse().ok())
}

fn to_stored_season(model: season::Model) -> StoredSeason {
    StoredSeason {
        key: SeasonKey::new(model.show_id, model.season_number as u16),
        title: model.title,
        rough_start: parse_stored_date(model.rough_start.as_deref()),
        rough_end: parse_stored_date(model.rough_end.as_deref()),
    }
}

fn widen(stored: Option<Date>, new: Option<Date>, pick: fn(Date, Date) -> Date) -> Option<Date> {
    match (stored, new) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => a.or(b),
    }
}

/// Links `owner` to each genre that exists as a node. Genre nodes are only
/// ever created by seeding.
async fn link_genres<C: ConnectionTrait>(
    conn: &C,
    owner_kind: &str,
    owner_id: &str,
    genres: impl IntoIterator<Item = &Genre>,
) -> Result<(), DbErr> {
    for g in genres {
        if genre::Entity::find_by_id(g.as_str().to_string()).one(conn).await?.is_none() {
            debug!(genre = %g, owner_id = %owner_id, "genre not seeded, skipping link");
            continue;
        }
        let model = has_genre::ActiveModel {
            id: Default::default(),
            owner_kind: Set(owner_kind.to_string()),
            owner_id: Set(owner_id.to_string()),
            genre: Set(g.as_str().to_string()),
        };
        has_genre::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    has_genre::Column::OwnerKind,
                    has_genre::Column::OwnerId,
                    has_genre::Column::Genre,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
    }
    Ok(())
}

/// Stretches a stored season's rough range to cover `start..=end`. The range
/// never shrinks.
async fn widen_season_range<C: ConnectionTrait>(
    conn: &C,
    existing: season::Model,
    start: Option<Date>,
    end: Option<Date>,
) -> Result<(), DbErr> {
    let stored_start = parse_stored_date(existing.rough_start.as_deref());
    let stored_end = parse_stored_date(existing.rough_end.as_deref());
    let start = widen(stored_start, start, std::cmp::min);
    let end = widen(stored_end, end, std::cmp::max);
    if start == stored_start && end == stored_end {
        return Ok(());
    }

    debug!(season_id = %existing.season_id, start = ?start, end = ?end, "widening season range");
    let mut active: season::ActiveModel = existing.into();
    active.rough_start = Set(start.map(|d| d.to_string()));
    active.rough_end = Set(end.map(|d| d.to_string()));
    active.update(conn).await?;
    Ok(())
}

async fn link_episode_to_season<C: ConnectionTrait>(
    conn: &C,
    episode_id: &str,
    season_id: &str,
) -> Result<(), DbErr> {
    let model = episode_of::ActiveModel {
        id: Default::default(),
        episode_id: Set(episode_id.to_string()),
        season_id: Set(season_id.to_string()),
    };
    episode_of::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([episode_of::Column::EpisodeId, episode_of::Column::SeasonId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl GraphStore for SqlGraphStore {
    async fn upsert_genre(&self, genre: Genre) -> AppResult<()> {
        let model = genre::ActiveModel { name: Set(genre.as_str().to_string()) };
        genre::Entity::insert(model)
            .on_conflict(OnConflict::column(genre::Column::Name).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn upsert_person(&self, person: &Person) -> AppResult<()> {
        let txn = self.db.begin().await?;

        match person::Entity::find_by_id(person.external_id.clone()).one(&txn).await? {
            Some(existing) => {
                if existing.full_name.trim().is_empty() && !person.full_name.trim().is_empty() {
                    debug!(person_id = %person.external_id, "back-filling person name");
                    let mut active: person::ActiveModel = existing.into();
                    active.full_name = Set(person.full_name.clone());
                    active.update(&txn).await?;
                }
            },
            None => {
                let model = person::ActiveModel {
                    external_id: Set(person.external_id.clone()),
                    full_name: Set(person.full_name.clone()),
                    created_at: Set(now_sec()),
                };
                person::Entity::insert(model).exec_without_returning(&txn).await?;
            },
        }

        txn.commit().await?;
        Ok(())
    }

    async fn upsert_show(&self, show: &Show, source: Provenance) -> AppResult<()> {
        let txn = self.db.begin().await?;

        match show::Entity::find_by_id(show.external_id.clone()).one(&txn).await? {
            Some(existing) => {
                if existing.title.trim().is_empty() && !show.title.trim().is_empty() {
                    let mut active: show::ActiveModel = existing.into();
                    active.title = Set(show.title.clone());
                    active.update(&txn).await?;
                }
            },
            None => {
                let model = show::ActiveModel {
                    external_id: Set(show.external_id.clone()),
                    title: Set(show.title.clone()),
                    source: Set(source.as_str().to_string()),
                    created_at: Set(now_sec()),
                };
                show::Entity::insert(model).exec_without_returning(&txn).await?;
            },
        }
        link_genres(&txn, OWNER_SHOW, &show.external_id, &show.genres).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn upsert_season(&self, s: &Season, source: Provenance) -> AppResult<()> {
        let season_id = s.key.to_string();
        let txn = self.db.begin().await?;

        match season::Entity::find_by_id(season_id.clone()).one(&txn).await? {
            Some(existing) => {
                widen_season_range(&txn, existing, s.rough_start(), s.rough_end()).await?;
            },
            None => {
                let model = season::ActiveModel {
                    season_id: Set(season_id.clone()),
                    show_id: Set(s.key.show_id.clone()),
                    season_number: Set(i32::from(s.key.number)),
                    title: Set(s.title.clone()),
                    rough_start: Set(s.rough_start().map(|d| d.to_string())),
                    rough_end: Set(s.rough_end().map(|d| d.to_string())),
                    source: Set(source.as_str().to_string()),
                    created_at: Set(now_sec()),
                };
                season::Entity::insert(model).exec_without_returning(&txn).await?;
            },
        }

        let edge = season_of::ActiveModel {
            id: Default::default(),
            season_id: Set(season_id.clone()),
            show_id: Set(s.key.show_id.clone()),
        };
        season_of::Entity::insert(edge)
            .on_conflict(
                OnConflict::columns([season_of::Column::SeasonId, season_of::Column::ShowId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        link_genres(&txn, OWNER_SEASON, &season_id, &s.genres).await?;

        let members = episode::Entity::find()
            .filter(episode::Column::SeasonId.eq(season_id.clone()))
            .all(&txn)
            .await?;
        for member in members {
            link_episode_to_season(&txn, &member.external_id, &season_id).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn upsert_episode(&self, ep: &Episode) -> AppResult<()> {
        let season_id = ep.season_key().to_string();
        let txn = self.db.begin().await?;

        match episode::Entity::find_by_id(ep.external_id.clone()).one(&txn).await? {
            Some(existing) => {
                if existing.title.trim().is_empty() && !ep.title.trim().is_empty() {
                    let mut active: episode::ActiveModel = existing.into();
                    active.title = Set(ep.title.clone());
                    active.update(&txn).await?;
                }
            },
            None => {
                let model = episode::ActiveModel {
                    external_id: Set(ep.external_id.clone()),
                    show_id: Set(ep.show_id.clone()),
                    season_id: Set(season_id.clone()),
                    season_number: Set(i32::from(ep.season_number)),
                    episode_number: Set(i32::from(ep.episode_number)),
                    air_date: Set(ep.air_date.to_string()),
                    title: Set(ep.title.clone()),
                    created_at: Set(now_sec()),
                };
                episode::Entity::insert(model).exec_without_returning(&txn).await?;
            },
        }

        link_genres(&txn, OWNER_EPISODE, &ep.external_id, &ep.genres).await?;

        if let Some(existing) = season::Entity::find_by_id(season_id.clone()).one(&txn).await? {
            let aired = ep.air_date;
            widen_season_range(&txn, existing, Some(dates::rough_start(aired)), Some(dates::rough_end(aired)))
                .await?;
            link_episode_to_season(&txn, &ep.external_id, &season_id).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn upsert_worked_on(
        &self,
        person_id: &str,
        target: &WorkedOnTarget,
        job_title: &str,
        source: Provenance,
    ) -> AppResult<bool> {
        let model = worked_on::ActiveModel {
            id: Default::default(),
            person_id: Set(person_id.to_string()),
            target_kind: Set(target.kind.as_str().to_string()),
            target_id: Set(target.id.clone()),
            job_title: Set(job_title.to_string()),
            source: Set(source.as_str().to_string()),
            created_at: Set(now_sec()),
        };
        let inserted = worked_on::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    worked_on::Column::PersonId,
                    worked_on::Column::TargetKind,
                    worked_on::Column::TargetId,
                    worked_on::Column::JobTitle,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(inserted > 0)
    }

    async fn upsert_worked_with(&self, link: &WorkedWith, overwrite: bool) -> AppResult<bool> {
        let (a, b) = if link.person_a <= link.person_b {
            (&link.person_a, &link.person_b)
        } else {
            (&link.person_b, &link.person_a)
        };
        let model = worked_with::ActiveModel {
            id: Default::default(),
            person_a: Set(a.clone()),
            person_b: Set(b.clone()),
            start_date: Set(link.start_date.to_string()),
            end_date: Set(link.end_date.to_string()),
            shared_season_count: Set(link.shared_season_count as i32),
            season_labels: Set(serde_json::to_string(&link.season_labels)?),
            created_at: Set(now_sec()),
        };

        let mut on_conflict =
            OnConflict::columns([worked_with::Column::PersonA, worked_with::Column::PersonB]);
        if overwrite {
            on_conflict.update_columns([
                worked_with::Column::StartDate,
                worked_with::Column::EndDate,
                worked_with::Column::SharedSeasonCount,
                worked_with::Column::SeasonLabels,
            ]);
        } else {
            on_conflict.do_nothing();
        }

        let written = worked_with::Entity::insert(model)
            .on_conflict(on_conflict.to_owned())
            .exec_without_returning(&self.db)
            .await?;
        Ok(written > 0)
    }

    async fn show_exists(&self, show_id: &str) -> AppResult<bool> {
        Ok(show::Entity::find_by_id(show_id.to_string()).one(&self.db).await?.is_some())
    }

    async fn find_season(&self, key: &SeasonKey) -> AppResult<Option<StoredSeason>> {
        let found = season::Entity::find_by_id(key.to_string()).one(&self.db).await?;
        Ok(found.map(to_stored_season))
    }

    async fn seasons_of_show(&self, show_id: &str) -> AppResult<Vec<StoredSeason>> {
        let rows = season::Entity::find()
            .filter(season::Column::ShowId.eq(show_id))
            .order_by_asc(season::Column::SeasonNumber)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(to_stored_season).collect())
    }

    async fn find_episode(&self, episode_id: &str) -> AppResult<Option<EpisodeDraft>> {
        let Some(row) = episode::Entity::find_by_id(episode_id.to_string()).one(&self.db).await?
        else {
            return Ok(None);
        };

        let genres = has_genre::Entity::find()
            .filter(has_genre::Column::OwnerKind.eq(OWNER_EPISODE))
            .filter(has_genre::Column::OwnerId.eq(episode_id))
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|g| Genre::from_name(&g.genre))
            .collect();

        let mut draft = EpisodeDraft::new(row.external_id, row.show_id);
        draft.season_number = u16::try_from(row.season_number).ok();
        draft.episode_number = u16::try_from(row.episode_number).ok();
        draft.air_date = row.air_date.parse().ok();
        draft.title = Some(row.title).filter(|t| !t.is_empty());
        draft.genres = genres;
        Ok(Some(draft))
    }

    async fn people(&self) -> AppResult<Vec<Person>> {
        let rows = person::Entity::find()
            .order_by_asc(person::Column::ExternalId)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|p| Person { external_id: p.external_id, full_name: p.full_name })
            .collect())
    }

    async fn shared_seasons(&self, person_id: &str) -> AppResult<Vec<(String, StoredSeason)>> {
        let season_kind = TargetKind::Season.as_str();

        let mine: Vec<String> = worked_on::Entity::find()
            .filter(worked_on::Column::PersonId.eq(person_id))
            .filter(worked_on::Column::TargetKind.eq(season_kind))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.target_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if mine.is_empty() {
            return Ok(Vec::new());
        }

        let others = worked_on::Entity::find()
            .filter(worked_on::Column::TargetKind.eq(season_kind))
            .filter(worked_on::Column::TargetId.is_in(mine.clone()))
            .filter(worked_on::Column::PersonId.ne(person_id))
            .order_by_asc(worked_on::Column::PersonId)
            .all(&self.db)
            .await?;

        let seasons: HashMap<String, StoredSeason> = season::Entity::find()
            .filter(season::Column::SeasonId.is_in(mine))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| (row.season_id.clone(), to_stored_season(row)))
            .collect();

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in others {
            let Some(s) = seasons.get(&row.target_id) else {
                continue;
            };
            if seen.insert((row.person_id.clone(), row.target_id.clone())) {
                out.push((row.person_id, s.clone()));
            }
        }
        Ok(out)
    }

    async fn worked_with_exists(&self, a: &str, b: &str) -> AppResult<bool> {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        let found = worked_with::Entity::find()
            .filter(worked_with::Column::PersonA.eq(a))
            .filter(worked_with::Column::PersonB.eq(b))
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use jiff::civil::date;

    use super::*;
    use crate::testing::seeded_store as store;

    fn episode(id: &str, season: u16, air: Date) -> Episode {
        Episode {
            external_id: id.to_string(),
            show_id: "tt0000001".to_string(),
            season_number: season,
            episode_number: 1,
            air_date: air,
            title: "Pilot".to_string(),
            genres: BTreeSet::from([Genre::Drama]),
            credited_job: None,
        }
    }

    #[tokio::test]
    async fn person_name_is_back_filled_only_when_empty() {
        let store = store().await;
        let blank = Person { external_id: "nm0000001".to_string(), full_name: String::new() };
        store.upsert_person(&blank).await.unwrap();

        let named = Person { full_name: "Jane Doe".to_string(), ..blank.clone() };
        store.upsert_person(&named).await.unwrap();
        let renamed = Person { full_name: "Someone Else".to_string(), ..blank };
        store.upsert_person(&renamed).await.unwrap();

        let people = store.people().await.unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].full_name, "Jane Doe");
    }

    #[tokio::test]
    async fn episode_round_trips_through_store() {
        let store = store().await;
        store.upsert_episode(&episode("tt0000011", 1, date(2019, 4, 2))).await.unwrap();

        let draft = store.find_episode("tt0000011").await.unwrap().unwrap();
        assert_eq!(draft.season_number, Some(1));
        assert_eq!(draft.air_date, Some(date(2019, 4, 2)));
        assert!(draft.genres.contains(&Genre::Drama));
        assert!(store.find_episode("tt0000099").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn season_links_episodes_stored_before_it() {
        let store = store().await;
        let ep = episode("tt0000011", 1, date(2019, 4, 2));
        store.upsert_episode(&ep).await.unwrap();
        assert!(episode_of::Entity::find().all(store.db()).await.unwrap().is_empty());

        let mut s = Season::new(SeasonKey::new("tt0000001", 1), "Show");
        s.first_air_date = Some(ep.air_date);
        s.last_air_date = Some(ep.air_date);
        store.upsert_season(&s, Provenance::Exact).await.unwrap();

        let edges = episode_of::Entity::find().all(store.db()).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].season_id, "tt0000001S1");
    }

    #[tokio::test]
    async fn season_range_only_widens() {
        let store = store().await;
        let key = SeasonKey::new("tt0000001", 1);

        let mut s = Season::new(key.clone(), "Show");
        s.first_air_date = Some(date(2018, 5, 1));
        s.last_air_date = Some(date(2018, 6, 1));
        store.upsert_season(&s, Provenance::Exact).await.unwrap();

        s.first_air_date = Some(date(2018, 9, 1));
        s.last_air_date = Some(date(2019, 2, 1));
        store.upsert_season(&s, Provenance::Exact).await.unwrap();

        let stored = store.find_season(&key).await.unwrap().unwrap();
        assert_eq!(stored.rough_start, Some(date(2018, 1, 1)));
        assert_eq!(stored.rough_end, Some(date(2019, 12, 31)));
        assert_eq!(store.seasons_of_show("tt0000001").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn later_episode_widens_stored_season() {
        let store = store().await;
        let key = SeasonKey::new("tt0000001", 1);

        let mut s = Season::new(key.clone(), "Show");
        s.first_air_date = Some(date(2015, 3, 1));
        s.last_air_date = Some(date(2015, 6, 1));
        store.upsert_season(&s, Provenance::Exact).await.unwrap();

        store.upsert_episode(&episode("tt0000012", 1, date(2016, 2, 1))).await.unwrap();

        let stored = store.find_season(&key).await.unwrap().unwrap();
        assert_eq!(stored.rough_start, Some(date(2015, 1, 1)));
        assert_eq!(stored.rough_end, Some(date(2016, 12, 31)));
        assert_eq!(episode_of::Entity::find().all(store.db()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn worked_on_is_keyed_by_person_target_and_job() {
        let store = store().await;
        let target = WorkedOnTarget { kind: TargetKind::Show, id: "tt0000001".to_string() };

        assert!(store.upsert_worked_on("nm1", &target, "key grip", Provenance::Exact).await.unwrap());
        assert!(!store.upsert_worked_on("nm1", &target, "key grip", Provenance::Inferred).await.unwrap());
        assert!(store.upsert_worked_on("nm1", &target, "best boy electric", Provenance::Exact).await.unwrap());
    }

    #[tokio::test]
    async fn worked_with_pairs_are_unordered() {
        let store = store().await;
        let link = WorkedWith {
            person_a: "nm2".to_string(),
            person_b: "nm1".to_string(),
            start_date: date(2018, 1, 1),
            end_date: date(2019, 12, 31),
            shared_season_count: 2,
            season_labels: vec!["Show S2 (2019)".to_string(), "Show S1 (2018)".to_string()],
        };
        assert!(store.upsert_worked_with(&link, false).await.unwrap());
        assert!(store.worked_with_exists("nm1", "nm2").await.unwrap());
        assert!(store.worked_with_exists("nm2", "nm1").await.unwrap());

        let flipped = WorkedWith { person_a: "nm1".to_string(), person_b: "nm2".to_string(), ..link };
        assert!(!store.upsert_worked_with(&flipped, false).await.unwrap());
        assert!(store.upsert_worked_with(&flipped, true).await.unwrap());

        let rows = worked_with::Entity::find().all(store.db()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].person_a, "nm1");
    }
}
