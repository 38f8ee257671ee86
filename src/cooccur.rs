//! WORKED_WITH derivation from shared seasons.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::{
    error::AppResult,
    models::{StoredSeason, WorkedWith},
    store::GraphStore,
};

const MAX_LABELS: usize = 5;

/// Summarises the seasons two people share. Returns `None` when no start or
/// no end date can be resolved.
pub fn summarize(a: &str, b: &str, shared: &[StoredSeason]) -> Option<WorkedWith> {
    let mut seasons: Vec<&StoredSeason> = Vec::new();
    for season in shared {
        if !seasons.iter().any(|s| s.key == season.key) {
            seasons.push(season);
        }
    }
    if seasons.is_empty() {
        return None;
    }

    let start_date = seasons.iter().filter_map(|s| s.rough_start).min()?;
    let end_date = seasons.iter().filter_map(|s| s.rough_end).max()?;

    // newest first, ties broken by key so both directions agree
    let mut dated: Vec<&StoredSeason> = seasons.iter().copied().filter(|s| s.rough_start.is_some()).collect();
    dated.sort_by(|x, y| y.rough_start.cmp(&x.rough_start).then_with(|| x.key.cmp(&y.key)));
    let season_labels = dated
        .iter()
        .filter_map(|s| s.rough_start.map(|d| format!("{} ({})", s.title, d.year())))
        .take(MAX_LABELS)
        .collect();

    let (person_a, person_b) = if a <= b { (a, b) } else { (b, a) };
    Some(WorkedWith {
        person_a: person_a.to_string(),
        person_b: person_b.to_string(),
        start_date,
        end_date,
        shared_season_count: seasons.len() as u32,
        season_labels,
    })
}

/// Links `person_id` to everyone sharing a season with them. Already linked
/// pairs are skipped unless `refresh` is set. Returns the links written.
pub async fn derive_for_person<S: GraphStore>(
    store: &S,
    person_id: &str,
    refresh: bool,
) -> AppResult<Vec<WorkedWith>> {
    let mut by_partner: BTreeMap<String, Vec<StoredSeason>> = BTreeMap::new();
    for (partner, season) in store.shared_seasons(person_id).await? {
        by_partner.entry(partner).or_default().push(season);
    }

    let mut written = Vec::new();
    for (partner, seasons) in by_partner {
        if !refresh && store.worked_with_exists(person_id, &partner).await? {
            continue;
        }
        let Some(link) = summarize(person_id, &partner, &seasons) else {
            debug!(person_id = %person_id, partner = %partner, "shared seasons have no dates");
            continue;
        };
        if store.upsert_worked_with(&link, refresh).await? {
            written.push(link);
        }
    }
    Ok(written)
}

/// Runs [`derive_for_person`] for every stored person.
pub async fn derive_all<S: GraphStore>(store: &S, refresh: bool) -> AppResult<usize> {
    let people = store.people().await?;
    let names: HashMap<&str, &str> =
        people.iter().map(|p| (p.external_id.as_str(), p.full_name.as_str())).collect();

    let mut total = 0;
    for person in &people {
        if person.external_id.is_empty() {
            continue;
        }
        let links = derive_for_person(store, &person.external_id, refresh).await?;
        if links.is_empty() {
            debug!(person = %person.full_name, "no new worked-with links");
        }
        for link in &links {
            info!(
                a = names.get(link.person_a.as_str()).copied().unwrap_or(link.person_a.as_str()),
                b = names.get(link.person_b.as_str()).copied().unwrap_or(link.person_b.as_str()),
                start = %link.start_date,
                end = %link.end_date,
                seasons = link.shared_season_count,
                "linked"
            );
        }
        total += links.len();
    }
    Ok(total)
}
