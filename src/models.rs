use std::{collections::BTreeSet, fmt};

use jiff::civil::Date;

use crate::dates;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Genre {
    Comedy,
    Mystery,
    RealityTv,
    Documentary,
    Biography,
    History,
    TalkShow,
    Drama,
    Music,
    GameShow,
    Sport,
    Crime,
    Adventure,
    Family,
    Thriller,
    Romance,
    Action,
    Western,
    SciFi,
    Horror,
    Musical,
    War,
    News,
    Short,
    Fantasy,
    Animation,
    Adult,
    FilmNoir,
}

impl Genre {
    pub const ALL: [Genre; 28] = [
        Genre::Comedy,
        Genre::Mystery,
        Genre::RealityTv,
        Genre::Documentary,
        Genre::Biography,
        Genre::History,
        Genre::TalkShow,
        Genre::Drama,
        Genre::Music,
        Genre::GameShow,
        Genre::Sport,
        Genre::Crime,
        Genre::Adventure,
        Genre::Family,
        Genre::Thriller,
        Genre::Romance,
        Genre::Action,
        Genre::Western,
        Genre::SciFi,
        Genre::Horror,
        Genre::Musical,
        Genre::War,
        Genre::News,
        Genre::Short,
        Genre::Fantasy,
        Genre::Animation,
        Genre::Adult,
        Genre::FilmNoir,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Comedy => "Comedy",
            Genre::Mystery => "Mystery",
            Genre::RealityTv => "Reality-TV",
            Genre::Documentary => "Documentary",
            Genre::Biography => "Biography",
            Genre::History => "History",
            Genre::TalkShow => "Talk-Show",
            Genre::Drama => "Drama",
            Genre::Music => "Music",
            Genre::GameShow => "Game-Show",
            Genre::Sport => "Sport",
            Genre::Crime => "Crime",
            Genre::Adventure => "Adventure",
            Genre::Family => "Family",
            Genre::Thriller => "Thriller",
            Genre::Romance => "Romance",
            Genre::Action => "Action",
            Genre::Western => "Western",
            Genre::SciFi => "Sci-Fi",
            Genre::Horror => "Horror",
            Genre::Musical => "Musical",
            Genre::War => "War",
            Genre::News => "News",
            Genre::Short => "Short",
            Genre::Fantasy => "Fantasy",
            Genre::Animation => "Animation",
            Genre::Adult => "Adult",
            Genre::FilmNoir => "Film Noir",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|g| g.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps free-text genre names onto the fixed vocabulary, dropping the rest.
pub fn genres_from_names<S: AsRef<str>>(names: &[S]) -> BTreeSet<Genre> {
    names
        .iter()
        .filter_map(|n| {
            let genre = Genre::from_name(n.as_ref());
            if genre.is_none() {
                tracing::debug!(genre = %n.as_ref(), "ignoring genre outside vocabulary");
            }
            genre
        })
        .collect()
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ShowType {
    FeatureFilm,
    TvSeries,
    TvMiniSeries,
    TvMovie,
    TvSpecial,
    TvShort,
    Documentary,
    Short,
    Video,
    VideoGame,
    /// A label outside the known vocabulary, kept verbatim.
    Other(String),
}

impl ShowType {
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().trim_matches(|c| c == '(' || c == ')').trim();
        match label.to_ascii_lowercase().as_str() {
            "" | "feature film" | "movie" => ShowType::FeatureFilm,
            "tv series" => ShowType::TvSeries,
            "tv mini series" | "tv mini-series" | "tv miniseries" => ShowType::TvMiniSeries,
            "tv movie" => ShowType::TvMovie,
            "tv special" => ShowType::TvSpecial,
            "tv short" => ShowType::TvShort,
            "documentary" => ShowType::Documentary,
            "short" => ShowType::Short,
            "video" => ShowType::Video,
            "video game" => ShowType::VideoGame,
            _ => ShowType::Other(label.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ShowType::FeatureFilm => "Feature Film",
            ShowType::TvSeries => "TV Series",
            ShowType::TvMiniSeries => "TV Mini Series",
            ShowType::TvMovie => "TV Movie",
            ShowType::TvSpecial => "TV Special",
            ShowType::TvShort => "TV Short",
            ShowType::Documentary => "Documentary",
            ShowType::Short => "Short",
            ShowType::Video => "Video",
            ShowType::VideoGame => "Video Game",
            ShowType::Other(label) => label,
        }
    }

    /// Episodic television, the only kind that has seasons.
    pub fn is_series(&self) -> bool {
        let label = self.as_str();
        label.contains("TV") && label.contains("Series")
    }
}

impl fmt::Display for ShowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Person {
    pub external_id: String,
    pub full_name: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Show {
    pub external_id: String,
    pub title: String,
    pub genres: BTreeSet<Genre>,
}

/// Identity of a season: the show it belongs to and its number.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SeasonKey {
    pub show_id: String,
    pub number: u16,
}

impl SeasonKey {
    pub fn new(show_id: impl Into<String>, number: u16) -> Self {
        Self { show_id: show_id.into(), number }
    }
}

impl fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}S{}", self.show_id, self.number)
    }
}

/// Inclusive range of active years, as printed next to a credit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct YearRange {
    pub first: i16,
    pub last: i16,
}

impl YearRange {
    pub fn new(first: i16, last: i16) -> Self {
        if first <= last { Self { first, last } } else { Self { first: last, last: first } }
    }

    pub fn years(&self) -> impl Iterator<Item = i16> {
        self.first..=self.last
    }
}

/// A complete episode. Only built through [`EpisodeDraft::build`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Episode {
    pub external_id: String,
    pub show_id: String,
    pub season_number: u16,
    pub episode_number: u16,
    pub air_date: Date,
    pub title: String,
    pub genres: BTreeSet<Genre>,
    /// Job credited on this particular episode, if the credit said so.
    pub credited_job: Option<String>,
}

impl Episode {
    pub fn season_key(&self) -> SeasonKey {
        SeasonKey::new(self.show_id.clone(), self.season_number)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MissingField {
    SeasonNumber,
    EpisodeNumber,
    AirDate,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissingField::SeasonNumber => "season number",
            MissingField::EpisodeNumber => "episode number",
            MissingField::AirDate => "air date",
        })
    }
}

/// An episode whose fields are filled in from several places. It becomes an
/// [`Episode`] only once season number, episode number and air date are all
/// known.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EpisodeDraft {
    pub external_id: String,
    pub show_id: String,
    pub season_number: Option<u16>,
    pub episode_number: Option<u16>,
    pub air_date: Option<Date>,
    pub title: Option<String>,
    pub genres: BTreeSet<Genre>,
    pub credited_job: Option<String>,
}

impl EpisodeDraft {
    pub fn new(external_id: impl Into<String>, show_id: impl Into<String>) -> Self {
        Self { external_id: external_id.into(), show_id: show_id.into(), ..Default::default() }
    }

    /// Copies every field `other` knows that this draft does not.
    pub fn fill_from(&mut self, other: EpisodeDraft) {
        self.season_number = self.season_number.or(other.season_number);
        self.episode_number = self.episode_number.or(other.episode_number);
        self.air_date = self.air_date.or(other.air_date);
        if self.title.as_deref().is_none_or(str::is_empty) {
            self.title = other.title;
        }
        self.genres.extend(other.genres);
        if self.credited_job.is_none() {
            self.credited_job = other.credited_job;
        }
    }

    pub fn build(self) -> Result<Episode, MissingField> {
        let season_number = self.season_number.ok_or(MissingField::SeasonNumber)?;
        let episode_number = self.episode_number.ok_or(MissingField::EpisodeNumber)?;
        let air_date = self.air_date.ok_or(MissingField::AirDate)?;
        Ok(Episode {
            external_id: self.external_id,
            show_id: self.show_id,
            season_number,
            episode_number,
            air_date,
            title: self.title.unwrap_or_default(),
            genres: self.genres,
            credited_job: self.credited_job,
        })
    }
}

impl From<Episode> for EpisodeDraft {
    fn from(ep: Episode) -> Self {
        Self {
            external_id: ep.external_id,
            show_id: ep.show_id,
            season_number: Some(ep.season_number),
            episode_number: Some(ep.episode_number),
            air_date: Some(ep.air_date),
            title: Some(ep.title),
            genres: ep.genres,
            credited_job: ep.credited_job,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Season {
    pub key: SeasonKey,
    pub title: String,
    pub first_air_date: Option<Date>,
    pub last_air_date: Option<Date>,
    pub genres: BTreeSet<Genre>,
    pub job_titles: Vec<String>,
    /// External ids of member episodes, in the order they were added.
    pub episode_ids: Vec<String>,
}

impl Season {
    pub fn new(key: SeasonKey, show_title: &str) -> Self {
        let title = format!("{} S{}", show_title, key.number);
        Self {
            key,
            title,
            first_air_date: None,
            last_air_date: None,
            genres: BTreeSet::new(),
            job_titles: Vec::new(),
            episode_ids: Vec::new(),
        }
    }

    pub fn rough_start(&self) -> Option<Date> {
        self.first_air_date.map(dates::rough_start)
    }

    pub fn rough_end(&self) -> Option<Date> {
        self.last_air_date.map(dates::rough_end)
    }
}

/// A season as the store returns it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredSeason {
    pub key: SeasonKey,
    pub title: String,
    pub rough_start: Option<Date>,
    pub rough_end: Option<Date>,
}

impl StoredSeason {
    pub fn years(&self) -> Option<YearRange> {
        Some(YearRange::new(self.rough_start?.year(), self.rough_end?.year()))
    }
}

/// An episode referenced from a credit block, before it is resolved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EpisodeStub {
    pub external_id: String,
    pub job_title: Option<String>,
}

/// One person-to-title credit, as read from a person page.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credit {
    pub show_id: String,
    pub show_title: String,
    pub job_class: String,
    pub job_title: String,
    pub show_type: ShowType,
    pub years: Option<YearRange>,
    pub episodes: Vec<EpisodeStub>,
}

impl Credit {
    pub fn is_cinematographer(&self) -> bool {
        self.job_class.eq_ignore_ascii_case(CINEMATOGRAPHER)
    }
}

pub const CINEMATOGRAPHER: &str = "cinematographer";
pub const DIRECTOR_OF_PHOTOGRAPHY: &str = "director of photography";

/// Where a WORKED_ON edge came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Provenance {
    /// The input named the season explicitly.
    Exact,
    /// The season (or only the show) was worked out from years or existence.
    Inferred,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Exact => "exact",
            Provenance::Inferred => "inferred",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkedOnTarget {
    pub kind: TargetKind,
    pub id: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetKind {
    Show,
    Season,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Show => "show",
            TargetKind::Season => "season",
        }
    }
}

/// Summary of the seasons two people have in common.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkedWith {
    pub person_a: String,
    pub person_b: String,
    pub start_date: Date,
    pub end_date: Date,
    pub shared_season_count: u32,
    pub season_labels: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    #[test]
    fn draft_builds_only_when_complete() {
        let mut draft = EpisodeDraft::new("tt0000010", "tt0000001");
        draft.season_number = Some(1);
        assert_eq!(draft.clone().build(), Err(MissingField::EpisodeNumber));

        draft.episode_number = Some(3);
        assert_eq!(draft.clone().build(), Err(MissingField::AirDate));

        draft.air_date = Some(date(2019, 4, 2));
        let ep = draft.build().unwrap();
        assert_eq!(ep.season_key().to_string(), "tt0000001S1");
        assert_eq!(ep.title, "");
    }

    #[test]
    fn fill_from_keeps_known_fields() {
        let mut draft = EpisodeDraft::new("tt0000010", "tt0000001");
        draft.season_number = Some(2);
        draft.credited_job = Some("key grip".to_string());

        let mut other = EpisodeDraft::new("tt0000010", "tt0000001");
        other.season_number = Some(9);
        other.episode_number = Some(4);
        other.title = Some("Pilot".to_string());
        other.genres.insert(Genre::Drama);
        draft.fill_from(other);

        assert_eq!(draft.season_number, Some(2));
        assert_eq!(draft.episode_number, Some(4));
        assert_eq!(draft.title.as_deref(), Some("Pilot"));
        assert_eq!(draft.credited_job.as_deref(), Some("key grip"));
        assert!(draft.genres.contains(&Genre::Drama));
    }

    #[test]
    fn genre_vocabulary_is_closed() {
        assert_eq!(Genre::from_name("sci-fi"), Some(Genre::SciFi));
        assert_eq!(Genre::from_name("Film Noir"), Some(Genre::FilmNoir));
        let genres = genres_from_names(&["Drama", "Space Opera"]);
        assert_eq!(genres.into_iter().collect::<Vec<_>>(), vec![Genre::Drama]);
    }

    #[test]
    fn show_type_labels() {
        assert_eq!(ShowType::from_label("(TV Series)"), ShowType::TvSeries);
        assert!(ShowType::from_label("TV Mini Series").is_series());
        assert!(!ShowType::from_label("TV Movie").is_series());
        assert_eq!(ShowType::from_label("Podcast").as_str(), "Podcast");
    }

    #[test]
    fn stored_season_years_need_both_bounds() {
        let season = StoredSeason {
            key: SeasonKey::new("tt0000001", 1),
            title: "Show S1".to_string(),
            rough_start: Some(date(2015, 1, 1)),
            rough_end: None,
        };
        assert_eq!(season.years(), None);
    }
}
