pub mod episode;
pub mod episode_of;
pub mod genre;
pub mod has_genre;
pub mod person;
pub mod season;
pub mod season_of;
pub mod show;
pub mod worked_on;
pub mod worked_with;
