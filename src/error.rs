use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("fetch of {url} failed after {attempts} attempts")]
    TransientFetch { url: String, attempts: u32 },

    #[error(transparent)]
    Http(#[from] wreq::Error),

    #[error(transparent)]
    Store(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(anyhow::Error::new(err))
    }
}

impl From<jiff::Error> for AppError {
    fn from(err: jiff::Error) -> Self {
        Self::Other(anyhow::Error::new(err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
