use thiserror::Error;

/// Transport-level failure fetching a remote page or image.
///
/// None of these surface to the user: the session logs them and keeps
/// the last good state.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("response body is not valid text")]
    NotText,
}

/// Failure extracting strip metadata from page markup.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("comic item container not found in page markup")]
    ContainerNotFound,
    #[error("comic container carries no id attribute")]
    MissingId,
}
