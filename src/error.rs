use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
  #[error("No data source configured: supply records, a pull source or a url.")]
  MissingSource,
  #[error("Invalid url template: {0}")]
  InvalidUrlTemplate(String),
  #[error("Source request failed: {0}")]
  Source(String),
  #[error("Listener failed: {0}")]
  Listener(String),
  #[error("Invalid coordinate: {lat}, {lon}")]
  InvalidCoordinate { lat: f64, lon: f64 },
  #[error("Failed to move map: {0}")]
  Locate(String),
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
