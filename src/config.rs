use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs::home_dir;
use log::error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::search::matcher::{MatchPolicy, ResultLimit};

/// Where the location of a record is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyLoc {
  /// One field holding the whole location, e.g. `"loc"` or `"geo.position"`.
  Combined(String),
  /// Two fields `[lat, lon]`, e.g. `["lat", "lon"]`.
  Pair([String; 2]),
}

impl Default for PropertyLoc {
  fn default() -> Self {
    Self::Combined("loc".to_string())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleOptions {
  pub radius: f64,
  pub weight: f64,
  pub color: String,
  pub stroke: bool,
  pub fill: bool,
}

impl Default for CircleOptions {
  fn default() -> Self {
    Self {
      radius: 10.0,
      weight: 3.0,
      color: "#e03".to_string(),
      stroke: true,
      fill: false,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconOptions {
  pub url: Option<String>,
}

/// Feedback drawn on the map for a found location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerOptions {
  #[serde(
    deserialize_with = "deserialize_toggle",
    serialize_with = "serialize_toggle"
  )]
  pub icon: Option<IconOptions>,
  pub animate: bool,
  #[serde(
    deserialize_with = "deserialize_toggle",
    serialize_with = "serialize_toggle"
  )]
  pub circle: Option<CircleOptions>,
}

impl Default for MarkerOptions {
  fn default() -> Self {
    Self {
      icon: None,
      animate: true,
      circle: Some(CircleOptions::default()),
    }
  }
}

/// Options of a search control. Field names follow the JSON option names of the control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchOptions {
  /// Remote url template, `{s}` is replaced by the encoded query.
  pub url: Option<String>,
  /// Callback parameter name for callback-wrapped replies.
  pub jsonp_param: Option<String>,
  pub property_loc: PropertyLoc,
  pub property_name: String,
  /// Id of the element the control is attached to.
  pub container: Option<String>,
  pub zoom: Option<u8>,
  pub min_length: usize,
  pub initial: bool,
  #[serde(rename = "casesensitive")]
  pub case_sensitive: bool,
  pub auto_type: bool,
  /// Debounce window in milliseconds.
  pub delay_type: u64,
  /// `-1` unbounded, `0` no tips, `n` at most n tips.
  pub tooltip_limit: i64,
  pub tip_auto_submit: bool,
  pub first_tip_submit: bool,
  pub collapsed: bool,
  pub auto_collapse: bool,
  /// Alert and blur collapse delay in milliseconds.
  pub auto_collapse_time: u64,
  pub text_err: String,
  pub text_cancel: String,
  pub text_placeholder: String,
  pub hide_marker_on_collapse: bool,
  #[serde(
    deserialize_with = "deserialize_toggle",
    serialize_with = "serialize_toggle"
  )]
  pub marker: Option<MarkerOptions>,
}

impl Default for SearchOptions {
  fn default() -> Self {
    Self {
      url: None,
      jsonp_param: None,
      property_loc: PropertyLoc::default(),
      property_name: "title".to_string(),
      container: None,
      zoom: None,
      min_length: 1,
      initial: true,
      case_sensitive: false,
      auto_type: true,
      delay_type: 400,
      tooltip_limit: -1,
      tip_auto_submit: true,
      first_tip_submit: false,
      collapsed: true,
      auto_collapse: false,
      auto_collapse_time: 1200,
      text_err: "Location not found".to_string(),
      text_cancel: "Cancel".to_string(),
      text_placeholder: "Search".to_string(),
      hide_marker_on_collapse: false,
      marker: Some(MarkerOptions::default()),
    }
  }
}

impl SearchOptions {
  #[must_use]
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.delay_type)
  }

  #[must_use]
  pub fn collapse_delay(&self) -> Duration {
    Duration::from_millis(self.auto_collapse_time)
  }

  #[must_use]
  pub fn match_policy(&self) -> MatchPolicy {
    MatchPolicy {
      initial_only: self.initial,
      case_sensitive: self.case_sensitive,
      limit: ResultLimit::from(self.tooltip_limit),
    }
  }

  /// Reads options from a json file; missing fields keep their defaults.
  ///
  /// # Errors
  /// Fails if the file cannot be read or is not valid json.
  pub fn from_path(path: &Path) -> crate::error::Result<Self> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
  }
}

/// Reads a records file.
///
/// # Errors
/// Fails if the file cannot be read or is not valid json.
pub fn read_records(path: &Path) -> crate::error::Result<serde_json::Value> {
  Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Toggle<T> {
  Enabled(bool),
  Value(T),
}

/// Reads `false` as `None`, `true` as the default value and anything else as the value.
fn deserialize_toggle<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de> + Default,
{
  Ok(match Toggle::<T>::deserialize(deserializer)? {
    Toggle::Enabled(false) => None,
    Toggle::Enabled(true) => Some(T::default()),
    Toggle::Value(value) => Some(value),
  })
}

#[allow(clippy::ref_option)]
fn serialize_toggle<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
  S: Serializer,
  T: Serialize,
{
  match value {
    Some(value) => value.serialize(serializer),
    None => serializer.serialize_bool(false),
  }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
  pub config_path: Option<PathBuf>,
  /// Records file used when no source is given on the command line.
  pub records: Option<PathBuf>,
  /// Endpoint map events are forwarded to.
  pub viewer_url: Option<String>,
  pub search: Option<SearchOptions>,
}

impl Config {
  #[must_use]
  pub fn new() -> Self {
    let from_env = Self::from_env();
    let from_file = Self::from_file();
    let default = Self::defaults();

    let mut merged = from_env;
    if let Some(from_file) = &from_file {
      merged = merged.merge(from_file);
    }
    merged = merged.merge(&default);

    if merged.config_path.is_some() && from_file.is_none() {
      merged.init_cfg_file();
    }

    merged
  }

  #[must_use]
  pub fn search_options(&self) -> SearchOptions {
    self.search.clone().unwrap_or_default()
  }

  fn defaults() -> Self {
    Self {
      config_path: home_dir().map(|p| p.join(".config").join("mapsearch")),
      records: None,
      viewer_url: None,
      search: Some(SearchOptions::default()),
    }
  }

  fn from_env() -> Self {
    Self {
      config_path: std::env::var("MAPSEARCH_CONFIG").ok().map(PathBuf::from),
      records: std::env::var("MAPSEARCH_RECORDS").ok().map(PathBuf::from),
      viewer_url: std::env::var("MAPSEARCH_VIEWER_URL").ok(),
      search: None,
    }
  }

  fn merge(mut self, other: &Self) -> Self {
    self.config_path = self.config_path.or(other.config_path.clone());
    self.records = self.records.or(other.records.clone());
    self.viewer_url = self.viewer_url.or(other.viewer_url.clone());
    self.search = self.search.or(other.search.clone());
    self
  }

  fn from_file() -> Option<Self> {
    let config_path = std::env::var("MAPSEARCH_CONFIG")
      .ok()
      .map(PathBuf::from)
      .or_else(|| home_dir().map(|p| p.join(".config").join("mapsearch")))?;
    let config_path = config_path.join("config.json");

    serde_json::from_str(&std::fs::read_to_string(&config_path).ok()?)
      .inspect_err(|e| error!("Failed to read config file: {e}"))
      .ok()
  }

  fn init_cfg_file(&self) {
    let Some(path) = &self.config_path else {
      return;
    };
    if !path.exists() {
      let _ = std::fs::create_dir_all(path).inspect_err(|e| {
        error!("Failed to create config directory: {e}");
      });
    }

    let path = path.join("config.json");
    if !path.exists() {
      match serde_json::to_string_pretty(self) {
        Ok(config) => {
          let _ = std::fs::write(path, config).inspect_err(|e| {
            error!("Failed to write config file: {e}");
          });
        }
        Err(e) => error!("Failed to serialize config: {e}"),
      }
    }
  }
}
