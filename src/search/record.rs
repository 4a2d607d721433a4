use serde_json::Value;

use crate::config::{PropertyLoc, SearchOptions};
use crate::coordinates::{WGS84Coordinate, bounds_center};

/// One indexed, searchable, located entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
  /// Display text resolved from the configured name path.
  pub title: String,
  pub location: WGS84Coordinate,
  /// The source item the record was built from.
  pub raw: Value,
}

impl Record {
  #[must_use]
  pub fn new(title: impl Into<String>, location: WGS84Coordinate, raw: Value) -> Self {
    Self {
      title: title.into(),
      location,
      raw,
    }
  }
}

/// Resolves a dotted path like `properties.name` inside a value.
#[must_use]
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
  path.split('.').try_fold(value, |current, segment| match current {
    Value::Object(obj) => obj.get(segment),
    Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
    _ => None,
  })
}

fn text_of(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

/// Which fields of a source item hold its title and its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFields {
  pub name: String,
  pub loc: PropertyLoc,
}

impl Default for RecordFields {
  fn default() -> Self {
    Self {
      name: "title".to_string(),
      loc: PropertyLoc::default(),
    }
  }
}

impl From<&SearchOptions> for RecordFields {
  fn from(options: &SearchOptions) -> Self {
    Self {
      name: options.property_name.clone(),
      loc: options.property_loc.clone(),
    }
  }
}

impl RecordFields {
  /// Builds a record from a plain item like `{"title": "Paris", "loc": [48.85, 2.35]}`.
  #[must_use]
  pub fn resolve(&self, item: &Value) -> Option<Record> {
    let title = text_of(get_path(item, &self.name)?)?;
    let location = self.location(item)?;
    Some(Record::new(title, location, item.clone()))
  }

  /// Builds a record from one entry of a keyed mapping.
  ///
  /// The entry value is either a location (`"Paris": [48.85, 2.35]`) or an item whose
  /// title falls back to the key.
  #[must_use]
  pub fn resolve_keyed(&self, key: &str, value: &Value) -> Option<Record> {
    if let Some(location) = WGS84Coordinate::from_value(value) {
      return Some(Record::new(key, location, value.clone()));
    }
    let title = get_path(value, &self.name)
      .and_then(text_of)
      .unwrap_or_else(|| key.to_string());
    let location = self.location(value)?;
    Some(Record::new(title, location, value.clone()))
  }

  /// Builds a record from a GeoJSON feature, using the point or the bounds center of the
  /// geometry as location.
  #[must_use]
  pub fn resolve_feature(&self, feature: &Value) -> Option<Record> {
    let title = feature
      .get("properties")
      .and_then(|props| get_path(props, &self.name))
      .or_else(|| get_path(feature, &self.name))
      .and_then(text_of)?;
    let location = feature
      .get("geometry")
      .and_then(geometry_center)
      .or_else(|| feature.get("properties").and_then(|p| self.location(p)))?;
    Some(Record::new(title, location, feature.clone()))
  }

  fn location(&self, item: &Value) -> Option<WGS84Coordinate> {
    match &self.loc {
      PropertyLoc::Combined(path) => WGS84Coordinate::from_value(get_path(item, path)?),
      PropertyLoc::Pair([lat, lon]) => {
        WGS84Coordinate::from_pair(get_path(item, lat)?, get_path(item, lon)?)
      }
    }
  }
}

#[must_use]
pub fn is_feature(value: &Value) -> bool {
  value.get("type").and_then(Value::as_str) == Some("Feature")
}

fn geometry_center(geometry: &Value) -> Option<WGS84Coordinate> {
  let coordinates = geometry.get("coordinates")?;
  if geometry.get("type").and_then(Value::as_str) == Some("Point") {
    return WGS84Coordinate::from_position(coordinates.as_array()?);
  }
  let mut positions = Vec::new();
  collect_positions(coordinates, &mut positions);
  bounds_center(positions)
}

fn collect_positions(value: &Value, out: &mut Vec<WGS84Coordinate>) {
  let Some(items) = value.as_array() else {
    return;
  };
  if items.first().is_some_and(Value::is_number) {
    out.extend(WGS84Coordinate::from_position(items));
  } else {
    for item in items {
      collect_positions(item, out);
    }
  }
}
