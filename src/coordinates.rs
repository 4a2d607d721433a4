use geo_types::{Coord, Rect};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The standard WGS84 coordinate system.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct WGS84Coordinate {
  #[serde(alias = "latitude")]
  pub lat: f64,
  #[serde(alias = "longitude", alias = "lng")]
  pub lon: f64,
}

impl WGS84Coordinate {
  #[must_use]
  pub fn new(lat: f64, lon: f64) -> Self {
    Self { lat, lon }
  }

  /// Returns a coordinate only if both components are finite.
  #[must_use]
  pub fn checked(lat: f64, lon: f64) -> Option<Self> {
    let coord = Self::new(lat, lon);
    coord.is_valid().then_some(coord)
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    self.lat.is_finite() && self.lon.is_finite()
  }

  /// Exact equality comparison using bit representation
  #[must_use]
  pub fn exact_eq(&self, other: &Self) -> bool {
    self.lat.to_bits() == other.lat.to_bits() && self.lon.to_bits() == other.lon.to_bits()
  }

  /// Reads a location stored in a single value.
  ///
  /// Accepts `[lat, lon]`, `{lat, lng}`, `{lat, lon}`, `{latitude, longitude}` and
  /// numeric strings for any of the components.
  #[must_use]
  pub fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Array(items) if items.len() >= 2 => Self::from_pair(&items[0], &items[1]),
      Value::Object(obj) => {
        let lat = obj.get("lat").or_else(|| obj.get("latitude"))?;
        let lon = obj
          .get("lng")
          .or_else(|| obj.get("lon"))
          .or_else(|| obj.get("longitude"))?;
        Self::from_pair(lat, lon)
      }
      Value::String(s) => {
        let (lat, lon) = s.split_once(',')?;
        Self::checked(lat.trim().parse().ok()?, lon.trim().parse().ok()?)
      }
      _ => None,
    }
  }

  /// Reads a location stored in two discrete values.
  #[must_use]
  pub fn from_pair(lat: &Value, lon: &Value) -> Option<Self> {
    Self::checked(number(lat)?, number(lon)?)
  }

  /// Reads a GeoJSON position, which is ordered `[lon, lat]`.
  #[must_use]
  pub fn from_position(position: &[Value]) -> Option<Self> {
    match position {
      [lon, lat, ..] => Self::checked(lat.as_f64()?, lon.as_f64()?),
      _ => None,
    }
  }
}

impl From<WGS84Coordinate> for Coord<f64> {
  fn from(coord: WGS84Coordinate) -> Self {
    Coord {
      x: coord.lon,
      y: coord.lat,
    }
  }
}

fn number(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

/// Center of the bounding box around all coordinates.
#[must_use]
pub fn bounds_center(coords: impl IntoIterator<Item = WGS84Coordinate>) -> Option<WGS84Coordinate> {
  let mut coords = coords.into_iter().map(Coord::from);
  let first = coords.next()?;
  let (min, max) = coords.fold((first, first), |(min, max), c| {
    (
      Coord {
        x: min.x.min(c.x),
        y: min.y.min(c.y),
      },
      Coord {
        x: max.x.max(c.x),
        y: max.y.max(c.y),
      },
    )
  });
  let center = Rect::new(min, max).center();
  WGS84Coordinate::checked(center.y, center.x)
}
