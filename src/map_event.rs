use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::coordinates::WGS84Coordinate;

/// A mutation of the host map requested by a search control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapEvent {
  /// Moves the viewport; `None` keeps the current zoom.
  FocusOn {
    coordinate: WGS84Coordinate,
    zoom_level: Option<u8>,
  },
  Marker {
    coordinate: WGS84Coordinate,
    label: String,
    icon: Option<String>,
  },
  Circle {
    coordinate: WGS84Coordinate,
    radius: f64,
    color: String,
    weight: f64,
    stroke: bool,
    fill: bool,
  },
  CircleRadius(f64),
  /// Removes marker and circle of the last located result.
  ClearFeedback,
}

/// The host map of a search control.
pub trait MapHost {
  fn send(&mut self, event: MapEvent);
}

impl<H: MapHost + ?Sized> MapHost for Box<H> {
  fn send(&mut self, event: MapEvent) {
    (**self).send(event);
  }
}

impl MapHost for Sender<MapEvent> {
  fn send(&mut self, event: MapEvent) {
    if let Err(e) = Sender::send(self, event) {
      log::error!("Failed to send map event: {e}");
    }
  }
}
