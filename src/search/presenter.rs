use std::time::{Duration, Instant};

use log::{debug, info};

use crate::config::{CircleOptions, MarkerOptions, SearchOptions};
use crate::coordinates::WGS84Coordinate;
use crate::error::{Result, SearchError};
use crate::map_event::{MapEvent, MapHost};

const FRAME: Duration = Duration::from_millis(200);
const STEPS: f64 = 5.0;

/// Replaces the default pan/zoom when locating a result.
pub type MoveHook = Box<dyn FnMut(WGS84Coordinate, &str, &mut dyn MapHost) -> anyhow::Result<()>>;

/// Shrinks a circle from twice its radius back to its radius in accelerating steps.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleAnimation {
  target: f64,
  radius: f64,
  step: f64,
  acceleration: f64,
  next_frame: Instant,
  done: bool,
}

impl CircleAnimation {
  #[must_use]
  pub fn new(target: f64, now: Instant) -> Self {
    Self {
      target,
      radius: target * 2.0,
      step: (target / STEPS).floor(),
      acceleration: 0.0,
      next_frame: now + FRAME,
      done: false,
    }
  }

  #[must_use]
  pub fn radius(&self) -> f64 {
    self.radius
  }

  #[must_use]
  pub fn is_done(&self) -> bool {
    self.done
  }

  /// The radius of the next frame if one is due.
  pub fn advance(&mut self, now: Instant) -> Option<f64> {
    if self.done || now < self.next_frame {
      return None;
    }
    self.next_frame += FRAME;
    self.acceleration += 0.5;
    self.step += self.acceleration;
    self.radius -= self.step;
    if self.radius < self.target {
      self.radius = self.target;
      self.done = true;
    }
    Some(self.radius)
  }
}

/// Marker and circle drawn for the last located result.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackMarker {
  pub location: WGS84Coordinate,
  pub title: String,
  pub marker: bool,
  pub circle: Option<CircleAnimation>,
}

/// Moves the host map to located results and draws their feedback.
pub struct LocationPresenter {
  host: Box<dyn MapHost>,
  zoom: Option<u8>,
  marker: Option<MarkerOptions>,
  move_hook: Option<MoveHook>,
  feedback: Option<FeedbackMarker>,
}

impl LocationPresenter {
  #[must_use]
  pub fn new(host: Box<dyn MapHost>, options: &SearchOptions) -> Self {
    Self {
      host,
      zoom: options.zoom,
      marker: options.marker.clone(),
      move_hook: None,
      feedback: None,
    }
  }

  pub fn set_move_hook(&mut self, hook: MoveHook) {
    self.move_hook = Some(hook);
  }

  #[must_use]
  pub fn feedback(&self) -> Option<&FeedbackMarker> {
    self.feedback.as_ref()
  }

  /// Moves the map to `location` and replaces the feedback marker.
  ///
  /// # Errors
  /// Fails without touching the map if the location is not finite, or when the move hook
  /// fails.
  pub fn locate(&mut self, location: WGS84Coordinate, title: &str, now: Instant) -> Result<()> {
    if !location.is_valid() {
      return Err(SearchError::InvalidCoordinate {
        lat: location.lat,
        lon: location.lon,
      });
    }

    match &mut self.move_hook {
      Some(hook) => hook(location, title, self.host.as_mut()).map_err(|e| SearchError::Locate(e.to_string()))?,
      None => self.host.send(MapEvent::FocusOn {
        coordinate: location,
        zoom_level: self.zoom,
      }),
    }
    info!("Located '{title}' at {:.4}, {:.4}", location.lat, location.lon);

    self.clear();
    let Some(marker) = &self.marker else {
      return Ok(());
    };
    if let Some(icon) = &marker.icon {
      self.host.send(MapEvent::Marker {
        coordinate: location,
        label: title.to_string(),
        icon: icon.url.clone(),
      });
    }
    let circle = marker.circle.as_ref().map(|circle| {
      let animation = marker.animate.then(|| CircleAnimation::new(circle.radius, now));
      let radius = animation.as_ref().map_or(circle.radius, CircleAnimation::radius);
      self.host.send(circle_event(location, circle, radius));
      animation
    });
    self.feedback = Some(FeedbackMarker {
      location,
      title: title.to_string(),
      marker: marker.icon.is_some(),
      circle: circle.flatten(),
    });
    Ok(())
  }

  /// Advances the circle animation.
  pub fn animate(&mut self, now: Instant) {
    let Some(animation) = self.feedback.as_mut().and_then(|f| f.circle.as_mut()) else {
      return;
    };
    if let Some(radius) = animation.advance(now) {
      self.host.send(MapEvent::CircleRadius(radius));
    }
  }

  /// Removes the feedback marker from the map.
  pub fn clear(&mut self) {
    if let Some(feedback) = self.feedback.take() {
      debug!("Clearing feedback for '{}'", feedback.title);
      self.host.send(MapEvent::ClearFeedback);
    }
  }
}

fn circle_event(coordinate: WGS84Coordinate, circle: &CircleOptions, radius: f64) -> MapEvent {
  MapEvent::Circle {
    coordinate,
    radius,
    color: circle.color.clone(),
    weight: circle.weight,
    stroke: circle.stroke,
    fill: circle.fill,
  }
}
