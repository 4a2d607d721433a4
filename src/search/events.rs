use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use log::{error, warn};
use serde::Serialize;
use serde_json::Value;

use crate::coordinates::WGS84Coordinate;
use crate::error::SearchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
  Expanded,
  Collapsed,
  Cancel,
  LocationFound,
}

impl EventKind {
  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      EventKind::Expanded => "search:expanded",
      EventKind::Collapsed => "search:collapsed",
      EventKind::Cancel => "search:cancel",
      EventKind::LocationFound => "search:locationfound",
    }
  }

  #[must_use]
  pub fn all() -> &'static [EventKind] {
    &[
      EventKind::Expanded,
      EventKind::Collapsed,
      EventKind::Cancel,
      EventKind::LocationFound,
    ]
  }
}

/// Lifecycle signal of a search control.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SearchEvent {
  #[serde(rename = "search:expanded")]
  Expanded { text: String },
  #[serde(rename = "search:collapsed")]
  Collapsed { text: String },
  #[serde(rename = "search:cancel")]
  Cancel { text: String },
  #[serde(rename = "search:locationfound")]
  LocationFound {
    text: String,
    latlng: WGS84Coordinate,
    title: String,
    /// The source item of the found record.
    layer: Option<Value>,
  },
}

impl SearchEvent {
  #[must_use]
  pub fn kind(&self) -> EventKind {
    match self {
      SearchEvent::Expanded { .. } => EventKind::Expanded,
      SearchEvent::Collapsed { .. } => EventKind::Collapsed,
      SearchEvent::Cancel { .. } => EventKind::Cancel,
      SearchEvent::LocationFound { .. } => EventKind::LocationFound,
    }
  }

  #[must_use]
  pub fn event_type(&self) -> &'static str {
    self.kind().name()
  }

  #[must_use]
  pub fn text(&self) -> &str {
    match self {
      SearchEvent::Expanded { text }
      | SearchEvent::Collapsed { text }
      | SearchEvent::Cancel { text }
      | SearchEvent::LocationFound { text, .. } => text,
    }
  }
}

pub type Listener = Box<dyn FnMut(&SearchEvent) -> anyhow::Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Dispatches [`SearchEvent`]s to subscribed listeners.
///
/// A failing or panicking listener is logged and skipped; the remaining listeners still run.
#[derive(Default)]
pub struct EventBus {
  listeners: Vec<(ListenerId, EventKind, Listener)>,
  next_id: u64,
}

impl EventBus {
  pub fn on(
    &mut self,
    kind: EventKind,
    listener: impl FnMut(&SearchEvent) -> anyhow::Result<()> + 'static,
  ) -> ListenerId {
    let id = ListenerId(self.next_id);
    self.next_id += 1;
    self.listeners.push((id, kind, Box::new(listener)));
    id
  }

  /// Returns false if the listener was not subscribed.
  pub fn off(&mut self, id: ListenerId) -> bool {
    let before = self.listeners.len();
    self.listeners.retain(|(other, _, _)| *other != id);
    self.listeners.len() != before
  }

  #[must_use]
  pub fn listener_count(&self, kind: EventKind) -> usize {
    self.listeners.iter().filter(|(_, k, _)| *k == kind).count()
  }

  /// Calls every listener of the event kind and returns the failures.
  pub fn emit(&mut self, event: &SearchEvent) -> Vec<SearchError> {
    let kind = event.kind();
    let mut failures = Vec::new();
    for (id, _, listener) in self.listeners.iter_mut().filter(|(_, k, _)| *k == kind) {
      match catch_unwind(AssertUnwindSafe(|| listener(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
          warn!("Listener {id:?} for {} failed: {e}", kind.name());
          failures.push(SearchError::Listener(e.to_string()));
        }
        Err(panic) => {
          let message = panic_message(panic.as_ref());
          error!("Listener {id:?} for {} panicked: {message}", kind.name());
          failures.push(SearchError::Listener(message));
        }
      }
    }
    failures
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(s) = panic.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}
