use std::time::Duration;

use log::{debug, warn};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

use crate::map_event::{MapEvent, MapHost};

pub const DEFAULT_VIEWER_URL: &str = "http://localhost:12345/";

/// Forwards map events to a map viewer listening for json posts.
///
/// Events are queued and sent from a background task every 100ms so the control never
/// waits for the viewer. `finalize` has to be awaited to flush the queue.
pub struct MapSender {
  sender: UnboundedSender<Option<MapEvent>>,
  inner_join_handle: JoinHandle<()>,
  url: String,
}

struct SenderInner {
  receiver: UnboundedReceiver<Option<MapEvent>>,
  queue: Vec<MapEvent>,
  url: String,
}

impl SenderInner {
  fn start(receiver: UnboundedReceiver<Option<MapEvent>>, url: String) -> JoinHandle<()> {
    tokio::spawn(
      Self {
        receiver,
        queue: Vec::new(),
        url,
      }
      .run(),
    )
  }

  async fn run(mut self) {
    let mut interval = tokio::time::interval(Duration::from_millis(100));
    loop {
      tokio::select! {
        event = self.receiver.recv() => {
          match event {
            Some(Some(event)) => self.queue.push(event),
            Some(None) | None => {
              self.send_queue().await;
              break;
            }
          }
        },
        _ = interval.tick() => self.send_queue().await,
      }
    }
  }

  async fn send_queue(&mut self) {
    for event in compact(std::mem::take(&mut self.queue)) {
      self.send_event(&event).await;
    }
  }

  async fn send_event(&self, event: &MapEvent) {
    let request = match surf::post(&self.url).body_json(event) {
      Ok(request) => request,
      Err(e) => {
        warn!("Cannot serialize map event: {e}");
        return;
      }
    };
    if let Err(e) = request.await {
      warn!("Failed to send map event to {}: {e}", self.url);
    }
  }
}

/// Drops circle frames that are replaced by a later frame of the same batch.
fn compact(queue: Vec<MapEvent>) -> Vec<MapEvent> {
  let mut compacted: Vec<MapEvent> = Vec::with_capacity(queue.len());
  for event in queue {
    if let (MapEvent::CircleRadius(_), Some(MapEvent::CircleRadius(_))) = (&event, compacted.last()) {
      compacted.pop();
    }
    compacted.push(event);
  }
  compacted
}

impl MapSender {
  /// Starts the background task; has to be called inside a tokio runtime.
  #[must_use]
  pub fn new(url: impl Into<String>) -> Self {
    let url = url.into();
    let (sender, receiver) = unbounded_channel();
    Self {
      sender,
      inner_join_handle: SenderInner::start(receiver, url.clone()),
      url,
    }
  }

  /// Whether a viewer answers its healthcheck.
  pub async fn viewer_available(&self) -> bool {
    let healthcheck = format!("{}/healthcheck", self.url.trim_end_matches('/'));
    match surf::get(&healthcheck).send().await {
      Ok(response) => response.status().is_success(),
      Err(e) => {
        debug!("Healthcheck {healthcheck}: {e}");
        false
      }
    }
  }

  /// Queues an event for sending.
  pub fn send_event(&self, event: MapEvent) {
    let _ = self.sender.send(Some(event));
  }

  /// Sends the events that are still in the queue.
  pub async fn finalize(self) {
    let _ = self.sender.send(None);
    let _ = self.inner_join_handle.await;
  }
}

impl MapHost for MapSender {
  fn send(&mut self, event: MapEvent) {
    self.send_event(event);
  }
}
