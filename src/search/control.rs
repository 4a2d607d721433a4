use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Instant;

use log::{debug, info, warn};
use serde_json::Value;

use super::events::{EventBus, EventKind, ListenerId, SearchEvent};
use super::index::RecordIndex;
use super::input::{CursorStep, InputController, InputPhase, Keystroke, QueryState};
use super::matcher::{MatchEngine, MatchPolicy, Matcher};
use super::presenter::{FeedbackMarker, LocationPresenter, MoveHook};
use super::record::{Record, RecordFields};
use super::source::{Delivery, RemoteSource, Source, SourceAdapter, SourceReply};
use super::state::{ControlState, ControlStateMachine, Expired};
use super::view::{SuggestionView, Tip, TipBuilder, TipList, default_tip};
use crate::config::SearchOptions;
use crate::coordinates::WGS84Coordinate;
use crate::error::{Result, SearchError};
use crate::map_event::MapHost;

/// Keys with a meaning for the control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
  Enter,
  Up,
  Down,
  Escape,
}

/// Reshapes raw source data before it is indexed.
pub type FormatHook = Box<dyn FnMut(Value) -> anyhow::Result<Value>>;

pub struct SearchControlBuilder {
  options: SearchOptions,
  host: Box<dyn MapHost>,
  source: Option<Source>,
  view: Option<Box<dyn SuggestionView>>,
  matcher: Option<Box<dyn Matcher>>,
  format: Option<FormatHook>,
  move_hook: Option<MoveHook>,
  tip_builder: Option<TipBuilder>,
}

impl SearchControlBuilder {
  /// Resident records: an array, a keyed mapping or a feature collection.
  #[must_use]
  pub fn records(mut self, data: Value) -> Self {
    self.source = Some(Source::Static(data));
    self
  }

  /// Records fetched per search cycle by a callback.
  #[must_use]
  pub fn pull(mut self, pull: impl FnMut(&str, Delivery) + 'static) -> Self {
    self.source = Some(Source::Adapter(Box::new(pull)));
    self
  }

  #[must_use]
  pub fn adapter(mut self, adapter: impl SourceAdapter + 'static) -> Self {
    self.source = Some(Source::Adapter(Box::new(adapter)));
    self
  }

  #[must_use]
  pub fn remote(self, remote: RemoteSource) -> Self {
    self.adapter(remote)
  }

  #[must_use]
  pub fn view(mut self, view: impl SuggestionView + 'static) -> Self {
    self.view = Some(Box::new(view));
    self
  }

  /// Replaces prefix/substring matching.
  #[must_use]
  pub fn matcher(mut self, matcher: impl Matcher + 'static) -> Self {
    self.matcher = Some(Box::new(matcher));
    self
  }

  /// Replaces prefix/substring matching with a filter over all records.
  #[must_use]
  pub fn filter_data(
    self,
    filter: impl FnMut(&str, &RecordIndex) -> anyhow::Result<Vec<Arc<Record>>> + 'static,
  ) -> Self {
    self.matcher(filter)
  }

  #[must_use]
  pub fn format_data(mut self, format: impl FnMut(Value) -> anyhow::Result<Value> + 'static) -> Self {
    self.format = Some(Box::new(format));
    self
  }

  #[must_use]
  pub fn move_to_location(
    mut self,
    hook: impl FnMut(WGS84Coordinate, &str, &mut dyn MapHost) -> anyhow::Result<()> + 'static,
  ) -> Self {
    self.move_hook = Some(Box::new(hook));
    self
  }

  #[must_use]
  pub fn build_tip(mut self, builder: impl Fn(&Record) -> String + 'static) -> Self {
    self.tip_builder = Some(Box::new(builder));
    self
  }

  /// # Errors
  /// Fails without a source, with an invalid url, or when formatting resident records fails.
  pub fn build(self) -> Result<SearchControl> {
    let source = match self.source {
      Some(source) => source,
      None => match RemoteSource::from_options(&self.options) {
        Some(remote) => Source::Adapter(Box::new(remote?)),
        None => return Err(SearchError::MissingSource),
      },
    };

    let options = self.options;
    let policy = options.match_policy();
    let mut presenter = LocationPresenter::new(self.host, &options);
    if let Some(hook) = self.move_hook {
      presenter.set_move_hook(hook);
    }
    let (reply_sender, replies) = channel();

    let mut control = SearchControl {
      fields: RecordFields::from(&options),
      policy,
      adapter: None,
      format: self.format,
      matcher: self
        .matcher
        .unwrap_or_else(|| Box::new(MatchEngine::new(policy))),
      index: Arc::default(),
      input: InputController::new(
        options.min_length,
        options.debounce(),
        options.auto_type,
        options.case_sensitive,
      ),
      state: ControlStateMachine::new(options.collapsed, options.collapse_delay()),
      presenter,
      view: self.view.unwrap_or_else(|| Box::new(TipList::default())),
      tip_builder: self.tip_builder.unwrap_or_else(|| Box::new(default_tip)),
      events: EventBus::default(),
      replies,
      reply_sender,
      options,
    };

    match source {
      Source::Static(data) => control.index = Arc::new(control.index_data(data)?),
      Source::Adapter(adapter) => {
        info!("Search control uses {} source", adapter.name());
        control.adapter = Some(adapter);
      }
    }
    Ok(control)
  }
}

/// A map search control: matches typed text against located records, shows suggestions
/// and moves the map to the chosen one.
///
/// The control is driven by the host: input events are forwarded to it and [`Self::tick`]
/// is called regularly (e.g. every frame) to run debounced searches, apply source replies
/// and expire timers.
pub struct SearchControl {
  options: SearchOptions,
  policy: MatchPolicy,
  fields: RecordFields,
  /// `None` searches the resident index.
  adapter: Option<Box<dyn SourceAdapter>>,
  format: Option<FormatHook>,
  matcher: Box<dyn Matcher>,
  index: Arc<RecordIndex>,
  input: InputController,
  state: ControlStateMachine,
  presenter: LocationPresenter,
  view: Box<dyn SuggestionView>,
  tip_builder: TipBuilder,
  events: EventBus,
  replies: Receiver<SourceReply>,
  reply_sender: Sender<SourceReply>,
}

impl SearchControl {
  #[must_use]
  pub fn builder(options: SearchOptions, host: impl MapHost + 'static) -> SearchControlBuilder {
    SearchControlBuilder {
      options,
      host: Box::new(host),
      source: None,
      view: None,
      matcher: None,
      format: None,
      move_hook: None,
      tip_builder: None,
    }
  }

  #[must_use]
  pub fn options(&self) -> &SearchOptions {
    &self.options
  }

  #[must_use]
  pub fn state(&self) -> ControlState {
    self.state.state()
  }

  #[must_use]
  pub fn input_visible(&self) -> bool {
    self.state.input_visible()
  }

  #[must_use]
  pub fn query(&self) -> &QueryState {
    self.input.query()
  }

  #[must_use]
  pub fn text(&self) -> &str {
    self.input.text()
  }

  #[must_use]
  pub fn input_phase(&self) -> InputPhase {
    self.input.phase()
  }

  #[must_use]
  pub fn candidates(&self) -> &[Arc<Record>] {
    &self.input.query().candidates
  }

  /// The cancel button is shown while there is text.
  #[must_use]
  pub fn cancel_visible(&self) -> bool {
    !self.input.text().is_empty()
  }

  #[must_use]
  pub fn alert(&self) -> Option<&str> {
    self.state.alert().map(|a| a.message.as_str())
  }

  #[must_use]
  pub fn feedback(&self) -> Option<&FeedbackMarker> {
    self.presenter.feedback()
  }

  #[must_use]
  pub fn index(&self) -> Arc<RecordIndex> {
    Arc::clone(&self.index)
  }

  fn visible_count(&self) -> usize {
    match self.input.phase() {
      InputPhase::Idle => 0,
      _ => self.policy.limit.visible(self.input.query().candidates.len()),
    }
  }

  /// The suggestions currently shown.
  #[must_use]
  pub fn tips(&self) -> Vec<Tip> {
    self
      .input
      .query()
      .candidates
      .iter()
      .take(self.visible_count())
      .enumerate()
      .map(|(index, record)| Tip {
        index,
        text: (self.tip_builder)(record.as_ref()),
        location: record.location,
      })
      .collect()
  }

  pub fn on(
    &mut self,
    kind: EventKind,
    listener: impl FnMut(&SearchEvent) -> anyhow::Result<()> + 'static,
  ) -> ListenerId {
    self.events.on(kind, listener)
  }

  pub fn off(&mut self, id: ListenerId) -> bool {
    self.events.off(id)
  }

  fn emit(&mut self, event: &SearchEvent) {
    let failures = self.events.emit(event);
    if !failures.is_empty() {
      debug!("{} listeners failed on {}", failures.len(), event.event_type());
    }
  }

  pub fn expand(&mut self) {
    if self.state.expand() {
      let text = self.input.text().to_string();
      self.emit(&SearchEvent::Expanded { text });
    }
  }

  /// Clears the query and hides the input.
  pub fn collapse(&mut self) {
    let text = self.input.text().to_string();
    if !self.state.collapse() {
      return;
    }
    self.input.reset();
    self.view.hide();
    self.view.input("", None);
    self.view.alert(None);
    if self.options.hide_marker_on_collapse {
      self.presenter.clear();
    }
    self.emit(&SearchEvent::Collapsed { text });
  }

  /// Discards the query without locating anything and collapses.
  pub fn cancel(&mut self) {
    if !self.state.input_visible() {
      return;
    }
    let text = self.input.text().to_string();
    self.input.reset();
    self.view.hide();
    self.view.input("", None);
    self.emit(&SearchEvent::Cancel { text });
    self.collapse();
  }

  pub fn focus(&mut self) {
    self.expand();
    self.state.cancel_collapse();
  }

  /// Collapses after `autoCollapseTime` unless the control gets focus or hover again.
  pub fn blur(&mut self, now: Instant) {
    if self.state.input_visible() {
      self.state.schedule_collapse(now);
    }
  }

  pub fn hover(&mut self) {
    self.state.cancel_collapse();
  }

  /// Handles an edit of the input text.
  pub fn type_text(&mut self, text: &str, now: Instant) {
    self.state.cancel_collapse();
    if self.state.hide_alert() {
      self.view.alert(None);
    }
    if !self.state.input_visible() {
      self.expand();
    }
    if self.input.type_text(text, now) == Keystroke::Cleared {
      self.view.hide();
    }
  }

  /// Sets the text and searches at once, skipping the debounce window.
  pub fn search_text(&mut self, text: &str, now: Instant) {
    self.type_text(text, now);
    if self.input.long_enough() {
      self.run_search(now);
    }
  }

  pub fn key(&mut self, key: Key, now: Instant) {
    match key {
      Key::Up | Key::Down => {
        let step = if key == Key::Up {
          CursorStep::Up
        } else {
          CursorStep::Down
        };
        let cursor = self.input.move_cursor(step, self.visible_count());
        self.view.select(cursor);
        if cursor.is_some() {
          self.view.input(self.input.text(), None);
        }
      }
      Key::Enter => {
        let visible = self.visible_count();
        if self.input.query().cursor.is_none()
          && (visible == 1 || (self.options.first_tip_submit && visible > 0))
        {
          self.input.set_cursor(Some(0));
        }
        self.submit(now);
      }
      Key::Escape => {
        if self.visible_count() > 0 {
          self.input.dismiss();
          self.view.hide();
        } else {
          self.cancel();
        }
      }
    }
  }

  /// Pointer over a tip.
  pub fn hover_tip(&mut self, index: usize) {
    if index < self.visible_count() {
      self.input.hover(Some(index));
      self.view.select(Some(index));
    }
  }

  /// Click on a tip: fills the input and, with `tipAutoSubmit`, locates it.
  pub fn click_tip(&mut self, index: usize, now: Instant) {
    if index >= self.visible_count() {
      return;
    }
    self.input.set_cursor(Some(index));
    self.view.input(self.input.text(), None);
    if self.options.tip_auto_submit {
      self.submit(now);
    } else {
      self.input.dismiss();
      self.view.hide();
    }
  }

  /// Locates the selected candidate, or the record titled like the input text.
  pub fn submit(&mut self, now: Instant) {
    if !self.state.input_visible() {
      self.expand();
      return;
    }
    if self.input.text().is_empty() {
      self.collapse();
      return;
    }
    let record = self.input.selected().or_else(|| {
      self
        .index
        .exact(self.input.text(), self.policy.case_sensitive)
        .into_iter()
        .next()
    });
    match record {
      Some(record) => self.commit(&record, now),
      None => {
        info!("No location found for '{}'", self.input.text());
        self.input.dismiss();
        self.view.hide();
        self.show_alert(None, now);
      }
    }
  }

  fn commit(&mut self, record: &Record, now: Instant) {
    let text = self.input.text().to_string();
    self.input.finish(&record.title);
    self.view.hide();
    self.view.input(&record.title, None);

    self.state.begin_locate();
    match self.presenter.locate(record.location, &record.title, now) {
      Ok(()) => {
        self.state.finish_locate();
        self.emit(&SearchEvent::LocationFound {
          text,
          latlng: record.location,
          title: record.title.clone(),
          layer: (!record.raw.is_null()).then(|| record.raw.clone()),
        });
        if self.options.auto_collapse {
          self.collapse();
        }
      }
      Err(e) => {
        warn!("Failed to locate '{}': {e}", record.title);
        self.state.finish_locate();
        self.show_alert(None, now);
      }
    }
  }

  /// Shows `message`, or the configured error text, until `autoCollapseTime` passed.
  pub fn show_alert(&mut self, message: Option<&str>, now: Instant) {
    let message = message.unwrap_or(&self.options.text_err).to_string();
    info!("Search alert: {message}");
    self.state.show_alert(&message, now);
    self.view.alert(Some(&message));
  }

  /// Replaces the records with a new resident collection.
  ///
  /// # Errors
  /// Fails when the format hook fails; the old records stay in place.
  pub fn set_source(&mut self, data: Value, now: Instant) -> Result<()> {
    let index = self.index_data(data)?;
    self.adapter = None;
    self.index = Arc::new(index);
    match self.input.phase() {
      InputPhase::Fetching { .. } | InputPhase::Presenting if self.input.long_enough() => {
        self.run_search(now);
      }
      InputPhase::Fetching { .. } => self.input.invalidate(),
      _ => {}
    }
    Ok(())
  }

  /// Replaces the records with the features of a layer.
  ///
  /// # Errors
  /// See [`Self::set_source`].
  pub fn set_layer(&mut self, layer: Value, now: Instant) -> Result<()> {
    self.set_source(layer, now)
  }

  /// Applies source replies, runs due searches and expires timers.
  pub fn tick(&mut self, now: Instant) {
    self.poll(now);
    if self.input.is_due(now) {
      self.run_search(now);
    }
    for expired in self.state.tick(now) {
      match expired {
        Expired::Alert => self.view.alert(None),
        Expired::Collapse => self.collapse(),
      }
    }
    self.presenter.animate(now);
  }

  /// Applies source replies. Replies of superseded requests are dropped.
  pub fn poll(&mut self, now: Instant) {
    while let Ok(reply) = self.replies.try_recv() {
      if !self.input.is_current(reply.seq) {
        debug!("Discarding stale reply {} for '{}'", reply.seq, reply.query);
        continue;
      }
      match reply.result.and_then(|data| self.index_data(data)) {
        Ok(index) => {
          self.index = Arc::new(index);
          self.present(&reply.query, now);
        }
        Err(e) => self.fail_search(&reply.query, &e, now),
      }
    }
  }

  fn run_search(&mut self, now: Instant) {
    let text = self.input.typed().to_string();
    let seq = self.input.issue(now);
    match &mut self.adapter {
      Some(adapter) => {
        adapter.request(&text, Delivery::new(seq, text.clone(), self.reply_sender.clone()));
        self.poll(now);
      }
      None => self.present(&text, now),
    }
  }

  fn present(&mut self, query: &str, now: Instant) {
    let matches = match self.matcher.find(&self.index, query) {
      Ok(matches) => matches,
      Err(e) => {
        self.fail_search(query, &SearchError::Source(e.to_string()), now);
        return;
      }
    };
    debug!("'{query}' matched {} records", matches.len());
    self.input.present(matches);

    let tips = self.tips();
    if tips.is_empty() {
      self.view.hide();
    } else {
      self.view.show(&tips, None);
    }
    match self.input.autotype().cloned() {
      Some(completion) => self.view.input(&completion.text, Some(completion.selection)),
      None => self.view.input(self.input.text(), None),
    }
  }

  fn fail_search(&mut self, query: &str, error: &SearchError, now: Instant) {
    warn!("Search for '{query}' failed: {error}");
    self.input.dismiss();
    self.view.hide();
    self.show_alert(None, now);
  }

  fn index_data(&mut self, data: Value) -> Result<RecordIndex> {
    let data = match &mut self.format {
      Some(format) => format(data).map_err(|e| SearchError::Source(format!("formatting records failed: {e}")))?,
      None => data,
    };
    Ok(RecordIndex::build(&data, &self.fields))
  }
}
