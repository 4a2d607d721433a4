use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;

use super::matcher::normalize;
use super::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPhase {
  /// Less than `min_length` characters typed.
  Idle,
  /// Waiting for typing to pause.
  Debouncing { due: Instant },
  /// Waiting for the source to deliver request `seq`.
  Fetching { seq: u64 },
  Presenting,
}

#[derive(Debug, Clone, Default)]
pub struct QueryState {
  /// Current input text, including an accepted completion.
  pub text: String,
  /// Index into `candidates`, `None` means no selection.
  pub cursor: Option<usize>,
  pub candidates: Vec<Arc<Record>>,
  pub last_issued_at: Option<Instant>,
}

/// Inline completion proposed by autotype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
  pub text: String,
  /// Byte range of the completed part, pre-selected so typing replaces it.
  pub selection: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
  /// Text is shorter than `min_length`, candidates were cleared.
  Cleared,
  /// A search is scheduled.
  Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStep {
  Up,
  Down,
}

/// Typed text, debounce timer, candidates and selection of a control.
#[derive(Debug)]
pub struct InputController {
  query: QueryState,
  phase: InputPhase,
  min_length: usize,
  debounce: Duration,
  auto_type: bool,
  case_sensitive: bool,
  next_seq: u64,
  current_seq: Option<u64>,
  /// Text the user typed, without completions.
  typed: String,
  deleting: bool,
  completion: Option<Completion>,
}

impl InputController {
  #[must_use]
  pub fn new(min_length: usize, debounce: Duration, auto_type: bool, case_sensitive: bool) -> Self {
    Self {
      query: QueryState::default(),
      phase: InputPhase::Idle,
      min_length,
      debounce,
      auto_type,
      case_sensitive,
      next_seq: 0,
      current_seq: None,
      typed: String::new(),
      deleting: false,
      completion: None,
    }
  }

  #[must_use]
  pub fn query(&self) -> &QueryState {
    &self.query
  }

  #[must_use]
  pub fn text(&self) -> &str {
    &self.query.text
  }

  #[must_use]
  pub fn phase(&self) -> InputPhase {
    self.phase
  }

  #[must_use]
  pub fn completion(&self) -> Option<&Completion> {
    self.completion.as_ref()
  }

  /// The text without a pending completion.
  #[must_use]
  pub fn typed(&self) -> &str {
    &self.typed
  }

  #[must_use]
  pub fn long_enough(&self) -> bool {
    self.query.text.chars().count() >= self.min_length
  }

  /// Handles an edit of the input text.
  pub fn type_text(&mut self, text: &str, now: Instant) -> Keystroke {
    let len = text.chars().count();
    let typed_len = self.typed.chars().count();
    let had_completion = self.completion.take().is_some();
    self.deleting = len < typed_len || (had_completion && len <= typed_len);
    self.typed = text.to_string();
    self.query.text = text.to_string();
    self.query.cursor = None;

    if len < self.min_length {
      self.clear_results();
      return Keystroke::Cleared;
    }
    self.phase = InputPhase::Debouncing {
      due: now + self.debounce,
    };
    Keystroke::Scheduled
  }

  /// Whether the debounce window elapsed.
  #[must_use]
  pub fn is_due(&self, now: Instant) -> bool {
    matches!(self.phase, InputPhase::Debouncing { due } if now >= due)
  }

  /// Starts a search cycle for the current text and returns its sequence number.
  ///
  /// Every earlier request becomes stale.
  pub fn issue(&mut self, now: Instant) -> u64 {
    self.next_seq += 1;
    let seq = self.next_seq;
    self.current_seq = Some(seq);
    self.query.last_issued_at = Some(now);
    self.phase = InputPhase::Fetching { seq };
    debug!("Issued search {seq} for '{}'", self.query.text);
    seq
  }

  #[must_use]
  pub fn is_current(&self, seq: u64) -> bool {
    self.current_seq == Some(seq)
  }

  /// Makes any pending or in-flight request stale.
  pub fn invalidate(&mut self) {
    if let Some(seq) = self.current_seq.take() {
      debug!("Invalidated search {seq}");
    }
    if matches!(
      self.phase,
      InputPhase::Debouncing { .. } | InputPhase::Fetching { .. }
    ) {
      self.phase = InputPhase::Idle;
    }
  }

  /// Stores the matches of the current request. A pending completion is dropped.
  pub fn present(&mut self, candidates: Vec<Arc<Record>>) {
    if self.completion.take().is_some() {
      self.query.text.clone_from(&self.typed);
    }
    self.current_seq = None;
    self.query.candidates = candidates;
    self.query.cursor = None;
    self.phase = InputPhase::Presenting;
  }

  /// Proposes the best candidate as inline completion.
  ///
  /// Never fires while the user is deleting text.
  pub fn autotype(&mut self) -> Option<&Completion> {
    if !self.auto_type || self.deleting {
      return None;
    }
    let best = self.query.candidates.first()?;
    let typed = normalize(&self.typed, self.case_sensitive);
    let title = normalize(&best.title, self.case_sensitive);
    if typed.is_empty() || !title.starts_with(typed.as_ref()) || title.len() == typed.len() {
      return None;
    }
    // Case folding may change lengths, so the typed part is measured on the folded title.
    let start = best
      .title
      .char_indices()
      .map(|(i, _)| i)
      .chain(std::iter::once(best.title.len()))
      .find(|&i| normalize(&best.title[..i], self.case_sensitive).len() >= typed.len())
      .unwrap_or(best.title.len());
    self.query.text.clone_from(&best.title);
    self.completion = Some(Completion {
      text: best.title.clone(),
      selection: start..best.title.len(),
    });
    self.completion.as_ref()
  }

  /// Moves the selection among the first `visible` candidates.
  ///
  /// Down on the last tip keeps it, up on the first tip clears the selection. The
  /// selected title is written into the input.
  pub fn move_cursor(&mut self, step: CursorStep, visible: usize) -> Option<usize> {
    if visible == 0 || self.phase != InputPhase::Presenting {
      return self.query.cursor;
    }
    let cursor = match (step, self.query.cursor) {
      (CursorStep::Down, None) => Some(0),
      (CursorStep::Down, Some(i)) => Some((i + 1).min(visible - 1)),
      (CursorStep::Up, None | Some(0)) => None,
      (CursorStep::Up, Some(i)) => Some(i - 1),
    };
    self.set_cursor(cursor);
    cursor
  }

  pub fn set_cursor(&mut self, cursor: Option<usize>) {
    self.query.cursor = cursor.filter(|&i| i < self.query.candidates.len());
    if let Some(record) = self.selected() {
      let title = record.title.clone();
      self.completion = None;
      self.typed.clone_from(&title);
      self.query.text = title;
    }
  }

  #[must_use]
  pub fn selected(&self) -> Option<Arc<Record>> {
    self
      .query
      .cursor
      .and_then(|i| self.query.candidates.get(i))
      .cloned()
  }

  /// Marks a candidate without writing it into the input.
  pub fn hover(&mut self, cursor: Option<usize>) {
    self.query.cursor = cursor.filter(|&i| i < self.query.candidates.len());
  }

  /// Hides the candidates; the text stays.
  pub fn dismiss(&mut self) {
    self.invalidate();
    self.completion = None;
    self.clear_results();
  }

  /// Replaces the text with the committed title and hides the candidates.
  pub fn finish(&mut self, title: &str) {
    self.dismiss();
    self.query.text = title.to_string();
    self.typed = title.to_string();
  }

  /// Clears text, candidates and pending requests.
  pub fn reset(&mut self) {
    self.invalidate();
    self.query.text.clear();
    self.typed.clear();
    self.deleting = false;
    self.completion = None;
    self.clear_results();
  }

  fn clear_results(&mut self) {
    self.current_seq = None;
    self.query.candidates.clear();
    self.query.cursor = None;
    self.phase = InputPhase::Idle;
  }
}
