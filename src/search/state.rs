use std::time::{Duration, Instant};

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
  Collapsed,
  Expanded,
  Locating,
  Alerting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
  pub message: String,
  pub until: Instant,
  resume: ControlState,
}

/// Timers of the state machine that expired during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expired {
  Alert,
  Collapse,
}

/// Expanded/collapsed/locating/alerting state of one control.
#[derive(Debug)]
pub struct ControlStateMachine {
  state: ControlState,
  alert: Option<Alert>,
  collapse_at: Option<Instant>,
  delay: Duration,
  /// When false the input is never hidden.
  collapsible: bool,
}

impl ControlStateMachine {
  #[must_use]
  pub fn new(collapsible: bool, delay: Duration) -> Self {
    Self {
      state: if collapsible {
        ControlState::Collapsed
      } else {
        ControlState::Expanded
      },
      alert: None,
      collapse_at: None,
      delay,
      collapsible,
    }
  }

  #[must_use]
  pub fn state(&self) -> ControlState {
    self.state
  }

  #[must_use]
  pub fn alert(&self) -> Option<&Alert> {
    self.alert.as_ref()
  }

  /// Whether the input field is shown.
  #[must_use]
  pub fn input_visible(&self) -> bool {
    match self.state {
      ControlState::Collapsed => false,
      ControlState::Alerting => self
        .alert
        .as_ref()
        .is_none_or(|a| a.resume != ControlState::Collapsed),
      ControlState::Expanded | ControlState::Locating => true,
    }
  }

  fn transition(&mut self, to: ControlState) {
    if self.state != to {
      debug!("Search control {:?} -> {to:?}", self.state);
      self.state = to;
    }
  }

  /// Returns true if the control was collapsed.
  pub fn expand(&mut self) -> bool {
    self.collapse_at = None;
    match self.state {
      ControlState::Collapsed => {
        self.transition(ControlState::Expanded);
        true
      }
      ControlState::Alerting => {
        if let Some(alert) = &mut self.alert
          && alert.resume == ControlState::Collapsed
        {
          alert.resume = ControlState::Expanded;
          return true;
        }
        false
      }
      ControlState::Expanded | ControlState::Locating => false,
    }
  }

  /// Returns true if the control was expanded. A non-collapsible control stays expanded.
  pub fn collapse(&mut self) -> bool {
    self.collapse_at = None;
    if self.state == ControlState::Collapsed {
      return false;
    }
    self.alert = None;
    self.transition(if self.collapsible {
      ControlState::Collapsed
    } else {
      ControlState::Expanded
    });
    true
  }

  pub fn begin_locate(&mut self) {
    self.alert = None;
    self.transition(ControlState::Locating);
  }

  pub fn finish_locate(&mut self) {
    if self.state == ControlState::Locating {
      self.transition(ControlState::Expanded);
    }
  }

  pub fn show_alert(&mut self, message: &str, now: Instant) {
    let resume = match self.state {
      ControlState::Alerting => self
        .alert
        .as_ref()
        .map_or(ControlState::Expanded, |a| a.resume),
      ControlState::Collapsed => ControlState::Collapsed,
      ControlState::Expanded | ControlState::Locating => ControlState::Expanded,
    };
    self.alert = Some(Alert {
      message: message.to_string(),
      until: now + self.delay,
      resume,
    });
    self.transition(ControlState::Alerting);
  }

  /// Returns true if an alert was shown.
  pub fn hide_alert(&mut self) -> bool {
    match self.alert.take() {
      Some(alert) => {
        self.transition(alert.resume);
        true
      }
      None => false,
    }
  }

  /// Collapses after the configured delay unless cancelled.
  pub fn schedule_collapse(&mut self, now: Instant) {
    if self.state != ControlState::Collapsed {
      self.collapse_at = Some(now + self.delay);
    }
  }

  pub fn cancel_collapse(&mut self) {
    self.collapse_at = None;
  }

  #[must_use]
  pub fn collapse_scheduled(&self) -> bool {
    self.collapse_at.is_some()
  }

  /// Reports and clears expired timers; the alert is hidden here, collapsing is up to the caller.
  pub fn tick(&mut self, now: Instant) -> Vec<Expired> {
    let mut expired = Vec::new();
    if self.alert.as_ref().is_some_and(|a| now >= a.until) {
      self.hide_alert();
      expired.push(Expired::Alert);
    }
    if self.collapse_at.is_some_and(|at| now >= at) {
      self.collapse_at = None;
      expired.push(Expired::Collapse);
    }
    expired
  }
}
