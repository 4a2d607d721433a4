use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use super::record::Record;
use crate::coordinates::WGS84Coordinate;

/// One row of the suggestion list.
#[derive(Debug, Clone, PartialEq)]
pub struct Tip {
  /// Index into the candidates.
  pub index: usize,
  pub text: String,
  pub location: WGS84Coordinate,
}

/// Formats the text of a tip.
pub type TipBuilder = Box<dyn Fn(&Record) -> String>;

#[must_use]
pub fn default_tip(record: &Record) -> String {
  record.title.clone()
}

/// Renders the suggestion list of a control.
///
/// Clicks and hovers are reported back through the control.
pub trait SuggestionView {
  fn show(&mut self, tips: &[Tip], cursor: Option<usize>);
  fn hide(&mut self);
  fn select(&mut self, _cursor: Option<usize>) {}
  /// Echo of the input, with the pre-selected part of an autotype completion.
  fn input(&mut self, _text: &str, _selection: Option<Range<usize>>) {}
  fn alert(&mut self, _message: Option<&str>) {}
}

/// Keeps the rendered state in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TipList {
  pub tips: Vec<Tip>,
  pub cursor: Option<usize>,
  pub visible: bool,
  pub input: String,
  pub selection: Option<Range<usize>>,
  pub alert: Option<String>,
}

impl SuggestionView for TipList {
  fn show(&mut self, tips: &[Tip], cursor: Option<usize>) {
    self.tips = tips.to_vec();
    self.cursor = cursor;
    self.visible = true;
  }

  fn hide(&mut self) {
    self.tips.clear();
    self.cursor = None;
    self.visible = false;
  }

  fn select(&mut self, cursor: Option<usize>) {
    self.cursor = cursor;
  }

  fn input(&mut self, text: &str, selection: Option<Range<usize>>) {
    self.input = text.to_string();
    self.selection = selection;
  }

  fn alert(&mut self, message: Option<&str>) {
    self.alert = message.map(str::to_string);
  }
}

/// Shared views let the host read what was rendered.
impl<V: SuggestionView> SuggestionView for Rc<RefCell<V>> {
  fn show(&mut self, tips: &[Tip], cursor: Option<usize>) {
    self.borrow_mut().show(tips, cursor);
  }

  fn hide(&mut self) {
    self.borrow_mut().hide();
  }

  fn select(&mut self, cursor: Option<usize>) {
    self.borrow_mut().select(cursor);
  }

  fn input(&mut self, text: &str, selection: Option<Range<usize>>) {
    self.borrow_mut().input(text, selection);
  }

  fn alert(&mut self, message: Option<&str>) {
    self.borrow_mut().alert(message);
  }
}
