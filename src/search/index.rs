use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;

use super::matcher::{self, MatchPolicy};
use super::record::{Record, RecordFields, is_feature};

struct IndexEntry {
  /// Case folded title.
  folded: String,
  record: Arc<Record>,
}

/// The searchable records of one source snapshot, in insertion order.
///
/// An index is never modified after it is built; a source refresh builds a new one.
#[derive(Default)]
pub struct RecordIndex {
  entries: Vec<IndexEntry>,
}

impl std::fmt::Debug for RecordIndex {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RecordIndex")
      .field("records", &self.entries.len())
      .finish()
  }
}

impl RecordIndex {
  /// Indexes raw source data: an array of items or features, a GeoJSON
  /// `FeatureCollection`, or a keyed mapping of title to item or location.
  ///
  /// Items without a resolvable title or finite location are skipped.
  #[must_use]
  pub fn build(data: &Value, fields: &RecordFields) -> Self {
    let mut skipped = 0;
    let mut records = Vec::new();
    let mut push = |record: Option<Record>| match record {
      Some(record) => records.push(record),
      None => skipped += 1,
    };

    match data {
      Value::Array(items) => {
        for item in items {
          if is_feature(item) {
            push(fields.resolve_feature(item));
          } else {
            push(fields.resolve(item));
          }
        }
      }
      Value::Object(obj) if obj.get("type").and_then(Value::as_str) == Some("FeatureCollection") => {
        for feature in obj
          .get("features")
          .and_then(Value::as_array)
          .into_iter()
          .flatten()
        {
          push(fields.resolve_feature(feature));
        }
      }
      Value::Object(_) if is_feature(data) => push(fields.resolve_feature(data)),
      Value::Object(obj) => {
        for (key, value) in obj {
          push(fields.resolve_keyed(key, value));
        }
      }
      Value::Null => {}
      other => warn!("Cannot index source data of this shape: {other}"),
    }

    if skipped > 0 {
      debug!(
        "Skipped {skipped} items without '{}' or a valid location",
        fields.name
      );
    }
    Self::from_records(records)
  }

  #[must_use]
  pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
    let entries = records
      .into_iter()
      .map(|record| IndexEntry {
        folded: record.title.to_lowercase(),
        record: Arc::new(record),
      })
      .collect::<Vec<_>>();
    debug!("Indexed {} records", entries.len());
    Self { entries }
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn records(&self) -> impl Iterator<Item = &Arc<Record>> {
    self.entries.iter().map(|e| &e.record)
  }

  /// Iterates `(comparable title, record)` for the given case mode.
  pub(crate) fn keyed(&self, case_sensitive: bool) -> impl Iterator<Item = (&str, &Arc<Record>)> {
    self.entries.iter().map(move |e| {
      let key = if case_sensitive {
        e.record.title.as_str()
      } else {
        e.folded.as_str()
      };
      (key, &e.record)
    })
  }

  /// Matching records for `text`, in insertion order.
  #[must_use]
  pub fn lookup(&self, text: &str, policy: &MatchPolicy) -> Vec<Arc<Record>> {
    matcher::find(self, text, policy)
  }

  /// Records whose title equals `text`, in insertion order.
  #[must_use]
  pub fn exact(&self, text: &str, case_sensitive: bool) -> Vec<Arc<Record>> {
    let needle = matcher::normalize(text, case_sensitive);
    self
      .keyed(case_sensitive)
      .filter(|(key, _)| *key == needle)
      .map(|(_, record)| Arc::clone(record))
      .collect()
  }
}
