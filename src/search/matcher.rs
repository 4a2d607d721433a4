use std::borrow::Cow;
use std::sync::Arc;

use super::index::RecordIndex;
use super::record::Record;

/// How many matches are handed to the suggestion view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultLimit {
  Unbounded,
  /// Matches are computed (e.g. for autotype) but no tip is shown.
  Hidden,
  Max(usize),
}

impl From<i64> for ResultLimit {
  fn from(limit: i64) -> Self {
    match limit {
      0 => Self::Hidden,
      n if n < 0 => Self::Unbounded,
      n => usize::try_from(n).map_or(Self::Unbounded, Self::Max),
    }
  }
}

impl ResultLimit {
  /// Number of tips to show for `total` matches.
  #[must_use]
  pub fn visible(self, total: usize) -> usize {
    match self {
      Self::Unbounded => total,
      Self::Hidden => 0,
      Self::Max(n) => total.min(n),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
  /// Prefix match instead of substring match.
  pub initial_only: bool,
  pub case_sensitive: bool,
  pub limit: ResultLimit,
}

impl Default for MatchPolicy {
  fn default() -> Self {
    Self {
      initial_only: true,
      case_sensitive: false,
      limit: ResultLimit::Unbounded,
    }
  }
}

#[must_use]
pub fn normalize(text: &str, case_sensitive: bool) -> Cow<'_, str> {
  if case_sensitive {
    Cow::Borrowed(text)
  } else {
    Cow::Owned(text.to_lowercase())
  }
}

/// Records matching `query` in insertion order.
///
/// An empty query matches nothing. A positive limit truncates; with a hidden limit all
/// matches are returned and the caller shows none of them.
#[must_use]
pub fn find(index: &RecordIndex, query: &str, policy: &MatchPolicy) -> Vec<Arc<Record>> {
  let needle = normalize(query, policy.case_sensitive);
  if needle.is_empty() {
    return Vec::new();
  }
  let hits = index
    .keyed(policy.case_sensitive)
    .filter(|(key, _)| {
      if policy.initial_only {
        key.starts_with(needle.as_ref())
      } else {
        key.contains(needle.as_ref())
      }
    })
    .map(|(_, record)| Arc::clone(record));
  match policy.limit {
    ResultLimit::Max(n) => hits.take(n).collect(),
    ResultLimit::Unbounded | ResultLimit::Hidden => hits.collect(),
  }
}

/// Produces the candidates for a query.
pub trait Matcher {
  /// # Errors
  /// Fails when a user supplied filter fails.
  fn find(&mut self, index: &RecordIndex, query: &str) -> anyhow::Result<Vec<Arc<Record>>>;
}

/// Prefix/substring matching under a [`MatchPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchEngine {
  pub policy: MatchPolicy,
}

impl MatchEngine {
  #[must_use]
  pub fn new(policy: MatchPolicy) -> Self {
    Self { policy }
  }
}

impl Matcher for MatchEngine {
  fn find(&mut self, index: &RecordIndex, query: &str) -> anyhow::Result<Vec<Arc<Record>>> {
    Ok(find(index, query, &self.policy))
  }
}

/// Custom filters receive the query and all records.
impl<F> Matcher for F
where
  F: FnMut(&str, &RecordIndex) -> anyhow::Result<Vec<Arc<Record>>>,
{
  fn find(&mut self, index: &RecordIndex, query: &str) -> anyhow::Result<Vec<Arc<Record>>> {
    self(query, index)
  }
}
