use std::fmt::Display;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use anyhow::anyhow;
use log::{debug, warn};
use serde_json::Value;

use crate::config::SearchOptions;
use crate::error::{Result, SearchError};

const USER_AGENT: &str = "mapsearch/0.1 (https://github.com/UdHo/mapvas)";
const CALLBACK_PREFIX: &str = "mapsearch_cb_";

/// Data delivered by a source for one request.
#[derive(Debug)]
pub struct SourceReply {
  pub seq: u64,
  pub query: String,
  pub result: Result<Value>,
}

/// Hands the data of one request back to the control that issued it.
///
/// Can be called synchronously from [`SourceAdapter::request`] or later from another
/// task. Replies of superseded requests are dropped by the control.
#[derive(Debug)]
pub struct Delivery {
  seq: u64,
  query: String,
  sender: Sender<SourceReply>,
}

impl Delivery {
  #[must_use]
  pub fn new(seq: u64, query: String, sender: Sender<SourceReply>) -> Self {
    Self { seq, query, sender }
  }

  #[must_use]
  pub fn seq(&self) -> u64 {
    self.seq
  }

  #[must_use]
  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn deliver(self, data: Value) {
    self.send(Ok(data));
  }

  pub fn fail(self, error: impl Display) {
    self.send(Err(SearchError::Source(error.to_string())));
  }

  pub fn send(self, result: Result<Value>) {
    let seq = self.seq;
    if self
      .sender
      .send(SourceReply {
        seq,
        query: self.query,
        result,
      })
      .is_err()
    {
      debug!("Control dropped before reply {seq} arrived");
    }
  }
}

/// Fetches raw records for a query on every search cycle.
pub trait SourceAdapter {
  fn name(&self) -> &str {
    "pull"
  }

  fn request(&mut self, query: &str, delivery: Delivery);
}

/// Pull callbacks receive the query text and the delivery handle.
impl<F> SourceAdapter for F
where
  F: FnMut(&str, Delivery),
{
  fn request(&mut self, query: &str, delivery: Delivery) {
    self(query, delivery);
  }
}

/// Where the records of a control come from.
pub enum Source {
  /// Resident records, indexed once.
  Static(Value),
  /// Records fetched per search cycle.
  Adapter(Box<dyn SourceAdapter>),
}

impl std::fmt::Debug for Source {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Static(_) => write!(f, "Source::Static"),
      Self::Adapter(adapter) => write!(f, "Source::Adapter({})", adapter.name()),
    }
  }
}

/// Transport used by [`RemoteSource`].
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
  async fn fetch(&self, url: &str) -> anyhow::Result<String>;
}

pub struct SurfFetcher {
  client: surf::Client,
}

impl Default for SurfFetcher {
  fn default() -> Self {
    Self {
      client: surf::Client::new(),
    }
  }
}

#[async_trait::async_trait]
impl Fetcher for SurfFetcher {
  async fn fetch(&self, url: &str) -> anyhow::Result<String> {
    self
      .client
      .get(url)
      .header("User-Agent", USER_AGENT)
      .recv_string()
      .await
      .map_err(|e| anyhow!("Request to {url} failed: {e}"))
  }
}

/// Builds the request url for a query.
pub enum UrlTemplate {
  /// `{s}` is replaced by the encoded query.
  Template(String),
  Builder(Box<dyn Fn(&str) -> String + Send + Sync>),
}

impl UrlTemplate {
  #[must_use]
  pub fn build(&self, query: &str) -> String {
    match self {
      Self::Template(template) => template.replace("{s}", &urlencoding::encode(query)),
      Self::Builder(builder) => builder(query),
    }
  }
}

/// Requests records from a remote endpoint on a tokio runtime.
pub struct RemoteSource {
  url: UrlTemplate,
  jsonp_param: Option<String>,
  fetcher: Arc<dyn Fetcher>,
}

impl RemoteSource {
  /// # Errors
  /// Fails if the template is empty.
  pub fn new(template: impl Into<String>) -> Result<Self> {
    let template = template.into();
    if template.trim().is_empty() {
      return Err(SearchError::InvalidUrlTemplate(template));
    }
    if !template.contains("{s}") {
      warn!("Url template '{template}' has no {{s}} placeholder, the query is not sent");
    }
    Ok(Self {
      url: UrlTemplate::Template(template),
      jsonp_param: None,
      fetcher: Arc::new(SurfFetcher::default()),
    })
  }

  #[must_use]
  pub fn with_builder(builder: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
    Self {
      url: UrlTemplate::Builder(Box::new(builder)),
      jsonp_param: None,
      fetcher: Arc::new(SurfFetcher::default()),
    }
  }

  /// # Errors
  /// Fails if the options carry an empty url.
  pub fn from_options(options: &SearchOptions) -> Option<Result<Self>> {
    let url = options.url.as_ref()?;
    Some(Self::new(url.clone()).map(|source| source.with_jsonp_param(options.jsonp_param.clone())))
  }

  #[must_use]
  pub fn with_jsonp_param(mut self, param: Option<String>) -> Self {
    self.jsonp_param = param;
    self
  }

  #[must_use]
  pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
    self.fetcher = fetcher;
    self
  }

  /// The request url and, for callback-wrapped replies, the callback name.
  #[must_use]
  pub fn request_url(&self, query: &str, seq: u64) -> (String, Option<String>) {
    let url = self.url.build(query);
    match &self.jsonp_param {
      Some(param) => {
        let callback = format!("{CALLBACK_PREFIX}{seq}");
        let separator = if url.contains('?') { '&' } else { '?' };
        (format!("{url}{separator}{param}={callback}"), Some(callback))
      }
      None => (url, None),
    }
  }
}

impl SourceAdapter for RemoteSource {
  fn name(&self) -> &'static str {
    "remote"
  }

  fn request(&mut self, query: &str, delivery: Delivery) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
      delivery.fail("no tokio runtime available for remote requests");
      return;
    };
    let (url, callback) = self.request_url(query, delivery.seq());
    let fetcher = Arc::clone(&self.fetcher);
    debug!("Requesting {url}");
    runtime.spawn(async move {
      let result = fetch(fetcher.as_ref(), &url, callback.as_deref()).await;
      delivery.send(result);
    });
  }
}

async fn fetch(fetcher: &dyn Fetcher, url: &str, callback: Option<&str>) -> Result<Value> {
  let body = fetcher
    .fetch(url)
    .await
    .map_err(|e| SearchError::Source(e.to_string()))?;
  let json = match callback {
    Some(callback) => unwrap_callback(&body, callback)?,
    None => body.as_str(),
  };
  Ok(serde_json::from_str(json)?)
}

/// Extracts the payload of `callback(...)`.
///
/// # Errors
/// Fails if the body is not wrapped in the callback.
pub fn unwrap_callback<'a>(body: &'a str, callback: &str) -> Result<&'a str> {
  let trimmed = body.trim().trim_end_matches(';').trim_end();
  trimmed
    .strip_prefix(callback)
    .map(str::trim_start)
    .and_then(|rest| rest.strip_prefix('('))
    .and_then(|rest| rest.strip_suffix(')'))
    .ok_or_else(|| SearchError::Source(format!("reply is not wrapped in {callback}(...)")))
}
