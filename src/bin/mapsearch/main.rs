use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, channel};
use std::time::{Duration, Instant};

use clap::Parser as CliParser;
use log::{error, warn};
use serde_json::{Value, json};

use mapsearch::config::{Config, SearchOptions, read_records};
use mapsearch::map_event::MapEvent;
use mapsearch::remote::{DEFAULT_VIEWER_URL, MapSender};
use mapsearch::search::{EventKind, InputPhase, Key, SearchControl};

const REPLY_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(20);
const FRAME: Duration = Duration::from_millis(200);

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Json file with the records to search: an array, a keyed object or a feature collection.
  #[arg(short, long)]
  records: Option<PathBuf>,

  /// Remote source url, `{s}` is replaced by the query.
  #[arg(short, long)]
  url: Option<String>,

  /// Query parameter naming the callback of callback-wrapped replies.
  #[arg(long)]
  jsonp_param: Option<String>,

  /// Json file with search options. Defaults to the options of the config file.
  #[arg(short, long)]
  options: Option<PathBuf>,

  /// Field holding the title of a record.
  #[arg(short = 'n', long)]
  property_name: Option<String>,

  /// Matches anywhere in the title instead of at its start.
  #[arg(short, long)]
  substring: bool,

  #[arg(short, long)]
  case_sensitive: bool,

  /// Maximum number of suggestions. -1 shows all.
  #[arg(short, long)]
  limit: Option<i64>,

  /// Locates the first suggestion of every query.
  #[arg(long)]
  commit: bool,

  /// Forwards map events to a map viewer instead of printing them.
  #[arg(long)]
  viewer: Option<Option<String>>,

  /// Queries to run. Lines of stdin are used if none are given.
  queries: Vec<String>,
}

fn search_options(args: &Args, config: &Config) -> anyhow::Result<SearchOptions> {
  let mut options = match &args.options {
    Some(path) => SearchOptions::from_path(path)?,
    None => config.search_options(),
  };
  if args.url.is_some() {
    options.url.clone_from(&args.url);
  }
  if args.jsonp_param.is_some() {
    options.jsonp_param.clone_from(&args.jsonp_param);
  }
  if let Some(name) = &args.property_name {
    options.property_name.clone_from(name);
  }
  if let Some(limit) = args.limit {
    options.tooltip_limit = limit;
  }
  options.initial &= !args.substring;
  options.case_sensitive |= args.case_sensitive;
  options.first_tip_submit |= args.commit;
  // Queries are complete, no inline completion or collapsing on the command line.
  options.auto_type = false;
  options.collapsed = false;
  Ok(options)
}

async fn run_query(control: &mut SearchControl, query: &str) {
  let start = Instant::now();
  control.search_text(query, start);
  while matches!(control.input_phase(), InputPhase::Fetching { .. }) {
    if start.elapsed() > REPLY_TIMEOUT {
      error!("No reply for '{query}' within {REPLY_TIMEOUT:?}");
      break;
    }
    tokio::time::sleep(POLL_INTERVAL).await;
    control.tick(Instant::now());
  }

  let candidates: Vec<Value> = control
    .tips()
    .iter()
    .map(|tip| json!({"title": tip.text, "lat": tip.location.lat, "lon": tip.location.lon}))
    .collect();
  println!(
    "{}",
    json!({"query": query, "candidates": candidates, "alert": control.alert()})
  );
}

/// Lets the circle of a located result shrink back to its radius.
async fn finish_animation(control: &mut SearchControl) {
  while control
    .feedback()
    .and_then(|f| f.circle.as_ref())
    .is_some_and(|circle| !circle.is_done())
  {
    tokio::time::sleep(FRAME).await;
    control.tick(Instant::now());
  }
}

fn forward(map_events: &Receiver<MapEvent>, sender: Option<&MapSender>) {
  for event in map_events.try_iter() {
    match sender {
      Some(sender) => sender.send_event(event),
      None => match serde_json::to_string(&event) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Cannot serialize map event: {e}"),
      },
    }
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let args = Args::parse();
  env_logger::init();

  let config = Config::new();
  let options = search_options(&args, &config)?;
  let remote = options.url.is_some();

  let (host, map_events) = channel();
  let mut builder = SearchControl::builder(options, host);
  if !remote && let Some(path) = args.records.as_ref().or(config.records.as_ref()) {
    builder = builder.records(read_records(path)?);
  }
  let mut control = builder.build()?;
  control.on(EventKind::LocationFound, |event| {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
  });

  let sender = match &args.viewer {
    Some(url) => {
      let url = url
        .clone()
        .or_else(|| config.viewer_url.clone())
        .unwrap_or_else(|| DEFAULT_VIEWER_URL.to_string());
      let sender = MapSender::new(url.clone());
      if !sender.viewer_available().await {
        warn!("No map viewer answers at {url}");
      }
      Some(sender)
    }
    None => None,
  };

  let queries: Box<dyn Iterator<Item = String>> = if args.queries.is_empty() {
    Box::new(std::io::stdin().lock().lines().map_while(Result::ok))
  } else {
    Box::new(args.queries.clone().into_iter())
  };

  for query in queries {
    let query = query.trim();
    if query.is_empty() {
      continue;
    }
    run_query(&mut control, query).await;
    if args.commit && !control.tips().is_empty() {
      control.key(Key::Enter, Instant::now());
      if sender.is_some() {
        finish_animation(&mut control).await;
      }
    }
    forward(&map_events, sender.as_ref());
  }

  if let Some(sender) = sender {
    sender.finalize().await;
  }
  Ok(())
}
