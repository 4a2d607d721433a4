use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, channel};
use std::time::{Duration, Instant};

use assert_approx_eq::assert_approx_eq;
use mapsearch::config::SearchOptions;
use mapsearch::search::matcher::find;
use mapsearch::search::{
  ControlState, Delivery, EventKind, InputPhase, Key, MatchPolicy, SearchControl, SearchEvent,
  TipList,
};
use mapsearch::{MapEvent, MapHost, SearchError};
use rstest::rstest;
use serde_json::{Value, json};

const DEBOUNCE: Duration = Duration::from_millis(400);
const COLLAPSE_DELAY: Duration = Duration::from_millis(1200);

fn cities() -> Value {
  let data = std::fs::read_to_string("tests/resources/cities.json").expect("Failed to read cities");
  serde_json::from_str(&data).expect("cities.json is valid json")
}

fn options() -> SearchOptions {
  SearchOptions::default()
}

fn no_autotype() -> SearchOptions {
  SearchOptions {
    auto_type: false,
    ..options()
  }
}

struct Harness {
  control: SearchControl,
  view: Rc<RefCell<TipList>>,
  map: Receiver<MapEvent>,
  events: Rc<RefCell<Vec<SearchEvent>>>,
}

impl Harness {
  fn new(options: SearchOptions) -> Self {
    Self::with_records(options, cities())
  }

  fn with_records(options: SearchOptions, records: Value) -> Self {
    let (host, map) = channel();
    let view = Rc::new(RefCell::new(TipList::default()));
    let control = SearchControl::builder(options, host)
      .records(records)
      .view(Rc::clone(&view))
      .build()
      .unwrap();
    Self::wrap(control, view, map)
  }

  fn wrap(mut control: SearchControl, view: Rc<RefCell<TipList>>, map: Receiver<MapEvent>) -> Self {
    let events = Rc::new(RefCell::new(Vec::new()));
    for kind in EventKind::all() {
      let events = Rc::clone(&events);
      control.on(*kind, move |event| {
        events.borrow_mut().push(event.clone());
        Ok(())
      });
    }
    Self {
      control,
      view,
      map,
      events,
    }
  }

  fn titles(&self) -> Vec<String> {
    self
      .control
      .candidates()
      .iter()
      .map(|record| record.title.clone())
      .collect()
  }

  fn event_types(&self) -> Vec<&'static str> {
    self.events.borrow().iter().map(SearchEvent::event_type).collect()
  }

  fn found(&self) -> Option<String> {
    self.events.borrow().iter().rev().find_map(|event| match event {
      SearchEvent::LocationFound { title, .. } => Some(title.clone()),
      _ => None,
    })
  }

  fn map_events(&self) -> Vec<MapEvent> {
    self.map.try_iter().collect()
  }
}

#[test]
fn test_typing_suggests_after_debounce_and_autotypes() {
  let mut h = Harness::new(options());
  let start = Instant::now();

  h.control.type_text("pa", start);
  assert_eq!(h.control.state(), ControlState::Expanded);
  assert_eq!(h.event_types(), ["search:expanded"]);

  h.control.tick(start + Duration::from_millis(100));
  assert!(h.control.candidates().is_empty());

  h.control.tick(start + DEBOUNCE);
  assert_eq!(h.titles(), ["Paris", "Parma", "Pavia"]);
  assert_eq!(h.control.text(), "Paris");

  let view = h.view.borrow();
  assert!(view.visible);
  assert_eq!(view.tips.len(), 3);
  assert_eq!(view.input, "Paris");
  assert_eq!(view.selection, Some(2..5));
}

#[test]
fn test_arrow_keys_select_and_enter_locates() {
  let mut h = Harness::new(options());
  let now = Instant::now();
  h.control.search_text("pa", now);

  h.control.key(Key::Down, now);
  assert_eq!(h.control.text(), "Paris");
  h.control.key(Key::Down, now);
  assert_eq!(h.control.text(), "Parma");
  assert_eq!(h.view.borrow().cursor, Some(1));
  h.control.key(Key::Enter, now);

  {
    let events = h.events.borrow();
    let Some(SearchEvent::LocationFound {
      title,
      latlng,
      layer,
      ..
    }) = events.last()
    else {
      panic!("No location found: {events:?}");
    };
    assert_eq!(title, "Parma");
    assert_approx_eq!(latlng.lat, 44.8015);
    assert_approx_eq!(latlng.lon, 10.3279);
    assert_eq!(layer.as_ref().unwrap()["country"], "IT");
  }

  let map = h.map_events();
  assert!(matches!(map[0], MapEvent::FocusOn { zoom_level: None, .. }));
  let MapEvent::Circle { radius, .. } = map[1] else {
    panic!("Expected a circle: {map:?}");
  };
  assert_approx_eq!(radius, 20.0);

  assert_eq!(h.control.state(), ControlState::Expanded);
  assert_eq!(h.control.text(), "Parma");
  assert!(h.control.tips().is_empty());
  assert!(!h.view.borrow().visible);
}

#[test]
fn test_up_from_first_tip_clears_selection() {
  let mut h = Harness::new(no_autotype());
  let now = Instant::now();
  h.control.search_text("pa", now);

  h.control.key(Key::Down, now);
  for _ in 0..5 {
    h.control.key(Key::Down, now);
  }
  assert_eq!(h.control.query().cursor, Some(2));
  h.control.key(Key::Up, now);
  h.control.key(Key::Up, now);
  h.control.key(Key::Up, now);
  assert_eq!(h.control.query().cursor, None);
  assert_eq!(h.view.borrow().cursor, None);
}

#[test]
fn test_keystrokes_within_debounce_search_once() {
  let queries = Rc::new(RefCell::new(Vec::new()));
  let seen = Rc::clone(&queries);
  let (host, _map) = channel::<MapEvent>();
  let mut control = SearchControl::builder(options(), host)
    .records(cities())
    .filter_data(move |query, index| {
      seen.borrow_mut().push(query.to_string());
      Ok(find(index, query, &MatchPolicy::default()))
    })
    .build()
    .unwrap();

  let start = Instant::now();
  for (elapsed, text) in [(0, "p"), (100, "pa"), (200, "par")] {
    let now = start + Duration::from_millis(elapsed);
    control.type_text(text, now);
    control.tick(now);
  }
  control.tick(start + Duration::from_millis(500));
  assert!(queries.borrow().is_empty());

  control.tick(start + Duration::from_millis(600));
  control.tick(start + Duration::from_millis(1200));
  assert_eq!(*queries.borrow(), ["par"]);
  assert_eq!(control.candidates().len(), 2);
}

#[test]
fn test_stale_replies_are_discarded() {
  let deliveries: Rc<RefCell<Vec<Delivery>>> = Rc::default();
  let requests = Rc::clone(&deliveries);
  let (host, _map) = channel::<MapEvent>();
  let mut control = SearchControl::builder(no_autotype(), host)
    .pull(move |_query, delivery| requests.borrow_mut().push(delivery))
    .build()
    .unwrap();

  let now = Instant::now();
  control.search_text("pa", now);
  control.search_text("par", now);
  let mut pending: Vec<Delivery> = deliveries.borrow_mut().drain(..).collect();
  assert_eq!(pending.len(), 2);
  let current = pending.pop().unwrap();
  let stale = pending.pop().unwrap();
  assert_eq!(stale.query(), "pa");
  assert_eq!(current.query(), "par");

  stale.deliver(json!([{"title": "Pavia", "loc": [45.18, 9.15]}]));
  control.tick(now);
  assert!(control.candidates().is_empty());
  assert!(matches!(control.input_phase(), InputPhase::Fetching { .. }));

  current.deliver(json!([
    {"title": "Parma", "loc": [44.8, 10.3]},
    {"title": "Paris", "loc": [48.85, 2.35]}
  ]));
  control.tick(now);
  let titles: Vec<_> = control.candidates().iter().map(|r| r.title.as_str()).collect();
  assert_eq!(titles, ["Parma", "Paris"]);
}

#[rstest]
#[case("pa", 0)]
#[case("par", 2)]
fn test_min_length(#[case] text: &str, #[case] expected: usize) {
  let mut h = Harness::new(SearchOptions {
    min_length: 3,
    ..options()
  });
  let start = Instant::now();
  h.control.type_text(text, start);
  h.control.tick(start + Duration::from_secs(1));
  assert_eq!(h.control.candidates().len(), expected);
}

#[rstest]
#[case(true, false, "ar", &[])]
#[case(false, false, "ar", &["Paris", "Parma"])]
#[case(true, true, "pa", &[])]
#[case(true, true, "Pa", &["Paris", "Parma", "Pavia"])]
#[case(true, false, "PA", &["Paris", "Parma", "Pavia"])]
fn test_matching_modes(
  #[case] initial: bool,
  #[case] case_sensitive: bool,
  #[case] query: &str,
  #[case] expected: &[&str],
) {
  let mut h = Harness::new(SearchOptions {
    initial,
    case_sensitive,
    ..no_autotype()
  });
  h.control.search_text(query, Instant::now());
  assert_eq!(h.titles(), expected);
}

#[test]
fn test_unknown_text_alerts_until_timeout() {
  let mut h = Harness::new(options());
  let now = Instant::now();
  h.control.search_text("zurich", now);
  assert!(h.control.tips().is_empty());

  h.control.key(Key::Enter, now);
  assert_eq!(h.control.state(), ControlState::Alerting);
  assert_eq!(h.control.alert(), Some("Location not found"));
  assert_eq!(h.view.borrow().alert.as_deref(), Some("Location not found"));

  h.control.tick(now + COLLAPSE_DELAY - Duration::from_millis(1));
  assert_eq!(h.control.state(), ControlState::Alerting);
  h.control.tick(now + COLLAPSE_DELAY);
  assert_eq!(h.control.state(), ControlState::Expanded);
  assert!(h.control.alert().is_none());
  assert!(h.view.borrow().alert.is_none());
  assert!(h.found().is_none());
}

#[test]
fn test_typing_hides_alert() {
  let mut h = Harness::new(options());
  let now = Instant::now();
  h.control.show_alert(Some("Nothing here"), now);
  assert_eq!(h.control.alert(), Some("Nothing here"));

  h.control.type_text("ro", now);
  assert!(h.control.alert().is_none());
  assert_eq!(h.control.state(), ControlState::Expanded);
  assert_eq!(h.event_types(), ["search:expanded"]);
}

#[test]
fn test_cancel_clears_and_collapses() {
  let mut h = Harness::new(options());
  let now = Instant::now();
  h.control.type_text("pa", now);
  assert!(h.control.cancel_visible());

  h.control.cancel();
  assert_eq!(
    h.event_types(),
    ["search:expanded", "search:cancel", "search:collapsed"]
  );
  {
    let events = h.events.borrow();
    assert_eq!(events[1].text(), "pa");
    assert_eq!(events[2].text(), "");
  }
  assert_eq!(h.control.state(), ControlState::Collapsed);
  assert_eq!(h.control.text(), "");
  assert!(!h.control.cancel_visible());

  // A pending search does not run after cancelling.
  h.control.tick(now + Duration::from_secs(1));
  assert!(h.control.candidates().is_empty());
}

#[test]
fn test_escape_hides_tips_then_cancels() {
  let mut h = Harness::new(options());
  let now = Instant::now();
  h.control.search_text("pa", now);
  assert_eq!(h.control.tips().len(), 3);

  h.control.key(Key::Escape, now);
  assert!(h.control.tips().is_empty());
  assert_eq!(h.control.state(), ControlState::Expanded);
  assert_eq!(h.control.text(), "Paris");

  h.control.key(Key::Escape, now);
  assert_eq!(h.control.state(), ControlState::Collapsed);
  assert!(h.event_types().contains(&"search:cancel"));
}

#[test]
fn test_enter_toggles_empty_control() {
  let mut h = Harness::new(options());
  let now = Instant::now();
  h.control.key(Key::Enter, now);
  assert_eq!(h.control.state(), ControlState::Expanded);
  h.control.key(Key::Enter, now);
  assert_eq!(h.control.state(), ControlState::Collapsed);
  assert_eq!(h.event_types(), ["search:expanded", "search:collapsed"]);
}

#[test]
fn test_blur_collapses_after_delay() {
  let mut h = Harness::new(options());
  let now = Instant::now();
  h.control.focus();
  h.control.blur(now);
  h.control.tick(now + COLLAPSE_DELAY - Duration::from_millis(1));
  assert_eq!(h.control.state(), ControlState::Expanded);
  h.control.tick(now + COLLAPSE_DELAY);
  assert_eq!(h.control.state(), ControlState::Collapsed);
}

#[test]
fn test_hover_and_focus_keep_control_open() {
  let mut h = Harness::new(options());
  let now = Instant::now();
  h.control.focus();
  h.control.blur(now);
  h.control.hover();
  h.control.tick(now + Duration::from_secs(2));
  assert_eq!(h.control.state(), ControlState::Expanded);

  h.control.blur(now);
  h.control.focus();
  h.control.tick(now + Duration::from_secs(2));
  assert_eq!(h.control.state(), ControlState::Expanded);
}

#[rstest]
#[case(true)]
#[case(false)]
fn test_collapse_and_feedback_marker(#[case] hide: bool) {
  let mut h = Harness::new(SearchOptions {
    hide_marker_on_collapse: hide,
    ..options()
  });
  let now = Instant::now();
  h.control.search_text("rom", now);
  // The only tip is taken on enter.
  h.control.key(Key::Enter, now);
  assert_eq!(h.control.feedback().unwrap().title, "Rome");
  h.map_events();

  h.control.collapse();
  assert_eq!(h.control.feedback().is_none(), hide);
  assert_eq!(h.map_events().contains(&MapEvent::ClearFeedback), hide);
  let events = h.events.borrow();
  assert!(matches!(events.last(), Some(SearchEvent::Collapsed { text }) if text == "Rome"));
}

#[test]
fn test_hidden_tips_still_autotype() {
  let mut h = Harness::new(SearchOptions {
    tooltip_limit: 0,
    ..options()
  });
  let now = Instant::now();
  h.control.search_text("pa", now);
  assert!(h.control.tips().is_empty());
  assert!(!h.view.borrow().visible);
  assert_eq!(h.control.candidates().len(), 3);
  assert_eq!(h.control.text(), "Paris");

  h.control.key(Key::Enter, now);
  assert_eq!(h.found().as_deref(), Some("Paris"));
}

#[test]
fn test_tooltip_limit_truncates() {
  let mut h = Harness::new(SearchOptions {
    tooltip_limit: 2,
    ..no_autotype()
  });
  h.control.search_text("pa", Instant::now());
  assert_eq!(h.titles(), ["Paris", "Parma"]);
  assert_eq!(h.view.borrow().tips.len(), 2);
}

#[rstest]
#[case(true, Some("Paris"))]
#[case(false, None)]
fn test_first_tip_submit(#[case] first_tip_submit: bool, #[case] expected: Option<&str>) {
  let mut h = Harness::new(SearchOptions {
    first_tip_submit,
    ..no_autotype()
  });
  let now = Instant::now();
  h.control.search_text("pa", now);
  h.control.key(Key::Enter, now);
  assert_eq!(h.found().as_deref(), expected);
  if expected.is_none() {
    assert_eq!(h.control.state(), ControlState::Alerting);
  }
}

#[rstest]
#[case("BERN", Some("Bern"))]
#[case("ber", None)]
fn test_enter_matches_title_exactly(#[case] text: &str, #[case] expected: Option<&str>) {
  let mut h = Harness::new(SearchOptions {
    tooltip_limit: 0,
    ..no_autotype()
  });
  let now = Instant::now();
  h.control.search_text(text, now);
  assert!(h.control.tips().is_empty());
  h.control.key(Key::Enter, now);
  assert_eq!(h.found().as_deref(), expected);
}

#[test]
fn test_click_tip_locates() {
  let mut h = Harness::new(no_autotype());
  let now = Instant::now();
  h.control.search_text("pa", now);
  h.control.click_tip(2, now);
  assert_eq!(h.found().as_deref(), Some("Pavia"));
  assert_eq!(h.control.text(), "Pavia");
}

#[test]
fn test_click_tip_without_auto_submit_fills_input() {
  let mut h = Harness::new(SearchOptions {
    tip_auto_submit: false,
    ..no_autotype()
  });
  let now = Instant::now();
  h.control.search_text("pa", now);
  h.control.click_tip(1, now);
  assert_eq!(h.control.text(), "Parma");
  assert!(h.control.tips().is_empty());
  assert!(h.found().is_none());

  h.control.key(Key::Enter, now);
  assert_eq!(h.found().as_deref(), Some("Parma"));
}

#[test]
fn test_hover_tip_keeps_text() {
  let mut h = Harness::new(no_autotype());
  let now = Instant::now();
  h.control.search_text("pa", now);
  h.control.hover_tip(1);
  assert_eq!(h.control.text(), "pa");
  assert_eq!(h.view.borrow().cursor, Some(1));
  h.control.hover_tip(7);
  assert_eq!(h.view.borrow().cursor, Some(1));

  h.control.key(Key::Enter, now);
  assert_eq!(h.found().as_deref(), Some("Parma"));
}

#[test]
fn test_auto_collapse_after_locate() {
  let mut h = Harness::new(SearchOptions {
    auto_collapse: true,
    ..options()
  });
  let now = Instant::now();
  h.control.search_text("rom", now);
  h.control.key(Key::Enter, now);
  assert_eq!(
    h.event_types(),
    ["search:expanded", "search:locationfound", "search:collapsed"]
  );
  assert_eq!(h.control.state(), ControlState::Collapsed);
}

#[test]
fn test_not_collapsible_control_stays_open() {
  let mut h = Harness::new(SearchOptions {
    collapsed: false,
    ..options()
  });
  let now = Instant::now();
  assert_eq!(h.control.state(), ControlState::Expanded);
  assert!(h.control.input_visible());

  h.control.type_text("pa", now);
  h.control.cancel();
  assert_eq!(h.event_types(), ["search:cancel", "search:collapsed"]);
  assert_eq!(h.control.state(), ControlState::Expanded);
  assert_eq!(h.control.text(), "");
}

#[test]
fn test_listener_failures_are_isolated() {
  let (host, _map) = channel::<MapEvent>();
  let mut control = SearchControl::builder(options(), host)
    .records(cities())
    .build()
    .unwrap();
  let calls = Rc::new(RefCell::new(0));
  control.on(EventKind::Expanded, |_| anyhow::bail!("listener is broken"));
  control.on(EventKind::Expanded, |_| panic!("listener exploded"));
  let counter = Rc::clone(&calls);
  let id = control.on(EventKind::Expanded, move |_| {
    *counter.borrow_mut() += 1;
    Ok(())
  });

  control.expand();
  assert_eq!(*calls.borrow(), 1);
  assert_eq!(control.state(), ControlState::Expanded);

  assert!(control.off(id));
  control.collapse();
  control.expand();
  assert_eq!(*calls.borrow(), 1);
}

#[test]
fn test_set_source_replaces_records() {
  let mut h = Harness::new(options());
  let now = Instant::now();
  h.control.search_text("ber", now);
  assert_eq!(h.titles(), ["Berlin", "Bern"]);
  assert_eq!(h.control.text(), "Berlin");

  h.control
    .set_source(json!([{"title": "Bergamo", "loc": [45.69, 9.67]}]), now)
    .unwrap();
  assert_eq!(h.control.index().len(), 1);
  assert_eq!(h.titles(), ["Bergamo"]);
  assert_eq!(h.control.text(), "Bergamo");
}

#[test]
fn test_set_layer_with_features() {
  let mut h = Harness::new(no_autotype());
  let now = Instant::now();
  let layer = json!({
    "type": "FeatureCollection",
    "features": [{
      "type": "Feature",
      "properties": {"title": "Lyon"},
      "geometry": {"type": "Point", "coordinates": [4.8357, 45.764]}
    }]
  });
  h.control.set_layer(layer, now).unwrap();
  h.control.search_text("ly", now);
  h.control.key(Key::Enter, now);

  let events = h.events.borrow();
  let Some(SearchEvent::LocationFound { latlng, layer, .. }) = events.last() else {
    panic!("No location found: {events:?}");
  };
  assert_approx_eq!(latlng.lat, 45.764);
  assert_approx_eq!(latlng.lon, 4.8357);
  assert_eq!(layer.as_ref().unwrap()["properties"]["title"], "Lyon");
}

#[test]
fn test_keyed_records() {
  let records = json!({
    "Lyon": [45.764, 4.8357],
    "Lille": {"loc": {"lat": 50.6292, "lng": 3.0573}}
  });
  let mut h = Harness::with_records(no_autotype(), records);
  let now = Instant::now();
  h.control.search_text("l", now);
  assert_eq!(h.titles(), ["Lyon", "Lille"]);
  h.control.search_text("lil", now);
  h.control.key(Key::Enter, now);
  assert_eq!(h.found().as_deref(), Some("Lille"));
}

#[test]
fn test_format_data_reshapes_records() {
  let (host, _map) = channel::<MapEvent>();
  let mut control = SearchControl::builder(no_autotype(), host)
    .records(json!({"results": [{"name": "Turin", "lat": 45.07, "lon": 7.68}]}))
    .format_data(|data| {
      let items = data["results"].as_array().cloned().unwrap_or_default();
      Ok(Value::Array(
        items
          .into_iter()
          .map(|item| json!({"title": item["name"], "loc": [item["lat"], item["lon"]]}))
          .collect(),
      ))
    })
    .build()
    .unwrap();
  control.search_text("tu", Instant::now());
  assert_eq!(control.candidates()[0].title, "Turin");
}

#[test]
fn test_failing_format_or_missing_source_fails_build() {
  let (host, _map) = channel::<MapEvent>();
  let result = SearchControl::builder(options(), host)
    .records(cities())
    .format_data(|_| anyhow::bail!("unexpected shape"))
    .build();
  assert!(matches!(result, Err(SearchError::Source(_))));

  let (host, _map) = channel::<MapEvent>();
  let result = SearchControl::builder(options(), host).build();
  assert!(matches!(result, Err(SearchError::MissingSource)));
}

#[test]
fn test_move_to_location_hook() {
  let (host, map) = channel();
  let mut h = Harness::wrap(
    SearchControl::builder(
      SearchOptions {
        marker: None,
        ..options()
      },
      host,
    )
    .records(cities())
    .view(TipList::default())
    .move_to_location(|at, title, host| {
      host.send(MapEvent::Marker {
        coordinate: at,
        label: title.to_string(),
        icon: None,
      });
      Ok(())
    })
    .build()
    .unwrap(),
    Rc::default(),
    map,
  );
  let now = Instant::now();
  h.control.search_text("rom", now);
  h.control.key(Key::Enter, now);
  let map = h.map_events();
  assert_eq!(map.len(), 1);
  assert!(matches!(&map[0], MapEvent::Marker { label, .. } if label == "Rome"));
  assert_eq!(h.found().as_deref(), Some("Rome"));
}

#[test]
fn test_failing_move_hook_alerts() {
  let (host, _map) = channel::<MapEvent>();
  let mut control = SearchControl::builder(options(), host)
    .records(cities())
    .move_to_location(|_, _, _| anyhow::bail!("map is gone"))
    .build()
    .unwrap();
  let now = Instant::now();
  control.search_text("rom", now);
  control.key(Key::Enter, now);
  assert_eq!(control.state(), ControlState::Alerting);
  assert!(control.feedback().is_none());
}

#[test]
fn test_build_tip() {
  let (host, map) = channel();
  let view = Rc::new(RefCell::new(TipList::default()));
  let control = SearchControl::builder(no_autotype(), host)
    .records(cities())
    .view(Rc::clone(&view))
    .build_tip(|record| {
      format!(
        "{} ({})",
        record.title,
        record.raw["country"].as_str().unwrap_or("?")
      )
    })
    .build()
    .unwrap();
  let mut h = Harness::wrap(control, view, map);
  h.control.search_text("be", Instant::now());
  let texts: Vec<_> = h.view.borrow().tips.iter().map(|tip| tip.text.clone()).collect();
  assert_eq!(texts, ["Berlin (DE)", "Bern (CH)"]);
  assert_eq!(h.control.tips()[1].text, "Bern (CH)");
}

#[test]
fn test_circle_shrinks_on_ticks() {
  let mut h = Harness::new(options());
  let now = Instant::now();
  h.control.search_text("rom", now);
  h.control.key(Key::Enter, now);
  h.map_events();

  let frame = Duration::from_millis(200);
  let mut radii = Vec::new();
  for i in 1..=4 {
    h.control.tick(now + frame * i);
    radii.extend(h.map_events().into_iter().filter_map(|event| match event {
      MapEvent::CircleRadius(radius) => Some(radius),
      _ => None,
    }));
  }
  assert_eq!(radii.len(), 3);
  assert_approx_eq!(radii[0], 17.5);
  assert_approx_eq!(radii[1], 14.0);
  assert_approx_eq!(radii[2], 10.0);
  let circle = h.control.feedback().unwrap().circle.as_ref().unwrap();
  assert!(circle.is_done());
}

#[test]
fn test_map_host_trait_object() {
  let (sender, map) = channel::<MapEvent>();
  let mut host: Box<dyn MapHost> = Box::new(sender);
  host.send(MapEvent::ClearFeedback);
  assert_eq!(map.try_recv().unwrap(), MapEvent::ClearFeedback);
}

#[test]
fn test_keyed_records_keep_document_order() {
  let records = json!({"Parma": [44.8015, 10.3279], "Paris": [48.8566, 2.3522]});
  let mut h = Harness::with_records(no_autotype(), records);
  h.control.search_text("par", Instant::now());
  assert_eq!(h.titles(), ["Parma", "Paris"]);
}

#[test]
fn test_research_keeps_typed_text() {
  let mut h = Harness::new(options());
  let now = Instant::now();
  h.control.search_text("pa", now);
  assert_eq!(h.control.text(), "Paris");

  h.control
    .set_source(json!([{"title": "Sapporo", "loc": [43.06, 141.35]}]), now)
    .unwrap();
  assert!(h.control.candidates().is_empty());
  assert_eq!(h.control.text(), "pa");
  assert_eq!(h.view.borrow().input, "pa");
}
