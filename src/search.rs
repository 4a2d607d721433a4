//! Incremental search over located records: matching, suggestion state, the control
//! lifecycle and the map feedback of a found location.

pub mod control;
pub mod events;
pub mod index;
pub mod input;
pub mod matcher;
pub mod presenter;
pub mod record;
pub mod source;
pub mod state;
pub mod view;

pub use control::{Key, SearchControl, SearchControlBuilder};
pub use events::{EventKind, ListenerId, SearchEvent};
pub use index::RecordIndex;
pub use input::{InputPhase, QueryState};
pub use matcher::{MatchEngine, MatchPolicy, Matcher, ResultLimit};
pub use record::{Record, RecordFields};
pub use source::{Delivery, Fetcher, RemoteSource, SourceAdapter, SurfFetcher};
pub use state::ControlState;
pub use view::{SuggestionView, Tip, TipList};
