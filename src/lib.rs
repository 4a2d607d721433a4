pub mod config;
pub mod coordinates;
pub mod error;
pub mod map_event;
pub mod remote;
pub mod search;

pub use coordinates::WGS84Coordinate;
pub use error::{Result, SearchError};
pub use map_event::{MapEvent, MapHost};
pub use search::SearchControl;
