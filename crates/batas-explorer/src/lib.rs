//! # batas-explorer
//!
//! Stateful core of the village boundary map explorer.
//!
//! [`MapExplorer`] keeps the map view, the selected village, the search
//! results and the detail panel consistent with user input and map events.
//! The map itself is driven through the [`MapEngine`] seam; village data comes
//! from a [`VillageBackend`], normally the REST [`ApiClient`].
//!
//! Overlapping fetches follow latest-request-wins: a response is applied only
//! if no newer request of the same kind was issued while it was in flight.

pub mod api_client;
pub mod backend;
pub mod detail;
pub mod explorer;
pub mod presentation;
pub mod search;
pub mod selection;
pub mod sequence;
pub mod style;
pub mod view;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api_client::ApiClient;
pub use backend::VillageBackend;
pub use detail::{DetailCoordinator, DetailOutcome, DetailRecord};
pub use explorer::MapExplorer;
pub use presentation::{Caption, DetailRow};
pub use search::{SearchCoordinator, SearchOutcome};
pub use selection::Selection;
pub use style::{OverlayStyle, StyleRule};
pub use view::{MapEngine, MapEvent, MapHandle, ViewController};
