//! Screens built on `enact_core`: a stopwatch, a click counter and a
//! debounced package search.

pub mod counter;
pub mod search;
pub mod stopwatch;

pub use counter::counter;
pub use search::{search, search_results, ResultsProps, SearchProps, SearchState};
pub use stopwatch::{format_elapsed, stopwatch, StopwatchProps};
