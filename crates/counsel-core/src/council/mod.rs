//! Council activity state store.
//!
//! - `activity`: stage, actor and monologue types
//! - `state`: `CouncilState` and the `CouncilAction` reducer
//! - `store`: the injectable, disposable `CouncilStore`

mod activity;
mod state;
mod store;

pub use activity::{ActivityState, DEFAULT_MONOLOGUE_WINDOW, MonologueEntry, Stage};
pub use state::{CouncilAction, CouncilState};
pub use store::CouncilStore;
