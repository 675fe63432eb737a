//! Reversible edits: the record mutator, the action log and the bulk
//! coordinator built on top of them.

pub mod actions;
pub mod bulk;
pub mod history;
pub mod mutator;

pub use actions::{AddTagAction, RemoveTagAction, SetValueAction};
pub use bulk::{apply_to_all, delete_from_all, BulkOutcome};
pub use history::{CompositeAction, EditAction, History, HistoryState};
