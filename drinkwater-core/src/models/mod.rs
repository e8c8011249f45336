mod cup_size;
mod goal;
mod history_entry;
mod user_id;

pub use cup_size::CupSize;
pub use goal::{Goal, GoalError};
pub use history_entry::HistoryEntry;
pub use user_id::UserId;
