mod auth;
mod config_cmd;
mod drink;
mod goal;
mod history;
mod status;

pub use auth::AuthCommand;
pub use config_cmd::ConfigCommand;
pub use drink::DrinkCommand;
pub use goal::GoalCommand;
pub use history::HistoryCommand;
pub use status::StatusCommand;

use clap::ValueEnum;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Renders `fraction` (0.0 to 1.0) as a fixed-width bar: `[#####.....]`.
pub(crate) fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}
