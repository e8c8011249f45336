use clap::Args;
use serde::Serialize;

use drinkwater_core::{SessionSnapshot, SessionState};

use super::{progress_bar, OutputFormat};
use crate::app::App;

/// Show today's progress toward the goal
#[derive(Args)]
pub struct StatusCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    session: &'a SessionState,
    consumed: u32,
    goal: u32,
    percent: u32,
    goal_reached: bool,
    logged_today: u32,
    cup: u32,
}

impl StatusCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let view = app.session.snapshot();
        let logged_today = match view.uid() {
            Some(uid) => {
                app.session
                    .history()
                    .total_on(uid, chrono::Utc::now().date_naive())
                    .await
            }
            None => 0,
        };

        match self.format {
            OutputFormat::Json => {
                let report = report(&view, logged_today);
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Text => print_status(&view, logged_today),
        }
        Ok(())
    }
}

fn report(view: &SessionSnapshot, logged_today: u32) -> StatusReport<'_> {
    StatusReport {
        session: &view.session,
        consumed: view.consumed,
        goal: view.goal.ml(),
        percent: percent(view),
        goal_reached: view.goal_reached(),
        logged_today,
        cup: view.cup.ml(),
    }
}

fn percent(view: &SessionSnapshot) -> u32 {
    (view.goal.fraction(view.consumed) * 100.0).round() as u32
}

fn print_status(view: &SessionSnapshot, logged_today: u32) {
    match &view.session {
        SessionState::Authenticated(identity) => println!("Signed in as {}", identity.email),
        SessionState::Anonymous => println!("Not signed in"),
    }
    println!();
    println!("Progress:  {}ml / {}", view.consumed, view.goal);
    println!(
        "           {} {}%",
        progress_bar(view.goal.fraction(view.consumed), 30),
        percent(view)
    );
    println!("Today:     {}ml logged (UTC)", logged_today);
    println!("Cup size:  {}", view.cup);

    if view.goal_reached() {
        println!();
        println!("Goal reached. Well done!");
    }
}
