use clap::{Args, Subcommand};

use drinkwater_core::Goal;

use crate::app::App;

#[derive(Args)]
pub struct GoalCommand {
    #[command(subcommand)]
    pub command: GoalSubcommand,
}

#[derive(Subcommand)]
pub enum GoalSubcommand {
    /// Show the daily goal
    Show,

    /// Set the daily goal (0-4000ml, rounded to 100ml)
    Set {
        /// Goal in ml
        ml: u32,
    },
}

impl GoalCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            GoalSubcommand::Show => {
                let view = app.session.snapshot();
                println!("Daily goal: {}", view.goal);
                if view.uid().is_none() {
                    println!("(default; sign in to use your own goal)");
                }
                Ok(())
            }
            GoalSubcommand::Set { ml } => {
                app.require_sign_in()?;

                let goal = parse_goal(*ml)?;
                if goal.ml() != *ml {
                    println!("Rounded {}ml to {}", ml, goal);
                }
                app.session.set_goal(goal).await?;
                println!("Daily goal set to {}", goal);
                Ok(())
            }
        }
    }
}

/// Range-checks raw input, then snaps it to the goal step.
fn parse_goal(ml: u32) -> Result<Goal, drinkwater_core::GoalError> {
    Goal::new(ml)?;
    Ok(Goal::snapped(ml))
}
