use clap::{Args, ValueEnum};

use drinkwater_core::CupSize;

use super::progress_bar;
use crate::app::App;

#[derive(Clone, Copy, ValueEnum)]
pub enum CupPreset {
    /// 200ml
    Glass,
    /// 350ml
    Mug,
    /// 500ml
    Bottle,
}

impl From<CupPreset> for CupSize {
    fn from(preset: CupPreset) -> Self {
        match preset {
            CupPreset::Glass => CupSize::GLASS,
            CupPreset::Mug => CupSize::MUG,
            CupPreset::Bottle => CupSize::BOTTLE,
        }
    }
}

/// Log a drink of water
#[derive(Args)]
pub struct DrinkCommand {
    /// Container to drink from
    #[arg(long, value_enum, conflicts_with = "amount")]
    pub cup: Option<CupPreset>,

    /// Custom amount in ml
    #[arg(long, short)]
    pub amount: Option<u32>,
}

impl DrinkCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(cup) = self.cup_size()? {
            app.session.set_cup_size(cup);
        }

        let outcome = app.session.drink().await;

        println!("You drank {}ml of water", outcome.amount);
        println!(
            "{} {}ml / {}",
            progress_bar(outcome.goal.fraction(outcome.consumed), 30),
            outcome.consumed,
            outcome.goal
        );
        if outcome.goal_reached {
            println!("Congratulations! You reached your hydration goal!");
        }
        if !outcome.persisted {
            match app.session.uid() {
                None => println!("Not signed in: this drink was not saved."),
                Some(_) => eprintln!("Warning: this drink could not be fully saved."),
            }
        }
        Ok(())
    }

    fn cup_size(&self) -> Result<Option<CupSize>, String> {
        if let Some(ml) = self.amount {
            return CupSize::new(ml)
                .map(Some)
                .ok_or_else(|| "Amount must be greater than 0ml".to_string());
        }
        Ok(self.cup.map(CupSize::from))
    }
}
