//! Account commands: sign up, log in, log out, status.

use clap::{Args, Subcommand};
use std::io::{self, Write};

use drinkwater_core::AuthProvider;

use crate::app::App;

#[derive(Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand)]
pub enum AuthSubcommand {
    /// Create an account and sign in
    Signup {
        /// Email address (prompted if omitted)
        #[arg(long, short)]
        email: Option<String>,

        /// Password (prompted if omitted)
        #[arg(long, short)]
        password: Option<String>,
    },

    /// Sign in to an existing account
    Login {
        /// Email address (prompted if omitted)
        #[arg(long, short)]
        email: Option<String>,

        /// Password (prompted if omitted)
        #[arg(long, short)]
        password: Option<String>,
    },

    /// Sign out; stored data is kept
    Logout,

    /// Show who is signed in
    Status,
}

impl AuthCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            AuthSubcommand::Signup { email, password } => {
                let (email, password) = credentials(email, password)?;
                let identity = app.auth.create_account(&email, &password).await?;
                app.session.apply_identity(Some(identity.clone())).await;

                println!("Account created! Signed in as {}", identity.email);
                println!("Daily goal: {}", app.session.snapshot().goal);
                Ok(())
            }
            AuthSubcommand::Login { email, password } => {
                let (email, password) = credentials(email, password)?;
                let identity = app.auth.sign_in(&email, &password).await?;
                app.session.apply_identity(Some(identity.clone())).await;

                let view = app.session.snapshot();
                println!("Signed in as {}", identity.email);
                println!("Progress: {}ml / {}", view.consumed, view.goal);
                Ok(())
            }
            AuthSubcommand::Logout => {
                if app.auth.current_identity().is_none() {
                    println!("Not signed in.");
                    return Ok(());
                }
                app.auth.sign_out().await?;
                app.session.apply_identity(None).await;
                println!("Signed out.");
                Ok(())
            }
            AuthSubcommand::Status => {
                match app.auth.current_identity() {
                    Some(identity) => {
                        println!("Signed in as {}", identity.email);
                        println!("User ID: {}", identity.uid);
                    }
                    None => println!("Not signed in."),
                }
                Ok(())
            }
        }
    }
}

fn credentials(
    email: &Option<String>,
    password: &Option<String>,
) -> Result<(String, String), io::Error> {
    let email = match email {
        Some(email) => email.clone(),
        None => prompt("Email: ")?,
    };
    let password = match password {
        Some(password) => password.clone(),
        None => prompt("Password: ")?,
    };
    Ok((email, password))
}

fn prompt(label: &str) -> Result<String, io::Error> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
