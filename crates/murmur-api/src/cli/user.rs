//! Account provisioning CLI commands.

use anyhow::{Result, bail};
use clap::Subcommand;
use console::style;
use dialoguer::Password;

use murmur_types::error::AccountError;
use murmur_types::identity::Rank;

use crate::state::AppState;

#[derive(Subcommand)]
pub enum UserCommand {
    /// Create an account.
    Add {
        /// Login name.
        username: String,

        /// Grant the admin rank.
        #[arg(long)]
        admin: bool,

        /// Password (prompted with hidden input when omitted).
        #[arg(long)]
        password: Option<String>,
    },
}

pub async fn run(state: &AppState, action: UserCommand, json: bool) -> Result<()> {
    match action {
        UserCommand::Add {
            username,
            admin,
            password,
        } => add_user(state, &username, admin, password, json).await,
    }
}

/// Create an account, prompting for the password if not given.
///
/// # Examples
///
/// ```bash
/// murmur user add alice
/// murmur user add root --admin --password 'correct horse'
/// ```
pub async fn add_user(
    state: &AppState,
    username: &str,
    admin: bool,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt(format!("Password for {}", style(username).bold()))
            .with_confirmation("Repeat password", "Passwords do not match")
            .interact()?,
    };

    let rank = if admin { Rank::Admin } else { Rank::User };
    let user = match state.accounts.create_user(username, &password, rank).await {
        Ok(user) => user,
        Err(AccountError::Validation(errors)) => {
            let detail = errors.into_values().collect::<Vec<_>>().join(" ");
            bail!("{detail}");
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!(
            "  {} User '{}' created ({})",
            style("✓").green().bold(),
            style(&user.username).bold(),
            user.rank
        );
    }

    Ok(())
}
