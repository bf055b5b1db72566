use inquire::{Password, PasswordDisplayMode, Text};

use crate::auth::PasswordHasher;
use crate::config::ServerConfig;
use crate::server::validation::{validate_password, validate_username};
use crate::store::Store;

use super::open_store;

pub fn run_user_add(
    config: &ServerConfig,
    username: Option<String>,
    password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = open_store(config)?;

    let username = if let Some(name) = username {
        validate_username(&name).map_err(anyhow::Error::msg)?;
        name
    } else if non_interactive {
        anyhow::bail!("--username is required in non-interactive mode");
    } else {
        Text::new("Username:")
            .with_validator(|input: &str| {
                Ok(validate_username(input)
                    .map(|()| inquire::validator::Validation::Valid)
                    .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.into())))
            })
            .prompt()?
    };

    if store.get_user_by_name(&username)?.is_some() {
        anyhow::bail!("User '{}' already exists", username);
    }

    let password = if let Some(password) = password {
        validate_password(&password).map_err(anyhow::Error::msg)?;
        password
    } else if non_interactive {
        anyhow::bail!("--password is required in non-interactive mode");
    } else {
        Password::new("Password:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .with_validator(|input: &str| {
                Ok(validate_password(input)
                    .map(|()| inquire::validator::Validation::Valid)
                    .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.into())))
            })
            .prompt()?
    };

    let hash = PasswordHasher::new().hash(&password)?;
    let user_id = store.create_user(&username, &hash)?;

    println!("Created user \"{username}\" (id {user_id})");

    Ok(())
}
