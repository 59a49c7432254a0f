use crate::auth::{Authenticator, SignUp};
use crate::settings::{Backend, Settings};
use crate::store;
use anyhow::{bail, Context};

async fn authenticator(settings: &Settings) -> anyhow::Result<Authenticator> {
    if settings.database.backend == Backend::Memory {
        bail!("user management needs a persistent backend, database.backend is \"memory\"");
    }
    let stores = store::connect(&settings.database)
        .await
        .context("cannot connect to the database")?;
    Ok(Authenticator::new(
        stores.users,
        settings.auth.password_scheme,
    ))
}

/// Registers a user from the command line, prompting for the password.
pub async fn create_user(settings: &Settings, email: &str) -> anyhow::Result<()> {
    let authenticator = authenticator(settings).await?;
    let password = rpassword::prompt_password("Password: ")?;
    let repeat_password = rpassword::prompt_password("Repeat password: ")?;
    let user = authenticator
        .register(&SignUp::new(email, &password, &repeat_password))
        .await?;
    println!("Created user {} with id {}", user.email, user.id);
    Ok(())
}

/// Removes a user and their projects.
pub async fn delete_user(settings: &Settings, email: &str) -> anyhow::Result<()> {
    let authenticator = authenticator(settings).await?;
    let users = authenticator.users();
    match users.find_by_email(email).await? {
        Some(user) => {
            users.delete(user.id).await?;
            println!("Deleted user {} with id {}", user.email, user.id);
            Ok(())
        }
        None => bail!("no user with email {}", email),
    }
}
