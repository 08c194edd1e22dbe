use std::path::PathBuf;
use tracing::info;
use crate::auth::hash_password;
use crate::cli::commands::CreateUserArgs;
use crate::config::load_config;
use crate::db::Database;
use crate::errors::ManagerError;
use crate::models::{NewUser, User};

pub async fn handle_create_user(args: CreateUserArgs) -> Result<(), ManagerError> {
    let config_path = args.config.as_ref().map(PathBuf::from);
    let config = load_config(config_path.as_deref(), &args.overrides()).await?;
    let db = Database::new(&config.database.path)?;

    let user = create_user(&db, &args)?;
    println!(
        "Created {} '{}' (id {})",
        if user.is_superuser { "superuser" } else { "user" },
        user.username,
        user.id
    );
    Ok(())
}

fn create_user(db: &Database, args: &CreateUserArgs) -> Result<User, ManagerError> {
    let new_user = NewUser {
        username: args.username.clone(),
        email: args.email.clone(),
        password: args.password.clone(),
        is_active: true,
        is_superuser: args.superuser,
        full_name: args.full_name.clone(),
    };
    new_user.validate()?;

    let hashed = hash_password(&new_user.password)?;
    let user = db.create_user(&new_user, &hashed)?;
    info!(user_id = user.id, superuser = user.is_superuser, "User created from command line");
    Ok(user)
}
