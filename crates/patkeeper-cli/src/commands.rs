//! Subcommand handlers. Each one drives the controller and prints results
//! to stdout; notices are printed by the caller.

use std::collections::BTreeSet;
use std::io::{self, Write};

use anyhow::{bail, Result};
use chrono::Utc;
use tracing::warn;

use patkeeper_core::presenter::TokenView;
use patkeeper_core::utils::truncate_string;
use patkeeper_core::{Config, SessionController};

use crate::clipboard::Osc52Clipboard;
use crate::Command;

/// Column width for application and component names
const NAME_WIDTH: usize = 24;

pub async fn run(command: Command, controller: &mut SessionController, saved: Config) -> Result<()> {
    match command {
        Command::Login { username } => login(controller, username, saved).await,
        Command::Logout => {
            controller.logout()?;
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => {
            match controller.identity() {
                Some(identity) => println!("{} ({})", identity.display_name, identity.id),
                None => println!("Not signed in."),
            }
            Ok(())
        }
        Command::Apps => apps(controller).await,
        Command::List { reveal, reveal_all } => list(controller, reveal, reveal_all).await,
        Command::Generate { role, application } => {
            generate(controller, &role, application.as_deref()).await
        }
        Command::Copy { application } => copy(controller, &application).await,
    }
}

async fn login(controller: &mut SessionController, username: Option<String>, mut saved: Config) -> Result<()> {
    let username = match username.or_else(|| std::env::var("PATKEEPER_USERNAME").ok()) {
        Some(username) => username,
        None => prompt_username(saved.last_username.as_deref())?,
    };
    let password = match std::env::var("PATKEEPER_PASSWORD") {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    let identity = controller.login(&username, &password).await?;
    println!("Signed in as {}.", identity.display_name);

    saved.last_username = Some(username.trim().to_string());
    if let Err(e) = saved.save() {
        warn!(error = %e, "Failed to remember username");
    }
    Ok(())
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim();
    Ok(match (username.is_empty(), last) {
        (true, Some(last)) => last.to_string(),
        _ => username.to_string(),
    })
}

async fn apps(controller: &mut SessionController) -> Result<()> {
    let options = controller.load_applications().await?;
    if options.is_empty() {
        println!("No applications available.");
        return Ok(());
    }
    println!("{:<12} {:<12} {:<w$} DESCRIPTION", "ROLE", "APPLICATION", "NAME", w = NAME_WIDTH);
    for option in &options {
        println!(
            "{:<12} {:<12} {:<w$} {}",
            option.role_id,
            option.application_id,
            truncate_string(&option.name, NAME_WIDTH),
            option.description,
            w = NAME_WIDTH
        );
    }
    Ok(())
}

async fn list(controller: &mut SessionController, reveal: Vec<String>, reveal_all: bool) -> Result<()> {
    let tokens = controller.refresh_tokens().await?;

    let to_reveal: BTreeSet<String> = if reveal_all {
        tokens.iter().map(|t| t.owner_application_id.clone()).collect()
    } else {
        reveal.into_iter().collect()
    };
    for id in &to_reveal {
        controller.reveal(id)?;
    }

    let views = controller.token_views(Utc::now())?;
    if views.is_empty() {
        println!("No tokens yet");
        println!("Generate your first token to get started");
        return Ok(());
    }
    print_views(&views);
    Ok(())
}

fn print_views(views: &[TokenView]) {
    println!(
        "{:<12} {:<w$} {:<w$} {:<8} {:<13} TOKEN",
        "APPLICATION",
        "NAME",
        "COMPONENT",
        "STATUS",
        "EXPIRES",
        w = NAME_WIDTH
    );
    for view in views {
        println!(
            "{:<12} {:<w$} {:<w$} {:<8} {:<13} {}",
            view.owner_application_id,
            truncate_string(&view.application_name, NAME_WIDTH),
            truncate_string(&view.component_name, NAME_WIDTH),
            view.status.state.to_string(),
            view.expires,
            view.secret,
            w = NAME_WIDTH
        );
    }
}

async fn generate(controller: &mut SessionController, role: &str, application: Option<&str>) -> Result<()> {
    // The catalog resolves the role's application; generation can still
    // proceed with an explicit id if it is unavailable.
    let _ = controller.load_applications().await;
    let token = controller.generate_token(role, application).await?;

    println!("{}", token.secret);
    eprintln!("Store this token now. It is shown masked from here on.");
    Ok(())
}

async fn copy(controller: &mut SessionController, application: &str) -> Result<()> {
    let tokens = controller.refresh_tokens().await?;
    let Some(token) = tokens.iter().find(|t| t.owner_application_id == application) else {
        bail!("No token for application {}", application);
    };

    let mut clipboard = Osc52Clipboard::stdout();
    if !controller.copy_secret(token, &mut clipboard)? {
        bail!("Copy to clipboard failed");
    }
    Ok(())
}
