use anyhow::{Context, Result};
use colored::Colorize;
use counsel_core::identity::IdentityProvider;
use counsel_infrastructure::{ConfigService, SecretStorage};

use super::GlobalOptions;

pub fn run(options: &GlobalOptions, init: bool, set_base_url: Option<String>) -> Result<()> {
    let paths = options.paths()?;
    let service = ConfigService::new(&paths);
    let secrets = SecretStorage::with_path(paths.secret_file());

    if init {
        if service.ensure_file()? {
            println!("{}", format!("Wrote {}", service.path().display()).green());
        }
        if secrets.ensure_template().context("Failed to write secret.json")? {
            println!("{}", format!("Wrote {}", secrets.path().display()).green());
        }
    }

    if let Some(url) = set_base_url {
        service.update(|settings| settings.server.base_url = url)?;
        println!("{}", "Saved server.base_url".green());
    }

    let settings = options.settings(&paths)?;
    let identity = secrets
        .resolve_identity()
        .context("Failed to read credentials")?;

    println!("{} {}", "config:".bold(), service.path().display());
    println!("{} {}", "secrets:".bold(), secrets.path().display());
    println!(
        "{} token {}, user {}",
        "identity:".bold(),
        if identity.bearer_token().is_some() {
            "set".green()
        } else {
            "missing".red()
        },
        identity.user_id().as_deref().unwrap_or("-")
    );
    println!();
    print!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}
