mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use rocket_crash::commands::{self, auto::AutoConfig, play::PlayConfig};
use rocket_crash::config::{self, Config};
use rocket_crash::logging::{self, LogTarget};
use rocket_crash::service::HttpGameService;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    install_panic_hook();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let log_target = match (&config.log_file, &cli.command) {
        (Some(path), _) => LogTarget::File(path.clone()),
        (None, Some(Command::Auto { .. })) => LogTarget::Stderr,
        (None, None) => LogTarget::Discard,
    };
    logging::init(log_target)?;

    let service = HttpGameService::new(&config.base_url, config.request_timeout())
        .with_context(|| format!("cannot use game service at {}", config.base_url))?;

    match cli.command {
        Some(Command::Auto {
            cash_out_at,
            rounds,
        }) => {
            commands::auto::auto(
                service,
                AutoConfig {
                    controller: config.controller(),
                    bet: config.default_bet,
                    cash_out_at,
                    rounds,
                },
                std::io::stdout(),
            )
            .await?;
        }
        None => {
            let state = commands::play::play_live(
                service,
                PlayConfig {
                    controller: config.controller(),
                    default_bet: config.default_bet,
                },
            )
            .await?;
            if !state.message.is_empty() {
                println!("{}", state.message);
            }
        }
    }

    Ok(())
}

/// Load the config file and layer CLI flags over it.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => config::load_from(path)?,
        None => {
            let cwd = std::env::current_dir().context("cannot read current directory")?;
            config::load(&cwd)?
        }
    };
    if let Some(ref base_url) = cli.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(ms) = cli.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(bet) = cli.bet {
        config.default_bet = bet;
    }
    if let Some(ref path) = cli.log_file {
        config.log_file = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

/// Install a panic hook that restores terminal state before printing the panic.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        crossterm::execute!(
            std::io::stdout(),
            crossterm::cursor::Show,
            crossterm::terminal::LeaveAlternateScreen
        )
        .ok();
        crossterm::terminal::disable_raw_mode().ok();
        default_hook(info);
    }));
}
