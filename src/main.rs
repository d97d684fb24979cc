use std::path::PathBuf;

use anyhow::Context;
use clap::{Arg, ArgAction, Command, value_parser};
use coctbots::alerts::ServiceAlertsBot;
use coctbots::mastodon::{DryRunPoster, MastodonClient, Poster};
use coctbots::relay::relay;
use coctbots::set_up_logger;
use coctbots::types::parse_alerts;
use log::{debug, info};

#[derive(Debug)]
enum Bot {
    Relay { message: String },
    Alerts { path: PathBuf },
}

#[derive(Debug)]
struct Args {
    verbose: bool,
    dry_run: bool,
    bot: Bot,
}

fn parse_args() -> Args {
    let matches = Command::new("coctbots")
        .version("0.1")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Verbose mode. Outputs DEBUG and higher log messages."),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .global(true)
                .env("COCTBOTS_DRY_RUN")
                .action(ArgAction::SetTrue)
                .help("Log toots rather than posting them, and skip archiving."),
        )
        .subcommand(
            Command::new("relay")
                .about("Post a plain text alert, if it fits in a toot.")
                .arg(Arg::new("message").required(true)),
        )
        .subcommand(
            Command::new("alerts")
                .about("Post toots for a JSON list of service alerts.")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");

    let dry_run = matches.get_flag("dry-run");

    let bot = match matches.subcommand() {
        Some(("relay", sub)) => Bot::Relay {
            message: sub
                .get_one::<String>("message")
                .cloned()
                .unwrap_or_default(),
        },
        Some(("alerts", sub)) => Bot::Alerts {
            path: sub.get_one::<PathBuf>("file").cloned().unwrap_or_default(),
        },
        _ => unreachable!("subcommand is required"),
    };

    Args {
        verbose,
        dry_run,
        bot,
    }
}

fn poster(dry_run: bool) -> anyhow::Result<Box<dyn Poster>> {
    Ok(if dry_run {
        Box::new(DryRunPoster)
    } else {
        Box::new(MastodonClient::from_env()?)
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    let args = parse_args();
    set_up_logger(module_path!(), args.verbose)?;
    debug!("{args:?}");

    let poster = poster(args.dry_run)?;

    match args.bot {
        Bot::Relay { message } => {
            let posted = relay(poster.as_ref(), &message).await?;
            info!("Posted: {posted}");
        }
        Bot::Alerts { path } => {
            let message = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let alerts = parse_alerts(&message)?;

            let bot = ServiceAlertsBot::from_env(poster, !args.dry_run).await;
            bot.process_alerts(alerts).await?;
        }
    }

    Ok(())
}
