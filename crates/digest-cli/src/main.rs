use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use digest_http::HttpDigestService;
use digest_workspace::prelude::*;
use digest_workspace::{DetailLoad, DigestItem};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("digest")
        .version(digest_workspace::VERSION)
        .about("Research digest workspace")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Workspace config file (TOML)"),
        )
        .arg(
            Arg::new("api")
                .long("api")
                .global(true)
                .help("Override the service base URL"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("login")
                .about("Store an access token and verify it")
                .arg(Arg::new("token").long("token").required(true)),
        )
        .subcommand(
            Command::new("status").about("Show the workspace").arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Output as JSON"),
            ),
        )
        .subcommand(Command::new("toggle").about("Turn the daily digest on or off"))
        .subcommand(
            Command::new("history")
                .about("List sent digests")
                .arg(
                    Arg::new("date")
                        .long("date")
                        .help("Only digests sent on this date (YYYY-MM-DD)"),
                )
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .help("Show every digest instead of the most recent"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("List the papers of one digest")
                .arg(
                    Arg::new("id")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                ),
        )
        .subcommand(
            Command::new("profile")
                .about("Research profile")
                .subcommand_required(true)
                .subcommand(Command::new("show"))
                .subcommand(
                    Command::new("set")
                        .about("Replace the given lists (comma separated)")
                        .arg(Arg::new("disciplines").long("disciplines"))
                        .arg(Arg::new("keywords").long("keywords"))
                        .arg(Arg::new("journals").long("journals")),
                ),
        )
        .subcommand(
            Command::new("time")
                .about("Daily delivery time")
                .subcommand_required(true)
                .subcommand(Command::new("set").arg(Arg::new("time").required(true)))
                .subcommand(Command::new("clear")),
        )
        .subcommand(Command::new("test-digest").about("Send a test digest now"))
        .subcommand(Command::new("logout").about("Forget the stored token"))
}

fn load_config(matches: &ArgMatches) -> Result<WorkspaceConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => WorkspaceConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => WorkspaceConfig::new(),
    };
    if let Some(api) = matches.get_one::<String>("api") {
        config = config.with_api_base_url(api.as_str());
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &WorkspaceConfig, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    init_tracing(&config, matches.get_flag("log-json"));

    let Some((command, args)) = matches.subcommand() else {
        return Ok(());
    };
    tracing::info!(command, api = %config.api_base_url, "running command");

    let result = dispatch(config, command, args).await;
    match &result {
        Ok(()) => tracing::info!(command, "command finished"),
        Err(e) => tracing::error!(command, error = %format!("{e:#}"), "command failed"),
    }
    result
}

async fn dispatch(config: WorkspaceConfig, command: &str, args: &ArgMatches) -> Result<()> {
    let service = Arc::new(HttpDigestService::new(config.api_base_url.as_str())?);
    let store = Arc::new(FileCredentialStore::new(&config.credential_path));
    let workspace = Workspace::open(config, service, store).await?;

    match command {
        "login" => {
            let token = args
                .get_one::<String>("token")
                .context("--token is required")?;
            workspace.session().sign_in(token).await?;
            workspace.load().await.context("token was not accepted")?;
            let email = workspace
                .session()
                .user()
                .and_then(|user| user.email)
                .unwrap_or_default();
            println!("Signed in as {email}");
        }
        "logout" => {
            workspace.logout().await?;
            println!("Signed out");
        }
        _ => {
            load(&workspace).await?;
            run(&workspace, command, args).await?;
        }
    }
    Ok(())
}

async fn load(workspace: &Workspace) -> Result<()> {
    workspace
        .load()
        .await
        .context("session ended, run `digest login --token <TOKEN>`")
}

async fn run(workspace: &Workspace, command: &str, args: &ArgMatches) -> Result<()> {
    match command {
        "status" => {
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&workspace.snapshot())?);
            } else {
                print_status(workspace);
            }
        }
        "toggle" => {
            let enabled = workspace.subscription().toggle().await?;
            println!("Daily digest {}", if enabled { "enabled" } else { "disabled" });
        }
        "history" => {
            let feed = workspace.feed();
            feed.set_date_filter(args.get_one::<String>("date").map(String::as_str));
            feed.set_expanded(args.get_flag("all"));
            print_history(&feed.visible_items(), feed.hidden_count());
        }
        "show" => {
            let id = args.get_one::<i64>("id").context("digest id is required")?;
            if let DetailLoad::Loaded(count) = workspace.open_digest(DigestId(*id)).await? {
                println!("{count} papers");
                for paper in workspace.detail().papers() {
                    println!("- {} ({})", paper.title, paper.source);
                    println!("  {}", paper.url);
                }
            }
        }
        "profile" => match args.subcommand() {
            Some(("set", set)) => {
                let editor = workspace.profile();
                editor.start_edit();
                for (name, field) in [
                    ("disciplines", ProfileField::Disciplines),
                    ("keywords", ProfileField::Keywords),
                    ("journals", ProfileField::JournalPreferences),
                ] {
                    if let Some(text) = set.get_one::<String>(name) {
                        editor.set_field(field, text.as_str())?;
                    }
                }
                editor.save().await?;
                print_profile(workspace);
            }
            _ => print_profile(workspace),
        },
        "time" => {
            let time = workspace.digest_time();
            match args.subcommand() {
                Some(("set", set)) => {
                    let text = set.get_one::<String>("time").context("time is required")?;
                    time.set_time_text(text.as_str());
                }
                _ => time.set_time_text(""),
            }
            match time.save().await? {
                Some(stored) => println!("Daily digest at {stored}"),
                None => println!("Daily digest time cleared"),
            }
        }
        "test-digest" => {
            let result = workspace.test_digest().trigger().await;
            println!("{}", workspace.test_digest().message());
            result?;
        }
        other => anyhow::bail!("unknown command {other}"),
    }
    Ok(())
}

fn print_status(workspace: &Workspace) {
    let email = workspace
        .session()
        .user()
        .and_then(|user| user.email)
        .unwrap_or_default();
    println!("User:          {email}");
    println!(
        "Subscription:  {}",
        if workspace.subscription().enabled() { "on" } else { "off" }
    );
    println!(
        "Delivery time: {}",
        workspace
            .digest_time()
            .confirmed()
            .unwrap_or_else(|| "not set".to_string())
    );
    println!("Digests:       {}", workspace.feed().items().len());
    print_profile(workspace);
}

fn print_profile(workspace: &Workspace) {
    let profile = workspace.profile().profile();
    if !workspace.profile().has_profile() {
        println!("No research profile configured");
        return;
    }
    println!("Disciplines:   {}", profile.disciplines.join(", "));
    println!("Keywords:      {}", profile.keywords.join(", "));
    println!("Journals:      {}", profile.journal_preferences.join(", "));
}

fn print_history(items: &[DigestItem], hidden: usize) {
    if items.is_empty() {
        println!("No digests");
        return;
    }
    for item in items {
        println!(
            "{:>6}  {:<25}  {} papers",
            item.id,
            item.sent_at.as_deref().unwrap_or("-"),
            item.paper_count
        );
    }
    if hidden > 0 {
        println!("... {hidden} more, use --all");
    }
}
