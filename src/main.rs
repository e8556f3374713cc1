use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use inboxhub::profiles::{EndpointProfile, JsonFileStore, ProfileEdit, ProfileStore};
use inboxhub::ui::{MainViewModel, SendPhase, SettingsViewModel};
use inboxhub::{AppConfig, WorkflowClient};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "inboxhub", version, about = "Send notes to a workflow inbox")]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true, env = "INBOXHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding persisted profiles
    #[arg(long, global = true, env = "INBOXHUB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a note; reads stdin when no text is given
    Send {
        /// Profile to select before sending
        #[arg(long)]
        profile: Option<String>,

        text: Vec<String>,
    },
    /// Manage endpoint profiles
    #[command(subcommand)]
    Profiles(ProfilesCommand),
}

#[derive(Subcommand, Debug)]
enum ProfilesCommand {
    /// List all profiles
    List,
    /// Show the current profile
    Current,
    /// Select the profile used for sending
    Use { id: String },
    /// Delete a profile
    Delete { id: String },
    /// Add a profile
    Add(AddArgs),
    /// Change fields of a profile
    Edit {
        id: String,
        #[command(flatten)]
        fields: EditArgs,
    },
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    api_key: String,
    #[arg(long)]
    workflow_id: String,
    /// Make this the default profile
    #[arg(long)]
    default: bool,
}

#[derive(Args, Debug)]
struct EditArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    workflow_id: Option<String>,
    /// Make this the default profile
    #[arg(long)]
    default: bool,
}

impl From<EditArgs> for ProfileEdit {
    fn from(args: EditArgs) -> Self {
        ProfileEdit {
            name: args.name,
            base_url: args.base_url,
            api_key: args.api_key,
            workflow_id: args.workflow_id,
            is_default: args.default.then_some(true),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting InboxHub");
    let backend = JsonFileStore::new(config.preferences_path());
    debug!("Preferences at {}", backend.path().display());
    let store = ProfileStore::new(backend).with_seed(config.seed_profile());

    match cli.command {
        Command::Send { profile, text } => send(store, &config, profile, text),
        Command::Profiles(command) => {
            profiles(SettingsViewModel::new(store), command)?;
            Ok(true)
        }
    }
}

fn send(
    store: ProfileStore,
    config: &AppConfig,
    profile: Option<String>,
    text: Vec<String>,
) -> Result<bool> {
    let draft = if text.is_empty() {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("reading note from stdin")?;
        input
    } else {
        text.join(" ")
    };
    if draft.trim().is_empty() {
        bail!("nothing to send");
    }

    let client = WorkflowClient::from_config(config)?;
    let mut view = MainViewModel::new(store, Arc::new(client), config)?;
    if let Some(id) = profile {
        view.set_current_profile(&id)?;
    }
    if !view.state().has_api_config {
        eprintln!(
            "Profile '{}' is missing an API key or workflow id",
            view.current_profile().name
        );
    }

    view.update_message_content(draft);
    view.send_message();

    // Leave the transport timeout room to report first
    let wait = config.connect_timeout() + config.request_timeout() + Duration::from_secs(5);
    if !view.wait_for_send(wait) {
        bail!("timed out waiting for the workflow to answer");
    }

    let state = view.state();
    if state.phase == SendPhase::Failed {
        eprintln!(
            "{}",
            state.error_message.as_deref().unwrap_or("Send failed")
        );
        return Ok(false);
    }
    if let Some(output) = &state.last_output {
        println!("{}", output);
    }
    Ok(true)
}

fn profiles(mut view: SettingsViewModel, command: ProfilesCommand) -> Result<()> {
    match command {
        ProfilesCommand::List => {
            let current = view.current_profile().id.clone();
            for p in view.profiles() {
                print_profile(p, p.id == current);
            }
        }
        ProfilesCommand::Current => print_profile(view.current_profile(), true),
        ProfilesCommand::Use { id } => {
            view.set_current_profile(&id)?;
            println!("Using {}", view.current_profile().name);
        }
        ProfilesCommand::Delete { id } => {
            view.delete_profile(&id)?;
        }
        ProfilesCommand::Add(args) => {
            view.start_create_new_profile();
            view.update_editing_profile(ProfileEdit {
                name: Some(args.name),
                base_url: args.base_url,
                api_key: Some(args.api_key),
                workflow_id: Some(args.workflow_id),
                is_default: Some(args.default),
            });
            let id = view
                .state()
                .editing_profile
                .as_ref()
                .map(|p| p.id.clone())
                .unwrap_or_default();
            view.finish_edit()?;
            println!("{}", id);
        }
        ProfilesCommand::Edit { id, fields } => {
            let Some(existing) = view.profiles().iter().find(|p| p.id == id).cloned() else {
                bail!("no profile with id '{}'", id);
            };
            let edit = ProfileEdit::from(fields);
            if edit.is_empty() {
                bail!("nothing to change; pass at least one field");
            }
            view.start_edit_profile(existing);
            view.update_editing_profile(edit);
            view.finish_edit()?;
        }
    }
    Ok(())
}

fn print_profile(profile: &EndpointProfile, current: bool) {
    println!(
        "{} {}\t{}\t{}\t{}{}",
        if current { "*" } else { " " },
        profile.id,
        profile.name,
        profile.base_url,
        if profile.workflow_id.is_empty() { "-" } else { profile.workflow_id.as_str() },
        if profile.is_default { "\t(default)" } else { "" },
    );
}
