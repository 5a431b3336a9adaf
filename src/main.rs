use std::path::PathBuf;
use std::sync::Arc;

/// Reset SIGPIPE to default behavior so piping (e.g. `densify-recommendation read ... | head`)
/// exits cleanly instead of panicking on broken pipe.
#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use densify_recommendation::config::{self, Settings};
use densify_recommendation::densify::ConnectionInfo;
use densify_recommendation::engine::{ProgressEvent, RecommendationEngine, ResourceState};
use densify_recommendation::identity::ConfiguredIdentity;
use densify_recommendation::output::formatter;
use densify_recommendation::store::{
    put_parameter, ParameterStore, PutOutcome, SqliteParameterStore,
};

/// densify-recommendation - resolve and cache recommended instance sizing
#[derive(Parser)]
#[command(name = "densify-recommendation", version, about, long_about = None)]
struct Cli {
    /// Path to settings file (defaults to ./densify.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parameter store database path
    #[arg(short, long)]
    store: Option<String>,

    /// Account identifier used when no test account is given
    #[arg(long)]
    account: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print lifecycle results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the parameter store database
    Init,

    /// Store Densify connection info
    Connect {
        /// Densify instance URL (https:// is assumed when no scheme is given)
        #[arg(long)]
        url: String,

        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        /// Parameter name to store the connection under
        #[arg(long)]
        parameter: Option<String>,
    },

    /// Resolve and cache a recommendation for a new resource
    Create {
        #[command(flatten)]
        resource: ResourceArgs,
    },

    /// Serve the cached recommendation, refreshing it when stale
    Read {
        #[command(flatten)]
        resource: ResourceArgs,
    },

    /// Re-resolve a resource, replacing the previous resource's cache entry
    Update {
        #[command(flatten)]
        resource: ResourceArgs,

        /// Provisioning ID of the resource before the update
        #[arg(long)]
        previous_id: Option<String>,
    },

    /// Remove a resource's cached recommendation
    Delete {
        #[command(flatten)]
        resource: ResourceArgs,
    },

    /// List the resource
    List {
        #[command(flatten)]
        resource: ResourceArgs,
    },

    /// Inspect the parameter store
    Parameters {
        #[command(subcommand)]
        command: ParameterCommands,
    },
}

#[derive(Subcommand)]
enum ParameterCommands {
    /// List parameters
    List {
        /// Only list names starting with this prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Show a parameter's value
    Show { name: String },

    /// Remove a parameter
    Rm { name: String },
}

#[derive(Args)]
struct ResourceArgs {
    /// JSON file with the resource model (flags override its fields)
    #[arg(long)]
    resource: Option<PathBuf>,

    #[arg(long)]
    provisioning_id: Option<String>,

    /// Fallback instance type
    #[arg(long)]
    instance_type: Option<String>,

    /// Resolve against this account instead of the caller's own
    #[arg(long)]
    test_account: Option<String>,

    /// Bump the shared refresh marker after resolving
    #[arg(long)]
    force_update: bool,

    /// Parameter holding the connection info for this resource
    #[arg(long)]
    connection_parameter: Option<String>,
}

impl ResourceArgs {
    fn to_state(&self) -> Result<ResourceState> {
        let mut state = match &self.resource {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read resource file: {}", path.display()))?;
                serde_json::from_str::<ResourceState>(&content)
                    .with_context(|| format!("Failed to parse resource file: {}", path.display()))?
            }
            None => ResourceState::default(),
        };

        if let Some(ref id) = self.provisioning_id {
            state.provisioning_id = Some(id.clone());
        }
        if let Some(ref instance_type) = self.instance_type {
            state.instance_type = Some(instance_type.clone());
        }
        if let Some(ref account) = self.test_account {
            state.test_account_override = Some(account.clone());
        }
        if let Some(ref parameter) = self.connection_parameter {
            state.connection_parameter_name = Some(parameter.clone());
        }
        state.force_update |= self.force_update;
        Ok(state)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(unix)]
    reset_sigpipe();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(ref path) = cli.store {
        settings.store.path = path.clone();
    }
    if let Some(ref account) = cli.account {
        settings.identity.account_id = Some(account.clone());
    }

    match cli.command {
        Commands::Init => cmd_init(&settings),
        Commands::Connect {
            ref url,
            ref username,
            ref password,
            ref parameter,
        } => cmd_connect(&settings, url, username, password, parameter.as_deref()).await,
        Commands::Create { ref resource } => {
            let engine = build_engine(&settings)?;
            let event = engine.create(resource.to_state()?).await;
            report(&cli, "Create", event)
        }
        Commands::Read { ref resource } => {
            let engine = build_engine(&settings)?;
            let event = engine.read(resource.to_state()?).await;
            report(&cli, "Read", event)
        }
        Commands::Update {
            ref resource,
            ref previous_id,
        } => {
            let engine = build_engine(&settings)?;
            let previous = previous_id.as_deref().map(ResourceState::new);
            let event = engine.update(resource.to_state()?, previous).await;
            report(&cli, "Update", event)
        }
        Commands::Delete { ref resource } => {
            let engine = build_engine(&settings)?;
            let event = engine.delete(resource.to_state()?).await;
            report(&cli, "Delete", event)
        }
        Commands::List { ref resource } => {
            let engine = build_engine(&settings)?;
            let event = engine.list(resource.to_state()?).await;
            report(&cli, "List", event)
        }
        Commands::Parameters { ref command } => cmd_parameters(&settings, command).await,
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn open_store(settings: &Settings) -> Result<SqliteParameterStore> {
    let store = SqliteParameterStore::open(&settings.store.path)?
        .with_max_versions(settings.store.max_versions);
    store.initialize()?;
    Ok(store)
}

fn build_engine(settings: &Settings) -> Result<RecommendationEngine> {
    let store = Arc::new(open_store(settings)?);
    let identity = Arc::new(ConfiguredIdentity::new(settings.identity.account_id.clone()));
    Ok(RecommendationEngine::new(store, identity, settings.clone()))
}

fn report(cli: &Cli, operation: &str, event: ProgressEvent) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&event)?);
    } else {
        formatter::print_event(operation, &event);
    }
    if !event.is_success() {
        bail!(
            "{} failed: {}",
            operation,
            event.message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

// ─── Commands ────────────────────────────────────────────────────────────────

fn cmd_init(settings: &Settings) -> Result<()> {
    open_store(settings)?;
    formatter::print_success(&format!(
        "Parameter store initialized at {}.",
        settings.store.path
    ));
    Ok(())
}

async fn cmd_connect(
    settings: &Settings,
    url: &str,
    username: &str,
    password: &str,
    parameter: Option<&str>,
) -> Result<()> {
    let store = open_store(settings)?;
    let key = parameter.unwrap_or(settings.parameters.connection.as_str());
    let connection = ConnectionInfo::new(url, username, password);
    let value = connection.to_json()?;

    match put_parameter(&store, key, &value, true).await? {
        PutOutcome::Written { version } => {
            formatter::print_success(&format!(
                "Stored connection to {} under {} (version {}).",
                connection.base_url(),
                key,
                version
            ));
            Ok(())
        }
        PutOutcome::Dropped => bail!("Parameter store busy, connection info was not stored."),
    }
}

async fn cmd_parameters(settings: &Settings, command: &ParameterCommands) -> Result<()> {
    let store = open_store(settings)?;

    match command {
        ParameterCommands::List { prefix } => {
            let parameters = store.list(prefix)?;
            formatter::print_parameter_list(&parameters);
        }

        ParameterCommands::Show { name } => {
            let parameter = store
                .get_parameter(name)
                .with_context(|| format!("Parameter '{}' not found in store.", name))?;
            formatter::print_parameter_detail(&parameter);
        }

        ParameterCommands::Rm { name } => {
            store
                .delete(name)
                .await
                .with_context(|| format!("Failed to remove parameter '{}'.", name))?;
            formatter::print_success(&format!("Removed {} from store.", name));
        }
    }

    Ok(())
}
