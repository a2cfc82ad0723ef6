//! Learnplaces command line
//!
//! Operator tool over the learnplace database. Block changes go through the
//! same [`BlockController`] a host request handler uses, running as an
//! operator that holds write permission on every object.
//!
//! ## Usage
//!
//! ```bash
//! # Create database and default config
//! learnplaces init
//!
//! # Create a learnplace for host object 42
//! learnplaces learnplace create --object-id 42 --latitude 46.95 --longitude 7.44
//!
//! # Add a rich text block at the top
//! learnplaces block add --object-id 42 --kind rich-text --position 0 --field content="<p>Welcome</p>"
//!
//! # Show the learnplace with its blocks as JSON
//! learnplaces learnplace show --object-id 42
//!
//! # Page through all learnplaces
//! learnplaces learnplace list --limit 20 --offset 40
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use learnplaces::collection::BlockCollection;
use learnplaces::controller::{
    BlockForm, Command, Flash, Outcome, Request, View, QUERY_ACCORDION, QUERY_BLOCK, QUERY_POSITION,
};
use learnplaces::services::events::spawn_logging_listener;
use learnplaces::{
    BlockController, BlockKind, Config, Container, LearnplaceDb, Location, Services,
    StaticAccessGuard, Visibility,
};

#[derive(Parser, Debug)]
#[command(name = "learnplaces")]
#[command(about = "Manage learnplaces and their content blocks")]
struct Cli {
    /// Path to config file
    #[arg(short, long, env = "LEARNPLACES_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long, env = "LEARNPLACES_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the storage directory, database and default config
    Init,

    /// Learnplace operations
    #[command(subcommand)]
    Learnplace(LearnplaceCommand),

    /// Block operations
    #[command(subcommand)]
    Block(BlockCommand),

    /// Per-object configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print database statistics
    Stats,
}

#[derive(Subcommand, Debug)]
enum LearnplaceCommand {
    Create {
        #[arg(long)]
        object_id: i64,
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        elevation: f64,
        /// Radius in meters; defaults to the configured radius
        #[arg(long)]
        radius: Option<u32>,
    },
    Show {
        #[arg(long)]
        object_id: i64,
    },
    /// List learnplaces ordered by object id, without blocks
    List {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    Delete {
        #[arg(long)]
        object_id: i64,
    },
}

/// Host object the command runs against
#[derive(Args, Debug)]
struct Target {
    #[arg(long)]
    object_id: i64,
    /// Ref id of the object in the host repository; defaults to the object id
    #[arg(long)]
    ref_id: Option<i64>,
}

impl Target {
    fn request(&self, command: Command) -> Request {
        Request::new(self.ref_id.unwrap_or(self.object_id), self.object_id, command)
    }
}

#[derive(Subcommand, Debug)]
enum BlockCommand {
    /// Create a block and place it in the learnplace or an accordion
    Add {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        kind: BlockKind,
        /// Insert position (0-based); appends when absent
        #[arg(long, allow_hyphen_values = true)]
        position: Option<i64>,
        /// Accordion the block goes into
        #[arg(long)]
        accordion: Option<i64>,
        /// Defaults to the object's configured visibility
        #[arg(long)]
        visibility: Option<Visibility>,
        /// Form field as key=value, e.g. content="<p>Hi</p>"
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Change fields of a block, keeping its position
    Edit {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        block: i64,
        #[arg(long)]
        visibility: Option<Visibility>,
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Delete a block and renumber its container
    Remove {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        block: i64,
    },
    /// Move a block inside its container
    Move {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        block: i64,
        #[arg(long, allow_hyphen_values = true)]
        position: i64,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show {
        #[arg(long)]
        object_id: i64,
    },
    Set {
        #[arg(long)]
        object_id: i64,
        #[arg(long)]
        online: Option<bool>,
        #[arg(long)]
        visibility: Option<Visibility>,
        #[arg(long)]
        zoom_level: Option<u8>,
        #[arg(long)]
        zoom: Option<bool>,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "learnplaces=debug" } else { "learnplaces=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Load config
    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    // Apply CLI overrides
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }

    std::fs::create_dir_all(&config.storage_dir)
        .with_context(|| format!("creating {}", config.storage_dir.display()))?;

    let db = Arc::new(LearnplaceDb::open(&config.database_path())?);
    let services = Arc::new(Services::new(db, &config));
    let listener = spawn_logging_listener(services.events.clone());

    match cli.command {
        Commands::Init => init(&config)?,
        Commands::Learnplace(command) => learnplace(&services, &config, command)?,
        Commands::Block(command) => block(&services, command)?,
        Commands::Config(command) => configuration(&services, command)?,
        Commands::Stats => print_json(&services.stats()?)?,
    }

    // Closing the bus lets the listener log what is queued, then stop
    drop(services);
    listener.await?;
    Ok(())
}

fn init(config: &Config) -> anyhow::Result<()> {
    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }
    info!(database = %config.database_path().display(), "Storage initialized");
    Ok(())
}

fn learnplace(services: &Services, config: &Config, command: LearnplaceCommand) -> anyhow::Result<()> {
    match command {
        LearnplaceCommand::Create { object_id, latitude, longitude, elevation, radius } => {
            let location = Location {
                latitude,
                longitude,
                elevation,
                radius: radius.unwrap_or(config.default_radius),
            };
            let learnplace = services.learnplace.create(object_id, location)?;
            print_json(&learnplace)
        }
        LearnplaceCommand::Show { object_id } => {
            let learnplace = services.learnplace.find_by_object_id(object_id)?;
            print_json(&learnplace)
        }
        LearnplaceCommand::List { limit, offset } => print_json(&services.learnplace.list(limit, offset)?),
        LearnplaceCommand::Delete { object_id } => {
            let learnplace = services.learnplace.find_by_object_id(object_id)?;
            services.learnplace.delete(learnplace.id)?;
            info!(object_id, "Learnplace deleted");
            Ok(())
        }
    }
}

fn block(services: &Arc<Services>, command: BlockCommand) -> anyhow::Result<()> {
    let operator = Arc::new(StaticAccessGuard::allow_all());

    match command {
        BlockCommand::Add { target, kind, position, accordion, visibility, fields } => {
            let visibility = match visibility {
                Some(visibility) => visibility,
                None => services.configuration.find_by_object_id(target.object_id)?.default_visibility,
            };
            let form = fields
                .into_iter()
                .fold(BlockForm::new(kind), |form, (key, value)| form.with(&key, value))
                .with("visibility", visibility.as_str());

            let mut request = target.request(Command::Create).with_form(form);
            if let Some(position) = position {
                request = request.with_query(QUERY_POSITION, position);
            }
            if let Some(accordion) = accordion {
                request = request.with_query(QUERY_ACCORDION, accordion);
            }
            let controller = BlockController::new(kind, services.clone(), operator);
            finish(controller.execute(&request))
        }
        BlockCommand::Edit { target, block, visibility, fields } => {
            let existing = services.block.find(block)?;
            let mut form = fields
                .into_iter()
                .fold(BlockForm::from_block(&existing), |form, (key, value)| form.with(&key, value));
            if let Some(visibility) = visibility {
                form = form.with("visibility", visibility.as_str());
            }

            let controller = BlockController::new(existing.kind(), services.clone(), operator);
            finish(controller.execute(&target.request(Command::Update).with_form(form)))
        }
        BlockCommand::Remove { target, block } => {
            let existing = services.block.find(block)?;
            let controller = BlockController::new(existing.kind(), services.clone(), operator);
            finish(controller.execute(&target.request(Command::Delete).with_query(QUERY_BLOCK, block)))
        }
        BlockCommand::Move { target, block, position } => move_block(services, &target, block, position),
    }
}

fn move_block(services: &Services, target: &Target, block_id: i64, position: i64) -> anyhow::Result<()> {
    let learnplace = services.learnplace.find_by_object_id(target.object_id)?;
    let learnplace_id = learnplace.id;
    let container = services
        .block
        .container_of(block_id)?
        .ok_or_else(|| anyhow!("block {} is not placed in any container", block_id))?;

    let index = match container {
        Container::Learnplace(id) if id == learnplace_id => {
            let mut learnplace = learnplace;
            let to = learnplace.move_block(block_id, clamp(position))?;
            services.learnplace.store(learnplace)?;
            to
        }
        Container::Accordion(id)
            if services.block.container_of(id)? == Some(Container::Learnplace(learnplace_id)) =>
        {
            let mut accordion = services.accordion.find(id)?;
            let to = accordion.move_block(block_id, clamp(position))?;
            services.accordion.store(accordion)?;
            to
        }
        other => bail!("block {} belongs to {}, not to object {}", block_id, other, target.object_id),
    };

    info!(block_id, index, "Moved block");
    Ok(())
}

fn clamp(position: i64) -> usize {
    learnplaces::collection::clamp_position(position, usize::MAX)
}

fn configuration(services: &Services, command: ConfigCommand) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Show { object_id } => {
            print_json(&services.configuration.find_by_object_id(object_id)?)
        }
        ConfigCommand::Set { object_id, online, visibility, zoom_level, zoom } => {
            let mut configuration = services.configuration.find_by_object_id(object_id)?;
            if let Some(online) = online {
                configuration.online = online;
            }
            if let Some(visibility) = visibility {
                configuration.default_visibility = visibility;
            }
            if let Some(zoom_level) = zoom_level {
                configuration.map_zoom_level = zoom_level;
            }
            if let Some(zoom) = zoom {
                configuration.map_zoom = zoom;
            }
            print_json(&services.configuration.store(configuration)?)
        }
    }
}

/// Print the outcome of a controller command; failures become errors
fn finish(outcome: Outcome) -> anyhow::Result<()> {
    debug!(outcome = ?outcome, "Command finished");
    match &outcome {
        Outcome::Render(View::EditForm { error: Some(error), .. }) => bail!("{}", error),
        Outcome::Redirect { flash: Some(Flash::Failure(key)), .. } => bail!("command failed: {}", key),
        _ => print_json(&outcome),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
