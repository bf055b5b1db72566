use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use entities::cli::{
    AnnotationCommands, StudyCommands, UserCommands, open_store, run_annotation_dump, run_init,
    run_study_dump, run_user_add,
};
use entities::config::{LoggingConfig, load_config};
use entities::server::{AppState, create_router};

#[derive(Parser)]
#[command(name = "entities")]
#[command(about = "Collaborative text annotation server", long_about = None)]
struct Cli {
    /// Configuration file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = "entities.toml")]
    config: PathBuf,

    /// Data directory for the database and text storage
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directories and database
    Init,

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Inspect annotations
    Annotation {
        #[command(subcommand)]
        command: AnnotationCommands,
    },

    /// Export study data
    Study {
        #[command(subcommand)]
        command: StudyCommands,
    },
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(Some(cli.config.as_path()))?;
    if let Some(data_dir) = cli.data_dir {
        config.server.data_dir = data_dir;
    }

    init_tracing(&config.logging)?;

    match cli.command {
        Commands::Init => run_init(&config.server)?,
        Commands::Serve { host, port } => {
            let mut server = config.server;
            if let Some(host) = host {
                server.host = host;
            }
            if let Some(port) = port {
                server.port = port;
            }

            let store = open_store(&server)?;
            let addr = server.socket_addr()?;
            let state = Arc::new(AppState::new(Arc::new(store), server));

            let app = create_router(state);

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
        Commands::User { command } => match command {
            UserCommands::Add {
                username,
                password,
                non_interactive,
            } => run_user_add(&config.server, username, password, non_interactive)?,
        },
        Commands::Annotation { command } => match command {
            AnnotationCommands::Dump { ids, all } => {
                run_annotation_dump(&config.server, ids, all)?;
            }
        },
        Commands::Study { command } => match command {
            StudyCommands::Dump { study_id } => run_study_dump(&config.server, study_id)?,
        },
    }

    Ok(())
}
