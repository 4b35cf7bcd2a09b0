//! Operator CLI for the catalog core.
//!
//! # Responsibility
//! - Map flags and environment into explicit core configuration values.
//! - Seed demo data, register one singer/album graph, and print hydrated reads as JSON.

use catalog_core::{
    parse_date, AlbumPredicate, AlbumSpec, AssociationLoader, CompareOp, ConnectionManager,
    GraphCreator, LoggingConfig, RandomDataSeeder, SingerPredicate, SingerSpec, StoreConfig,
    TrackCount, DEFAULT_TRACK_RANGE,
};
use clap::{Args, Parser, Subcommand};
use log::error;
use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "catalog", version = catalog_core::core_version(), about = "Singer/album/track catalog")]
struct Cli {
    /// `:memory:`, a `file:` URI, or a database path.
    #[arg(long, env = "CONNECTION_STRING", default_value = catalog_core::config::DEFAULT_CONNECTION_STRING)]
    db: String,

    #[arg(long, default_value_t = catalog_core::config::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    #[arg(long, default_value_t = catalog_core::config::DEFAULT_RETRY_DELAY.as_millis() as u64)]
    retry_delay_ms: u64,

    #[arg(long, env = "CATALOG_LOG_LEVEL", default_value = catalog_core::default_log_level())]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create random singer/album/track graphs, one transaction each.
    Seed {
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Register one singer with one album of random tracks.
    Register(RegisterArgs),
    /// List hydrated singers matching one filter.
    Singers(SingerFilter),
    /// List albums (with tracks) of one singer.
    Albums {
        #[arg(long)]
        singer_id: String,
    },
}

#[derive(Debug, Args)]
struct RegisterArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    album_title: String,
    /// YYYY-MM-DD
    #[arg(long)]
    release_date: Option<String>,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct SingerFilter {
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    prefix: Option<String>,
    /// Singers with an album released before this date (YYYY-MM-DD).
    #[arg(long)]
    released_before: Option<String>,
}

impl SingerFilter {
    fn to_predicate(&self) -> Result<SingerPredicate, catalog_core::PredicateError> {
        if let Some(last_name) = &self.last_name {
            return SingerPredicate::parse("last_name", CompareOp::Eq, last_name);
        }
        if let Some(prefix) = &self.prefix {
            return SingerPredicate::parse("last_name", CompareOp::Prefix, prefix);
        }
        let date = self.released_before.as_deref().unwrap_or_default();
        SingerPredicate::parse("album.release_date", CompareOp::Before, date)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = catalog_core::init_logging(&LoggingConfig::stderr(cli.log_level.as_str())) {
        eprintln!("logging init failed: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={}", err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = StoreConfig::new(cli.db)
        .with_max_attempts(cli.max_attempts)
        .with_retry_delay(Duration::from_millis(cli.retry_delay_ms));
    let db = ConnectionManager::new(config).connect()?;

    match cli.command {
        Command::Seed { count } => {
            let creator = GraphCreator::new(db);
            let report = RandomDataSeeder::new(&creator).seed(count);
            for (iteration, err) in &report.failures {
                eprintln!("seed iteration {iteration} failed: {err}");
            }
            println!("{}", serde_json::to_string_pretty(&report.created)?);
        }
        Command::Register(args) => {
            let singer = SingerSpec::new(args.first_name, args.last_name);
            let mut album = AlbumSpec::new(
                args.album_title,
                TrackCount::Between {
                    min: *DEFAULT_TRACK_RANGE.start(),
                    max: *DEFAULT_TRACK_RANGE.end(),
                },
            );
            album.release_date = args
                .release_date
                .as_deref()
                .map(|value| parse_date("release_date", value))
                .transpose()?;
            let created = GraphCreator::new(db).create_graph(&singer, &[album])?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        Command::Singers(filter) => {
            let predicate = filter.to_predicate()?;
            let singers = AssociationLoader::new(db).load_singers(&predicate)?;
            println!("{}", serde_json::to_string_pretty(&singers)?);
        }
        Command::Albums { singer_id } => {
            let predicate = AlbumPredicate::parse("singer_id", CompareOp::Eq, &singer_id)?;
            let albums = AssociationLoader::new(db).load_albums(&predicate)?;
            println!("{}", serde_json::to_string_pretty(&albums)?);
        }
    }

    Ok(())
}
