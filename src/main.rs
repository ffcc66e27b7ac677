use clap::{ArgAction, Parser, Subcommand};
use dialoguer::Confirm;
use renamizer::{
    Catalog, Config, ConfigError, Episode, EpisodeKey, EpisodeOrder, FileOperationError,
    FileResolverError, MediaInfo, MetadataRetrievalError, PlannedOperation, RenameEvent,
    RenameSession, RenamizerError, Show, inspect_media,
};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `renamizer=debug`
const LOG_FILTER: &str = "RENAMIZER_LOG";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory for cached metadata
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, global = true, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Country code used for localized show names (e.g. ES)
    #[arg(long, global = true)]
    locale: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search TVMaze and TMDB for a show
    Search {
        /// The search query
        query: String,
    },
    /// List the episodes of a show
    Episodes {
        /// The search query
        query: String,
        /// Which search result to use (1-based)
        #[arg(long, default_value_t = 1)]
        pick: usize,
        /// Only list this season
        #[arg(long)]
        season: Option<u32>,
        /// Episode order: aired, dvd or absolute
        #[arg(long, default_value = "aired")]
        order: EpisodeOrder,
    },
    /// Drop the cached data of a show so it is fetched again
    Refresh {
        /// The search query
        query: String,
        /// Which search result to use (1-based)
        #[arg(long, default_value_t = 1)]
        pick: usize,
    },
    /// Move video files into the library, pairing episodes and files by position
    Rename {
        /// The search query
        query: String,
        /// Which search result to use (1-based)
        #[arg(long, default_value_t = 1)]
        pick: usize,
        /// Library root; files land below "<OUTPUT>/Series de TV"
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
        /// Use every episode of this season
        #[arg(long)]
        season: Option<u32>,
        /// Use these episodes (S01E02 or 1x02), in the given order
        #[arg(short, long = "episode", value_name = "EPISODE")]
        episodes: Vec<EpisodeKey>,
        /// Leave the episode title out of the file name
        #[arg(long)]
        no_title: bool,
        /// Add every video file found below this directory
        #[arg(long = "dir", value_name = "DIR")]
        dirs: Vec<PathBuf>,
        /// Sort episodes and files before pairing them
        #[arg(long)]
        sort: bool,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
        /// Video files to rename
        files: Vec<PathBuf>,
    },
    /// Show stream details of video files
    Inspect {
        /// Video files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Renamizer(#[from] RenamizerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    MetadataRetrieval(#[from] MetadataRetrievalError),

    #[error(transparent)]
    FileOperation(#[from] FileOperationError),

    #[error(transparent)]
    FileResolver(#[from] FileResolverError),

    #[error("Could not read confirmation: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("No show found for '{0}'")]
    NoMatches(String),

    #[error("Result {pick} does not exist; the search returned {count} show(s)")]
    PickOutOfRange { pick: usize, count: usize },

    #[error("Episode {0} does not exist for this show")]
    EpisodeNotFound(EpisodeKey),

    #[error("Select episodes with --episode or --season")]
    NoEpisodesSelected,

    #[error("{0} file(s) could not be moved")]
    IncompleteRename(usize),
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_FILTER).unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = Config::from_env()?;

    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(seconds) = cli.timeout {
        config.http_timeout = Duration::from_secs(seconds);
    }
    if let Some(locale) = &cli.locale {
        config.locale = locale.clone();
    }

    Ok(config)
}

fn format_show(show: &Show) -> String {
    match show.year {
        Some(year) => format!("{} ({})", show.display_name, year),
        None => show.display_name.clone(),
    }
}

fn format_media_info(info: &MediaInfo) -> String {
    if info.is_empty() {
        return "unknown".to_string();
    }

    let mut parts = Vec::new();
    if let Some(resolution) = &info.resolution {
        parts.push(resolution.clone());
    }
    if let Some(codec) = &info.video_codec {
        parts.push(codec.clone());
    }
    match (&info.audio_codec, info.audio_channels) {
        (Some(codec), Some(channels)) => parts.push(format!("{} {}ch", codec, channels)),
        (Some(codec), None) => parts.push(codec.clone()),
        (None, Some(channels)) => parts.push(format!("{}ch", channels)),
        (None, None) => {}
    }
    parts.join(", ")
}

/// Searches and returns the `pick`-th show, printing provider failures
fn pick_show(catalog: &Catalog, query: &str, pick: usize) -> Result<Show, CliError> {
    let outcome = catalog.search(query);

    for failure in &outcome.failures {
        eprintln!("Warning: {} search failed: {}", failure.provider, failure.error);
    }

    if outcome.shows.is_empty() {
        return Err(CliError::NoMatches(query.to_string()));
    }

    let count = outcome.shows.len();
    let show = pick
        .checked_sub(1)
        .and_then(|index| outcome.shows.into_iter().nth(index))
        .ok_or(CliError::PickOutOfRange { pick, count })?;

    println!("Using {} [{}]", format_show(&show), show.id);
    Ok(show)
}

fn run_search(catalog: &Catalog, query: &str) {
    let outcome = catalog.search(query);

    for failure in &outcome.failures {
        eprintln!("Warning: {} search failed: {}", failure.provider, failure.error);
    }

    if outcome.shows.is_empty() {
        println!("No shows found.");
        return;
    }

    for (index, show) in outcome.shows.iter().enumerate() {
        println!(
            "{:>3}. {:<8} {:>8}  {}",
            index + 1,
            show.id.provider,
            show.id.id,
            format_show(show)
        );
    }
}

fn run_episodes(
    catalog: &Catalog,
    query: &str,
    pick: usize,
    season: Option<u32>,
    order: EpisodeOrder,
) -> Result<(), CliError> {
    let show = pick_show(catalog, query, pick)?;
    let episodes = catalog.episodes_in_order(&show.id, order)?;

    let mut listed = 0;
    for episode in episodes
        .iter()
        .filter(|e| season.is_none_or(|s| e.season_number == s))
    {
        println!(
            "{}  {:<10}  {}",
            EpisodeKey::of(episode),
            episode.air_date.as_deref().unwrap_or("-"),
            episode.name
        );
        listed += 1;
    }

    if listed == 0 {
        println!("No episodes found.");
    }
    Ok(())
}

/// Resolves `--episode`/`--season` against the show's episode list
fn select_episodes(
    available: Vec<Episode>,
    keys: &[EpisodeKey],
    season: Option<u32>,
) -> Result<Vec<Episode>, CliError> {
    if !keys.is_empty() {
        return keys
            .iter()
            .map(|key| {
                available
                    .iter()
                    .find(|e| EpisodeKey::of(e) == *key)
                    .cloned()
                    .ok_or(CliError::EpisodeNotFound(*key))
            })
            .collect();
    }

    match season {
        Some(season) => Ok(available
            .into_iter()
            .filter(|e| e.season_number == season)
            .collect()),
        None => Err(CliError::NoEpisodesSelected),
    }
}

fn print_plan(plan: &[PlannedOperation]) {
    println!("\n=== Planned Moves ===\n");
    for (index, operation) in plan.iter().enumerate() {
        println!(
            "[{}/{}] {} - {}",
            index + 1,
            plan.len(),
            EpisodeKey::of(&operation.episode),
            operation.episode.name
        );
        println!("  From:  {}", operation.source.display());
        println!("  To:    {}", operation.destination.display());
        println!("  Media: {}", format_media_info(&operation.media_info));
    }
    println!();
}

/// Handles rename events and prints formatted output to stdout
fn handle_rename_event(event: RenameEvent) {
    match event {
        RenameEvent::Moved {
            index,
            total,
            destination,
            ..
        } => {
            println!("[{}/{}] Moved to {}", index + 1, total, destination.display());
        }
        RenameEvent::Failed {
            index,
            total,
            source,
            error,
        } => {
            eprintln!(
                "[{}/{}] Failed to move {}: {}",
                index + 1,
                total,
                source.display(),
                error
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_rename(
    catalog: &Catalog,
    query: &str,
    pick: usize,
    output: PathBuf,
    season: Option<u32>,
    keys: &[EpisodeKey],
    include_title: bool,
    dirs: &[PathBuf],
    sort: bool,
    yes: bool,
    files: Vec<PathBuf>,
) -> Result<(), CliError> {
    let show = pick_show(catalog, query, pick)?;
    let episodes = select_episodes(catalog.episodes(&show.id)?, keys, season)?;

    let mut session = RenameSession::new();
    session.select_show(show);
    for episode in episodes {
        if !session.add_episode(episode) {
            debug!("Skipping duplicate episode selection");
        }
    }
    for file in files {
        session.add_file(file);
    }
    for dir in dirs {
        let added = session.add_directory(dir)?;
        info!("Found {} video file(s) in {}", added, dir.display());
    }
    if sort {
        session.sort_episodes();
        session.sort_files();
    }

    let plan = session.plan(Some(&output), include_title)?;
    if plan.is_empty() {
        println!("Nothing to rename.");
        return Ok(());
    }

    print_plan(&plan);

    if !yes
        && !Confirm::new()
            .with_prompt(format!("Move {} file(s)?", plan.len()))
            .default(false)
            .interact()?
    {
        println!("Aborted, no files were moved.");
        return Ok(());
    }

    let report = session.execute(plan, handle_rename_event);
    println!("\nMoved {} file(s).", report.moved.len());

    if report.is_complete() {
        Ok(())
    } else {
        Err(CliError::IncompleteRename(report.failed.len()))
    }
}

fn run_inspect(files: &[PathBuf]) {
    for file in files {
        println!("{}: {}", file.display(), format_media_info(&inspect_media(file)));
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::Inspect { files } = &cli.command {
        run_inspect(files);
        return Ok(());
    }

    let config = load_config(&cli)?;
    let catalog = Catalog::open(&config)?;

    match cli.command {
        Command::Search { query } => run_search(&catalog, &query),
        Command::Episodes {
            query,
            pick,
            season,
            order,
        } => run_episodes(&catalog, &query, pick, season, order)?,
        Command::Refresh { query, pick } => {
            let show = pick_show(&catalog, &query, pick)?;
            catalog.refresh(&show.id)?;
            println!("Cleared cached data for {}.", format_show(&show));
        }
        Command::Rename {
            query,
            pick,
            output,
            season,
            episodes,
            no_title,
            dirs,
            sort,
            yes,
            files,
        } => run_rename(
            &catalog, &query, pick, output, season, &episodes, !no_title, &dirs, sort, yes,
            files,
        )?,
        Command::Inspect { .. } => {}
    }

    Ok(())
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("\nError: {}", e);
        process::exit(1);
    }
}
