// src/main.rs
mod config;
mod error;
mod fetcher;
mod materialize;
mod normalize;
mod organizer;
mod planner;
mod queue;
mod resolver;
mod search;
mod source;
mod summary;
mod templates;

use clap::{ArgAction, Parser};
use config::{Config, SearchSite};
use error::ValidationError;
use fetcher::{Fetcher, HttpTransport};
use materialize::{Materializer, Mode};
use organizer::{Options, Organizer};
use resolver::Resolver;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use summary::RunReport;

#[derive(Parser, Debug)]
#[command(name = "audiobook-organizer", version)]
#[command(about = "Organize audiobook folders using metadata scraped from Audible or Goodreads")]
struct Args {
    /// Path to place organized folders (default: a sibling `_organized_` folder)
    #[arg(short = 'O', long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Copy folders instead of moving them
    #[arg(short, long)]
    copy: bool,

    /// Flatten book folders, renumbering every audio file into the book root
    #[arg(short, long)]
    flatten: bool,

    /// Write a 'metadata.opf' file (Audiobookshelf)
    #[arg(short, long)]
    opf: bool,

    /// Write an 'info.txt' summary file
    #[arg(short, long)]
    infotxt: bool,

    /// Write debug logging to the debug log file
    #[arg(short, long)]
    debug: bool,

    /// JSON queue file: [{"folder": "...", "url": "..."}]
    #[arg(short, long, value_name = "FILE")]
    queue: Option<PathBuf>,

    /// Queue a folder with its Audible/Goodreads URL, or 'skip'
    #[arg(short, long, num_args = 2, value_names = ["FOLDER", "URL"], action = ArgAction::Append)]
    pair: Vec<String>,

    /// Site used for search suggestions
    #[arg(short, long, value_enum)]
    site: Option<SearchSite>,

    /// Print a search link for each FOLDER instead of processing
    #[arg(long)]
    suggest: bool,

    /// Persist the effective settings to the config file
    #[arg(long)]
    save_config: bool,

    /// Audiobook folder(s) to look up
    #[arg(value_name = "FOLDER")]
    folders: Vec<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("⚠️  Could not load config, using defaults: {:#}", e);
            Config::default()
        }
    };
    apply_overrides(&mut config, &args);
    init_logging(args.debug, &config.debug_log);

    if args.save_config {
        match config.save() {
            Ok(()) => println!("💾 Config saved"),
            Err(e) => eprintln!("⚠️  Failed to save config: {:#}", e),
        }
    }

    if args.suggest {
        suggest(&args.folders, config.search_site);
        return ExitCode::SUCCESS;
    }

    println!("📚 audiobook-organizer v{}", env!("CARGO_PKG_VERSION"));

    match run(&args, &config).await {
        Ok(report) => {
            print!("{}", report.render());
            ExitCode::from(report.exit_code() as u8)
        }
        Err(e) => {
            eprintln!("\n❌ {:#}", e);
            if e.downcast_ref::<ValidationError>().is_some() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(output) = &args.output {
        config.output_dir = Some(output.clone());
    }
    if let Some(site) = args.site {
        config.search_site = site;
    }
}

fn init_logging(debug: bool, log_path: &Path) {
    let default_filter = if debug { "audiobook_organizer=debug" } else { "warn" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));

    if debug {
        match std::fs::File::create(log_path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
                println!("🐛 Debug log: {}", log_path.display());
            }
            Err(e) => eprintln!("⚠️  Cannot create debug log {}: {}", log_path.display(), e),
        }
    }

    builder.init();
}

fn suggest(folders: &[PathBuf], site: SearchSite) {
    for folder in folders {
        let term = search::search_term(folder);
        println!("🔎 {}\n   {}", folder.display(), search::search_url(site, &term));
    }
}

/// Validate everything up front, then process the queue
async fn run(args: &Args, config: &Config) -> anyhow::Result<RunReport> {
    let output_dir = match &config.output_dir {
        Some(dir) => Some(queue::validate_output(dir)?),
        None => None,
    };

    let mut entries = Vec::new();
    if let Some(path) = &args.queue {
        entries.extend(queue::load(path)?);
    }
    entries.extend(queue::from_pairs(&args.pair)?);

    for folder in &args.folders {
        if !folder.is_dir() {
            return Err(ValidationError::InputNotDirectory(folder.clone()).into());
        }
    }

    let queue = queue::build(entries)?;

    let queued: HashSet<&Path> = queue.iter().map(|e| e.folder.as_path()).collect();
    for folder in &args.folders {
        let is_queued = folder
            .canonicalize()
            .map(|f| queued.contains(f.as_path()))
            .unwrap_or(false);
        if !is_queued {
            println!("⏭️  No URL queued for {}, see --suggest", folder.display());
        }
    }

    let opf_template = if args.opf {
        Some(templates::load_template(config.opf_template.as_deref())?)
    } else {
        None
    };

    let transport = HttpTransport::new(config)?;
    let resolver = Resolver::new(Fetcher::new(transport, config.retry.clone()), config);
    let mode = if args.copy { Mode::Copy } else { Mode::Move };
    let options = Options {
        output_dir,
        default_output_name: config.default_output_name.clone(),
        flatten: args.flatten,
        opf_template,
        infotxt: args.infotxt,
    };
    let organizer = Organizer::new(resolver, Materializer::new(mode), options);

    println!("\n==================== PROCESSING {} FOLDER(S) ====================", queue.len());

    let mut report = RunReport::new();
    organizer.run(&queue, &mut report).await;
    Ok(report)
}
