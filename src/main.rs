use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use folio::{Folio, HashAlg, Options, SearchOptions};

#[derive(Parser)]
#[command(name = "folio", version, about = "Single-file versioned document store")]
struct Cli {
    /// Store file, e.g. ./docs/notes.folio
    #[arg(short, long)]
    file: PathBuf,
    /// Hash algorithm for a newly created store: xxh3, fnv1a, blake2b
    #[arg(long, default_value = "xxh3")]
    hash: String,
    /// fsync after every write
    #[arg(long)]
    sync: bool,
    /// Keep a negative-lookup bloom filter
    #[arg(long)]
    bloom: bool,
    /// Compact automatically every N writes (0 = never)
    #[arg(long, default_value = "0")]
    auto_compact: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store content under a label
    Set { label: String, content: String },
    /// Print the current content of a label
    Get { label: String },
    /// Exit 0 if the label exists, 1 otherwise
    Exists { label: String },
    /// Retire the current version of a label (history is kept)
    Del { label: String },
    /// Move the current content of one label to another
    Rename { old: String, new: String },
    /// Print every live label
    List,
    /// Print every version of a label, oldest first
    History { label: String },
    /// Print every live label/content pair
    All,
    /// Print documents whose content matches a regex
    Search {
        pattern: String,
        #[arg(short = 'i', long)]
        ignore_case: bool,
        /// Print labels only, not content
        #[arg(short, long)]
        quiet: bool,
    },
    /// Print labels matching a regex
    Match {
        pattern: String,
        #[arg(short = 'i', long)]
        ignore_case: bool,
    },
    /// Rebuild the file: sort regions, drop erased lines
    Compact,
    /// Rebuild with history discarded
    Purge,
    /// Re-key every record under a new hash algorithm
    Rehash { algorithm: String },
    /// Print header metadata
    Info,
}

fn main() {
    env_logger::builder().filter_level(LevelFilter::Warn).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        exit(1);
    }
}

fn run(cli: Cli) -> folio::Result<()> {
    let hash_algorithm = match HashAlg::from_name(&cli.hash) {
        Some(a) => a,
        None => {
            eprintln!("unknown hash algorithm {:?} (xxh3, fnv1a, blake2b)", cli.hash);
            exit(2);
        }
    };

    let dir = match cli.file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => std::path::Path::new("."),
    };
    let name = match cli.file.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => {
            eprintln!("{} has no file name", cli.file.display());
            exit(2);
        }
    };

    let db = Folio::open(
        dir,
        name,
        Options {
            hash_algorithm,
            sync_writes: cli.sync,
            bloom_filter: cli.bloom,
            auto_compact: cli.auto_compact,
            ..Options::default()
        },
    )?;

    match cli.command {
        Commands::Set { label, content } => db.set(&label, &content)?,
        Commands::Get { label } => println!("{}", db.get(&label)?),
        Commands::Exists { label } => {
            if !db.exists(&label)? {
                db.close()?;
                exit(1);
            }
        }
        Commands::Del { label } => db.delete(&label)?,
        Commands::Rename { old, new } => db.rename(&old, &new)?,
        Commands::List => db.list(|label| {
            println!("{label}");
            true
        })?,
        Commands::History { label } => db.history(&label, |content, ts| {
            println!("{ts}\t{content}");
            true
        })?,
        Commands::All => db.all(|label, content| {
            println!("{label}\t{content}");
            true
        })?,
        Commands::Search { pattern, ignore_case, quiet } => {
            let opts = SearchOptions { case_insensitive: ignore_case };
            db.search(&pattern, &opts, |label, content| {
                if quiet {
                    println!("{label}");
                } else {
                    println!("{label}\t{content}");
                }
                true
            })?;
        }
        Commands::Match { pattern, ignore_case } => {
            let opts = SearchOptions { case_insensitive: ignore_case };
            db.match_labels(&pattern, &opts, |label| {
                println!("{label}");
                true
            })?;
        }
        Commands::Compact => db.compact()?,
        Commands::Purge => db.purge()?,
        Commands::Rehash { algorithm } => match HashAlg::from_name(&algorithm) {
            Some(a) => db.rehash(a)?,
            None => {
                eprintln!("unknown hash algorithm {algorithm:?} (xxh3, fnv1a, blake2b)");
                exit(2);
            }
        },
        Commands::Info => {
            let info = db.info()?;
            println!("file:                    {}", db.path().display());
            println!("algorithm:               {}", info.algorithm.name());
            println!("dirty:                   {}", info.dirty);
            println!("heap end:                {}", info.heap_end);
            println!("index end:               {}", info.index_end);
            println!("live documents:          {}", info.live_count);
            println!("writes since compaction: {}", info.writes_since_compaction);
            println!("auto-compact every:      {}", info.auto_compact_modulus);
            println!("file length:             {}", info.file_len);
        }
    }

    db.close()?;
    Ok(())
}
