//! Interactive console over a live word index.
//!
//! Reads one command per line from stdin:
//! - `add <path>` / `rm <path>` - start or stop watching a directory
//! - `find <word>` / `count <word>` - query the index
//! - `h` help, `q` quit

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use wordindex::{IndexConfig, IndexKind, WordIndexManager};

/// Console command line arguments.
#[derive(Parser, Debug)]
#[command(name = "wordindex")]
#[command(about = "Watch directories and look up the files containing a word")]
struct Args {
    /// Directory to watch on startup
    #[arg(value_name = "ROOT")]
    root: Option<PathBuf>,

    /// Indexing worker threads
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Make lookups wait for pending index updates
    #[arg(long)]
    block_requests: bool,

    /// Skip files larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    max_file_size: Option<u64>,

    /// Newline-delimited list of ignore regular expressions
    #[arg(long, value_name = "FILE")]
    ignore_list: Option<PathBuf>,

    /// Skip regular files without an extension
    #[arg(long)]
    skip_extensionless: bool,

    /// Use the memory-lean index layout
    #[arg(long)]
    compact: bool,

    /// Raw `indexer.*` property, applied before the flags above
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = parse_property)]
    properties: Vec<(String, String)>,
}

impl Args {
    fn config(&self) -> Result<IndexConfig> {
        let properties: HashMap<String, String> = self.properties.iter().cloned().collect();
        let mut config = IndexConfig::from_properties(&properties)?;
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if self.block_requests {
            config = config.with_block_requests(true);
        }
        if let Some(max_file_size) = self.max_file_size {
            config = config.with_max_file_size(max_file_size);
        }
        if let Some(ignore_list) = &self.ignore_list {
            config = config.with_ignore_list_file(ignore_list);
        }
        if self.skip_extensionless {
            config = config.with_skip_extensionless(true);
        }
        if self.compact {
            config = config.with_index_kind(IndexKind::Compact);
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_property(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Quit,
    Add(PathBuf),
    Remove(PathBuf),
    Find(String),
    Count(String),
    Empty,
}

const HELP: &str = "\
commands:
  h               show this help
  q               shut down and exit
  add <path>      start watching a directory
  rm <path>       stop watching a directory (alias: remove)
  find <word>     list files containing a word
  count <word>    number of files containing a word";

fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (line, ""),
    };
    let require = |what: &str| {
        if arg.is_empty() {
            Err(format!("`{name}` expects a {what}"))
        } else {
            Ok(arg.to_string())
        }
    };
    match name {
        "h" | "help" => Ok(Command::Help),
        "q" | "quit" => Ok(Command::Quit),
        "add" => require("path").map(|path| Command::Add(PathBuf::from(path))),
        "rm" | "remove" => require("path").map(|path| Command::Remove(PathBuf::from(path))),
        "find" => require("word").map(Command::Find),
        "count" => require("word").map(Command::Count),
        other => Err(format!("unknown command `{other}`, type h for help")),
    }
}

/// Runs one command. Returns false when the console should exit.
fn execute(manager: &WordIndexManager, command: Command, out: &mut impl Write) -> Result<bool> {
    match command {
        Command::Empty => {}
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Quit => return Ok(false),
        Command::Add(path) => {
            let path = absolute(path)?;
            manager.start_watch(&path)?;
            writeln!(out, "watching {}", path.display())?;
        }
        Command::Remove(path) => {
            let path = absolute(path)?;
            manager.stop_watch(&path)?;
            writeln!(out, "stopped watching {}", path.display())?;
        }
        Command::Find(word) => {
            for path in manager.get_paths_by_word(&word)? {
                writeln!(out, "{path}")?;
            }
        }
        Command::Count(word) => {
            writeln!(out, "{}", manager.get_paths_by_word(&word)?.len())?;
        }
    }
    Ok(true)
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().context("unable to resolve current directory")?;
    Ok(cwd.join(path))
}

fn run_console(manager: &WordIndexManager, input: impl BufRead, out: &mut impl Write) -> Result<()> {
    write!(out, ">> ")?;
    out.flush()?;
    for line in input.lines() {
        let line = line.context("failed to read command")?;
        let keep_going = match parse_command(&line) {
            Ok(command) => execute(manager, command, out).unwrap_or_else(|error| {
                let _ = writeln!(out, "ERROR: {error}");
                true
            }),
            Err(message) => {
                writeln!(out, "ERROR: {message}")?;
                true
            }
        };
        if !keep_going {
            break;
        }
        write!(out, ">> ")?;
        out.flush()?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let config = args.config().context("invalid configuration")?;

    let manager = WordIndexManager::new(config).context("failed to start word index")?;
    if let Some(root) = &args.root {
        manager
            .start_watch(absolute(root.clone())?)
            .with_context(|| format!("failed to watch {}", root.display()))?;
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let result = run_console(&manager, stdin.lock(), &mut stdout);
    manager.shutdown();
    log::info!("bye");
    result
}
