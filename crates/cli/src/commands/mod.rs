use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
use tome::{seed, Store};
use tracing::{debug, info};

/// Command handlers for the Tome CLI.
///
/// Each submodule implements one subcommand against the collection the
/// global flags select.
/// Aggregate command module.
mod aggregate;
/// Delete command module.
mod delete;
/// Explain command module.
mod explain;
/// Find command module.
mod find;
/// Script command module.
mod script;
/// Update command module.
mod update;

/// Parse a JSON command-line argument.
pub fn parse_json(s: &str) -> Result<Value, String> { serde_json::from_str(s).map_err(|e| format!("Invalid JSON: {}", e)) }

/// The CLI for the Tome document store.
///
/// Every invocation starts from a fresh in-memory store loaded with the sample
/// books (or the documents of `--data`), runs one command and prints its result
/// as pretty JSON on stdout.
#[derive(Parser)]
#[command(name = "tome")]
pub struct Cli {
    #[command(subcommand)]
    /// The subcommand to execute.
    pub command: Commands,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (can be used multiple times: -v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON file holding an array of documents to load instead of the sample books
    #[arg(long, value_name = "FILE", global = true)]
    pub data: Option<PathBuf>,

    /// Collection the documents are loaded into and commands run against
    #[arg(long, value_name = "NAME", default_value = seed::BOOKS_COLLECTION, global = true)]
    pub collection: String,
}

/// Enumeration of all available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Insert the documents and print their assigned ids.
    Seed,
    /// Find documents, with optional projection, sort and pagination.
    Find(find::FindArgs),
    /// Update the first (or every) document matching a filter.
    Update(update::UpdateArgs),
    /// Delete the first (or every) document matching a filter.
    Delete(delete::DeleteArgs),
    /// Run an aggregation pipeline.
    Aggregate(aggregate::AggregateArgs),
    /// Report how a filter would be executed.
    Explain(explain::ExplainArgs),
    /// Replay the sample query script against the books.
    Script,
}

/// Reads the documents to load: the `--data` file or the sample books.
pub fn load_documents(data: Option<&Path>) -> tome::Result<Vec<Value>> {
    let Some(path) = data
    else {
        debug!("Loading sample books");
        return Ok(seed::sample_books());
    };
    debug!("Loading documents from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Execute the specified CLI command.
///
/// This function loads the documents into a fresh store and dispatches to
/// the appropriate command handler, printing whatever it returns.
///
/// # Arguments
/// * `cli` - The parsed CLI arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or a `TomeError` on failure.
pub fn run_command(cli: Cli) -> tome::Result<()> {
    let documents = load_documents(cli.data.as_deref())?;
    let mut store = Store::new();
    let collection = store.collection_mut(&cli.collection)?;
    let ids = collection.insert_many(documents)?;
    info!("Loaded {} documents into collection {}", ids.len(), cli.collection);

    match cli.command {
        Commands::Seed => print_json(&serde_json::json!({"insertedIds": ids})),
        Commands::Find(args) => print_json(&find::run(collection, &args)?),
        Commands::Update(args) => print_json(&update::run(collection, &args)?),
        Commands::Delete(args) => print_json(&delete::run(collection, &args)?),
        Commands::Aggregate(args) => print_json(&aggregate::run(collection, &args)?),
        Commands::Explain(args) => print_json(&explain::run(collection, &args)?),
        Commands::Script => {
            for (heading, result) in script::run(collection)? {
                println!("== {} ==", heading);
                print_json(&result)?;
            }
            Ok(())
        },
    }
}

/// Prints a value as pretty JSON on stdout.
fn print_json(value: &Value) -> tome::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["tome", "find", "--filter", r#"{"genre": "Fantasy"}"#, "--limit", "2"]).unwrap();
        assert_eq!(cli.collection, "books");
        assert!(matches!(
            cli.command,
            Commands::Find(ref args) if args.filter == serde_json::json!({"genre": "Fantasy"}) && args.limit == Some(2)
        ));

        let cli = Cli::try_parse_from(["tome", "-vv", "--json", "seed", "--collection", "novels"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        assert_eq!(cli.collection, "novels");
    }

    #[test]
    fn test_cli_rejects_invalid_json() {
        assert!(Cli::try_parse_from(["tome", "find", "--filter", "{genre"]).is_err());
        assert!(Cli::try_parse_from(["tome", "update", "--filter", "{}"]).is_err());
    }

    #[test]
    fn test_load_documents_default() {
        assert_eq!(load_documents(None).unwrap().len(), 10);
    }

    #[test]
    fn test_load_documents_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"title": "Dune"}}, {{"title": "Emma"}}]"#).unwrap();
        let docs = load_documents(Some(file.path())).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_load_documents_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(load_documents(Some(&missing)), Err(tome::TomeError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(load_documents(Some(file.path())), Err(tome::TomeError::Json { .. })));
    }

    #[test]
    fn test_run_command_seed() {
        let cli = Cli::try_parse_from(["tome", "seed"]).unwrap();
        run_command(cli).unwrap();
    }
}
