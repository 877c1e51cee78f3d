//! scaffold: command-line front end for the device collection.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scaffold_client::secret_keys::{API_KEY, CLOUD_TOKEN, CLOUD_URL};
use scaffold_client::{
    Added, ClientConfig, Collection, Error, FileSecretStore, Notice, Record, RecordStore,
    RemovalOutcome, SearchResults, SecretStore, UploadOutcome,
};
use scaffold_inference::OllamaDescribeBackend;
use scaffold_jobs::{EnrichmentConfig, EnrichmentOutcome, EnrichmentPipeline};

#[derive(Parser)]
#[command(name = "scaffold")]
#[command(author, version, about = "Collect, tag and sync images and links")]
#[command(propagate_version = true)]
struct Cli {
    /// Device data directory (overrides SCAFFOLD_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy an image into the collection and tag it
    AddImage {
        path: PathBuf,

        /// Return without waiting for tagging to finish
        #[arg(long)]
        no_wait: bool,
    },

    /// Add a web link and tag it
    AddLink {
        url: String,

        /// Page title, if known
        #[arg(short, long)]
        title: Option<String>,

        /// Page description, if known
        #[arg(short, long)]
        description: Option<String>,

        /// Return without waiting for tagging to finish
        #[arg(long)]
        no_wait: bool,
    },

    /// List every record
    List,

    /// Show one record as JSON
    Show { id: String },

    /// Change a record's title and/or tags
    Edit {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        /// Comma-separated tags, replacing the current ones
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },

    /// Remove a record (remote copy first)
    Remove {
        id: String,

        /// Delete locally even if the remote store does not hold the record
        #[arg(long)]
        force: bool,
    },

    /// Remove every record (remote copies first)
    RemoveAll,

    /// Forget every local record without touching the remote store
    Clear,

    /// Upload new and changed records
    Sync,

    /// Search titles and tags
    Search { query: String },

    /// List records carrying a tag
    Tag { tag: String },

    /// Manage stored credentials
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store a credential (API_KEY, CLOUD_TOKEN or CLOUD_URL)
    Set { key: String, value: String },

    /// Delete a credential
    Unset { key: String },

    /// Show which credentials are set
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "scaffold_client=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(notice) if notice.ok => {
            println!("{}", notice.message);
            ExitCode::SUCCESS
        }
        Ok(notice) => {
            eprintln!("{}", notice.message);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn open_collection(config: ClientConfig) -> anyhow::Result<Collection> {
    let enrich = EnrichmentConfig::from_env();
    let api_key = FileSecretStore::new(&config.data_dir).get(API_KEY).await?;

    Ok(Collection::open(config, move |store: Arc<dyn RecordStore>| {
        if !enrich.enabled {
            return None;
        }
        let mut backend = OllamaDescribeBackend::from_env().with_timeout_secs(enrich.timeout_secs);
        if let Some(key) = api_key {
            backend = backend.with_api_key(key);
        }
        Some(EnrichmentPipeline::new(store, Arc::new(backend), enrich))
    }))
}

async fn run(cli: Cli) -> anyhow::Result<Notice> {
    let mut config = ClientConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    let collection = open_collection(config).await?;

    let notice = match cli.command {
        Commands::AddImage { path, no_wait } => {
            let added = collection.add_image(&path).await?;
            settle(added, no_wait).await?
        }
        Commands::AddLink {
            url,
            title,
            description,
            no_wait,
        } => {
            let added = collection.add_link(&url, title, description).await?;
            settle(added, no_wait).await?
        }
        Commands::List => {
            let records = collection.list().await?;
            print_records(&records);
            Notice::success(format!("{} record(s)", records.len()))
        }
        Commands::Show { id } => match collection.get(&id).await? {
            Some(record) => {
                println!("{}", serde_json::to_string_pretty(&record)?);
                Notice::success("")
            }
            None => Notice::failure(format!("No record with id {}", id)),
        },
        Commands::Edit { id, title, tags } => collection.edit(&id, title, tags).await?,
        Commands::Remove { id, force } => match collection.remove(&id, force).await {
            Ok((RemovalOutcome::Removed, notice)) => notice,
            Ok((RemovalOutcome::RemovedLocally { warning }, _)) => {
                Notice::success(format!("Removed locally. Warning: {}", warning))
            }
            Err(e @ Error::NotFound(_)) => {
                Notice::failure(format!(
                    "Remote store refused the removal, nothing deleted (use --force to delete locally): {}",
                    e
                ))
            }
            Err(e) => return Err(e.into()),
        },
        Commands::RemoveAll => {
            let report = collection.remove_all().await?;
            for (id, warning) in &report.warnings {
                eprintln!("{}: removed locally only ({})", id, warning);
            }
            for (id, error) in &report.failed {
                eprintln!("{}: not removed ({})", id, error);
            }
            let summary = format!(
                "Removed {}, locally only {}, failed {}",
                report.removed.len(),
                report.warnings.len(),
                report.failed.len()
            );
            if report.failed.is_empty() {
                Notice::success(summary)
            } else {
                Notice::failure(summary)
            }
        }
        Commands::Clear => collection.clear_all().await?,
        Commands::Sync => match collection.sync().await? {
            UploadOutcome::NothingToUpload => Notice::success("Nothing to upload"),
            UploadOutcome::Completed(report) => {
                for (id, error) in &report.failed {
                    eprintln!("{}: {}", id, error);
                }
                let summary = format!(
                    "Uploaded {} record(s), {} failed",
                    report.uploaded.len(),
                    report.failed.len()
                );
                if report.is_complete() {
                    Notice::success(summary)
                } else {
                    Notice::failure(summary)
                }
            }
        },
        Commands::Search { query } => match collection.search(&query).await? {
            SearchResults::Remote(hits) => {
                for hit in &hits {
                    let local = hit.local.as_ref().map(|r| r.id.as_str()).unwrap_or("-");
                    println!(
                        "{}  {}  [{}]  local={}",
                        hit.remote.id,
                        hit.remote.title,
                        hit.remote.tags.join(", "),
                        local
                    );
                }
                Notice::success(format!("{} remote match(es)", hits.len()))
            }
            SearchResults::Local(records) => {
                print_records(&records);
                Notice::success(format!("{} local match(es)", records.len()))
            }
        },
        Commands::Tag { tag } => {
            let records = collection.filter_by_tag(&tag).await?;
            print_records(&records);
            Notice::success(format!("{} record(s) tagged {:?}", records.len(), tag))
        }
        Commands::Config { action } => configure(&collection, action).await?,
    };
    Ok(notice)
}

async fn settle(added: Added, no_wait: bool) -> anyhow::Result<Notice> {
    let Added {
        record,
        notice,
        enrichment,
    } = added;
    println!("{}", record.id);

    let Some(handle) = enrichment.filter(|_| !no_wait) else {
        return Ok(notice);
    };
    match handle.wait().await {
        EnrichmentOutcome::Enriched(e) => Ok(Notice::success(format!(
            "{} Tagged as {:?} [{}]",
            notice.message,
            e.title,
            e.tags.join(", ")
        ))),
        EnrichmentOutcome::Failed(reason) => Ok(Notice::success(format!(
            "{} Tagging failed, it stays tagged \"needs tagging\": {}",
            notice.message, reason
        ))),
        EnrichmentOutcome::Superseded => Ok(Notice::success(format!(
            "{} Kept your edits, tagging result dropped.",
            notice.message
        ))),
        EnrichmentOutcome::RecordGone | EnrichmentOutcome::Disabled => Ok(notice),
    }
}

async fn configure(collection: &Collection, action: ConfigAction) -> anyhow::Result<Notice> {
    let secrets = collection.secrets();
    let known = [API_KEY, CLOUD_TOKEN, CLOUD_URL];
    match action {
        ConfigAction::Set { key, value } => {
            if !known.contains(&key.as_str()) {
                return Ok(Notice::failure(format!(
                    "Unknown key {}; expected one of {}",
                    key,
                    known.join(", ")
                )));
            }
            secrets.set(&key, &value).await?;
            Ok(Notice::success(format!("{} saved", key)))
        }
        ConfigAction::Unset { key } => {
            secrets.remove(&key).await?;
            Ok(Notice::success(format!("{} removed", key)))
        }
        ConfigAction::Show => {
            for key in known {
                let state = match secrets.get(key).await? {
                    Some(url) if key == CLOUD_URL => url,
                    Some(_) => "(set)".to_string(),
                    None => "(not set)".to_string(),
                };
                println!("{}: {}", key, state);
            }
            Ok(Notice::success(""))
        }
    }
}

fn print_records(records: &[Record]) {
    for record in records {
        let source = record.uri().or(record.url()).unwrap_or_default();
        let cloud = record.cloud_id().unwrap_or("-");
        println!(
            "{}  {}  [{}]  {}  cloud={} sync={:?}",
            &record.id[..record.id.len().min(12)],
            record.title,
            record.tags.join(", "),
            source,
            cloud,
            record.sync_state()
        );
    }
}
