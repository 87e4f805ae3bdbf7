//! Userinfo CLI - Admin Command Line Interface
//!
//! This binary inspects and edits a userinfo store file directly.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use userinfo_common::{StoreConfig, UserObject};
use userinfo_store::Session;

#[derive(Parser, Debug)]
#[command(name = "userinfo-cli")]
#[command(about = "Userinfo Admin CLI")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "userinfo.toml", env = "USERINFO_CONFIG")]
    config: PathBuf,

    /// Store file (overrides the configuration file)
    #[arg(long, env = "USERINFO_DB")]
    db: Option<PathBuf>,

    /// Log level (overrides the configuration file)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the store file and its buckets
    Init,
    /// List buckets
    Buckets,
    /// Print the value stored under a key
    Get {
        /// Bucket name
        bucket: String,
        /// Key
        key: String,
    },
    /// Store a value under a key (an empty key only creates the bucket)
    Put {
        /// Bucket name
        bucket: String,
        /// Key
        key: String,
        /// Value, stored as given
        value: String,
    },
    /// Delete a key
    Delete {
        /// Bucket name
        bucket: String,
        /// Key
        key: String,
    },
    /// Rebuild a cache from its bucket and print it
    Sync {
        #[command(subcommand)]
        target: SyncTarget,
    },
    /// List the objects in an owner's box
    Objects {
        /// Owner ID
        owner_id: String,
        /// Only list objects this user may read
        #[arg(long)]
        viewer: Option<String>,
    },
    /// Print or remove an object's payload
    Blob {
        #[command(subcommand)]
        action: BlobCommands,
    },
}

#[derive(Subcommand, Debug)]
enum SyncTarget {
    /// Users
    Users,
    /// Object boxes
    Boxes,
    /// Objects
    Objects,
}

#[derive(Subcommand, Debug)]
enum BlobCommands {
    /// Print the payload as stored (base64 text)
    Base64 {
        /// Object ID
        object_id: String,
        /// Refuse unless this user may read the object
        #[arg(long)]
        viewer: Option<String>,
    },
    /// Write the decoded payload bytes to stdout
    Raw {
        /// Object ID
        object_id: String,
        /// Refuse unless this user may read the object
        #[arg(long)]
        viewer: Option<String>,
    },
    /// Delete the payload file
    Remove {
        /// Object ID
        object_id: String,
    },
}

fn print_json<T: Serialize>(map: HashMap<String, T>) -> Result<()> {
    let sorted: BTreeMap<String, T> = map.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&sorted)?);
    Ok(())
}

fn find_object(session: &Session, object_id: &str) -> Result<UserObject> {
    if let Some(object) = session.cache().object(object_id) {
        return Ok(object);
    }
    match session.store().get_record::<UserObject>(object_id)? {
        Some(object) => Ok(object),
        None => bail!("object not found: {object_id}"),
    }
}

fn readable_object(session: &Session, object_id: &str, viewer: Option<&str>) -> Result<UserObject> {
    let object = find_object(session, object_id)?;
    if let Some(viewer) = viewer
        && !object.is_readable_by(viewer)
    {
        bail!("{viewer} may not read object {object_id}");
    }
    Ok(object)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load config file if it exists
    let mut config = StoreConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if let Some(db) = args.db {
        config.location = db;
    }
    let log_level = args.log_level.unwrap_or_else(|| config.logging.level.clone());

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let session = Session::init(&config)
        .with_context(|| format!("failed to open {}", config.location.display()))?;

    match args.command {
        Commands::Init => {
            info!("Initialized {}", config.location.display());
            println!("Store: {}", config.location.display());
            for bucket in session.store().buckets()? {
                println!("  {bucket}");
            }
        }
        Commands::Buckets => {
            for bucket in session.store().buckets()? {
                println!("{bucket}");
            }
        }
        Commands::Get { bucket, key } => match session.store().try_read(&bucket, &key)? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => bail!("no value for {bucket}/{key}"),
        },
        Commands::Put { bucket, key, value } => {
            session.store().write(&bucket, &key, value.as_bytes())?;
            println!("Stored {bucket}/{key}");
        }
        Commands::Delete { bucket, key } => {
            session.store().delete(&bucket, &key)?;
            println!("Deleted {bucket}/{key}");
        }
        Commands::Sync { target } => match target {
            SyncTarget::Users => print_json(session.cache().sync_users()?)?,
            SyncTarget::Boxes => print_json(session.cache().sync_object_boxes()?)?,
            SyncTarget::Objects => print_json(session.cache().sync_objects()?)?,
        },
        Commands::Objects { owner_id, viewer } => {
            let objects = match viewer {
                Some(viewer) => session.cache().objects_visible_to(&owner_id, &viewer),
                None => session.cache().objects_of(&owner_id),
            };
            println!("{}", serde_json::to_string_pretty(&objects)?);
        }
        Commands::Blob { action } => match action {
            BlobCommands::Base64 { object_id, viewer } => {
                let object = readable_object(&session, &object_id, viewer.as_deref())?;
                println!("{}", session.blobs().to_base64(&object));
            }
            BlobCommands::Raw { object_id, viewer } => {
                let object = readable_object(&session, &object_id, viewer.as_deref())?;
                let raw = session.blobs().try_raw_bytes(&object)?;
                std::io::stdout().write_all(&raw)?;
            }
            BlobCommands::Remove { object_id } => {
                let object = find_object(&session, &object_id)?;
                session.blobs().remove_payload(&object)?;
                println!("Removed payload of {object_id}");
            }
        },
    }

    session.close()?;
    Ok(())
}
