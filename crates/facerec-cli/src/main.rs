use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facerec_core::onnx::OnnxAnalyzer;
use facerec_core::{EncodingCache, FaceRecError, Identity, Label, RecognitionSession};
use facerec_hw::Camera;
use facerec_store::SqliteStore;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

mod annotate;
mod config;
mod font;

use config::Config;

#[derive(Parser)]
#[command(name = "facerec", about = "Webcam face enrollment and recognition")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a face from a short burst of camera frames
    Enroll {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        age: i64,
        #[arg(short, long)]
        email: String,
    },
    /// Label faces in the live camera feed until Ctrl-C
    Recognize {
        /// Stop after this many capture attempts
        #[arg(long)]
        max_frames: Option<u64>,
        /// Write the last annotated frame to this PNG file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Delete every record stored under a name
    Delete { name: String },
    /// List stored identities
    List {
        #[arg(long)]
        json: bool,
    },
    /// Write one row's encoding blob to a .bin file
    Export {
        rowid: i64,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Print an encoding stored in a .bin file
    Inspect {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List V4L2 capture devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::load()?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Enroll { name, age, email } => enroll(&config, Identity { name, age, email }),
        Commands::Recognize { max_frames, snapshot } => {
            recognize(&config, max_frames, snapshot).await
        }
        Commands::Delete { name } => delete(&config, &name),
        Commands::List { json } => list(&config, json),
        Commands::Export { rowid, dir } => {
            let path = store(&config).export_encoding(rowid, &dir)?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Inspect { file, json } => inspect(&file, json),
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No capture devices found");
            }
            for d in devices {
                println!("{}  {} ({}, {})", d.path, d.name, d.driver, d.bus);
            }
            Ok(())
        }
    }
}

fn store(config: &Config) -> SqliteStore {
    SqliteStore::new(&config.db_path)
}

fn load_cache(store: &SqliteStore) -> Result<EncodingCache> {
    facerec_core::load_cache(store)
        .with_context(|| format!("loading identities from {}", store.path().display()))
}

fn open_camera(config: &Config) -> Result<Camera> {
    let mut camera = Camera::open(&config.camera_device)
        .with_context(|| format!("opening camera {}", config.camera_device))?;
    camera.warm_up(config.warmup_frames);
    Ok(camera)
}

fn load_analyzer(config: &Config) -> Result<OnnxAnalyzer> {
    OnnxAnalyzer::load(&config.model_dir)
        .with_context(|| format!("loading face models from {}", config.model_dir.display()))
}

fn enroll(config: &Config, identity: Identity) -> Result<()> {
    let store = store(config);
    let mut cache = load_cache(&store)?;
    let mut analyzer = load_analyzer(config)?;

    let report = {
        let mut camera = open_camera(config)?;
        facerec_core::enroll(
            &mut camera,
            &mut analyzer,
            &store,
            &mut cache,
            &identity,
            config.frames_per_enroll,
        )
    };

    match report {
        Ok(report) => {
            println!(
                "User '{}' registered successfully ({} of {} frames used).",
                report.name, report.samples_used, report.frames_captured
            );
            Ok(())
        }
        Err(FaceRecError::NoFaceDetected) => {
            anyhow::bail!("No face detected in the captured images.")
        }
        Err(e) => Err(e).context("registration failed"),
    }
}

async fn recognize(config: &Config, max_frames: Option<u64>, snapshot: Option<PathBuf>) -> Result<()> {
    let store = store(config);
    let cache = load_cache(&store)?;
    if cache.is_empty() {
        tracing::warn!("no registered users; every face will be labeled Unknown");
    }

    let matcher = config.matcher();
    let analyzer = load_analyzer(config)?;
    let camera = open_camera(config)?;
    let mut session = RecognitionSession::new(camera, analyzer)
        .with_max_capture_failures(config.max_capture_failures);

    let mut interval = tokio::time::interval(Duration::from_millis(config.tick_interval_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_labels: Vec<Label> = Vec::new();
    let mut last_report = None;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("recognition stopped");
                break;
            }
            _ = interval.tick() => {
                let outcome = session
                    .tick(&cache, &matcher)
                    .with_context(|| format!("reading from camera {}", config.camera_device))?;
                if let Some(report) = outcome {
                    let labels: Vec<Label> = report.faces.iter().map(|f| f.label.clone()).collect();
                    if labels != last_labels {
                        let shown: Vec<String> = labels.iter().map(ToString::to_string).collect();
                        println!("frame {}: [{}]", report.frame.sequence, shown.join(", "));
                        last_labels = labels;
                    }
                    last_report = Some(report);
                }
                if max_frames.is_some_and(|max| session.ticks() >= max) {
                    break;
                }
            }
        }
    }

    tracing::info!(ticks = session.ticks(), dropped = session.dropped(), "recognition finished");
    drop(session);

    if let (Some(path), Some(report)) = (snapshot, last_report) {
        annotate::save_snapshot(&path, &report.frame, &report.faces)?;
        println!("Snapshot written to {}", path.display());
    }

    Ok(())
}

fn delete(config: &Config, name: &str) -> Result<()> {
    let store = store(config);
    let mut cache = load_cache(&store)?;

    match facerec_core::delete_identity(&store, &mut cache, name) {
        Ok(_) => {
            println!("User '{name}' has been deleted successfully.");
            Ok(())
        }
        Err(FaceRecError::UserNotFound(_)) => {
            eprintln!("No user found with the name '{name}'.");
            Ok(())
        }
        Err(e) => Err(e).context("delete failed"),
    }
}

fn list(config: &Config, json: bool) -> Result<()> {
    let store = store(config);
    facerec_core::EncodingStore::initialize(&store)?;
    let records = store.records()?;

    if json {
        let rows: Vec<_> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "rowid": r.rowid,
                    "name": r.record.identity.name,
                    "age": r.record.identity.age,
                    "email": r.record.identity.email,
                    "dim": r.record.reference_encoding.dim(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No users registered");
    }
    for r in &records {
        let id = &r.record.identity;
        println!(
            "{:>4}  {}  age={}  email={}  dim={}",
            r.rowid,
            id.name,
            id.age,
            id.email,
            r.record.reference_encoding.dim()
        );
    }
    Ok(())
}

fn inspect(file: &std::path::Path, json: bool) -> Result<()> {
    let encoding = facerec_store::read_encoding_file(file)?;
    if json {
        println!("{}", serde_json::to_string(&encoding)?);
    } else {
        println!("dim: {}", encoding.dim());
        println!("{:?}", encoding.values);
    }
    Ok(())
}
