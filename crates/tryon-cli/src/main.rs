use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tryon_core::{ranker, FaceShape, FixedShapeDetector, RandomShapeDetector, ShapeDetector};
use tryon_hw::V4lCaptureProvider;
use tryon_session::{Completion, Config, Controller, SessionSnapshot};

#[derive(Parser)]
#[command(name = "tryon", about = "Virtual eyewear try-on")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the frame catalog, ranked for a face shape
    Catalog {
        /// Face shape to rank for (round, oval, square, heart)
        #[arg(short, long)]
        shape: Option<FaceShape>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Open the camera, scan the face and show recommendations
    TryOn {
        /// Skip detection and use this face shape
        #[arg(short, long)]
        shape: Option<FaceShape>,
        /// Print the result snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// List V4L2 capture devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Catalog { shape, json } => show_catalog(&config, shape, json)?,
        Commands::TryOn { shape, json } => try_on(&config, shape, json).await?,
        Commands::Devices => {
            let devices = V4lCaptureProvider::list_devices();
            if devices.is_empty() {
                println!("No capture devices found");
            }
            for dev in devices {
                println!("{}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
            }
        }
    }

    Ok(())
}

fn show_catalog(config: &Config, shape: Option<FaceShape>, json: bool) -> Result<()> {
    let catalog = config.load_catalog().context("loading catalog")?;
    let ranked = ranker::rank(catalog.frames(), shape);

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    if let Some(shape) = shape {
        println!("Ranked for {shape} faces:");
    }
    for frame in ranked {
        let tag = if ranker::is_recommended(frame, shape) { "  [match]" } else { "" };
        println!(
            "  {:<4} {:<20} {:<10} {:>10}{tag}",
            frame.id,
            frame.name,
            frame.brand,
            frame.formatted_price()
        );
    }
    Ok(())
}

async fn try_on(config: &Config, shape: Option<FaceShape>, json: bool) -> Result<()> {
    let catalog = config.load_catalog().context("loading catalog")?;
    let provider = V4lCaptureProvider::new(config.camera_device.clone());
    let detector: Box<dyn ShapeDetector> = match shape {
        Some(shape) => Box::new(FixedShapeDetector(shape)),
        None => Box::new(RandomShapeDetector::new()),
    };

    let mut controller = Controller::new(
        provider,
        detector,
        catalog,
        &config.default_frame,
        config.analysis_delay(),
    )?;

    controller
        .start()
        .with_context(|| format!("cannot open camera {}; check permissions", config.camera_device))?;
    controller.analyze()?;
    println!("Analyzing face...");

    let completion = tokio::select! {
        completion = controller.next_completion() => Some(completion),
        _ = tokio::signal::ctrl_c() => None,
    };
    let Some(completion) = completion else {
        tracing::info!("interrupted; stopping session");
        controller.stop()?;
        return Ok(());
    };

    if let Some(Completion::Applied(_)) = completion {
        let snapshot = controller.snapshot();
        if json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        } else {
            print_result(&snapshot);
        }
    }

    controller.stop()?;
    Ok(())
}

fn print_result(snapshot: &SessionSnapshot) {
    if let Some(shape) = snapshot.detected_shape {
        println!("Face shape: {shape}");
    }
    if let Some(entry) = snapshot.selected() {
        println!(
            "Perfect match: {} ({}) {}",
            entry.frame.name,
            entry.frame.brand,
            entry.frame.formatted_price()
        );
    }
    println!();
    for entry in &snapshot.frames {
        let marker = if entry.selected { '>' } else { ' ' };
        let tag = if entry.recommended { "  [match]" } else { "" };
        println!(
            "{marker} {:<20} {:<10} {:>10}{tag}",
            entry.frame.name,
            entry.frame.brand,
            entry.frame.formatted_price()
        );
    }
}
