//! Headless driver for the neural terrain pipeline.
//!
//! `generate` runs one job against a local world at the normal tick rate,
//! `export` dumps a chunk's voxels to CSV.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use parking_lot::RwLock;

use neural_terrain::{
    ChunkGenerator, DEFAULT_CONFIG_FILE, DEFAULT_WORLD_FILE, ExportConfig, GenerationConfig,
    GenerationRequest, GenerationService, SavedWorld, TICKS_PER_SECOND, World, export_region,
    load_world, save_world,
};

/// Replace a chunk's terrain with blocks predicted by an ONNX model
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory with the model and category tables
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data-dir>/generative_terrain.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// World snapshot to load and save
    #[arg(long, global = true, default_value = DEFAULT_WORLD_FILE)]
    world: PathBuf,

    /// Seed for chunks that are not in the snapshot
    #[arg(long, global = true, default_value_t = 12345)]
    seed: u32,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate terrain for one chunk
    Generate {
        #[arg(long, allow_hyphen_values = true)]
        chunk_x: i32,
        #[arg(long, allow_hyphen_values = true)]
        chunk_z: i32,
        #[arg(long, default_value_t = 0)]
        requester: u32,
    },
    /// Export a chunk's voxels to CSV
    Export {
        #[arg(long, allow_hyphen_values = true)]
        chunk_x: i32,
        #[arg(long, allow_hyphen_values = true)]
        chunk_z: i32,
        /// Output file, must end with .csv
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => GenerationConfig::load(path)?,
        None => {
            let data_dir = args
                .data_dir
                .clone()
                .unwrap_or_else(neural_terrain::config::default_data_dir);
            GenerationConfig::load(&data_dir.join(DEFAULT_CONFIG_FILE))?
        }
    };
    if let Some(data_dir) = &args.data_dir {
        config = config.with_data_dir(data_dir);
    }

    let mut world = open_world(&args)?;

    match args.command {
        Command::Generate {
            chunk_x,
            chunk_z,
            requester,
        } => {
            ensure_chunks(&mut world, chunk_x, chunk_z);
            let world = Arc::new(RwLock::new(world));
            generate(Arc::clone(&world), &config, chunk_x, chunk_z, requester)?;

            let world = world.read();
            save_world(&args.world, &SavedWorld::from_world(&world))?;
            tracing::info!("World saved to {}", args.world.display());
        }
        Command::Export {
            chunk_x,
            chunk_z,
            out,
        } => {
            ensure_chunks(&mut world, chunk_x, chunk_z);
            let export = ExportConfig::new(out)?;
            let rows = export_region(&world, chunk_x, chunk_z, &export)?;
            println!(
                "Chunk data fetched successfully! {} rows written to {}",
                rows,
                export.path().display()
            );
        }
    }
    Ok(())
}

fn open_world(args: &Args) -> Result<World, Box<dyn std::error::Error>> {
    if args.world.exists() {
        let world = load_world(&args.world)?.into_world();
        tracing::info!(
            "Loaded {} chunks from {}",
            world.chunks.len(),
            args.world.display()
        );
        Ok(world)
    } else {
        Ok(World::new(args.seed))
    }
}

/// Generates the target chunk and its neighbours if they are missing, so
/// every lookup the pipeline makes lands in loaded terrain.
fn ensure_chunks(world: &mut World, chunk_x: i32, chunk_z: i32) {
    let generator = ChunkGenerator::new(world.seed);
    for cx in chunk_x - 1..=chunk_x + 1 {
        for cz in chunk_z - 1..=chunk_z + 1 {
            if !world.is_loaded(cx, cz) {
                world.insert_chunk(cx, cz, generator.generate_chunk(cx, cz));
            }
        }
    }
}

fn generate(
    world: neural_terrain::SharedWorld,
    config: &GenerationConfig,
    chunk_x: i32,
    chunk_z: i32,
    requester: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut service = GenerationService::start(world, config)?;

    if let Err(err) = service.submit(GenerationRequest::for_chunk(requester, chunk_x, chunk_z)) {
        service.shutdown();
        return Err(err.into());
    }

    let tick_duration = Duration::from_millis(1000 / TICKS_PER_SECOND);
    let mut failure = None;
    'ticks: loop {
        let tick_start = Instant::now();
        service.tick();

        for event in service.poll_events() {
            println!("{}", event);
            if event.is_terminal() {
                if let neural_terrain::GenerationEventKind::Failed { message } = event.kind {
                    failure = Some(message);
                }
                break 'ticks;
            }
        }

        if let Some(remaining) = tick_duration.checked_sub(tick_start.elapsed()) {
            thread::sleep(remaining);
        }
    }

    service.shutdown();
    match failure {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}
