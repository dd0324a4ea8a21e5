//! planetforge CLI: build cube-sphere chunks, whole planets and heightmaps.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use glam::DVec3;
use tracing_subscriber::EnvFilter;

use planetforge::export::{export_chunks_obj, export_planet_heightmaps, PngExportOptions};
use planetforge::forge::{execute, ChunkForge, ChunkRequest, ForgeConfig, ForgeMessage, Task, TaskId, TaskOutput};
use planetforge::geometry::FaceDirection;
use planetforge::mesh::{ChunkResult, NormalMode};
use planetforge::terrain::{generate_planet_heightmaps, CraterField, Seed, TerrainFunction, TerrainSettings};

type CliResult = Result<(), Box<dyn Error>>;

/// Chunked cube-sphere planet generator.
#[derive(Parser)]
#[command(name = "planetforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a single chunk and print its statistics.
    Chunk {
        #[command(flatten)]
        terrain: TerrainArgs,

        /// JSON build request; overrides the geometry flags below.
        #[arg(long)]
        request: Option<PathBuf>,

        /// Cube face (up, down, left, right, forward, backward).
        #[arg(long, default_value = "forward")]
        face: FaceDirection,

        /// Edge length of a depth-0 chunk (twice the planet radius).
        #[arg(long, default_value = "1000")]
        chunk_length: f64,

        /// Grid cells per chunk side.
        #[arg(long, default_value = "16")]
        subdivisions: u32,

        /// Quadtree depth of the chunk.
        #[arg(long, default_value = "0")]
        depth: u32,

        /// Chunk origin as x,y,z in the unrotated frame [default: 0,0,chunk_length/2].
        #[arg(long, value_delimiter = ',', num_args = 3, allow_negative_numbers = true)]
        position: Option<Vec<f64>>,

        /// Derive normals from the terrain gradient instead of the faces.
        #[arg(long)]
        analytic_normals: bool,

        /// Write the mesh as Wavefront OBJ.
        #[arg(long)]
        obj: Option<PathBuf>,

        /// Print the reply message as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Build every chunk of a planet at one depth through the worker pool.
    Planet {
        #[command(flatten)]
        terrain: TerrainArgs,

        #[arg(long, default_value = "1000")]
        chunk_length: f64,

        #[arg(long, default_value = "16")]
        subdivisions: u32,

        /// Each face is split into 4^depth chunks.
        #[arg(long, default_value = "1")]
        depth: u32,

        /// Worker threads (0 = one per CPU).
        #[arg(long, default_value = "0")]
        workers: usize,

        /// Output OBJ file.
        #[arg(short, long, default_value = "./output/planet.obj")]
        output: PathBuf,
    },

    /// Render the six face heightmaps as 16-bit PNGs.
    Heightmap {
        #[command(flatten)]
        terrain: TerrainArgs,

        /// Per-face resolution in pixels.
        #[arg(short, long, default_value = "512")]
        resolution: u32,

        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Base name for output files.
        #[arg(short, long, default_value = "planet")]
        name: String,
    },

    /// Print the surface radius along a direction.
    Sample {
        #[command(flatten)]
        terrain: TerrainArgs,

        /// Direction as x,y,z.
        #[arg(long, required = true, value_delimiter = ',', num_args = 3, allow_negative_numbers = true)]
        direction: Vec<f64>,

        /// Base sphere radius.
        #[arg(long, default_value = "500")]
        radius: f64,
    },
}

#[derive(Args)]
struct TerrainArgs {
    /// Seed for reproducible terrain.
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Built-in settings preset.
    #[arg(long, default_value = "earth")]
    preset: Preset,

    /// Terrain settings JSON; overrides the preset.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Earth,
    Moon,
}

impl TerrainArgs {
    fn build(&self) -> Result<TerrainFunction, Box<dyn Error>> {
        let settings = match &self.settings {
            Some(path) => TerrainSettings::load(path)?,
            None => match self.preset {
                Preset::Earth => TerrainSettings::earth_like(),
                Preset::Moon => TerrainSettings::moon_like(),
            },
        };
        Ok(TerrainFunction::new(settings, Seed::from(self.seed))?)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Chunk {
            terrain,
            request,
            face,
            chunk_length,
            subdivisions,
            depth,
            position,
            analytic_normals,
            obj,
            json,
        } => {
            let request = match request {
                Some(path) => load_request(&path),
                None => Ok(ChunkRequest {
                    depth,
                    position: position
                        .map(|p| DVec3::new(p[0], p[1], p[2]))
                        .unwrap_or(DVec3::new(0.0, 0.0, chunk_length / 2.0)),
                    normal_mode: if analytic_normals {
                        NormalMode::Analytic
                    } else {
                        NormalMode::FaceAccumulation
                    },
                    ..ChunkRequest::root(face, chunk_length, subdivisions)
                }),
            };
            request.and_then(|request| run_chunk(&terrain, request, obj, json))
        }
        Commands::Planet {
            terrain,
            chunk_length,
            subdivisions,
            depth,
            workers,
            output,
        } => run_planet(&terrain, chunk_length, subdivisions, depth, workers, output),
        Commands::Heightmap {
            terrain,
            resolution,
            output,
            name,
        } => run_heightmap(&terrain, resolution, output, name),
        Commands::Sample {
            terrain,
            direction,
            radius,
        } => run_sample(&terrain, DVec3::new(direction[0], direction[1], direction[2]), radius),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_request(path: &PathBuf) -> Result<ChunkRequest, Box<dyn Error>> {
    let json = std::fs::read_to_string(path)?;
    match Task::from_json(&json)? {
        Task::Build(request) => Ok(request),
        Task::Height(_) => Err("expected a buildTask request".into()),
    }
}

fn run_chunk(terrain: &TerrainArgs, request: ChunkRequest, obj: Option<PathBuf>, json: bool) -> CliResult {
    let terrain = terrain.build()?;
    let start = Instant::now();
    let outcome = execute(&terrain, Task::Build(request));
    let elapsed = start.elapsed();

    let chunk = match outcome {
        Ok(TaskOutput::Chunk(chunk)) => chunk,
        Ok(TaskOutput::Height(_)) => return Err("unexpected height result".into()),
        Err(e) => return Err(e.into()),
    };

    if json {
        let message = ForgeMessage::Chunk {
            id: TaskId(0),
            result: chunk.clone(),
        };
        println!("{}", message.to_json()?);
    } else {
        println!("Built chunk in {:.2?}", elapsed);
        print_chunk_stats(&chunk);
    }

    if let Some(path) = obj {
        export_chunks_obj(std::slice::from_ref(&chunk), &path)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_chunk_stats(chunk: &ChunkResult) {
    let radii = (0..chunk.vertex_count()).map(|i| chunk.position(i).length());
    let (min, max) = radii.fold((f32::MAX, f32::MIN), |(lo, hi), r| (lo.min(r), hi.max(r)));
    println!("  Vertices:  {}", chunk.vertex_count());
    println!("  Triangles: {}", chunk.triangle_count());
    println!("  Radius range: [{:.3}, {:.3}]", min, max);
    println!("  Average elevation: {:.3}", chunk.average_elevation);
}

fn run_planet(
    terrain: &TerrainArgs,
    chunk_length: f64,
    subdivisions: u32,
    depth: u32,
    workers: usize,
    output: PathBuf,
) -> CliResult {
    let terrain = Arc::new(terrain.build()?);
    let forge = ChunkForge::new(
        terrain,
        ForgeConfig {
            workers,
            ..ForgeConfig::default()
        },
    )?;

    let mut requests: Vec<ChunkRequest> = FaceDirection::all()
        .into_iter()
        .map(|face| ChunkRequest::root(face, chunk_length, subdivisions))
        .collect();
    for _ in 0..depth {
        requests = requests.iter().flat_map(ChunkRequest::children).collect();
    }

    println!("planetforge - {} chunks on {} workers", requests.len(), forge.worker_count());
    let start = Instant::now();
    let mut ids = Vec::with_capacity(requests.len());
    for request in requests {
        ids.push(forge.submit(Task::Build(request))?);
    }

    let mut chunks: Vec<Option<ChunkResult>> = vec![None; ids.len()];
    for completed in forge.drain() {
        let chunk = match completed.outcome? {
            TaskOutput::Chunk(chunk) => chunk,
            TaskOutput::Height(_) => return Err("unexpected height result".into()),
        };
        if let Some(slot) = ids.iter().position(|&id| id == completed.id) {
            chunks[slot] = Some(chunk);
        }
    }
    let chunks: Vec<ChunkResult> = chunks.into_iter().flatten().collect();
    println!("Built {} chunks in {:.2?}", chunks.len(), start.elapsed());

    export_chunks_obj(&chunks, &output)?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn run_heightmap(terrain: &TerrainArgs, resolution: u32, output: PathBuf, name: String) -> CliResult {
    if !(16..=8192).contains(&resolution) {
        return Err("resolution must be between 16 and 8192".into());
    }
    let terrain = terrain.build()?;
    let start = Instant::now();
    let maps = generate_planet_heightmaps(&terrain, &CraterField::empty(), resolution);
    println!("Sampled 6 faces at {0}x{0} in {1:.2?}", resolution, start.elapsed());

    let options = PngExportOptions::auto_range(&maps);
    println!("Height range: [{:.1}, {:.1}]", options.min_height, options.max_height);
    export_planet_heightmaps(&maps, &output, &name, &options)?;
    println!("Exported 6 PNG files: {}/{}_*.png", output.display(), name);
    Ok(())
}

fn run_sample(terrain: &TerrainArgs, direction: DVec3, radius: f64) -> CliResult {
    let terrain = terrain.build()?;
    let height = terrain
        .sample_height(direction, radius, &CraterField::empty())
        .ok_or("direction must be non-zero")?;
    println!("{height}");
    Ok(())
}
