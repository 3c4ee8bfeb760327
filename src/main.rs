//! HotBits CLI
//!
//! Produces entropy sets from a (mock) camera, reports the queue size,
//! and draws random values from stored sets.

use clap::{Args, Parser, Subcommand};
use hotbits::{
    capture::{Camera, MockCamera},
    config::FileConfig,
    engine::{BitPool, EngineError, EntropyRng},
    metrics::{MetricsRegistry, MetricsSnapshot},
    producer::Producer,
    storage::EntropyQueue,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "hotbits", version, about = "HotBits generator and consumer")]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding entropy sets (overrides the config file).
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Capture frames and store entropy sets.
    Produce(ProduceArgs),
    /// Print the number of stored sets.
    Status,
    /// Draw random values, consuming stored sets.
    Draw(DrawArgs),
}

#[derive(Debug, Args)]
struct ProduceArgs {
    /// Maximum number of stored sets before production pauses.
    #[arg(long)]
    max_sets: Option<usize>,

    /// Interval between frame captures in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stop after this many frames (0 runs until interrupted).
    #[arg(long, default_value_t = 0)]
    frames: u64,

    /// Port for the Prometheus endpoint (0 disables).
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[derive(Debug, Args)]
struct DrawArgs {
    /// How many values to draw.
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    #[command(subcommand)]
    kind: DrawKind,
}

#[derive(Debug, Subcommand)]
enum DrawKind {
    /// Raw K-bit unsigned integer.
    Bits { k: u32 },
    /// Integer in A..=B.
    Int {
        #[arg(allow_negative_numbers = true)]
        a: i64,
        #[arg(allow_negative_numbers = true)]
        b: i64,
    },
    /// Integer from START..STOP in steps of STEP.
    Range {
        #[arg(allow_negative_numbers = true)]
        start: i64,
        #[arg(allow_negative_numbers = true)]
        stop: i64,
        #[arg(allow_negative_numbers = true, default_value_t = 1)]
        step: i64,
    },
    /// Float in [0, 1).
    Float,
    /// Float between A and B.
    Uniform {
        #[arg(allow_negative_numbers = true)]
        a: f64,
        #[arg(allow_negative_numbers = true)]
        b: f64,
    },
    /// One of the given items.
    Pick {
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// The given items in random order.
    Shuffle {
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// K items from distinct positions, in their given order.
    Sample {
        k: usize,
        #[arg(required = true)]
        items: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    if let Some(storage) = cli.storage {
        config.storage.directory = storage;
    }

    match cli.command {
        Command::Produce(args) => produce(config, args),
        Command::Status => {
            let queue = EntropyQueue::from_config(&config.storage)?;
            println!("{}", queue.size()?);
            Ok(())
        }
        Command::Draw(args) => draw(config, args),
    }
}

fn produce(mut config: FileConfig, args: ProduceArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(max_sets) = args.max_sets {
        config.producer.max_sets = max_sets;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.producer.frame_interval_ms = interval_ms;
    }
    if let Some(port) = args.metrics_port {
        config.metrics.port = port;
    }
    config.validate()?;

    info!("HotBits generator v{}", hotbits::VERSION);
    info!("This is a demonstration using mock camera input");

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
    }

    let registry = MetricsRegistry::new()?;
    let registry = start_metrics_server(registry, config.metrics.port)?;

    let mut camera = MockCamera::new();
    camera.open(&config.capture)?;

    let queue = EntropyQueue::from_config(&config.storage)?;
    info!(
        directory = %queue.directory().display(),
        resident = queue.size()?,
        "Storage ready"
    );

    let mut producer = Producer::new(camera, queue, &config.producer);
    let max_frames = (args.frames > 0).then_some(args.frames);
    let result = producer.run_observed(max_frames, &stop, |queue, stats| {
        registry.update(&MetricsSnapshot::from_producer(queue, stats));
    });

    let stats = producer.stats();
    registry.update(&MetricsSnapshot::from_producer(producer.queue(), &stats));
    info!(
        frames = stats.frames_processed,
        sets = stats.sets_written,
        waits = stats.backpressure_waits,
        "Exiting"
    );

    producer.into_camera().close();
    result?;
    Ok(())
}

/// Starts the metrics endpoint on a background runtime and returns a handle
/// for pushing snapshots.
#[cfg(feature = "metrics")]
fn start_metrics_server(
    registry: MetricsRegistry,
    port: u16,
) -> Result<MetricsHandle, Box<dyn std::error::Error>> {
    use hotbits::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return Ok(MetricsHandle::Local(registry));
    }

    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();
    let runtime = tokio::runtime::Runtime::new()?;
    std::thread::spawn(move || {
        if let Err(e) = runtime.block_on(server.run()) {
            error!("Metrics server stopped: {}", e);
        }
    });
    Ok(MetricsHandle::Served(state))
}

#[cfg(not(feature = "metrics"))]
fn start_metrics_server(
    registry: MetricsRegistry,
    port: u16,
) -> Result<MetricsHandle, Box<dyn std::error::Error>> {
    if port != 0 {
        warn!(port, "Built without the `metrics` feature; not serving metrics");
    }
    Ok(MetricsHandle::Local(registry))
}

enum MetricsHandle {
    Local(MetricsRegistry),
    #[cfg(feature = "metrics")]
    Served(Arc<tokio::sync::RwLock<hotbits::metrics::MetricsState>>),
}

impl MetricsHandle {
    fn update(&self, snapshot: &MetricsSnapshot) {
        match self {
            MetricsHandle::Local(registry) => registry.update(snapshot),
            #[cfg(feature = "metrics")]
            MetricsHandle::Served(state) => state.blocking_write().update(snapshot),
        }
    }
}

fn draw(config: FileConfig, args: DrawArgs) -> Result<(), Box<dyn std::error::Error>> {
    let queue = EntropyQueue::from_config(&config.storage)?;
    let mut rng = BitPool::new(queue, config.engine.clone());

    for _ in 0..args.count {
        let line = match draw_one(&mut rng, &args.kind) {
            Ok(line) => line,
            Err(e) if e.is_exhausted() => {
                warn!("No HotBits available. Generate more sets with `hotbits produce`.");
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        println!("{}", line);
    }

    let snapshot = MetricsSnapshot::from_pool(&rng);
    info!(
        sets_consumed = snapshot.sets_consumed,
        bits_extracted = snapshot.bits_extracted,
        bits_discarded = snapshot.pool_bits_buffered,
        rejections = snapshot.rejections,
        remaining_sets = snapshot.queue_sets,
        "Draw complete"
    );
    Ok(())
}

fn draw_one(rng: &mut BitPool, kind: &DrawKind) -> Result<String, EngineError> {
    Ok(match kind {
        DrawKind::Bits { k } => rng.extract(*k)?.to_string(),
        DrawKind::Int { a, b } => rng.int_inclusive(*a, *b)?.to_string(),
        DrawKind::Range { start, stop, step } => rng.range(*start, *stop, *step)?.to_string(),
        DrawKind::Float => rng.uniform01()?.to_string(),
        DrawKind::Uniform { a, b } => rng.uniform(*a, *b)?.to_string(),
        DrawKind::Pick { items } => rng.pick(items)?.clone(),
        DrawKind::Shuffle { items } => {
            let mut items = items.clone();
            rng.shuffle(&mut items)?;
            items.join(" ")
        }
        DrawKind::Sample { k, items } => rng
            .pick_distinct(items, *k)?
            .into_iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" "),
    })
}
