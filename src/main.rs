use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use junction_sim::render::{LogRenderer, Renderer, TerminalRenderer};
use junction_sim::simulation::{SimConfig, SimulationEngine, DEFAULT_COLLISION_LOG, DEFAULT_LANE_LENGTH};

#[derive(Parser)]
#[command(name = "junction_sim")]
#[command(about = "Traffic through a single signalized intersection")]
struct Cli {
    /// Log a status line instead of drawing the intersection
    #[arg(long)]
    headless: bool,

    /// Run for this many seconds; without it, run until Enter is pressed
    #[arg(long)]
    seconds: Option<u64>,

    /// Seed for reproducible car generation
    #[arg(long)]
    seed: Option<u64>,

    /// File the collision monitor writes to
    #[arg(long, default_value = DEFAULT_COLLISION_LOG)]
    collision_log: PathBuf,

    /// Length of every lane in distance units
    #[arg(long, default_value_t = DEFAULT_LANE_LENGTH)]
    lane_length: u32,

    /// Milliseconds between simulation ticks
    #[arg(long, default_value = "250")]
    tick_ms: u64,

    /// Milliseconds between stop light phase ticks
    #[arg(long, default_value = "1000")]
    signal_ms: u64,

    /// Milliseconds between collision scans
    #[arg(long, default_value = "125")]
    monitor_ms: u64,
}

impl Cli {
    fn config(&self) -> SimConfig {
        SimConfig {
            tick_period: Duration::from_millis(self.tick_ms),
            signal_period: Duration::from_millis(self.signal_ms),
            monitor_period: Duration::from_millis(self.monitor_ms),
            lane_length: self.lane_length,
            seed: self.seed,
            collision_log: self.collision_log.clone(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn,junction_sim=info"))
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let renderer: Box<dyn Renderer> = if cli.headless {
        Box::new(LogRenderer::new(20))
    } else {
        Box::new(TerminalRenderer::new())
    };

    let mut engine = SimulationEngine::new(config, renderer)?;

    if !cli.headless {
        TerminalRenderer::init();
    }
    let run = engine.start().and_then(|()| wait_for_stop(cli.seconds));

    engine.stop();
    if !cli.headless {
        TerminalRenderer::restore();
    }
    run?;

    engine.with_world_locked(|world| world.log_summary());
    Ok(())
}

/// Block for `seconds`, or until Enter is pressed when no duration is given
fn wait_for_stop(seconds: Option<u64>) -> Result<()> {
    match seconds {
        Some(seconds) => std::thread::sleep(Duration::from_secs(seconds)),
        None => {
            info!("Press Enter to stop");
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read from stdin")?;
        }
    }
    Ok(())
}
