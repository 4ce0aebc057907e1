use anyhow::{Context, Result};
use clap::Parser;
use cogverse_lib::app::{App, RunOptions};
use cogverse_lib::model::config::{AppConfig, Preset};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file merged over the preset, key by key
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Starting configuration (minimal, standard, large_scale, consciousness_focus)
    #[arg(short, long, default_value = "standard")]
    preset: String,

    /// Override time.max_steps
    #[arg(short, long)]
    steps: Option<u64>,

    /// Override world.seed
    #[arg(long)]
    seed: Option<u64>,

    /// Pace ticks to time.target_fps
    #[arg(long)]
    real_time: bool,

    /// Ticks between status reports (0 disables them)
    #[arg(long, default_value_t = 100)]
    status_interval: u64,

    /// Print status reports and the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let base = args.preset.parse::<Preset>()?.config();
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path, &base)?,
        None => base,
    };
    if let Some(steps) = args.steps {
        config.time.max_steps = steps;
    }
    if let Some(seed) = args.seed {
        config.world.seed = Some(seed);
    }
    if args.real_time {
        config.time.real_time = true;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    cogverse_lib::model::init_logging(&args.log_level);

    let config = load_config(&args)?;
    tracing::info!(
        preset = %args.preset,
        fingerprint = %config.fingerprint(),
        max_steps = config.time.max_steps,
        "Configuration loaded"
    );

    let mut app = App::new(
        config,
        RunOptions {
            status_interval: args.status_interval,
            json: args.json,
        },
    )?;
    app.shutdown.listen_for_interrupt();

    let summary = app.run().await?;
    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!("{summary}");
    }

    let code = app.shutdown.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
