use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wrfpost::{run, RunOptions};

#[derive(Parser, Debug)]
#[command(
    name = "wrfpost",
    about = "Process WRF model output into human-readable forecast products"
)]
struct Args {
    /// Path to the wrfout NetCDF file
    wrf_file: PathBuf,

    /// Base output directory for products
    #[arg(default_value = "runs", env = "WRFPOST_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Digits disabling modules: 1=textgen 2=weathermaps 3=special
    /// 4=meteogram 5=skewt ("0" runs everything)
    #[arg(short = 'r', long, default_value = "0", env = "WRFPOST_RUN_FLAGS")]
    run_flags: String,

    /// The file holds a single usable timestep; skip products that
    /// need multiple hours
    #[arg(short = 'p', long)]
    partial: bool,

    /// Optional YAML file overriding the airport and product tables
    #[arg(long, env = "WRFPOST_CONFIG")]
    config: Option<PathBuf>,

    /// Log level filter when RUST_LOG is not set
    #[arg(long, default_value = "info", env = "WRFPOST_LOG_LEVEL")]
    log_level: String,
}

fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let options = RunOptions {
        wrf_file: args.wrf_file,
        output_dir: args.output_dir,
        run_flags: args.run_flags,
        partial: args.partial,
        config: args.config,
    };

    if let Err(err) = run(&options) {
        tracing::error!(error = %err, "run failed");
        std::process::exit(1);
    }
}
