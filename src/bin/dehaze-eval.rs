use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use dcp_dehaze::{
    io, report, BatchEvaluator, BatchOptions, BatchReport, Clahe, ClaheParams, DarkChannelPrior,
    DehazeMethod, DehazeParams, FileSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Dark Channel Prior
    Dcp,
    /// Contrast Limited Adaptive Histogram Equalization
    Clahe,
}

#[derive(Parser)]
#[command(
    name = "dehaze-eval",
    about = "Remove haze with the Dark Channel Prior and score results with PSNR/SSIM",
    version,
    after_help = "Example: dehaze-eval photos/ --csv results.csv --save-dir out/\n\n\
                  Scores compare each processed image against its own hazy input."
)]
struct Cli {
    /// Input image files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Methods to evaluate, in column order
    #[arg(
        short,
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [Method::Dcp, Method::Clahe]
    )]
    methods: Vec<Method>,

    /// Dark channel and dilation window size (odd)
    #[arg(long, default_value_t = dcp_dehaze::DEFAULT_PATCH_SIZE)]
    patch_size: u32,

    /// Haze removal strength (0.0-1.0]
    #[arg(long, default_value_t = DehazeParams::default().omega)]
    omega: f64,

    /// Lower bound for transmission (0.0-1.0]
    #[arg(long, default_value_t = DehazeParams::default().t_min)]
    t_min: f64,

    /// Fraction of brightest dark-channel pixels used for atmospheric light
    #[arg(long, default_value_t = DehazeParams::default().top_fraction)]
    top_fraction: f64,

    /// CLAHE clip limit
    #[arg(long, default_value_t = ClaheParams::default().clip_limit)]
    clip_limit: f64,

    /// CLAHE tile grid size (tiles per axis)
    #[arg(long, default_value_t = 8)]
    tiles: u32,

    /// Write per-image scores to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write aggregate statistics to this CSV file
    #[arg(long)]
    summary_csv: Option<PathBuf>,

    /// Save processed images into this directory
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Extension (format) for saved images
    #[arg(long, default_value = "jpg")]
    save_format: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "dcp_dehaze=debug"
    } else if cli.quiet {
        "dcp_dehaze=warn"
    } else {
        "dcp_dehaze=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_methods(cli: &Cli) -> dcp_dehaze::Result<Vec<Box<dyn DehazeMethod>>> {
    let dehaze = DehazeParams {
        patch_size: cli.patch_size,
        omega: cli.omega,
        t_min: cli.t_min,
        top_fraction: cli.top_fraction,
    };
    let clahe = ClaheParams {
        clip_limit: cli.clip_limit,
        tiles_x: cli.tiles,
        tiles_y: cli.tiles,
    };

    // Validate everything up front, even methods that were not selected
    dehaze.validate()?;
    clahe.validate()?;

    cli.methods
        .iter()
        .map(|m| -> dcp_dehaze::Result<Box<dyn DehazeMethod>> {
            let method: Box<dyn DehazeMethod> = match m {
                Method::Dcp => Box::new(DarkChannelPrior::new(dehaze)?),
                Method::Clahe => Box::new(Clahe::new(clahe)?),
            };
            Ok(method)
        })
        .collect()
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let methods = match build_methods(&cli) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let options = BatchOptions {
        save_dir: cli.save_dir.clone(),
        save_extension: cli.save_format.clone(),
    };
    let evaluator = match BatchEvaluator::new(methods, options) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let inputs = match io::collect_inputs(&cli.inputs) {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("Error: failed to read inputs: {e}");
            process::exit(1);
        }
    };
    let ids: Vec<String> = inputs.iter().map(|p| p.display().to_string()).collect();

    let result = match evaluator.evaluate(&FileSource, &ids) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Fatal: {e}");
            process::exit(1);
        }
    };

    if !cli.quiet {
        print_report(&result);
    }

    if let Some(path) = &cli.csv {
        if let Err(e) = report::write_records_file(&result, path) {
            eprintln!("Error: failed to write {}: {e}", path.display());
            process::exit(1);
        }
    }
    if let Some(path) = &cli.summary_csv {
        if let Err(e) = report::write_summary_file(&result.summaries(), path) {
            eprintln!("Error: failed to write {}: {e}", path.display());
            process::exit(1);
        }
    }

    if result.records.is_empty() {
        eprintln!("Error: no image could be evaluated");
        process::exit(1);
    }
}

fn print_report(result: &BatchReport) {
    for record in &result.records {
        let scores: Vec<String> = result
            .methods
            .iter()
            .zip(&record.scores)
            .map(|(m, s)| format!("{m}: PSNR {:.2} dB, SSIM {:.4}", s.psnr, s.ssim))
            .collect();
        eprintln!("[OK] {} ({})", record.id, scores.join("; "));
    }
    for skipped in &result.skipped {
        eprintln!("[SKIP] {}: {}", skipped.id, skipped.reason);
    }

    eprintln!();
    eprint!("[Summary] Evaluated: {}", result.records.len());
    if !result.skipped.is_empty() {
        eprint!(", Skipped: {}", result.skipped.len());
    }
    if result.failed_saves > 0 {
        eprint!(", Failed saves: {}", result.failed_saves);
    }
    eprintln!(" (Total: {})", result.total());

    if !result.records.is_empty() {
        println!();
        print!("{}", report::format_summary_table(&result.summaries()));
    }
}
