//! Command-line town generator: build a seeded town plan and write it as
//! an SVG document.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};
use townforge::{City, CoastMode, TownPlan};

#[derive(Parser, Debug)]
#[command(name = "townforge", version, about = "Procedural medieval town plan generator")]
struct Cli {
    /// Random seed; omitted or negative means time-derived.
    #[arg(long, allow_hyphen_values = true)]
    seed: Option<i64>,

    /// Town size: small (15 cells), medium (30) or large (60).
    #[arg(long, default_value = "medium")]
    size: String,

    /// Explicit cell count in 5..=200; overrides --size.
    #[arg(long)]
    cells: Option<usize>,

    /// Force a coastal town.
    #[arg(long, conflicts_with = "no_coast")]
    coast: bool,

    /// Force an inland town.
    #[arg(long)]
    no_coast: bool,

    /// Output SVG path.
    #[arg(value_hint = clap::ValueHint::FilePath)]
    output: PathBuf,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cells = match cli.cells {
        Some(n) => n,
        None => townforge::constants::size_cells(&cli.size)
            .with_context(|| format!("unknown size '{}'", cli.size))?,
    };

    let seed = match cli.seed {
        Some(s) if s >= 0 => s,
        _ => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(1),
    };

    let coast = if cli.coast {
        CoastMode::Force
    } else if cli.no_coast {
        CoastMode::Forbid
    } else {
        CoastMode::Random
    };

    let mut city = City::new(cells, seed, coast)?;
    city.build()?;
    let plan = TownPlan::from_city(&city);

    let svg = townforge::svg::render(&plan);
    std::fs::write(&cli.output, svg)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    println!("wrote {}", cli.output.display());
    println!("seed: {} (reuse to regenerate this town)", seed);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help/version requests are not failures.
            if e.use_stderr() {
                eprintln!("{}", e);
                return ExitCode::from(1);
            }
            print!("{}", e);
            return ExitCode::SUCCESS;
        }
    };
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
