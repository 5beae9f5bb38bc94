use std::path::PathBuf;

use clap::Parser;
use itinerary_tools::scaffold::{self, EnvVarDecl};
use itinerary_tools::{Result, logging};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    logging::init()?;

    let vars = cli
        .env_vars
        .iter()
        .map(|raw| EnvVarDecl::parse(raw))
        .collect::<Result<Vec<_>>>()?;
    let report = scaffold::scaffold(&cli.root, cli.name.trim(), &vars)?;

    println!("Integration '{}' created.", cli.name.trim());
    println!("  module:   {}", report.module.display());
    println!("  registry: {}", report.registry.display());
    println!("  env:      {}", report.env_file.display());
    println!("  template: {}", report.env_template.display());
    Ok(())
}

/// Scaffold a new provider integration.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Integration name (lowercase module name, e.g. `cruz_del_sur`).
    #[arg(short, long)]
    name: String,

    /// Environment variables as KEY=value, comma-separated or repeated.
    #[arg(short, long, value_delimiter = ',', num_args = 1.., required = true)]
    env_vars: Vec<String>,

    /// Project root containing `src/providers`.
    #[arg(long, default_value = ".")]
    root: PathBuf,
}
