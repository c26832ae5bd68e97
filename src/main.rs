//! grid-diagram CLI
//!
//! Reads a diagram file (or stdin) and writes the rendered SVG to stdout or
//! the path given with `-o`.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;

use grid_diagram::{render_with_config, RenderConfig, SettingsProfile};

#[derive(Parser)]
#[command(name = "grid-diagram")]
#[command(about = "Compile ASCII grid diagrams to SVG")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Output file (writes to stdout if not provided)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings profile (TOML): spacers, text sizes, grid alignment, margin
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Inline image files as base64 data uris
    #[arg(long)]
    embed_images: bool,

    /// Overlay a checkerboard over the default layer's grid tracks
    #[arg(long)]
    debug_grid: bool,

    /// Directory relative image and font paths resolve against
    /// (defaults to the input file's directory)
    #[arg(long)]
    base_path: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let profile = match &cli.settings {
        Some(path) => {
            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("Error reading settings '{}': {}", path.display(), e);
                    std::process::exit(1);
                }
            };
            match SettingsProfile::from_toml(&text) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    eprintln!("Error in settings '{}': {}", path.display(), e.message);
                    std::process::exit(1);
                }
            }
        }
        None => None,
    };

    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let base_path = cli.base_path.clone().or_else(|| {
        cli.input
            .as_ref()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
    });

    let config = RenderConfig {
        profile,
        base_path,
        embed_images: cli.embed_images,
        debug_grid: cli.debug_grid,
    };

    let svg = match render_with_config(&source, &config) {
        Ok(svg) => svg,
        Err(e) => {
            eprintln!("{}", e.format(&source, &filename));
            std::process::exit(1);
        }
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = fs::write(path, svg) {
                eprintln!("Error writing '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        }
        None => println!("{}", svg),
    }
}
