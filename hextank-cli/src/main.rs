//! HEXTANK CLI - Command-line interface
//!
//! Commands:
//! - serve: Start the match server
//! - genmap: Generate a map and print it as JSON

use clap::{Parser, Subcommand};
use hextank_core::{GameMap, MAP_RADIUS};
use hextank_server::{run_server, ServerConfig};

#[derive(Parser)]
#[command(name = "hextank")]
#[command(about = "HEXTANK authoritative match server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the match server
    Serve {
        #[arg(long, default_value = "8080")]
        port: u16,
    },
    /// Generate a map and print its cells as JSON
    Genmap {
        #[arg(long)]
        seed: u64,
        #[arg(long, default_value_t = MAP_RADIUS, value_parser = clap::value_parser!(i8).range(1..=10))]
        radius: i8,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = ServerConfig { port };
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_server(config))
        }
        Commands::Genmap { seed, radius } => {
            let map = GameMap::generate(radius, seed);
            let mut cells: Vec<_> = map.cells().collect();
            cells.sort_by_key(|(hex, _)| (hex.q, hex.r));
            let json = serde_json::to_string_pretty(&cells)?;
            println!("{json}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genmap_radius_defaults_to_standard_board() {
        let cli = Cli::try_parse_from(["hextank", "genmap", "--seed", "7"]).unwrap();
        match cli.command {
            Commands::Genmap { radius, .. } => assert_eq!(radius, MAP_RADIUS),
            _ => panic!("expected genmap"),
        }
    }

    #[test]
    fn test_genmap_rejects_out_of_range_radius() {
        assert!(Cli::try_parse_from(["hextank", "genmap", "--seed", "7", "--radius", "0"]).is_err());
        assert!(
            Cli::try_parse_from(["hextank", "genmap", "--seed", "7", "--radius", "11"]).is_err()
        );
    }
}
