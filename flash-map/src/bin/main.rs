use std::path::PathBuf;

use brainre1_flash_map::FlashMap;
use clap::{
    Parser,
    Subcommand,
};

#[derive(Parser)]
#[command(name = "brainre1-flash-map")]
#[command(about = "BrainFPV RE1 flash partition layout", long_about = None)]
struct Cli {
    /// Board revision to look up
    #[arg(short, long, default_value_t = 0)]
    revision: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print chip geometry and partitions
    Show,
    /// Validate the layout against the chip geometry
    Check,
    /// Write the partitions to a CSV file
    Csv {
        /// Output CSV file path
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let map = FlashMap::for_revision(cli.revision);

    match cli.command {
        Commands::Show => {
            print!("{}", map.render());
            Ok(())
        }
        Commands::Check => {
            map.check()?;
            println!("{} partitions OK", map.table.len());
            Ok(())
        }
        Commands::Csv { output } => {
            map.to_csv_file(&output)?;
            println!("Wrote {} partitions to {}", map.table.len(), output.display());
            Ok(())
        }
    }
}
