use clap::Parser;

use yamscan::commands::Commands;

#[derive(Parser)]
#[command(
    name = "yamscan",
    author,
    version,
    about = "Motif scanning and k-mer-preserving shuffling for DNA/RNA \
             sequences",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli.command.run() {
        eprintln!("> error: {err:#}");
        std::process::exit(1);
    }
}
