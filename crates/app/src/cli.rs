use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Run with in-memory stores; nothing is written to disk.
    #[arg(long, default_value_t = false)]
    pub ephemeral: bool,
}
