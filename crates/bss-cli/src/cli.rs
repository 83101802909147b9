use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bss")]
#[command(about = "Compiles nested BSS stylesheets to flat CSS")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a stylesheet and everything it imports.
    Build {
        input: PathBuf,
        /// Write CSS here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        minify: bool,
        /// JSON file with compile options.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory imports are resolved against.
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },
}
