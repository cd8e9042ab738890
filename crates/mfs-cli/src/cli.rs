use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mfs",
    about = "Edit files stored as trees of content-addressed nodes",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub layout: LayoutArgs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Tree layout options shared by every command.
#[derive(Args, Clone, Debug)]
pub struct LayoutArgs {
    /// TOML file with `chunk_size` and `max_links`
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Leaf size in bytes (overrides the config file)
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,
    /// Maximum children per interior node (overrides the config file)
    #[arg(long, global = true)]
    pub max_links: Option<usize>,
    /// Address version of the imported file; 1 stores raw leaves
    #[arg(long, global = true, default_value_t = 1)]
    pub address_version: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import a local file and print its root
    Import(ImportArgs),
    /// Import a local file, edit it through a descriptor, and print the new root
    Edit(EditArgs),
    /// Print the effective layout configuration
    Config,
}

#[derive(Args)]
pub struct ImportArgs {
    pub path: PathBuf,
}

#[derive(Args)]
pub struct EditArgs {
    pub path: PathBuf,
    /// Byte offset of the write
    #[arg(long, default_value_t = 0)]
    pub offset: u64,
    /// Literal bytes to write
    #[arg(long, conflicts_with = "from")]
    pub data: Option<String>,
    /// Local file whose contents are written
    #[arg(long)]
    pub from: Option<PathBuf>,
    /// Resize the file before writing
    #[arg(long)]
    pub truncate: Option<u64>,
    /// Write the edited contents to this path
    #[arg(long)]
    pub out: Option<PathBuf>,
}
