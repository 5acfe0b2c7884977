use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Inspect AT Protocol repository exports (CAR files)"
)]
pub struct Args {
    /// Repository export to read, `-` for stdin
    #[arg(short, long, env = "PDSVIEW_ARCHIVE", default_value = "-", global = true)]
    pub archive: PathBuf,

    /// Print JSON instead of plain text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the record collections present in the archive
    Collections {
        /// Also print how many record blocks each collection has
        #[arg(long)]
        counts: bool,
    },
    /// List records of one collection
    Records {
        /// Collection NSID, e.g. app.bsky.feed.post
        collection: String,
    },
    /// List record keys of one collection
    Keys {
        /// Collection NSID, e.g. app.bsky.feed.post
        collection: String,
    },
    /// Show archive header and commit details
    Info,
    /// Show the account profile record (app.bsky.actor.profile/self)
    Profile,
}

impl Args {
    /// Whether the archive comes from stdin
    pub fn reads_stdin(&self) -> bool {
        self.archive.as_os_str() == "-"
    }
}
