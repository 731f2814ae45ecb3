use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::{OwoColorize, Stream};
use std::{io::Write, path::PathBuf};

use bsa_ba2::Archive;
use tracing::info;

#[derive(Args)]
pub struct ListArgs {
    /// An input BSA or BA2 file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = Archive::open(&self.file).context(format!("path: {}", self.file.display()))?;
        info!(
            "{} v{} with {} entries",
            archive.format(),
            archive.version(),
            archive.len()
        );

        let mut out = std::io::stdout().lock();
        for entry in archive.entries() {
            let marker = if entry.compressed() { "C" } else { "-" };
            writeln!(
                out,
                "{:>12} {} {:#012x} {}",
                entry.display_size(),
                marker.if_supports_color(Stream::Stdout, |m| m.green()),
                entry.offset(),
                entry.full_path()
            )
            .into_diagnostic()?;
        }
        Ok(())
    }
}
