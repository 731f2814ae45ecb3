pub mod extract;
pub mod list;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// List the entries of a BSA or BA2 archive
    List(list::ListArgs),
    /// Extract a BSA or BA2 archive into a directory
    Extract(extract::ExtractArgs),
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::List(list) => list.handle(),
            Commands::Extract(extract) => extract.handle(),
        }
    }
}
