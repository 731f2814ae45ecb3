use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{
    fs::File,
    io::{Read, Seek, Write},
    path::{Path, PathBuf},
};

use bsa_ba2::{Archive, ArchiveOptions};
use tracing::{error, info};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input BSA or BA2 file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Tag BC5 textures as ATI2 instead of DXT5
    #[arg(long, default_value_t = false)]
    ati_fourcc: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let options = ArchiveOptions::builder()
            .use_alternate_fourcc(self.ati_fourcc)
            .build();
        let mut archive = Archive::open_with_options(&self.file, options)
            .context(format!("path: {}", self.file.display()))?;

        let failed = extract_all(&mut archive, &self.directory, self.overwrite);
        if failed > 0 {
            return Err(miette!(
                "{failed} of {} entries could not be extracted",
                archive.len()
            ));
        }

        info!("extracted {} entries", archive.len());
        Ok(())
    }
}

/// Extract every entry below `directory`, returning how many failed.
///
/// A failed entry is logged and skipped.
pub fn extract_all<R: Read + Seek>(
    archive: &mut Archive<R>,
    directory: &Path,
    overwrite: bool,
) -> usize {
    let mut failed = 0;
    for index in 0..archive.len() {
        if let Err(e) = extract_entry(archive, index, directory, overwrite) {
            error!("{e:?}");
            failed += 1;
        }
    }
    failed
}

fn extract_entry<R: Read + Seek>(
    archive: &mut Archive<R>,
    index: usize,
    directory: &Path,
    overwrite: bool,
) -> Result<()> {
    let name = archive.entry(index)?.full_path().to_owned();
    let p = directory.join(
        relative_path(&name).ok_or_else(|| miette!("refusing to extract {name:?} outside of the target"))?,
    );

    // extract first so a rejected entry leaves no empty file behind
    let data = archive.extract_to_vec(index).context(format!("entry: {name}"))?;
    info!("writing {}", p.display());

    if let Some(parent) = p.parent() {
        std::fs::create_dir_all(parent)
            .into_diagnostic()
            .context(format!("creating {}", parent.display()))?;
    }
    let mut out = if !overwrite {
        File::create_new(&p)
            .into_diagnostic()
            .context(format!("creating {}", &p.display()))?
    } else {
        File::create(&p)
            .into_diagnostic()
            .context(format!("creating {}", &p.display()))?
    };

    out.write_all(&data).into_diagnostic()?;
    Ok(())
}

/// Turn an archive path into a relative path, or `None` if it would leave the target directory.
pub fn relative_path(name: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for part in name.split(['\\', '/']) {
        match part {
            "" | "." => continue,
            ".." => return None,
            // drive letters and alternate streams
            part if part.contains(':') => return None,
            part => out.push(part),
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}
