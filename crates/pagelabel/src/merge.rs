use std::path::{Path, PathBuf};

use pagelabel_core::{merge_blocks, PipelineConfig};

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Annotation JSON files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Overwrite each file with the merged result instead of printing it
    #[arg(long)]
    pub in_place: bool,
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    let config = global.pipeline();

    for path in &options.files {
        let merged = merge_file(path, &config)?;
        if options.in_place {
            std::fs::write(path, &merged)
                .wrap_err_with(|| f!("Failed to write {}", path.display()))?;
            if global.verbose {
                println!("merged {}", path.display());
            }
        } else {
            println!("{merged}");
        }
    }

    Ok(())
}

/// Merge the blocks of a stored annotation file and return the new JSON.
pub fn merge_file(path: &Path, config: &PipelineConfig) -> Result<String> {
    let mut elements = read_elements(path)?;
    let before = elements.total();
    merge_blocks(&mut elements, config);
    log::info!("{}: {before} -> {} boxes", path.display(), elements.total());
    to_json(&elements)
}
