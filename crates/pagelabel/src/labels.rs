use std::path::{Path, PathBuf};

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Annotation JSON files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Directory for the `{name}.txt` label files
    #[arg(short, long, env = "PAGELABEL_LABELS_DIR")]
    pub output_dir: PathBuf,
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    std::fs::create_dir_all(&options.output_dir)
        .wrap_err_with(|| f!("Failed to create {}", options.output_dir.display()))?;

    for path in &options.files {
        let out = write_labels(path, &options.output_dir)?;
        if global.verbose {
            println!("{} -> {}", path.display(), out.display());
        }
    }

    Ok(())
}

/// Write the label file for one annotation file, named after its stem.
pub fn write_labels(path: &Path, output_dir: &Path) -> Result<PathBuf> {
    let elements = read_elements(path)?;
    let content = pagelabel_core::yolo::label_file(&elements)
        .map_err(|e| eyre!(e))
        .wrap_err_with(|| f!("Cannot export {}", path.display()))?;

    let out = output_dir.join(f!("{}.txt", file_stem(path)?));
    std::fs::write(&out, content).wrap_err_with(|| f!("Failed to write {}", out.display()))?;
    log::info!("{}: {} boxes", out.display(), elements.total());
    Ok(out)
}
