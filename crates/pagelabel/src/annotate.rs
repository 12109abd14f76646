use std::path::{Path, PathBuf};

use colored::Colorize;
use rayon::prelude::*;

use pagelabel_core::{extract_elements, PageElements, PageMeta, PipelineConfig, RawPage};

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// PDF files to annotate
    #[arg(required = true)]
    pub pdfs: Vec<PathBuf>,

    /// Directory for the `{name}_{page}.json` annotation files
    #[arg(short, long, env = "PAGELABEL_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Directory holding the rendered `{name}_{page}.png` page images. Pages
    /// without an image are skipped.
    #[arg(long, env = "PAGELABEL_IMAGE_DIR")]
    pub image_dir: Option<PathBuf>,

    /// Only annotate these pages (1-based, comma separated)
    #[arg(long, value_delimiter = ',')]
    pub pages: Vec<u32>,
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    std::fs::create_dir_all(&options.output_dir)
        .wrap_err_with(|| f!("Failed to create {}", options.output_dir.display()))?;
    let config = global.pipeline();

    for path in &options.pdfs {
        let written = annotate_pdf(path, &options, &config)?;
        println!(
            "{} {} ({} pages)",
            "annotated".green().bold(),
            path.display(),
            written.len()
        );
        if global.verbose {
            for file in &written {
                println!("  {}", file.display());
            }
        }
    }

    Ok(())
}

/// Page image file name, shared by the image and annotation outputs.
pub fn page_file_name(stem: &str, page: u32, extension: &str) -> String {
    f!("{stem}_{page}.{extension}")
}

struct PageJob {
    page: u32,
    raw: RawPage,
    image_path: PathBuf,
}

/// Annotate the selected pages of one PDF and write one JSON file per page.
/// Returns the written paths in page order.
pub fn annotate_pdf(
    path: &Path,
    options: &Options,
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>> {
    let stem = file_stem(path)?;
    let doc = pdf::Document::open(path)
        .map_err(|e| eyre!(e))
        .wrap_err_with(|| f!("Failed to open {}", path.display()))?;

    let page_numbers = doc.page_numbers();
    if let Some(&page) = options.pages.iter().find(|p| !page_numbers.contains(p)) {
        return Err(Error::PageOutOfRange {
            path: path.display().to_string(),
            page,
            count: page_numbers.len(),
        }
        .into());
    }

    let mut jobs = Vec::new();
    for page in page_numbers {
        if !options.pages.is_empty() && !options.pages.contains(&page) {
            continue;
        }

        let image_name = page_file_name(&stem, page, "png");
        let image_path = match &options.image_dir {
            Some(dir) => {
                let image_path = dir.join(&image_name);
                if !image_path.exists() {
                    log::warn!("page image {} not found, skipping page", image_path.display());
                    continue;
                }
                image_path
            }
            None => PathBuf::from(image_name),
        };

        match doc.page_primitives(page) {
            Ok(raw) => jobs.push(PageJob {
                page,
                raw,
                image_path,
            }),
            Err(e) => log::warn!("skipping page {page} of {}: {e}", path.display()),
        }
    }

    let pages: Vec<(u32, PageElements)> = jobs
        .into_par_iter()
        .map(|job| {
            let meta = PageMeta {
                image_width: job.raw.width,
                image_height: job.raw.height,
                image_path: job.image_path.display().to_string(),
            };
            (job.page, extract_elements(&job.raw, meta, config))
        })
        .collect();

    let mut written = Vec::with_capacity(pages.len());
    for (page, elements) in pages {
        let out = options.output_dir.join(page_file_name(&stem, page, "json"));
        std::fs::write(&out, to_json(&elements)?)
            .wrap_err_with(|| f!("Failed to write {}", out.display()))?;
        log::info!("{}: page {page}, {} boxes", path.display(), elements.total());
        written.push(out);
    }

    Ok(written)
}
