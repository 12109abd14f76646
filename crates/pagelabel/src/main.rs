use crate::prelude::*;
use clap::Parser;

mod annotate;
mod classes;
mod error;
mod labels;
mod merge;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Extract labelled layout boxes from PDF pages for detection-model training"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Height of the header and footer bands, as a fraction of the page height
    #[clap(long, env = "PAGELABEL_HEADER_BAND", global = true, default_value = "0.085")]
    header_band: f64,

    /// Whether to display additional information.
    #[clap(long, env = "PAGELABEL_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

impl Global {
    pub fn pipeline(&self) -> pagelabel_core::PipelineConfig {
        pagelabel_core::PipelineConfig {
            header_band_ratio: self.header_band,
            ..Default::default()
        }
    }
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Extract annotations from every page of one or more PDF files
    Annotate(crate::annotate::Options),

    /// Re-run block merging on stored annotation files
    Merge(crate::merge::Options),

    /// Convert annotation files into detection-model label files
    Labels(crate::labels::Options),

    /// Print the label → class-id table
    Classes(crate::classes::Options),
}

fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Annotate(options) => crate::annotate::run(options, app.global),
        SubCommands::Merge(options) => crate::merge::run(options, app.global),
        SubCommands::Labels(options) => crate::labels::run(options, app.global),
        SubCommands::Classes(options) => crate::classes::run(options, app.global),
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        App::command().debug_assert();
    }

    #[test]
    fn test_header_band_flag() {
        let app = App::parse_from(["pagelabel", "--header-band", "0.1", "classes"]);
        assert_eq!(app.global.pipeline().header_band_ratio, 0.1);
        assert!(matches!(app.command, SubCommands::Classes(_)));
    }
}
