//! jobcraft
//!
//! Resolves the layered configuration, then either prints it or reports the
//! state of the entity store it points at.

use anyhow::Result;
use clap::Parser;
use jobcraft::cli::{Cli, DumpFormat};
use jobcraft::config::{ConfigLoader, ConfigPaths, PathResolver, RepositorySettings, init_global};
use jobcraft::logging::{self, LogTarget};
use jobcraft::store::Store;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut paths = ConfigPaths::discover();
    if let Some(config_path) = &cli.config {
        paths = paths.with_explicit(config_path);
    }
    let loader = ConfigLoader::load_with(paths, &PathResolver::discover())?;
    for file in loader.present_files() {
        info!(file = %file.display(), "Using config file");
    }
    let config = init_global(loader.into_view())?;

    if cli.print_config {
        let rendered = match cli.format {
            DumpFormat::Yaml => config.to_yaml()?,
            DumpFormat::Json => config.to_json()?,
        };
        println!("{}", rendered.trim_end());
        return Ok(());
    }

    let settings = RepositorySettings::from_view(config)?;
    let store = Store::open(&settings)?;

    println!("data_dir: {}", store.root().display());
    println!("job-postings: {}", store.job_postings().list()?.len());
    println!("cvs: {}", store.cvs().list()?.len());

    Ok(())
}
