use anyhow::{Context, Result};
use ccsample::{config::Config, Pipeline};
use tracing::info;

use super::{cancel_on_interrupt, ProcessArgs};

pub async fn process_files(mut config: Config, args: ProcessArgs) -> Result<()> {
    args.extract.apply(&mut config);
    config.validate().context("Invalid command-line options")?;

    for path in &args.files {
        if !path.is_file() {
            anyhow::bail!("Segment file not found: {}", path.display());
        }
    }

    info!("Processing {} local segment file(s)", args.files.len());

    let pipeline = Pipeline::new(config).context("Failed to initialize pipeline")?;
    cancel_on_interrupt(pipeline.cancel_flag());

    let summary = pipeline
        .process_local(args.files)
        .await
        .context("Processing failed")?;

    if !pipeline.config().pipeline.quiet {
        summary.print_summary();
    }

    Ok(())
}
