use anyhow::{Context, Result};
use ccsample::{config::Config, util::format_bytes, Pipeline};
use tracing::{info, warn};

use super::{cancel_on_interrupt, RunArgs};

pub async fn run_sample(mut config: Config, args: RunArgs) -> Result<()> {
    args.apply(&mut config);
    config.validate().context("Invalid command-line options")?;

    info!(
        "Sampling {} segment(s), up to {} each, into {}",
        config.pipeline.segment_count,
        format_bytes(config.fetch.max_segment_bytes()),
        config.pipeline.output_dir.display()
    );

    let pipeline = Pipeline::new(config).context("Failed to initialize pipeline")?;
    cancel_on_interrupt(pipeline.cancel_flag());

    let summary = pipeline.run().await.context("Sampling run failed")?;

    if summary.segments_processed() == 0 {
        warn!("No segment was processed");
    }
    if !pipeline.config().pipeline.quiet {
        summary.print_summary();
    }

    Ok(())
}
