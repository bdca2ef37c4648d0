use anyhow::{Context, Result};
use ccsample::{
    archive::{build_client, RetryPolicy, SegmentLocator},
    config::Config,
    util::join_url,
};

use super::LocateArgs;

pub async fn locate_segments(mut config: Config, args: LocateArgs) -> Result<()> {
    args.sample.apply(&mut config);
    config.validate().context("Invalid command-line options")?;

    let client = build_client(&config.fetch).context("Failed to build HTTP client")?;
    let locator = SegmentLocator::new(
        client,
        config.archive.clone(),
        RetryPolicy::from(&config.fetch.retry),
    );

    let resolution = locator.resolve(config.pipeline.segment_count).await;

    println!("Crawl: {} ({})", resolution.crawl_id, resolution.crawl_id_source);
    println!(
        "Segments ({}, {}):",
        resolution.segments.len(),
        resolution.segments_source
    );
    for segment in &resolution.segments {
        println!("  {}", join_url(&config.archive.data_base_url, segment.as_str()));
    }

    Ok(())
}

