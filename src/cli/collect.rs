use crate::aggregate::Aggregator;
use crate::cli::CollectArgs;
use crate::config::{Config, MetricConfig};
use crate::output::{render, write_presentation};
use tracing::info;

pub fn execute(args: CollectArgs) -> anyhow::Result<()> {
    let config = args.config.as_deref().map(Config::load).transpose()?;

    let aggregator = match (&config, args.output_dir) {
        (Some(config), output_dir) => {
            let mut config = config.clone();
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }
            Aggregator::from_config(&config, args.web_root)?
        }
        (None, Some(output_dir)) => Aggregator::new(
            output_dir,
            Vec::new(),
            MetricConfig::default().regex()?,
            args.web_root,
        ),
        (None, None) => anyhow::bail!("Either --config or --output-dir is required"),
    };

    let presentation = aggregator.presentation()?;
    let metric_name = config
        .as_ref()
        .map(|c| c.metric.name.clone())
        .unwrap_or_else(|| MetricConfig::default().name);
    let entries: usize = presentation
        .groups
        .iter()
        .flat_map(|g| &g.splits)
        .map(|s| s.entries.len())
        .sum();
    info!(
        "Collected {} entries ({}) across {} groups",
        entries,
        metric_name,
        presentation.groups.len()
    );

    match args.out {
        Some(path) => {
            write_presentation(&path, &presentation, args.format)?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", render(&presentation, args.format)?),
    }

    Ok(())
}
