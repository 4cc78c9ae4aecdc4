use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    clean::{self, CleanOutcome},
    cli::CleanArgs,
    dataset::Dataset,
    io_utils, kpis, quality, report,
    rules::RuleSet,
    sort::{self, SortKey},
};

pub fn execute(args: &CleanArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let rules = RuleSet::load(&args.rules)?;
    info!(
        "Cleaning '{}' with rules {:?} (delimiter '{}', {} column rule(s))",
        args.input.display(),
        args.rules,
        crate::printable_delimiter(delimiter),
        rules.columns.len()
    );

    let raw = Dataset::read_csv(&args.input, delimiter, encoding)
        .with_context(|| format!("Reading input {:?}", args.input))?;
    info!("Read {} row(s) from {:?}", raw.len(), args.input);

    let sort_keys = resolve_sort_keys(args, &rules)?;
    let CleanOutcome {
        mut clean,
        removed,
        stats,
    } = clean::clean_dataset(&raw, &rules)?;
    if !sort_keys.is_empty() {
        debug!("Sorting cleaned rows by {sort_keys:?}");
        sort::sort_dataset(&mut clean, &sort_keys);
    }

    let output_delimiter = io_utils::resolve_output_delimiter(&args.output, None, delimiter);
    clean
        .write_csv(&args.output, output_delimiter)
        .with_context(|| format!("Writing cleaned rows to {:?}", args.output))?;
    let removed_delimiter = io_utils::resolve_output_delimiter(&args.removed, None, delimiter);
    removed
        .write_csv(&args.removed, removed_delimiter)
        .with_context(|| format!("Writing removed rows to {:?}", args.removed))?;
    stats.save_json(&args.stats)?;
    info!(
        "Kept {} row(s) ({} flagged), removed {}, dropped {} duplicate(s); stats written to {:?}",
        stats.rows_output, stats.rows_flagged, stats.rows_removed, stats.duplicates_removed, args.stats
    );

    if args.no_reports {
        return Ok(());
    }
    for (dataset, path) in [(&raw, &args.raw_report), (&clean, &args.report)] {
        let checks = quality::run_quality_checks(dataset, &rules);
        let kpis = kpis::compute_kpis(dataset, &rules);
        report::write_report(path, &report::render_report(&checks, &kpis))?;
        info!("Quality report written to {path:?}");
    }
    Ok(())
}

fn resolve_sort_keys(args: &CleanArgs, rules: &RuleSet) -> Result<Vec<SortKey>> {
    if args.no_sort {
        return Ok(Vec::new());
    }
    if args.sort.is_empty() {
        return Ok(rules.sort.clone());
    }
    args.sort
        .iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SortKey::parse)
        .collect()
}
