use std::io::{self, Write};

use anyhow::{Context, Result};
use log::info;

use crate::{cli::CheckArgs, dataset::Dataset, io_utils, kpis, quality, report, rules::RuleSet};

pub fn execute(args: &CheckArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let rules = RuleSet::load(&args.rules)?;
    let dataset = Dataset::read_csv(&args.input, delimiter, encoding)
        .with_context(|| format!("Reading input {:?}", args.input))?;

    let checks = quality::run_quality_checks(&dataset, &rules);
    let kpis = kpis::compute_kpis(&dataset, &rules);
    let rendered = report::render_report(&checks, &kpis);
    match &args.output {
        Some(path) if !io_utils::is_dash(path) => {
            report::write_report(path, &rendered)?;
            info!("Quality report for {:?} written to {path:?}", args.input);
        }
        _ => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .context("Writing report to stdout")?;
        }
    }
    if !checks.is_clean() {
        info!("{:?} has rows that cleaning would repair, flag, or remove", args.input);
    }
    Ok(())
}
