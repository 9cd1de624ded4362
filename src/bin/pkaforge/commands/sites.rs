use std::io::Write;

use anyhow::{Context, Result};

use pka_forge::Predictor;

use super::report::{SitesReport, write_sites};
use super::{count_substep, load_records, record_label};
use crate::cli::SitesArgs;
use crate::config::build_sites_config;
use crate::display::{Context as DisplayContext, Progress, print_sites};
use crate::io::create_output;

const TOTAL_STEPS: u8 = 3;

pub fn run_sites(args: SitesArgs, ctx: DisplayContext) -> Result<()> {
    let config = build_sites_config(&args.normalize)?;

    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Reading structures");
    let records = load_records(&args.input)?;
    progress.complete_step(
        "Reading structures",
        &[count_substep(records.len(), "structure")],
    );

    progress.step("Detecting ionization sites");
    let predictor = Predictor::new(config).context("Failed to load ionization patterns")?;
    let mut reports = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        let label = record_label(&record, idx);
        let prepared = predictor
            .normalize(&record.molecule)
            .with_context(|| format!("Normalization failed for '{label}'"))?;

        let mut report = SitesReport::new(label, prepared);
        for &polarity in args.polarity.polarities() {
            let sites = predictor.sites(&report.molecule, polarity);
            report.set(polarity, sites);
        }
        reports.push(report);
    }

    let site_count: usize = reports
        .iter()
        .flat_map(|r| r.lists())
        .map(|(_, sites)| sites.len())
        .sum();
    progress.complete_step(
        "Detecting ionization sites",
        &[
            format!("{} patterns", predictor.patterns().len()),
            count_substep(site_count, "site"),
        ],
    );

    if ctx.interactive {
        for report in &reports {
            print_sites(&report.name, &report.molecule, &report.lists());
        }
    }

    progress.step("Writing output");
    let mut out = create_output(args.output.output.as_deref())?;
    write_sites(&mut out, &reports, args.output.json)?;
    out.flush().context("Failed to flush output")?;
    progress.complete_step("Writing output", &[]);

    progress.finish();

    Ok(())
}
