use std::io::Write;

use anyhow::{Context, Result};

use pka_forge::{Polarity, Predictor};

use super::report::{PredictionReport, write_predictions};
use super::{count_substep, load_records, record_label};
use crate::cli::PredictArgs;
use crate::config::build_predict_config;
use crate::display::{Context as DisplayContext, Progress, print_input_summary, print_prediction};
use crate::io::create_output;

const TOTAL_STEPS: u8 = 3;

pub fn run_predict(args: PredictArgs, ctx: DisplayContext) -> Result<()> {
    let config = build_predict_config(&args.normalize, &args.model)?;

    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Reading structures");
    let records = load_records(&args.input)?;
    progress.complete_step(
        "Reading structures",
        &[count_substep(records.len(), "structure")],
    );

    let predictor = Predictor::new(config).context("Failed to initialize predictor")?;

    if ctx.interactive {
        let config = predictor.config();
        print_input_summary(&[
            ("Structures", records.len().to_string()),
            (
                "Patterns",
                format!(
                    "{} (table v{})",
                    predictor.patterns().len(),
                    predictor.patterns().version()
                ),
            ),
            ("Model Dir", config.models.dir().display().to_string()),
            ("Device", config.device.to_string()),
            (
                "Uncharge",
                if config.normalize.uncharge { "yes" } else { "no" }.to_string(),
            ),
        ]);
    }

    progress.step("Predicting pKa");
    let mut reports = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        let label = record_label(&record, idx);
        progress.detail(&format!("Predicting {label}"));
        let (prediction, prepared) = predictor
            .predict_for_protonate(&record.molecule)
            .with_context(|| format!("Prediction failed for '{label}'"))?;
        reports.push(PredictionReport::new(label, prepared, prediction));
    }

    let site_count: usize = reports
        .iter()
        .map(|r| r.prediction.base.len() + r.prediction.acid.len())
        .sum();
    let loaded: Vec<&str> = Polarity::BOTH
        .iter()
        .filter(|&&p| predictor.cache().is_loaded(p))
        .map(|p| p.as_str())
        .collect();
    let mut substeps = vec![count_substep(site_count, "ionizable site")];
    if !loaded.is_empty() {
        substeps.push(format!("Loaded {} model", loaded.join(" and ")));
    }
    progress.complete_step("Predicting pKa", &substeps);

    if ctx.interactive {
        for report in &reports {
            print_prediction(&report.name, &report.molecule, &report.prediction);
        }
    }

    progress.step("Writing output");
    let mut out = create_output(args.output.output.as_deref())?;
    write_predictions(&mut out, &reports, args.output.json)?;
    out.flush().context("Failed to flush output")?;

    let target = match &args.output.output {
        Some(path) => format!("Wrote {}", path.display()),
        None => "Wrote stdout".to_string(),
    };
    progress.complete_step("Writing output", &[target]);

    progress.finish();

    Ok(())
}
