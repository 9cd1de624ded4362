use std::io::Write;

use anyhow::{Context, Result};

use pka_forge::Predictor;
use pka_forge::io::read_smiles;

use super::report::{PredictionReport, write_predictions};
use crate::cli::DemoArgs;
use crate::config::build_demo_config;
use crate::display::{Context as DisplayContext, Progress, print_prediction};
use crate::io::create_output;

/// Phenothiazine with a basic side chain and an aryl ketone.
const REFERENCE_SMILES: &str = "CN(C)CCCN1C2=CC=CC=C2SC2=C1C=C(C=C2)C(C)=O";

const TOTAL_STEPS: u8 = 2;

pub fn run_demo(args: DemoArgs, ctx: DisplayContext) -> Result<()> {
    let config = build_demo_config(&args.model)?;

    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Predicting reference structure");
    let molecule = read_smiles(REFERENCE_SMILES).context("Reference structure is invalid")?;
    let predictor = Predictor::new(config).context("Failed to initialize predictor")?;
    let (prediction, prepared) = predictor
        .predict_for_protonate(&molecule)
        .context("Prediction failed for the reference structure")?;
    progress.complete_step(
        "Predicting reference structure",
        &[REFERENCE_SMILES.to_string()],
    );

    let report = PredictionReport::new("reference".to_string(), prepared, prediction);
    if ctx.interactive {
        print_prediction(&report.name, &report.molecule, &report.prediction);
    }

    progress.step("Writing output");
    let mut out = create_output(args.output.output.as_deref())?;
    write_predictions(&mut out, std::slice::from_ref(&report), args.output.json)?;
    out.flush().context("Failed to flush output")?;
    progress.complete_step("Writing output", &[]);

    progress.finish();

    Ok(())
}
