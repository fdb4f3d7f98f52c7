//! Render a synthetic ground truth, degrade it into low-resolution frames
//! and super-resolve them again.
//!
//! Usage: `sr_synthetic <config.json>`; see `super_resolution::config` for the
//! schema. Set `RUST_LOG=debug` to trace every conjugate-gradient step.
use serde::Serialize;
use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use super_resolution::config::{self, SyntheticRunConfig};
use super_resolution::evaluation::psnr;
use super_resolution::image::Interpolation;
use super_resolution::motion::MotionShiftSequence;
use super_resolution::{ImageData, ImageModel, IrlsMapSolver, SolveOutcome, SolveReport};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary<'a> {
    num_frames: usize,
    psnr_initial_db: f64,
    psnr_estimate_db: f64,
    report: &'a SolveReport,
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let mut config =
        config::load_config(Path::new(&config_path)).map_err(|err| err.to_string())?;
    if let Some(path) = config.motion_file.take() {
        config.model.motion = MotionShiftSequence::load(&path).map_err(|err| err.to_string())?;
    }
    let num_frames = config.frame_count();

    let truth = config.pattern.render().map_err(|err| err.to_string())?;
    let model = ImageModel::from_params(&config.model).map_err(|err| err.to_string())?;
    let observations = model
        .generate_observations(&truth, num_frames)
        .map_err(|err| err.to_string())?;
    println!(
        "Generated {} observations of {} from a {} ground truth ({} operators)",
        observations.len(),
        model.lr_size(truth.size()),
        truth.size(),
        model.len()
    );

    let (initial, outcome) = solve(&config, &model, &observations)?;
    let psnr_initial = psnr(&truth, &initial).map_err(|err| err.to_string())?;
    let psnr_estimate = psnr(&truth, &outcome.image).map_err(|err| err.to_string())?;
    let report = &outcome.report;
    println!(
        "Termination: {:?} after {} outer iterations ({:.1} ms)",
        report.termination,
        report.outer_iterations(),
        report.timing.total_ms
    );
    println!("Final cost: {:.6e}", report.final_cost);
    println!("PSNR initial estimate: {psnr_initial:.2} dB");
    println!("PSNR super-resolved:   {psnr_estimate:.2} dB");
    let range = outcome.image.report();
    if !range.is_in_range() {
        println!(
            "Estimate leaves [0, 1]: {} negative, {} above one",
            range.num_negative_pixels, range.num_over_one_pixels
        );
    }

    if let Some(path) = &config.output.motion_file {
        config.model.motion.save(path).map_err(|err| err.to_string())?;
        println!("Saved motion sequence to {}", path.display());
    }
    if let Some(path) = &config.output.report_json {
        let summary = RunSummary {
            num_frames,
            psnr_initial_db: psnr_initial,
            psnr_estimate_db: psnr_estimate,
            report,
        };
        write_json_file(path, &summary)?;
        println!("Saved report to {}", path.display());
    }
    Ok(())
}

fn solve(
    config: &SyntheticRunConfig,
    model: &ImageModel,
    observations: &[ImageData],
) -> Result<(ImageData, SolveOutcome), String> {
    let mut solver = IrlsMapSolver::new(config.solver.clone(), model, observations)
        .map_err(|err| err.to_string())?;
    for regularizer in &config.regularizers {
        let built = regularizer
            .build(solver.hr_size(), solver.num_channels())
            .map_err(|err| err.to_string())?;
        solver
            .add_regularizer(built, regularizer.lambda())
            .map_err(|err| err.to_string())?;
    }
    let initial = config
        .initial_estimate
        .build(observations, solver.hr_size(), Interpolation::Linear)
        .map_err(|err| err.to_string())?;
    let outcome = solver.solve(&initial).map_err(|err| err.to_string())?;
    Ok((initial, outcome))
}

fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let file = File::create(path)
        .map_err(|err| format!("Failed to create {}: {err}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|err| format!("Failed to write {}: {err}", path.display()))
}

fn usage() -> String {
    "Usage: sr_synthetic <config.json>".to_string()
}
