use super::minimizer::{InnerIteration, InnerMinimizer};
use super::options::IrlsSolverOptions;
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::{
    IrlsIterationReport, SolveReport, SolveStage, SolveTermination, TimingBreakdown,
};
use crate::error::{Error, Result};
use crate::image::{ImageData, ImagePlane, ImageSize, Interpolation};
use crate::model::ImageModel;
use crate::objective::{DataTerm, IrlsRegularizationTerm, ObjectiveFunction};
use crate::regularizer::Regularizer;
use log::{debug, info, warn};
use std::borrow::Cow;
use std::time::Instant;

/// Floor applied to regularization residuals before inverting them into
/// weights.
const MIN_RESIDUAL: f64 = 1e-5;

/// Lifecycle of the solver.
///
/// `Initialized → Reweighting → {InnerSolveRunning → WeightsStale}* →
/// Converged | MaxIterationsReached`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverState {
    Initialized,
    Reweighting,
    InnerSolveRunning,
    WeightsStale,
    Converged,
    MaxIterationsReached,
}

/// Estimate plus the trace of how it was obtained.
#[derive(Clone, Debug)]
pub struct SolveOutcome {
    pub image: ImageData,
    pub report: SolveReport,
}

/// Maximum a posteriori super-resolution via iteratively reweighted least
/// squares.
///
/// Each outer iteration minimizes the data term plus
/// `lambda_k * sum_i w_ki * r_ki(x)^2` for every regularizer `k` with the
/// configured inner minimizer, then re-estimates `w_ki = 1 / max(eps, |r_ki|)`.
/// The squared-weighted residual thereby approximates the L1 norm of the
/// regularizer residuals.
#[derive(Debug)]
pub struct IrlsMapSolver<'m> {
    options: IrlsSolverOptions,
    model: &'m ImageModel,
    observations: Vec<ImageData>,
    hr_size: ImageSize,
    num_channels: usize,
    regularizers: Vec<(Box<dyn Regularizer>, f64)>,
    weights: Vec<Vec<f64>>,
    state: SolverState,
    upsampling_ms: f64,
}

impl<'m> IrlsMapSolver<'m> {
    /// Validate the inputs and upsample every observation (nearest) to the
    /// high-resolution canvas.
    pub fn new(
        options: IrlsSolverOptions,
        model: &'m ImageModel,
        low_res: &[ImageData],
    ) -> Result<Self> {
        options.validate()?;
        let first = low_res.first().ok_or(Error::EmptyObservations)?;
        let lr_size = first.size();
        let num_channels = first.num_channels();
        if first.is_empty() {
            return Err(Error::invalid("observations", "observation 0 has no pixels"));
        }
        for (index, obs) in low_res.iter().enumerate().skip(1) {
            if obs.size() != lr_size || obs.num_channels() != num_channels {
                return Err(Error::ObservationMismatch {
                    index,
                    expected: format!("{lr_size} x {num_channels} channels"),
                    found: format!("{} x {} channels", obs.size(), obs.num_channels()),
                });
            }
        }
        let scale = model.downsampling_scale()?;
        if let Some(frames) = model.num_frames() {
            if frames < low_res.len() {
                return Err(Error::MotionSequenceTooShort {
                    available: frames,
                    required: low_res.len(),
                });
            }
        }
        let hr_size = lr_size.scaled_up(scale);
        let upsampling_start = Instant::now();
        let observations = low_res
            .iter()
            .map(|lr| lr.resized(hr_size, Interpolation::Nearest))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "irls solver: {} observations of {} upsampled x{} to {}",
            low_res.len(),
            lr_size,
            scale,
            hr_size
        );
        Ok(Self {
            options,
            model,
            observations,
            hr_size,
            num_channels,
            regularizers: Vec::new(),
            weights: Vec::new(),
            state: SolverState::Initialized,
            upsampling_ms: elapsed_ms(upsampling_start),
        })
    }

    /// Add a regularizer with its strength `lambda` (finite, >= 0).
    pub fn add_regularizer(
        &mut self,
        regularizer: Box<dyn Regularizer>,
        lambda: f64,
    ) -> Result<()> {
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(Error::invalid(
                "lambda",
                format!("regularization parameter must be finite and >= 0, got {lambda}"),
            ));
        }
        self.regularizers.push((regularizer, lambda));
        Ok(())
    }

    pub fn options(&self) -> &IrlsSolverOptions {
        &self.options
    }

    pub fn hr_size(&self) -> ImageSize {
        self.hr_size
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_observations(&self) -> usize {
        self.observations.len()
    }

    /// Observations as resampled onto the high-resolution canvas.
    pub fn observations(&self) -> &[ImageData] {
        &self.observations
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn regularization_parameter_sum(&self) -> f64 {
        self.regularizers.iter().map(|(_, lambda)| lambda).sum()
    }

    /// IRLS weights of regularizer `index` after the most recent solve (for
    /// the last channel group when channels are split).
    pub fn irls_weights(&self, index: usize) -> Option<&[f64]> {
        self.weights.get(index).map(Vec::as_slice)
    }

    /// Run the IRLS loop from `initial`, which must have the high-resolution
    /// size and the observations' channel count.
    pub fn solve(&mut self, initial: &ImageData) -> Result<SolveOutcome> {
        if initial.size() != self.hr_size || initial.num_channels() != self.num_channels {
            return Err(Error::invalid(
                "initial_estimate",
                format!(
                    "expected {} x {} channels, got {} x {} channels",
                    self.hr_size,
                    self.num_channels,
                    initial.size(),
                    initial.num_channels()
                ),
            ));
        }
        let start = Instant::now();
        let per_group = if self.options.split_channels {
            1
        } else {
            self.num_channels
        };
        let groups = self.num_channels / per_group.max(1);
        let num_parameters = per_group * self.hr_size.num_pixels();
        for (regularizer, _) in &mut self.regularizers {
            regularizer.set_image_dimensions(self.hr_size, per_group);
        }
        if groups > 1 {
            info!(
                "irls solver: splitting {} channels into {} groups of {}",
                self.num_channels, groups, per_group
            );
        }

        let mut options = self.options.clone();
        if options.adaptive_thresholds {
            let lambda_sum = self.regularization_parameter_sum();
            options.adjust_thresholds_adaptively(num_parameters, lambda_sum);
        }
        let minimizer = InnerMinimizer::from_options(options.inner.clone());

        let mut timing = TimingBreakdown::default();
        timing.push(SolveStage::ObservationUpsampling, self.upsampling_ms);
        let mut reports = Vec::new();
        let mut estimate = ImageData::new();
        let mut termination = SolveTermination::Converged;
        let mut final_cost = 0.0;
        self.state = SolverState::Reweighting;

        for group in 0..groups {
            let group_start = Instant::now();
            let reports_before = reports.len();
            let channels = group * per_group..(group + 1) * per_group;
            let observations: Cow<'_, [ImageData]> = if per_group == self.num_channels {
                Cow::Borrowed(&self.observations)
            } else {
                Cow::Owned(
                    self.observations
                        .iter()
                        .map(|obs| select_channels(obs, channels.clone()))
                        .collect::<Result<Vec<_>>>()?,
                )
            };
            let mut x = Vec::with_capacity(num_parameters);
            for c in channels.clone() {
                x.extend_from_slice(initial.channel_data(c)?);
            }

            let (group_termination, group_cost) = run_irls_loop(
                &IrlsLoop {
                    options: &options,
                    minimizer: &minimizer,
                    model: self.model,
                    observations: &observations,
                    regularizers: &self.regularizers,
                    size: self.hr_size,
                    num_channels: per_group,
                    group,
                },
                &mut self.weights,
                &mut self.state,
                &mut x,
                &mut reports,
            )?;
            if group_termination == SolveTermination::MaxIterationsReached {
                termination = SolveTermination::MaxIterationsReached;
            }
            final_cost += group_cost;

            let solved = ImageData::from_flat(&x, self.hr_size, per_group)?;
            for plane in solved.channels() {
                estimate.add_channel(plane.clone())?;
            }
            timing.push(
                SolveStage::ChannelGroup {
                    group,
                    outer_iterations: reports.len() - reports_before,
                },
                elapsed_ms(group_start),
            );
        }

        self.state = match termination {
            SolveTermination::Converged => SolverState::Converged,
            SolveTermination::MaxIterationsReached => SolverState::MaxIterationsReached,
        };
        timing.total_ms = elapsed_ms(start);
        info!(
            "irls solver: {:?} after {} outer iterations, final cost {:.6e} ({:.1} ms)",
            termination,
            reports.len(),
            final_cost,
            timing.total_ms
        );
        Ok(SolveOutcome {
            image: estimate,
            report: SolveReport {
                termination,
                final_cost,
                num_parameters,
                channel_groups: groups,
                iterations: reports,
                timing,
            },
        })
    }
}

/// Borrowed inputs shared by every outer iteration of one channel group.
struct IrlsLoop<'a> {
    options: &'a IrlsSolverOptions,
    minimizer: &'a InnerMinimizer,
    model: &'a ImageModel,
    observations: &'a [ImageData],
    regularizers: &'a [(Box<dyn Regularizer>, f64)],
    size: ImageSize,
    num_channels: usize,
    group: usize,
}

fn run_irls_loop(
    ctx: &IrlsLoop<'_>,
    weights: &mut Vec<Vec<f64>>,
    state: &mut SolverState,
    x: &mut [f64],
    reports: &mut Vec<IrlsIterationReport>,
) -> Result<(SolveTermination, f64)> {
    let n = x.len();
    *weights = ctx.regularizers.iter().map(|_| vec![1.0; n]).collect();
    let mut previous_cost = f64::INFINITY;
    let mut cost = f64::INFINITY;

    for iteration in 1..=ctx.options.max_irls_iterations {
        let iteration_start = Instant::now();
        *state = SolverState::InnerSolveRunning;
        let summary = {
            let mut objective = ObjectiveFunction::new(n).with_term(Box::new(DataTerm::new(
                ctx.model,
                ctx.observations,
                ctx.size,
                ctx.num_channels,
            )?));
            for ((regularizer, lambda), w) in ctx.regularizers.iter().zip(weights.iter()) {
                objective.add_term(Box::new(IrlsRegularizationTerm::new(
                    regularizer.as_ref(),
                    *lambda,
                    w,
                )));
            }
            ctx.minimizer.minimize(&mut objective, x, |it: &InnerIteration| {
                debug!(
                    "irls {}.{} inner {}: cost {:.6e} |g| {:.3e} step {:.3e}",
                    ctx.group, iteration, it.iteration, it.cost, it.gradient_norm, it.step_size
                );
            })?
        };
        if !summary.converged() {
            warn!(
                "irls {}.{}: inner solve stopped with {:?} after {} iterations",
                ctx.group, iteration, summary.termination, summary.iterations
            );
        }
        cost = summary.final_cost;
        let cost_difference = previous_cost - cost;
        reports.push(IrlsIterationReport {
            channel_group: ctx.group,
            iteration,
            cost,
            cost_difference: previous_cost.is_finite().then_some(cost_difference),
            inner: summary,
            elapsed_ms: elapsed_ms(iteration_start),
        });

        if ctx.regularizers.is_empty() {
            info!("irls {}: least squares done (no regularizers to reweight)", ctx.group);
            return Ok((SolveTermination::Converged, cost));
        }

        *state = SolverState::WeightsStale;
        for ((regularizer, _), w) in ctx.regularizers.iter().zip(weights.iter_mut()) {
            let residuals = regularizer.apply(x)?;
            for (wi, r) in w.iter_mut().zip(residuals) {
                *wi = 1.0 / r.abs().max(MIN_RESIDUAL);
            }
        }
        *state = SolverState::Reweighting;
        previous_cost = cost;
        info!(
            "irls {}.{}: cost {:.6e}, difference {:.3e}",
            ctx.group, iteration, cost, cost_difference
        );
        if cost_difference.abs() < ctx.options.irls_cost_difference_threshold {
            return Ok((SolveTermination::Converged, cost));
        }
    }
    Ok((SolveTermination::MaxIterationsReached, cost))
}

fn select_channels(image: &ImageData, channels: std::ops::Range<usize>) -> Result<ImageData> {
    let planes = channels
        .map(|c| image.channel(c).map(ImagePlane::clone))
        .collect::<Result<Vec<_>>>()?;
    ImageData::from_planes(planes)
}
