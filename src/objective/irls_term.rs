use super::ObjectiveTerm;
use crate::error::Result;
use crate::regularizer::{check_len, Regularizer};

/// Reweighted regularization `lambda * sum_i w_i * r_i(x)^2`.
///
/// The weights belong to the solver and are fixed for the lifetime of the
/// term; a non-positive `lambda` disables the term.
pub struct IrlsRegularizationTerm<'a> {
    regularizer: &'a dyn Regularizer,
    lambda: f64,
    weights: &'a [f64],
}

impl<'a> IrlsRegularizationTerm<'a> {
    pub fn new(regularizer: &'a dyn Regularizer, lambda: f64, weights: &'a [f64]) -> Self {
        Self {
            regularizer,
            lambda,
            weights,
        }
    }
}

impl ObjectiveTerm for IrlsRegularizationTerm<'_> {
    fn compute(&self, x: &[f64], gradient: Option<&mut [f64]>) -> Result<f64> {
        if self.lambda <= 0.0 {
            return Ok(0.0);
        }
        check_len("IRLS weights", x.len(), self.weights.len())?;
        let residuals = match gradient {
            Some(gradient) => {
                let constants: Vec<f64> = self.weights.iter().map(|w| self.lambda * w).collect();
                let (residuals, reg_gradient) =
                    self.regularizer.apply_with_gradient(x, &constants)?;
                for (g, rg) in gradient.iter_mut().zip(reg_gradient) {
                    *g += rg;
                }
                residuals
            }
            None => self.regularizer.apply(x)?,
        };
        let weighted: f64 = residuals
            .iter()
            .zip(self.weights)
            .map(|(r, w)| w * r * r)
            .sum();
        Ok(self.lambda * weighted)
    }
}
