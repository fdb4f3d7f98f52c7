//! MAP objective: a data-fidelity term plus weighted regularization terms.
pub mod data_term;
pub mod irls_term;

pub use self::data_term::DataTerm;
pub use self::irls_term::IrlsRegularizationTerm;

use crate::error::Result;
use crate::regularizer::check_len;
use crate::solver::minimizer::CostFunction;

/// One additive component of the objective.
pub trait ObjectiveTerm {
    /// Cost at `x`. When `gradient` is given, the term's gradient is added
    /// into it (never overwritten).
    fn compute(&self, x: &[f64], gradient: Option<&mut [f64]>) -> Result<f64>;
}

/// Ordered sum of [`ObjectiveTerm`]s over a fixed-length parameter vector.
pub struct ObjectiveFunction<'a> {
    num_parameters: usize,
    terms: Vec<Box<dyn ObjectiveTerm + 'a>>,
}

impl<'a> ObjectiveFunction<'a> {
    pub fn new(num_parameters: usize) -> Self {
        Self {
            num_parameters,
            terms: Vec::new(),
        }
    }

    pub fn add_term(&mut self, term: Box<dyn ObjectiveTerm + 'a>) {
        self.terms.push(term);
    }

    pub fn with_term(mut self, term: Box<dyn ObjectiveTerm + 'a>) -> Self {
        self.add_term(term);
        self
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Total cost; `gradient` is zeroed first and then receives every term's
    /// contribution.
    pub fn evaluate(&self, x: &[f64], mut gradient: Option<&mut [f64]>) -> Result<f64> {
        check_len("objective parameters", self.num_parameters, x.len())?;
        if let Some(g) = gradient.as_deref_mut() {
            check_len("objective gradient", self.num_parameters, g.len())?;
            g.fill(0.0);
        }
        let mut cost = 0.0;
        for term in &self.terms {
            cost += term.compute(x, gradient.as_deref_mut())?;
        }
        Ok(cost)
    }
}

impl CostFunction for ObjectiveFunction<'_> {
    fn num_parameters(&self) -> usize {
        self.num_parameters
    }

    fn evaluate(&mut self, x: &[f64], gradient: Option<&mut [f64]>) -> Result<f64> {
        ObjectiveFunction::evaluate(self, x, gradient)
    }
}
