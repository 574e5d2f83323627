//! Plain Gaussian Bayes nets.

use hybridforge_core::Result;

use crate::conditional::GaussianConditional;
use crate::values::VectorValues;

/// Gaussian conditionals in elimination order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GaussianBayesNet {
    conditionals: Vec<GaussianConditional>,
}

impl GaussianBayesNet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, conditional: GaussianConditional) {
        self.conditionals.push(conditional);
    }

    pub fn len(&self) -> usize {
        self.conditionals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditionals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GaussianConditional> {
        self.conditionals.iter()
    }

    /// Back-substitutes from the last conditional to the first.
    pub fn optimize(&self) -> Result<VectorValues> {
        let mut solution = VectorValues::new();
        for conditional in self.conditionals.iter().rev() {
            let x = conditional.solve(&solution)?;
            solution.insert(conditional.frontal(), x);
        }
        Ok(solution)
    }

    /// Sum of conditional errors.
    pub fn error(&self, values: &VectorValues) -> Result<f64> {
        self.conditionals.iter().map(|c| c.error(values)).sum()
    }

    /// `Σ ln|R_ii|` over all conditionals.
    pub fn log_det(&self) -> f64 {
        self.conditionals.iter().map(|c| c.log_det()).sum()
    }
}

impl FromIterator<GaussianConditional> for GaussianBayesNet {
    fn from_iter<I: IntoIterator<Item = GaussianConditional>>(iter: I) -> Self {
        GaussianBayesNet {
            conditionals: iter.into_iter().collect(),
        }
    }
}
