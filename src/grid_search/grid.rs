//! Grid
//!
//! Lays out the Lagrange multiplier vectors the grid search fits one estimator
//! for. Generation is a pure function of the basis and the settings: the same
//! inputs always give the same ordered points.
use crate::constants::GRID_DIMENSION_WARN_THRESHOLD;
use crate::errors::FairnessError;
use crate::moments::Basis;
use crate::utils::{precision_round, validate_positive_float_parameter};
use hashbrown::HashSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Advisory findings about a grid. These never stop a fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// The grid has more dimensions than can be explored thoroughly.
    GridDimension { dimensions: usize, threshold: usize },
    /// The grid is too small to hold every sign combination of the multipliers.
    GridSize { grid_size: usize, required: u128 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Diagnostic::GridDimension { dimensions, threshold } => write!(
                f,
                "The grid has {} dimensions. It is not recommended to use more than {}, otherwise a \
                 prohibitively large grid size is required to explore the grid thoroughly.",
                dimensions, threshold
            ),
            Diagnostic::GridSize { grid_size, required } => write!(
                f,
                "The grid size of {} is not sufficient to cover all combinations of signs of the \
                 Lagrange multipliers, which requires a grid size of at least {}.",
                grid_size, required
            ),
        }
    }
}

/// Generated grid. `points[i]` lives in basis coordinates, `lambda_vecs[i]`
/// is the same point mapped into the moment's index space.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub points: Vec<Vec<f64>>,
    pub lambda_vecs: Vec<Vec<f64>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Grid {
    pub fn len(&self) -> usize {
        self.lambda_vecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lambda_vecs.is_empty()
    }
}

/// A way of placing grid points in basis coordinates.
pub trait GridStrategy {
    /// Points before any offset is applied, in the order they will be fitted.
    ///
    /// * `basis` - Directions of the moment.
    /// * `grid_size` - Maximum number of points.
    /// * `grid_limit` - Largest absolute coordinate.
    /// * `force_l1_norm` - Whether every point must have L1 norm `grid_limit`.
    fn points(&self, basis: &Basis, grid_size: usize, grid_limit: f64, force_l1_norm: bool) -> Vec<Vec<f64>>;
}

/// Integer lattice points inside an L1 ball, closest to the origin first.
pub struct L1BallStrategy;

impl L1BallStrategy {
    fn accumulate(
        index: usize,
        max_val: i64,
        neg_allowed: &[bool],
        force_l1_norm: bool,
        entry: &mut Vec<i64>,
        out: &mut Vec<Vec<i64>>,
    ) {
        if index == neg_allowed.len() {
            out.push(entry.clone());
            return;
        }
        let values: Vec<i64> = if force_l1_norm && index == neg_allowed.len() - 1 {
            // Last coordinate takes whatever norm is left.
            if neg_allowed[index] && max_val > 0 {
                vec![-max_val, max_val]
            } else {
                vec![max_val]
            }
        } else {
            let min_val = if neg_allowed[index] { -max_val } else { 0 };
            (min_val..=max_val).collect()
        };
        for v in values {
            entry[index] = v;
            Self::accumulate(index + 1, max_val - v.abs(), neg_allowed, force_l1_norm, entry, out);
        }
    }

    fn lattice(n_units: i64, neg_allowed: &[bool], force_l1_norm: bool) -> Vec<Vec<i64>> {
        let mut out = Vec::new();
        let mut entry = vec![0; neg_allowed.len()];
        Self::accumulate(0, n_units, neg_allowed, force_l1_norm, &mut entry, &mut out);
        out
    }
}

impl GridStrategy for L1BallStrategy {
    fn points(&self, basis: &Basis, grid_size: usize, grid_limit: f64, force_l1_norm: bool) -> Vec<Vec<f64>> {
        let dim = basis.dim();
        let true_dim = true_dimension(dim, force_l1_norm);
        let n_neg = basis.neg_allowed.iter().filter(|n| **n).count();

        let (n_units, lattice) = if true_dim == 0 {
            (1, Self::lattice(1, &basis.neg_allowed, force_l1_norm))
        } else {
            let start = (grid_size as f64 / 2f64.powi(n_neg as i32)).powf(1.0 / true_dim as f64) - 1.0;
            let mut n_units = start.floor().max(0.0) as i64;
            loop {
                n_units += 1;
                let lattice = Self::lattice(n_units, &basis.neg_allowed, force_l1_norm);
                if lattice.len() >= grid_size {
                    break (n_units, lattice);
                }
            }
        };

        let mut lattice = lattice;
        lattice.sort_by_key(|p| p.iter().map(|v| v.abs()).sum::<i64>());
        lattice.truncate(grid_size);
        let scale = grid_limit / n_units as f64;
        lattice
            .into_iter()
            .map(|p| p.into_iter().map(|v| v as f64 * scale).collect())
            .collect()
    }
}

/// Evenly spaced values per axis.
///
/// The full Cartesian product is used when it fits in `grid_size`. Beyond that
/// `grid_size` distinct points are drawn with a seeded generator from the
/// lattice with three values per axis (two for non-negative axes).
pub struct CartesianStrategy {
    seed: u64,
}

impl CartesianStrategy {
    pub fn new(seed: u64) -> Self {
        CartesianStrategy { seed }
    }

    /// Values along one axis for `m` (odd) values per signed axis.
    fn axis(m: usize, neg_allowed: bool, grid_limit: f64) -> Vec<f64> {
        if neg_allowed {
            let step = 2.0 * grid_limit / (m - 1) as f64;
            (0..m).map(|i| -grid_limit + i as f64 * step).collect()
        } else {
            let k = (m + 1) / 2;
            let step = grid_limit / (k - 1) as f64;
            (0..k).map(|i| i as f64 * step).collect()
        }
    }

    fn product_size(m: usize, neg_allowed: &[bool]) -> Option<usize> {
        neg_allowed
            .iter()
            .try_fold(1usize, |acc, neg| acc.checked_mul(if *neg { m } else { (m + 1) / 2 }))
    }

    fn full_product(axes: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let mut points = vec![Vec::with_capacity(axes.len())];
        for axis in axes {
            points = points
                .into_iter()
                .flat_map(|p| {
                    axis.iter().map(move |v| {
                        let mut q = p.clone();
                        q.push(*v);
                        q
                    })
                })
                .collect();
        }
        points
    }

    fn sampled(&self, axes: &[Vec<f64>], grid_size: usize) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let zero: Vec<usize> = axes
            .iter()
            .map(|a| a.iter().position(|v| *v == 0.0).unwrap_or(0))
            .collect();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut chosen = Vec::with_capacity(grid_size);
        seen.insert(zero.clone());
        chosen.push(zero);
        while chosen.len() < grid_size {
            let candidate: Vec<usize> = axes.iter().map(|a| rng.gen_range(0..a.len())).collect();
            if seen.insert(candidate.clone()) {
                chosen.push(candidate);
            }
        }
        chosen
            .into_iter()
            .map(|idx| idx.iter().zip(axes).map(|(i, a)| a[*i]).collect())
            .collect()
    }
}

impl GridStrategy for CartesianStrategy {
    fn points(&self, basis: &Basis, grid_size: usize, grid_limit: f64, force_l1_norm: bool) -> Vec<Vec<f64>> {
        let neg_allowed = &basis.neg_allowed;
        if neg_allowed.is_empty() {
            return vec![Vec::new()];
        }
        let fits = |m: usize| Self::product_size(m, neg_allowed).map_or(false, |s| s <= grid_size);
        let mut points = if fits(3) {
            let mut m = 3;
            while fits(m + 2) {
                m += 2;
            }
            let axes: Vec<Vec<f64>> = neg_allowed.iter().map(|n| Self::axis(m, *n, grid_limit)).collect();
            Self::full_product(&axes)
        } else {
            let axes: Vec<Vec<f64>> = neg_allowed.iter().map(|n| Self::axis(3, *n, grid_limit)).collect();
            self.sampled(&axes, grid_size)
        };

        if force_l1_norm {
            let mut seen: HashSet<Vec<u64>> = HashSet::new();
            points = points
                .into_iter()
                .filter_map(|p| {
                    let norm: f64 = p.iter().map(|v| v.abs()).sum();
                    if norm == 0.0 {
                        return None;
                    }
                    let q: Vec<f64> = p.iter().map(|v| precision_round(v * grid_limit / norm, 12)).collect();
                    seen.insert(q.iter().map(|v| v.to_bits()).collect()).then_some(q)
                })
                .collect();
        }
        points.sort_by(|a, b| l1_norm(a).total_cmp(&l1_norm(b)));
        points
    }
}

fn l1_norm(p: &[f64]) -> f64 {
    p.iter().map(|v| v.abs()).sum()
}

/// Dimension of the grid once the L1 constraint removes a degree of freedom.
pub fn true_dimension(dim: usize, force_l1_norm: bool) -> usize {
    if force_l1_norm {
        dim.saturating_sub(1)
    } else {
        dim
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GridStrategyKind {
    /// Lattice points in an L1 ball.
    #[default]
    L1Ball,
    /// Cartesian product of per-axis values, sampled when too large.
    Cartesian { seed: u64 },
}

impl GridStrategy for GridStrategyKind {
    fn points(&self, basis: &Basis, grid_size: usize, grid_limit: f64, force_l1_norm: bool) -> Vec<Vec<f64>> {
        match self {
            GridStrategyKind::L1Ball => L1BallStrategy.points(basis, grid_size, grid_limit, force_l1_norm),
            GridStrategyKind::Cartesian { seed } => {
                CartesianStrategy::new(*seed).points(basis, grid_size, grid_limit, force_l1_norm)
            }
        }
    }
}

/// Builds the grid for a basis and reports advisory diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGenerator {
    pub grid_size: usize,
    pub grid_limit: f64,
    /// Shift added to every point, one value per basis direction.
    pub grid_offset: Option<Vec<f64>>,
    pub strategy: GridStrategyKind,
}

impl GridGenerator {
    pub fn new(grid_size: usize, grid_limit: f64) -> Self {
        GridGenerator {
            grid_size,
            grid_limit,
            grid_offset: None,
            strategy: GridStrategyKind::default(),
        }
    }

    pub fn set_grid_offset(mut self, grid_offset: Option<Vec<f64>>) -> Self {
        self.grid_offset = grid_offset;
        self
    }

    pub fn set_strategy(mut self, strategy: GridStrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Check the settings without generating anything.
    pub fn validate(&self) -> Result<(), FairnessError> {
        if self.grid_size == 0 {
            return Err(FairnessError::InvalidParameter(
                "grid_size".to_string(),
                "positive integer".to_string(),
                self.grid_size.to_string(),
            ));
        }
        validate_positive_float_parameter(self.grid_limit, "grid_limit")?;
        if self.grid_limit == 0.0 || !self.grid_limit.is_finite() {
            return Err(FairnessError::InvalidParameter(
                "grid_limit".to_string(),
                "positive finite value".to_string(),
                self.grid_limit.to_string(),
            ));
        }
        Ok(())
    }

    /// Generate the grid.
    ///
    /// * `basis` - Directions of the constraint moment.
    /// * `force_l1_norm` - Whether the objective lies in the span of the
    ///   constraint, which removes one degree of freedom.
    pub fn generate(&self, basis: &Basis, force_l1_norm: bool) -> Result<Grid, FairnessError> {
        self.validate()?;
        let dim = basis.dim();
        if let Some(offset) = &self.grid_offset {
            if offset.len() != dim {
                return Err(FairnessError::InvalidParameter(
                    "grid_offset".to_string(),
                    format!("{} values, one per grid dimension", dim),
                    offset.len().to_string(),
                ));
            }
        }

        let diagnostics = diagnostics(true_dimension(dim, force_l1_norm), self.grid_size);
        let mut points = self
            .strategy
            .points(basis, self.grid_size, self.grid_limit, force_l1_norm);
        if let Some(offset) = &self.grid_offset {
            for p in points.iter_mut() {
                for (v, o) in p.iter_mut().zip(offset) {
                    *v += o;
                }
            }
        }
        let lambda_vecs = points.iter().map(|p| basis.lambda_vec(p)).collect();
        Ok(Grid {
            points,
            lambda_vecs,
            diagnostics,
        })
    }
}

/// Dimension warning first, then size warning.
pub fn diagnostics(true_dim: usize, grid_size: usize) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    if true_dim > GRID_DIMENSION_WARN_THRESHOLD {
        out.push(Diagnostic::GridDimension {
            dimensions: true_dim,
            threshold: GRID_DIMENSION_WARN_THRESHOLD,
        });
    }
    let required = u32::try_from(true_dim)
        .ok()
        .and_then(|d| 1u128.checked_shl(d))
        .unwrap_or(u128::MAX);
    if required > grid_size as u128 {
        out.push(Diagnostic::GridSize { grid_size, required });
    }
    out
}
