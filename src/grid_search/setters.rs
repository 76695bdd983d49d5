use crate::estimator::Estimator;
use crate::grid_search::{GridSearch, GridStrategyKind, SelectionRule};
use crate::moments::Moment;

impl<E, M> GridSearch<E, M>
where
    E: Estimator + Clone,
    M: Moment,
{
    // Set methods for parameters

    /// Set the number of grid points.
    /// * `grid_size` - Number of multiplier vectors to fit. Fewer may be
    ///   generated when the basis has few directions.
    pub fn set_grid_size(mut self, grid_size: usize) -> Self {
        self.cfg.grid_size = grid_size;
        self
    }

    /// Set the grid limit.
    /// * `grid_limit` - Largest absolute multiplier along any basis direction.
    pub fn set_grid_limit(mut self, grid_limit: f64) -> Self {
        self.cfg.grid_limit = grid_limit;
        self
    }

    /// Set the grid offset.
    /// * `grid_offset` - Shift applied to every generated point, one value per basis direction.
    pub fn set_grid_offset(mut self, grid_offset: Option<Vec<f64>>) -> Self {
        self.cfg.grid_offset = grid_offset;
        self
    }

    /// Set an explicit grid.
    /// * `grid` - Multiplier vectors in the constraint's index space, fitted instead
    ///   of a generated grid.
    pub fn set_grid(mut self, grid: Option<Vec<Vec<f64>>>) -> Self {
        self.cfg.grid = grid;
        self
    }

    /// Set the grid strategy.
    /// * `grid_strategy` - How generated points are placed.
    pub fn set_grid_strategy(mut self, grid_strategy: GridStrategyKind) -> Self {
        self.cfg.grid_strategy = grid_strategy;
        self
    }

    /// Set the selection rule.
    /// * `selection_rule` - How the best candidate is chosen.
    pub fn set_selection_rule(mut self, selection_rule: SelectionRule) -> Self {
        self.cfg.selection_rule = selection_rule;
        self
    }

    /// Set parallel fitting.
    /// * `parallel` - Fit grid points on a thread pool.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.cfg.parallel = parallel;
        self
    }

    /// Set the number of threads.
    /// * `num_threads` - Threads used when fitting in parallel.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.cfg.num_threads = num_threads;
        self
    }

    /// Set the logging frequency.
    /// * `log_iterations` - Log progress every N grid points, 0 disables.
    pub fn set_log_iterations(mut self, log_iterations: usize) -> Self {
        self.cfg.log_iterations = log_iterations;
        self
    }
}
