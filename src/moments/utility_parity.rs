//! Utility Parity
//!
//! Parity constraints on the positive prediction rate of a classifier. Rows
//! are assigned an event (all rows for demographic parity, the true label for
//! equalized odds) and the rate of every group within an event is compared
//! against the rate of the whole event:
//!
//! `gamma(e, g) = E[h(X) | event = e, group = g] - E[h(X) | event = e]`
//!
//! Both signs of every difference are part of the index, so a bound applies to
//! the absolute difference.
use crate::constants::{ALL_EVENT, LABEL_EVENT_PREFIX};
use crate::errors::FairnessError;
use crate::estimator::Predictor;
use crate::moments::{loaded, Basis, ErrorRate, IndexLabel, Moment, MomentData, Sign};
use crate::data::Matrix;
use crate::utils::validate_positive_float_parameter;
use log::debug;
use serde::{Deserialize, Serialize};

/// Which rows take part in a parity constraint, and under what event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParityKind {
    DemographicParity,
    EqualizedOdds,
    TruePositiveRateParity,
    FalsePositiveRateParity,
}

// -0.0 and 0.0 are the same label.
fn label_event(y: f64) -> String {
    let y = if y == 0.0 { 0.0 } else { y };
    format!("{}{}", LABEL_EVENT_PREFIX, y)
}

impl ParityKind {
    fn event_of(&self, y: f64) -> Option<String> {
        match self {
            ParityKind::DemographicParity => Some(ALL_EVENT.to_string()),
            ParityKind::EqualizedOdds => Some(label_event(y)),
            ParityKind::TruePositiveRateParity if y == 1.0 => Some(label_event(y)),
            ParityKind::FalsePositiveRateParity if y == 0.0 => Some(label_event(y)),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ParityKind::DemographicParity => "DemographicParity",
            ParityKind::EqualizedOdds => "EqualizedOdds",
            ParityKind::TruePositiveRateParity => "TruePositiveRateParity",
            ParityKind::FalsePositiveRateParity => "FalsePositiveRateParity",
        }
    }
}

#[derive(Debug, Clone)]
struct ParityState {
    data: MomentData,
    events: Vec<String>,
    /// Event of each row, `None` when the row is outside the constraint.
    row_events: Vec<Option<usize>>,
    prob_event: Vec<f64>,
    /// `P(event, group)` indexed `[event][group]`.
    prob_group_event: Vec<Vec<f64>>,
    /// Non-empty `(event, group)` cells in index order.
    cells: Vec<(usize, usize)>,
    index: Vec<IndexLabel>,
}

impl ParityState {
    fn new(kind: ParityKind, data: MomentData) -> Self {
        let row_event_names: Vec<Option<String>> = data.y.iter().map(|y| kind.event_of(*y)).collect();
        let mut events: Vec<String> = row_event_names.iter().flatten().cloned().collect();
        events.sort();
        events.dedup();
        let row_events: Vec<Option<usize>> = row_event_names
            .iter()
            .map(|e| e.as_ref().and_then(|e| events.binary_search(e).ok()))
            .collect();

        let n = data.n_rows() as f64;
        let n_groups = data.groups.len();
        let mut prob_event = vec![0.0; events.len()];
        let mut prob_group_event = vec![vec![0.0; n_groups]; events.len()];
        for (e, g) in row_events.iter().zip(&data.group_ids) {
            if let Some(e) = e {
                prob_event[*e] += 1.0 / n;
                prob_group_event[*e][*g] += 1.0 / n;
            }
        }

        let mut cells = Vec::new();
        for (e, row) in prob_group_event.iter().enumerate() {
            for (g, p) in row.iter().enumerate() {
                if *p > 0.0 {
                    cells.push((e, g));
                }
            }
        }
        let mut index = Vec::with_capacity(2 * cells.len());
        for sign in [Sign::Pos, Sign::Neg] {
            for (e, g) in &cells {
                index.push(IndexLabel {
                    sign: Some(sign),
                    event: Some(events[*e].clone()),
                    group: data.groups[*g].clone(),
                });
            }
        }

        ParityState {
            data,
            events,
            row_events,
            prob_event,
            prob_group_event,
            cells,
            index,
        }
    }

    fn cell_position(&self, e: usize, g: usize) -> Option<usize> {
        self.cells.iter().position(|c| *c == (e, g))
    }
}

/// Parity of the positive prediction rate across groups, within each event.
#[derive(Debug, Clone)]
pub struct UtilityParity {
    kind: ParityKind,
    difference_bound: f64,
    state: Option<ParityState>,
}

impl UtilityParity {
    pub fn new(kind: ParityKind) -> Self {
        UtilityParity {
            kind,
            difference_bound: 0.0,
            state: None,
        }
    }

    /// Allow rates to differ by up to `difference_bound`.
    pub fn with_difference_bound(mut self, difference_bound: f64) -> Result<Self, FairnessError> {
        validate_positive_float_parameter(difference_bound, "difference_bound")?;
        self.difference_bound = difference_bound;
        Ok(self)
    }

    pub fn kind(&self) -> ParityKind {
        self.kind
    }

    pub fn difference_bound(&self) -> f64 {
        self.difference_bound
    }

    fn state(&self) -> Result<&ParityState, FairnessError> {
        loaded(&self.state, self.kind.name())
    }
}

/// Equal selection rate for every group.
pub struct DemographicParity;

impl DemographicParity {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> UtilityParity {
        UtilityParity::new(ParityKind::DemographicParity)
    }
}

/// Equal true and false positive rates for every group.
pub struct EqualizedOdds;

impl EqualizedOdds {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> UtilityParity {
        UtilityParity::new(ParityKind::EqualizedOdds)
    }
}

pub struct TruePositiveRateParity;

impl TruePositiveRateParity {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> UtilityParity {
        UtilityParity::new(ParityKind::TruePositiveRateParity)
    }
}

pub struct FalsePositiveRateParity;

impl FalsePositiveRateParity {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> UtilityParity {
        UtilityParity::new(ParityKind::FalsePositiveRateParity)
    }
}

impl Moment for UtilityParity {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn load_data(&mut self, x: &Matrix<f64>, y: &[f64], sensitive_features: &[String]) -> Result<(), FairnessError> {
        let data = MomentData::new(x, y, sensitive_features)?;
        let state = ParityState::new(self.kind, data);
        debug!(
            "{} loaded {} rows, {} events, {} groups.",
            self.kind.name(),
            state.data.n_rows(),
            state.events.len(),
            state.data.groups.len()
        );
        self.state = Some(state);
        Ok(())
    }

    fn index(&self) -> Result<&[IndexLabel], FairnessError> {
        Ok(&self.state()?.index)
    }

    fn basis(&self) -> Result<Basis, FairnessError> {
        let state = self.state()?;
        let n_cells = state.cells.len();
        let n_groups = state.data.groups.len();
        let mut basis = Basis {
            index_len: 2 * n_cells,
            pos: Vec::new(),
            neg: Vec::new(),
            neg_allowed: Vec::new(),
        };
        // The last group is the reference, its multiplier is implied by the others.
        for e in 0..state.events.len() {
            for g in 0..n_groups.saturating_sub(1) {
                let mut pos = vec![0.0; 2 * n_cells];
                let mut neg = vec![0.0; 2 * n_cells];
                if let Some(k) = state.cell_position(e, g) {
                    pos[k] = 1.0;
                    neg[n_cells + k] = 1.0;
                }
                basis.pos.push(pos);
                basis.neg.push(neg);
                basis.neg_allowed.push(true);
            }
        }
        Ok(basis)
    }

    fn signed_weights(&self, lambda_vec: &[f64]) -> Result<Vec<f64>, FairnessError> {
        let state = self.state()?;
        let n_cells = state.cells.len();
        if lambda_vec.len() != 2 * n_cells {
            return Err(FairnessError::InvalidInput(format!(
                "Expected {} multipliers, got {}.",
                2 * n_cells,
                lambda_vec.len()
            )));
        }
        let n_groups = state.data.groups.len();
        let mut lambda_signed = vec![vec![0.0; n_groups]; state.events.len()];
        let mut lambda_event = vec![0.0; state.events.len()];
        for (k, (e, g)) in state.cells.iter().enumerate() {
            let l = lambda_vec[k] - lambda_vec[n_cells + k];
            lambda_signed[*e][*g] = l;
            lambda_event[*e] += l;
        }
        let mut adjust = vec![vec![0.0; n_groups]; state.events.len()];
        for (e, row) in adjust.iter_mut().enumerate() {
            for (g, a) in row.iter_mut().enumerate() {
                let p = state.prob_group_event[e][g];
                if p > 0.0 {
                    *a = lambda_event[e] / state.prob_event[e] - lambda_signed[e][g] / p;
                }
            }
        }
        Ok(state
            .row_events
            .iter()
            .zip(&state.data.group_ids)
            .map(|(e, g)| e.map_or(0.0, |e| adjust[e][*g]))
            .collect())
    }

    fn gamma(&self, predictor: &dyn Predictor) -> Result<Vec<f64>, FairnessError> {
        let state = self.state()?;
        let pred = state.data.predict(predictor)?;
        let n_groups = state.data.groups.len();
        let mut sum_event = vec![0.0; state.events.len()];
        let mut count_event = vec![0.0; state.events.len()];
        let mut sum_cell = vec![vec![0.0; n_groups]; state.events.len()];
        let mut count_cell = vec![vec![0.0; n_groups]; state.events.len()];
        for ((e, g), p) in state.row_events.iter().zip(&state.data.group_ids).zip(&pred) {
            if let Some(e) = e {
                sum_event[*e] += p;
                count_event[*e] += 1.0;
                sum_cell[*e][*g] += p;
                count_cell[*e][*g] += 1.0;
            }
        }
        let signed: Vec<f64> = state
            .cells
            .iter()
            .map(|(e, g)| sum_cell[*e][*g] / count_cell[*e][*g] - sum_event[*e] / count_event[*e])
            .collect();
        let mut gamma = signed.clone();
        gamma.extend(signed.iter().map(|v| -v));
        Ok(gamma)
    }

    fn bound(&self) -> Result<Vec<f64>, FairnessError> {
        Ok(vec![self.difference_bound; self.state()?.index.len()])
    }

    fn default_objective(&self) -> Box<dyn Moment> {
        Box::new(ErrorRate::new())
    }

    fn is_classification(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::FnPredictor;

    fn keys(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    // Prediction is the single feature column.
    fn first_column(x: &Matrix<f64>) -> Vec<f64> {
        x.get_col(0).to_vec()
    }

    #[test]
    fn test_not_loaded() {
        let dp = DemographicParity::new();
        let err = dp.bound().unwrap_err();
        assert_eq!(err.to_string(), "Data has not been loaded into the DemographicParity moment.");
        assert!(dp.basis().is_err());
        assert!(dp.signed_weights(&[]).is_err());
    }

    #[test]
    fn test_negative_zero_label_shares_event() {
        let x = vec![0.0; 4];
        let y = vec![0.0, -0.0, 1.0, 1.0];
        let a = keys(&["a", "b", "a", "b"]);
        let mut eo = EqualizedOdds::new();
        eo.load_data(&Matrix::new(&x, 4, 1), &y, &a).unwrap();
        let index: Vec<String> = eo.index().unwrap().iter().map(|l| l.to_string()).collect();
        assert_eq!(index.len(), 8);
        assert!(index.iter().all(|l| !l.contains("label=-0")));
        assert_eq!(eo.basis().unwrap().dim(), 2);

        let mut fpr = FalsePositiveRateParity::new();
        fpr.load_data(&Matrix::new(&x, 4, 1), &y, &a).unwrap();
        assert_eq!(fpr.index().unwrap()[0].to_string(), "+,label=0,a");
        assert_eq!(fpr.index().unwrap().len(), 4);
    }

    #[test]
    fn test_demographic_parity_basis_and_gamma() {
        let x = vec![1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let y = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let a = keys(&["a", "a", "b", "b", "c", "c"]);
        let mut dp = DemographicParity::new();
        dp.load_data(&Matrix::new(&x, 6, 1), &y, &a).unwrap();

        let index = dp.index().unwrap();
        assert_eq!(index.len(), 6);
        assert_eq!(index[0].to_string(), "+,all,a");
        assert_eq!(index[5].to_string(), "-,all,c");

        let basis = dp.basis().unwrap();
        assert_eq!(basis.dim(), 2);
        assert!(basis.neg_allowed.iter().all(|n| *n));
        assert_eq!(basis.pos[1], vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(basis.neg[1], vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

        // Overall rate 0.5: a = 1.0, b = 0.0, c = 0.5.
        let gamma = dp.gamma(&FnPredictor(first_column)).unwrap();
        assert_eq!(gamma, vec![0.5, -0.5, 0.0, -0.5, 0.5, -0.0]);
        assert_eq!(dp.bound().unwrap(), vec![0.0; 6]);
    }

    #[test]
    fn test_demographic_parity_signed_weights() {
        let x = vec![0.0; 4];
        let y = vec![0.0, 1.0, 0.0, 1.0];
        let a = keys(&["a", "a", "a", "b"]);
        let mut dp = DemographicParity::new();
        dp.load_data(&Matrix::new(&x, 4, 1), &y, &a).unwrap();
        // lambda(+, a) = 1: adjust(a) = 1 / 1 - 1 / 0.75, adjust(b) = 1 / 1.
        let w = dp.signed_weights(&[1.0, 0.0, 0.0, 0.0]).unwrap();
        let wa = 1.0 - 1.0 / 0.75;
        assert!((w[0] - wa).abs() < 1e-12);
        assert!((w[2] - wa).abs() < 1e-12);
        assert!((w[3] - 1.0).abs() < 1e-12);
        assert!(dp.signed_weights(&[1.0]).is_err());
    }

    #[test]
    fn test_equalized_odds_events_and_empty_cells() {
        let x = vec![0.0; 5];
        let y = vec![0.0, 1.0, 0.0, 1.0, 0.0];
        // Group c only has label 0.
        let a = keys(&["a", "a", "b", "b", "c"]);
        let mut eo = EqualizedOdds::new();
        eo.load_data(&Matrix::new(&x, 5, 1), &y, &a).unwrap();

        let index = eo.index().unwrap();
        assert_eq!(index.len(), 10);
        assert_eq!(index[0].to_string(), "+,label=0,a");
        assert_eq!(index[3].to_string(), "+,label=1,a");

        // Two events times two non-reference groups.
        let basis = eo.basis().unwrap();
        assert_eq!(basis.dim(), 4);
        let w = eo.signed_weights(&vec![0.5; 10]).unwrap();
        assert!(w.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_rate_parity_keeps_one_label() {
        let x = vec![1.0, 0.0, 1.0, 1.0, 0.0, 0.0];
        let y = vec![1.0, 1.0, 0.0, 1.0, 1.0, 0.0];
        let a = keys(&["a", "a", "a", "b", "b", "b"]);

        let mut tpr = TruePositiveRateParity::new();
        tpr.load_data(&Matrix::new(&x, 6, 1), &y, &a).unwrap();
        assert!(tpr.index().unwrap().iter().all(|l| l.event.as_deref() == Some("label=1")));
        // Rows with label 0 carry no weight.
        let w = tpr.signed_weights(&[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(w[2], 0.0);
        assert_eq!(w[5], 0.0);
        // TPR: a = 0.5, b = 0.5, overall 0.5.
        let gamma = tpr.gamma(&FnPredictor(first_column)).unwrap();
        assert!(gamma.iter().all(|g| g.abs() < 1e-12));

        let mut fpr = FalsePositiveRateParity::new();
        fpr.load_data(&Matrix::new(&x, 6, 1), &y, &a).unwrap();
        assert_eq!(fpr.basis().unwrap().dim(), 1);
        // FPR: a = 1.0, b = 0.0, overall 0.5.
        assert_eq!(fpr.gamma(&FnPredictor(first_column)).unwrap(), vec![0.5, -0.5, -0.5, 0.5]);
    }

    #[test]
    fn test_difference_bound() {
        assert!(DemographicParity::new().with_difference_bound(-0.1).is_err());
        let x = vec![0.0; 2];
        let mut dp = DemographicParity::new().with_difference_bound(0.05).unwrap();
        dp.load_data(&Matrix::new(&x, 2, 1), &[0.0, 1.0], &keys(&["a", "b"])).unwrap();
        assert_eq!(dp.bound().unwrap(), vec![0.05; 4]);
        assert!(dp.default_objective().is_classification());
        assert!(dp.default_objective_lambda_vec().unwrap().is_none());
    }
}
