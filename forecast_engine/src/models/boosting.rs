//! Gradient-boosted regression trees on lag/rolling/calendar features
//!
//! Two engines share one implementation and differ in how trees grow:
//! `lightgbm` grows leaf-wise (best gain first, bounded leaf count) and
//! `xgboost` grows depth-wise (level by level, bounded depth). Both fit
//! squared error, so gradients are residuals and hessians are one.
//!
//! Multi-step forecasts are produced iteratively from the forecast-origin
//! feature row: each prediction becomes the new `lag_1` and every later lag
//! slot takes the previous slot's value. Rolling, calendar and exogenous
//! columns keep their origin values.

use crate::error::{ForecastError, Result};
use crate::features::FeatureDeriver;
use crate::models::{FitNote, ForecastModel, ForecastResult, TrainedForecastModel, TrainingSet};
use series_math::statistics::mean;
use tracing::debug;

/// Fewer complete feature rows than this and the model repeats the last value
pub const MIN_TRAINING_ROWS: usize = 5;

/// Splits must improve the objective by more than this
const MIN_GAIN: f64 = 1e-12;

/// How a tree chooses which leaf to split next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeGrowth {
    /// Split the leaf with the largest gain first
    LeafWise,
    /// Split every leaf of one depth before the next
    DepthWise,
}

/// Hyperparameters of a boosting engine
#[derive(Debug, Clone, PartialEq)]
pub struct BoosterConfig {
    pub name: &'static str,
    pub growth: TreeGrowth,
    pub rounds: usize,
    pub learning_rate: f64,
    pub max_leaves: Option<usize>,
    pub max_depth: Option<usize>,
    /// Minimum rows on each side of a split
    pub min_data_in_leaf: usize,
    /// Minimum hessian sum (row count under squared error) per child
    pub min_child_weight: f64,
    /// L2 regularisation on leaf weights
    pub lambda: f64,
}

impl BoosterConfig {
    /// Leaf-wise engine: 100 rounds, rate 0.1, 31 leaves, 20 rows per leaf
    pub fn lightgbm() -> Self {
        Self {
            name: "lightgbm",
            growth: TreeGrowth::LeafWise,
            rounds: 100,
            learning_rate: 0.1,
            max_leaves: Some(31),
            max_depth: None,
            min_data_in_leaf: 20,
            min_child_weight: 1e-3,
            lambda: 0.0,
        }
    }

    /// Depth-wise engine: 100 rounds, rate 0.3, depth 6, lambda 1
    pub fn xgboost() -> Self {
        Self {
            name: "xgboost",
            growth: TreeGrowth::DepthWise,
            rounds: 100,
            learning_rate: 0.3,
            max_leaves: None,
            max_depth: Some(6),
            min_data_in_leaf: 1,
            min_child_weight: 1.0,
            lambda: 1.0,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.rounds == 0 {
            return Err(ForecastError::InvalidParameter(
                "Boosting needs at least one round".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Learning rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if self.max_leaves == Some(0) || self.lambda < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "max_leaves must be positive and lambda non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Regression tree in flat array form
///
/// Children are internal node indices when non-negative and leaf indices
/// encoded as `-(leaf + 1)` when negative.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    split_features: Vec<usize>,
    thresholds: Vec<f64>,
    left_child: Vec<i32>,
    right_child: Vec<i32>,
    leaf_values: Vec<f64>,
    shrinkage: f64,
}

impl RegressionTree {
    pub fn num_leaves(&self) -> usize {
        self.leaf_values.len()
    }

    /// Maximum root-to-leaf depth
    pub fn depth(&self) -> usize {
        fn walk(tree: &RegressionTree, child: i32) -> usize {
            if child < 0 {
                return 0;
            }
            let node = child as usize;
            1 + walk(tree, tree.left_child[node]).max(walk(tree, tree.right_child[node]))
        }
        if self.split_features.is_empty() {
            0
        } else {
            walk(self, 0)
        }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        if self.split_features.is_empty() {
            return self.leaf_values.first().copied().unwrap_or(0.0) * self.shrinkage;
        }

        let mut node_idx = 0usize;
        loop {
            let feature_value = features
                .get(self.split_features[node_idx])
                .copied()
                .unwrap_or(0.0);
            let child = if feature_value <= self.thresholds[node_idx] {
                self.left_child[node_idx]
            } else {
                self.right_child[node_idx]
            };

            if child < 0 {
                let leaf_idx = (-child - 1) as usize;
                return self.leaf_values[leaf_idx] * self.shrinkage;
            }
            node_idx = child as usize;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitChoice {
    feature: usize,
    threshold: f64,
    gain: f64,
}

#[derive(Debug)]
enum Node {
    Leaf { rows: Vec<usize>, depth: usize },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

/// Grows one tree against the current residuals
struct TreeBuilder<'a> {
    config: &'a BoosterConfig,
    features: &'a [Vec<f64>],
    residuals: &'a [f64],
}

impl<'a> TreeBuilder<'a> {
    fn best_split(&self, rows: &[usize], depth: usize) -> Option<SplitChoice> {
        if self.config.max_depth.map_or(false, |max| depth >= max) {
            return None;
        }
        let n = rows.len();
        let min_rows = self.config.min_data_in_leaf.max(1);
        if n < 2 * min_rows {
            return None;
        }

        let lambda = self.config.lambda;
        let total: f64 = rows.iter().map(|&i| self.residuals[i]).sum();
        let parent_score = total * total / (n as f64 + lambda);
        let width = self.features[rows[0]].len();

        let mut best: Option<SplitChoice> = None;
        let mut order = rows.to_vec();
        for feature in 0..width {
            order.sort_by(|&a, &b| self.features[a][feature].total_cmp(&self.features[b][feature]));

            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += self.residuals[order[k]];
                let here = self.features[order[k]][feature];
                let next = self.features[order[k + 1]][feature];
                if here == next {
                    continue;
                }

                let left_n = k + 1;
                let right_n = n - left_n;
                if left_n < min_rows
                    || right_n < min_rows
                    || (left_n as f64) < self.config.min_child_weight
                    || (right_n as f64) < self.config.min_child_weight
                {
                    continue;
                }

                let right_sum = total - left_sum;
                let gain = 0.5
                    * (left_sum * left_sum / (left_n as f64 + lambda)
                        + right_sum * right_sum / (right_n as f64 + lambda)
                        - parent_score);
                if gain > MIN_GAIN && best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitChoice {
                        feature,
                        threshold: 0.5 * (here + next),
                        gain,
                    });
                }
            }
        }
        best
    }

    /// Replace leaf `id` by a split; returns the two new leaves
    fn apply(&self, nodes: &mut Vec<Node>, id: usize, choice: SplitChoice) -> Option<[usize; 2]> {
        let (rows, depth) = match &nodes[id] {
            Node::Leaf { rows, depth } => (rows.clone(), *depth),
            Node::Split { .. } => return None,
        };
        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&i| self.features[i][choice.feature] <= choice.threshold);
        if left.is_empty() || right.is_empty() {
            return None;
        }

        let left_id = nodes.len();
        let right_id = left_id + 1;
        nodes.push(Node::Leaf {
            rows: left,
            depth: depth + 1,
        });
        nodes.push(Node::Leaf {
            rows: right,
            depth: depth + 1,
        });
        nodes[id] = Node::Split {
            feature: choice.feature,
            threshold: choice.threshold,
            left: left_id,
            right: right_id,
        };
        Some([left_id, right_id])
    }

    fn grow(&self) -> RegressionTree {
        let root: Vec<usize> = (0..self.residuals.len()).collect();
        let mut pending: Vec<(usize, SplitChoice)> = Vec::new();
        if let Some(choice) = self.best_split(&root, 0) {
            pending.push((0, choice));
        }
        let mut nodes = vec![Node::Leaf {
            rows: root,
            depth: 0,
        }];

        let mut leaves = 1usize;
        while !pending.is_empty() {
            if self.config.max_leaves.map_or(false, |max| leaves >= max) {
                break;
            }

            let pos = match self.config.growth {
                TreeGrowth::DepthWise => 0,
                TreeGrowth::LeafWise => pending
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1 .1.gain.total_cmp(&b.1 .1.gain))
                    .map(|(i, _)| i)
                    .unwrap_or(0),
            };
            let (id, choice) = pending.remove(pos);

            if let Some(children) = self.apply(&mut nodes, id, choice) {
                leaves += 1;
                for child in children {
                    if let Node::Leaf { rows, depth } = &nodes[child] {
                        if let Some(choice) = self.best_split(rows, *depth) {
                            pending.push((child, choice));
                        }
                    }
                }
            }
        }

        self.compile(nodes)
    }

    /// Flatten the arena, computing regularised leaf weights
    fn compile(&self, nodes: Vec<Node>) -> RegressionTree {
        let mut encoded = vec![0i32; nodes.len()];
        let (mut internal, mut leaf) = (0i32, 0i32);
        for (i, node) in nodes.iter().enumerate() {
            encoded[i] = match node {
                Node::Split { .. } => {
                    internal += 1;
                    internal - 1
                }
                Node::Leaf { .. } => {
                    leaf += 1;
                    -leaf
                }
            };
        }

        let mut tree = RegressionTree {
            split_features: Vec::new(),
            thresholds: Vec::new(),
            left_child: Vec::new(),
            right_child: Vec::new(),
            leaf_values: Vec::new(),
            shrinkage: self.config.learning_rate,
        };
        for node in nodes {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    tree.split_features.push(feature);
                    tree.thresholds.push(threshold);
                    tree.left_child.push(encoded[left]);
                    tree.right_child.push(encoded[right]);
                }
                Node::Leaf { rows, .. } => {
                    let sum: f64 = rows.iter().map(|&i| self.residuals[i]).sum();
                    tree.leaf_values
                        .push(sum / (rows.len() as f64 + self.config.lambda));
                }
            }
        }
        tree
    }
}

/// Additive ensemble of regression trees on top of a constant base score
#[derive(Debug, Clone)]
pub struct GradientBoostedTrees {
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    /// Fit the ensemble to `targets` by squared-error boosting
    pub fn fit(config: &BoosterConfig, rows: &[Vec<f64>], targets: &[f64]) -> Result<Self> {
        config.validate()?;
        if rows.is_empty() || rows.len() != targets.len() {
            return Err(ForecastError::ValidationError(format!(
                "Boosting needs matching non-empty rows and targets ({} vs {})",
                rows.len(),
                targets.len()
            )));
        }
        let width = rows[0].len();
        if rows.iter().any(|r| r.len() != width) {
            return Err(ForecastError::ValidationError(
                "All feature rows must have the same width".to_string(),
            ));
        }

        let base_score = mean(targets)?;
        let mut predictions = vec![base_score; targets.len()];
        let mut trees = Vec::with_capacity(config.rounds);

        for round in 0..config.rounds {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(y, p)| y - p)
                .collect();
            let tree = TreeBuilder {
                config,
                features: rows,
                residuals: &residuals,
            }
            .grow();

            if tree.num_leaves() == 1 && tree.leaf_values[0].abs() < MIN_GAIN {
                // Nothing left to fit; further rounds would repeat this tree
                debug!(engine = config.name, round, "Boosting converged early");
                break;
            }
            for (prediction, row) in predictions.iter_mut().zip(rows) {
                *prediction += tree.predict(row);
            }
            trees.push(tree);
        }

        Ok(Self { base_score, trees })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

/// Shift lag slots one step: the smallest lag takes `prediction`, every
/// later slot takes the value of the slot before it
pub fn shift_lag_chain(row: &mut [f64], slots: &[(usize, usize)], prediction: f64) {
    for i in (1..slots.len()).rev() {
        row[slots[i].1] = row[slots[i - 1].1];
    }
    if let Some(&(_, first)) = slots.first() {
        row[first] = prediction;
    }
}

/// Tree-ensemble forecaster over derived features
#[derive(Debug, Clone)]
pub struct GradientBoostedForecaster {
    engine: BoosterConfig,
    deriver: FeatureDeriver,
}

impl GradientBoostedForecaster {
    pub fn new(engine: BoosterConfig, lags: &[usize], windows: &[usize]) -> Result<Self> {
        engine.validate()?;
        Ok(Self {
            engine,
            deriver: FeatureDeriver::new(lags, windows)?,
        })
    }
}

#[derive(Debug, Clone)]
enum FittedState {
    /// Too few complete rows; repeat the last value
    Sparse { last_value: f64, usable: usize },
    Fitted {
        booster: GradientBoostedTrees,
        origin: Vec<f64>,
        lag_slots: Vec<(usize, usize)>,
    },
}

/// Trained tree-ensemble forecaster
#[derive(Debug, Clone)]
pub struct TrainedGradientBoosted {
    name: &'static str,
    state: FittedState,
}

impl ForecastModel for GradientBoostedForecaster {
    type Trained = TrainedGradientBoosted;

    fn train(&self, data: &TrainingSet) -> Result<Self::Trained> {
        let last_value = data.values().last().copied().ok_or(
            ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            },
        )?;

        let frame = self
            .deriver
            .derive_with_origin(data.target(), data.exogenous())?;
        let matrix = frame.training_matrix()?;

        if matrix.len() < MIN_TRAINING_ROWS {
            debug!(
                engine = self.engine.name,
                usable = matrix.len(),
                "Too few complete feature rows; repeating the last value"
            );
            return Ok(TrainedGradientBoosted {
                name: self.engine.name,
                state: FittedState::Sparse {
                    last_value,
                    usable: matrix.len(),
                },
            });
        }

        let booster = GradientBoostedTrees::fit(&self.engine, &matrix.rows, &matrix.targets)?;
        debug!(
            engine = self.engine.name,
            rows = matrix.len(),
            features = frame.feature_columns().len(),
            trees = booster.trees().len(),
            "Fitted boosted trees"
        );

        Ok(TrainedGradientBoosted {
            name: self.engine.name,
            state: FittedState::Fitted {
                booster,
                origin: frame.last_feature_row()?,
                lag_slots: frame.lag_slots(),
            },
        })
    }

    fn name(&self) -> &str {
        self.engine.name
    }
}

impl TrainedForecastModel for TrainedGradientBoosted {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        match &self.state {
            FittedState::Sparse { last_value, usable } => {
                Ok(ForecastResult::new(vec![*last_value; horizon], horizon)?
                    .with_note(FitNote::SparseTrainingRows { usable: *usable }))
            }
            FittedState::Fitted {
                booster,
                origin,
                lag_slots,
            } => {
                let mut row = origin.clone();
                let mut values = Vec::with_capacity(horizon);
                for _ in 0..horizon {
                    let prediction = booster.predict(&row);
                    values.push(prediction);
                    shift_lag_chain(&mut row, lag_slots, prediction);
                }
                ForecastResult::new(values, horizon)
            }
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}
