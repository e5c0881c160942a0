//! Bagged decision-tree classifier for binary win/loss labels.
//!
//! Each tree is grown on a bootstrap sample with gini splits over a random
//! subset of features. The win probability is the mean of the leaf win
//! fractions across trees. All randomness flows from one seeded RNG, so the
//! same data and config always grow the same forest.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split. `None` means ceil(sqrt(n_features)).
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "lowercase")]
enum Node {
    Leaf {
        p_win: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

fn gini(wins: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = wins as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Node,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [u8],
    config: &'a ForestConfig,
    max_features: usize,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl TreeBuilder<'_> {
    fn build(&self, indices: &[usize], depth: usize, rng: &mut StdRng) -> Node {
        let n = indices.len();
        let wins = indices.iter().filter(|&&i| self.y[i] == 1).count();
        let impurity = gini(wins, n);
        let leaf = Node::Leaf {
            p_win: if n == 0 { 0.5 } else { wins as f64 / n as f64 },
            n_samples: n,
        };

        if depth >= self.config.max_depth || n < self.config.min_samples_split || impurity < 1e-12 {
            return leaf;
        }

        let Some(best) = self.best_split(indices, impurity, rng) else {
            return leaf;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[i][best.feature] <= best.threshold);

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(&left, depth + 1, rng)),
            right: Box::new(self.build(&right, depth + 1, rng)),
        }
    }

    fn best_split(&self, indices: &[usize], parent: f64, rng: &mut StdRng) -> Option<SplitCandidate> {
        let n_features = self.x[indices[0]].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);
        features.truncate(self.max_features);

        let n = indices.len();
        let total_wins = indices.iter().filter(|&&i| self.y[i] == 1).count();
        let mut best: Option<SplitCandidate> = None;

        for feature in features {
            let mut sorted: Vec<usize> = indices.to_vec();
            sorted.sort_by(|&a, &b| {
                self.x[a][feature]
                    .partial_cmp(&self.x[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_wins = 0usize;
            for k in 0..n - 1 {
                if self.y[sorted[k]] == 1 {
                    left_wins += 1;
                }
                let here = self.x[sorted[k]][feature];
                let next = self.x[sorted[k + 1]][feature];
                if next <= here {
                    continue;
                }

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < self.config.min_samples_leaf || n_right < self.config.min_samples_leaf {
                    continue;
                }

                let weighted = (n_left as f64 * gini(left_wins, n_left)
                    + n_right as f64 * gini(total_wins - left_wins, n_right))
                    / n as f64;
                let gain = parent - weighted;
                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

impl DecisionTree {
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { p_win, .. } => return *p_win,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    feature_names: Vec<String>,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit on rows `x` with 0/1 labels `y`.
    pub fn fit(
        config: ForestConfig,
        feature_names: Vec<String>,
        x: &[Vec<f64>],
        y: &[u8],
    ) -> Result<Self, DomainError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(DomainError::InvalidInput(format!(
                "need matching non-empty rows and labels, got {} rows and {} labels",
                x.len(),
                y.len()
            )));
        }
        if x.iter().any(|row| row.len() != feature_names.len()) {
            return Err(DomainError::InvalidInput(
                "row width does not match feature names".into(),
            ));
        }
        if config.n_trees == 0 {
            return Err(DomainError::InvalidInput("n_trees must be positive".into()));
        }

        let n = x.len();
        let n_features = feature_names.len();
        let max_features = config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize)
            .clamp(1, n_features.max(1));

        let builder = TreeBuilder {
            x,
            y,
            config: &config,
            max_features,
        };

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut trees = Vec::with_capacity(config.n_trees);
        for _ in 0..config.n_trees {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(DecisionTree {
                root: builder.build(&sample, 0, &mut rng),
            });
        }

        Ok(Self {
            config,
            feature_names,
            trees,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean win probability across trees.
    pub fn predict_proba(&self, row: &[f64]) -> Result<f64, DomainError> {
        if row.len() != self.feature_names.len() {
            return Err(DomainError::InvalidInput(format!(
                "expected {} features, got {}",
                self.feature_names.len(),
                row.len()
            )));
        }
        if self.trees.is_empty() {
            return Err(DomainError::ModelUnavailable);
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }
}
