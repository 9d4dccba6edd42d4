//! Tunable constants of the layout search, read from the document's
//! `settings` object. Every field has a default, so `{}` is a valid value.

use serde::{Deserialize, Serialize};

/// Multipliers used when scoring candidate layouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoreWeights {
    /// Cost of a line broken inside a word.
    pub bad_break: f64,
    /// Cost of a line broken at whitespace or a forced newline.
    pub ok_break: f64,
    /// Cost per point of content wider than its column.
    pub overflow: f64,
    /// Cost per point of unused column width.
    pub slack: f64,
    /// Divides the column height standard deviation.
    pub stddev_divisor: f64,
    /// Cost per item that could not be placed in a candidate.
    pub unplaced: f64,
    /// Base of the penalty for content that failed to place (`base - area`).
    pub error_base: f64,
    pub image_bad_break: f64,
    pub image_ok_break: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            bad_break: 30.0,
            ok_break: 3.0,
            overflow: 10.0,
            slack: 0.01,
            stddev_divisor: 10.0,
            unplaced: 1e6,
            error_base: 1e9,
            image_bad_break: 50.0,
            image_ok_break: 1.0,
        }
    }
}

impl ScoreWeights {
    pub fn breaks_cost(&self, bad: usize, ok: usize) -> f64 {
        self.bad_break * bad as f64 + self.ok_break * ok as f64
    }

    pub fn fit_cost(&self, unused: f64) -> f64 {
        self.overflow * (-unused).max(0.0) + self.slack * unused.max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizerSettings {
    /// Hard cap on objective evaluations per search.
    pub max_evaluations: usize,
    /// Stop once every vertex scores within this much of the best.
    pub tolerance: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_evaluations: 400,
            tolerance: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutSettings {
    pub weights: ScoreWeights,
    pub min_column_width: f64,
    pub column_granularity: f64,
    /// Below this many items, every split into columns is tried.
    pub brute_force_limit: usize,
    /// Fraction of the bounds height a column may overrun while scoring.
    pub overflow_allowance: f64,
    pub block_cache_size: usize,
    pub optimizer: OptimizerSettings,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            min_column_width: 40.0,
            column_granularity: 5.0,
            brute_force_limit: 10,
            overflow_allowance: 0.1,
            block_cache_size: 1024,
            optimizer: OptimizerSettings::default(),
        }
    }
}
