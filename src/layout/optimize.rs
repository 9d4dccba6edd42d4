//! # Layout Search
//!
//! Column widths, item splits and image sizes are all chosen by the same
//! search: a Nelder–Mead minimization over points of the simplex
//! `{x ∈ [0,1]ᵏ : Σx = 1}`.
//!
//! The search runs on the first `k − 1` coordinates; the last one is
//! `1 − Σ`. A point outside the simplex, or one the objective cannot turn
//! into a concrete candidate, scores `BAD · (1 + badness)` so the simplex
//! walks back toward valid ground without explicit constraints.
//!
//! Objectives are discrete underneath (widths are whole points, splits are
//! whole items), so every point is first mapped to an integer key and scores
//! are cached by key. Two nearby points that round to the same candidate are
//! only scored once.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::error::LayoutError;
use crate::layout::OptimizerSettings;

/// Score of an unrealizable candidate, before scaling by its badness.
pub const BAD: f64 = 1e12;

const SCORE_CACHE_SIZE: usize = 512;
const MIN_SIMPLEX_SIZE: f64 = 1e-3;

/// Something the search can minimize.
pub trait Objective {
    /// Turn a point of the simplex (`k` coordinates summing to 1) into a
    /// discrete candidate.
    fn discretize(&self, x: &[f64]) -> Result<Vec<i64>, LayoutError>;

    /// Score a candidate produced by [`Objective::discretize`]. Lower is better.
    fn score(&mut self, key: &[i64]) -> f64;
}

/// Best candidate found by [`minimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Optimum {
    pub key: Vec<i64>,
    pub score: f64,
    /// Objective evaluations, including cache hits.
    pub evaluations: usize,
}

struct Search<'o, O: Objective> {
    objective: &'o mut O,
    cache: LruCache<Vec<i64>, f64>,
    best: Option<(Vec<i64>, f64)>,
    least_badness: f64,
    evaluations: usize,
}

impl<O: Objective> Search<'_, O> {
    fn eval(&mut self, params: &[f64]) -> f64 {
        self.evaluations += 1;

        let sum: f64 = params.iter().sum();
        let outside: f64 =
            params.iter().map(|v| (-v).max(0.0)).sum::<f64>() + (sum - 1.0).max(0.0);
        if outside > 0.0 || params.iter().any(|v| !v.is_finite()) {
            // Outside the simplex; says nothing about whether the objective
            // can be realized at all.
            return BAD * (1.0 + outside.min(1e6));
        }

        let mut x = params.to_vec();
        x.push((1.0 - sum).max(0.0));
        let key = match self.objective.discretize(&x) {
            Ok(key) => key,
            Err(LayoutError::BadParameters { badness }) => return self.reject(badness),
            Err(LayoutError::TooSmall { needed, available }) => {
                return self.reject((needed - available).max(0.0))
            }
        };

        let score = match self.cache.get(&key) {
            Some(s) => *s,
            None => {
                let s = self.objective.score(&key);
                self.cache.put(key.clone(), s);
                s
            }
        };
        if self.best.as_ref().map_or(true, |(_, b)| score < *b) {
            self.best = Some((key, score));
        }
        score
    }

    fn reject(&mut self, badness: f64) -> f64 {
        let badness = if badness.is_finite() { badness.abs() } else { 1e6 };
        self.least_badness = self.least_badness.min(badness);
        BAD * (1.0 + badness)
    }
}

/// Minimize `objective` over the `k`-simplex.
///
/// Fails with [`LayoutError::BadParameters`] when no point the search visited
/// could be realized; the badness is the smallest one seen.
pub fn minimize<O: Objective>(
    objective: &mut O,
    k: usize,
    settings: &OptimizerSettings,
) -> Result<Optimum, LayoutError> {
    let mut search = Search {
        objective,
        cache: LruCache::new(NonZeroUsize::new(SCORE_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN)),
        best: None,
        least_badness: f64::INFINITY,
        evaluations: 0,
    };

    if k <= 1 {
        search.eval(&[]);
    } else {
        nelder_mead(&mut search, k - 1, settings);
    }

    let evaluations = search.evaluations;
    match search.best {
        Some((key, score)) => {
            tracing::debug!(k, evaluations, score, "layout search succeeded in {evaluations} evaluations");
            Ok(Optimum {
                key,
                score,
                evaluations,
            })
        }
        None => Err(LayoutError::BadParameters {
            badness: if search.least_badness.is_finite() {
                search.least_badness
            } else {
                1.0
            },
        }),
    }
}

/// Starting simplex: vertex `i` puts ⅔ of the weight on coordinate `i` and
/// shares the rest evenly, so every vertex is a valid point.
fn initial_simplex(k: usize) -> Vec<Vec<f64>> {
    let rest = (1.0 / 3.0) / (k - 1) as f64;
    (0..k)
        .map(|i| {
            (0..k - 1)
                .map(|j| if i == j { 2.0 / 3.0 } else { rest })
                .collect()
        })
        .collect()
}

fn nelder_mead<O: Objective>(search: &mut Search<'_, O>, d: usize, settings: &OptimizerSettings) {
    const ALPHA: f64 = 1.0;
    const GAMMA: f64 = 2.0;
    const RHO: f64 = 0.5;
    const SIGMA: f64 = 0.5;

    let mut simplex: Vec<(Vec<f64>, f64)> = initial_simplex(d + 1)
        .into_iter()
        .map(|p| {
            let f = search.eval(&p);
            (p, f)
        })
        .collect();

    while search.evaluations < settings.max_evaluations {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let spread = simplex[d].1 - simplex[0].1;
        let size = simplex[1..]
            .iter()
            .map(|(p, _)| distance(p, &simplex[0].0))
            .fold(0.0, f64::max);
        if (spread <= settings.tolerance && size < MIN_SIMPLEX_SIZE) || size < 1e-9 {
            break;
        }

        let centroid: Vec<f64> = (0..d)
            .map(|j| simplex[..d].iter().map(|(p, _)| p[j]).sum::<f64>() / d as f64)
            .collect();
        let worst = simplex[d].0.clone();
        let along = |t: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst)
                .map(|(c, w)| c + t * (c - w))
                .collect()
        };

        let reflected = along(ALPHA);
        let fr = search.eval(&reflected);
        if fr < simplex[0].1 {
            let expanded = along(GAMMA);
            let fe = search.eval(&expanded);
            simplex[d] = if fe < fr { (expanded, fe) } else { (reflected, fr) };
            continue;
        }
        if fr < simplex[d - 1].1 {
            simplex[d] = (reflected, fr);
            continue;
        }

        let (contracted, fc) = if fr < simplex[d].1 {
            let p = along(RHO);
            let f = search.eval(&p);
            (p, f)
        } else {
            let p = along(-RHO);
            let f = search.eval(&p);
            (p, f)
        };
        if fc < simplex[d].1.min(fr) {
            simplex[d] = (contracted, fc);
            continue;
        }

        // Shrink toward the best vertex.
        let best = simplex[0].0.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let p: Vec<f64> = best
                .iter()
                .zip(&vertex.0)
                .map(|(b, v)| b + SIGMA * (v - b))
                .collect();
            let f = search.eval(&p);
            *vertex = (p, f);
        }
    }
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Split `total` into `x.len()` whole sizes proportional to `x`.
///
/// Each size is at least `minval`; what is left above the minimums is handed
/// out in steps of `granularity` by rounding the cumulative cut points, and
/// the last bucket absorbs whatever does not divide evenly. The result only
/// depends on the proportions of `x`, not its scale.
pub fn divide_space(
    x: &[f64],
    total: i64,
    minval: i64,
    granularity: i64,
) -> Result<Vec<i64>, LayoutError> {
    let k = x.len();
    if k == 0 {
        return Err(LayoutError::BadParameters { badness: 1.0 });
    }
    let negative: f64 = x.iter().map(|v| (-v).max(0.0)).sum();
    if negative > 0.0 || x.iter().any(|v| !v.is_finite()) {
        return Err(LayoutError::BadParameters {
            badness: negative.max(1.0),
        });
    }
    let needed = k as i64 * minval;
    if needed > total {
        return Err(LayoutError::BadParameters {
            badness: (needed - total) as f64,
        });
    }

    let granularity = granularity.max(1);
    let units = (total - needed) / granularity;
    let sum: f64 = x.iter().sum();
    let weights: Vec<f64> = if sum > 0.0 {
        x.iter().map(|v| v / sum).collect()
    } else {
        vec![1.0 / k as f64; k]
    };

    let mut sizes = Vec::with_capacity(k);
    let mut cumulative = 0.0;
    let mut previous_cut = 0i64;
    for w in &weights[..k - 1] {
        cumulative += w;
        let cut = ((units as f64 * cumulative).round() as i64).clamp(previous_cut, units);
        sizes.push(minval + (cut - previous_cut) * granularity);
        previous_cut = cut;
    }
    let assigned: i64 = sizes.iter().sum();
    sizes.push(total - assigned);
    Ok(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divide_space_sums_and_respects_minimum() {
        let sizes = divide_space(&[0.2, 0.5, 0.3], 400, 40, 5).unwrap();
        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes.iter().sum::<i64>(), 400);
        for s in &sizes[..2] {
            assert!(*s >= 40);
            assert_eq!((s - 40) % 5, 0);
        }
        assert!(sizes[2] >= 40);
    }

    #[test]
    fn divide_space_is_scale_invariant() {
        let x = [0.17, 0.41, 0.42];
        let a = divide_space(&x, 523, 40, 5).unwrap();
        let b = divide_space(&x.map(|v| v * 8.0), 523, 40, 5).unwrap();
        let c = divide_space(&x.map(|v| v * 0.25), 523, 40, 5).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn divide_space_equal_weights() {
        assert_eq!(divide_space(&[1.0, 1.0], 100, 10, 1).unwrap(), vec![50, 50]);
        assert_eq!(divide_space(&[1.0; 3], 100, 10, 5).unwrap(), vec![35, 30, 35]);
    }

    #[test]
    fn divide_space_rejects_impossible_minimum() {
        match divide_space(&[1.0, 1.0, 1.0], 100, 40, 5) {
            Err(LayoutError::BadParameters { badness }) => assert_eq!(badness, 20.0),
            other => panic!("unexpected {other:?}"),
        }
        assert!(divide_space(&[-0.5, 1.5], 100, 10, 1).is_err());
    }

    #[test]
    fn divide_space_all_zero_weights_split_evenly() {
        assert_eq!(divide_space(&[0.0, 0.0], 90, 10, 1).unwrap(), vec![45, 45]);
    }

    /// Distance of a two-way split from a target split.
    struct Target {
        want: i64,
        scored: usize,
    }

    impl Objective for Target {
        fn discretize(&self, x: &[f64]) -> Result<Vec<i64>, LayoutError> {
            divide_space(x, 100, 10, 1)
        }

        fn score(&mut self, key: &[i64]) -> f64 {
            self.scored += 1;
            ((key[0] - self.want) as f64).abs()
        }
    }

    #[test]
    fn finds_one_dimensional_target() {
        let mut t = Target {
            want: 73,
            scored: 0,
        };
        let opt = minimize(&mut t, 2, &OptimizerSettings::default()).unwrap();
        assert!((opt.key[0] - 73).abs() <= 1, "got {:?}", opt.key);
        assert!(t.scored <= opt.evaluations);
    }

    struct Bowl;

    impl Objective for Bowl {
        fn discretize(&self, x: &[f64]) -> Result<Vec<i64>, LayoutError> {
            divide_space(x, 300, 20, 1)
        }

        fn score(&mut self, key: &[i64]) -> f64 {
            let target = [50, 150, 100];
            key.iter()
                .zip(target)
                .map(|(k, t)| ((k - t) as f64).powi(2))
                .sum()
        }
    }

    #[test]
    fn finds_three_way_split() {
        let opt = minimize(&mut Bowl, 3, &OptimizerSettings::default()).unwrap();
        assert_eq!(opt.key.iter().sum::<i64>(), 300);
        assert!(opt.score < 100.0, "score {} key {:?}", opt.score, opt.key);
    }

    #[test]
    fn evaluation_budget_is_respected() {
        let settings = OptimizerSettings {
            max_evaluations: 10,
            tolerance: 0.0,
        };
        let opt = minimize(&mut Bowl, 3, &settings).unwrap();
        // One full iteration may finish after the cap is reached.
        assert!(opt.evaluations <= 10 + 4);
    }

    struct Impossible;

    impl Objective for Impossible {
        fn discretize(&self, x: &[f64]) -> Result<Vec<i64>, LayoutError> {
            divide_space(x, 10, 40, 1)
        }

        fn score(&mut self, _: &[i64]) -> f64 {
            0.0
        }
    }

    #[test]
    fn no_valid_point_is_bad_parameters() {
        let err = minimize(&mut Impossible, 2, &OptimizerSettings::default()).unwrap_err();
        assert_eq!(err, LayoutError::BadParameters { badness: 70.0 });
    }

    #[test]
    fn single_coordinate_is_scored_once() {
        let mut t = Target {
            want: 0,
            scored: 0,
        };
        struct One<'a>(&'a mut Target);
        impl Objective for One<'_> {
            fn discretize(&self, x: &[f64]) -> Result<Vec<i64>, LayoutError> {
                divide_space(x, 100, 10, 1)
            }
            fn score(&mut self, key: &[i64]) -> f64 {
                self.0.score(key)
            }
        }
        let opt = minimize(&mut One(&mut t), 1, &OptimizerSettings::default()).unwrap();
        assert_eq!(opt.key, vec![100]);
        assert_eq!(t.scored, 1);
    }
}
