//! Distribution metrics over holder balances.
//!
//! Every function here is pure and total: empty and single-element inputs
//! return a documented degenerate value instead of dividing by zero.
//! Negative or non-finite balances are treated as zero.
//!
//! | Metric | Range | Degenerate value |
//! |--------|-------|------------------|
//! | [`gini`] | `[0, 1]` | `0` for `n <= 1` or zero total |
//! | [`hhi`] | `[0, 1]` / `[0, 10000]` | `0` for zero total |
//! | [`nakamoto_coefficient`] | `0..=n` | `n` when the threshold is unreachable |
//! | [`shannon_entropy`] | `[0, log2 n]` | `0` |
//! | [`palma_ratio`] | `>= 0` | `0` for zero total, [`PALMA_SENTINEL`] when the bottom 40% hold nothing |
//! | [`lorenz_curve`] | points in `[0, 1]^2` | `[(0,0), (1,1)]` |

use serde::{Deserialize, Serialize};

use crate::HolderBalance;

pub const DEFAULT_NAKAMOTO_THRESHOLD: f64 = 0.51;

/// Finite stand-in for an infinite Palma ratio, so results stay orderable.
pub const PALMA_SENTINEL: f64 = 1_000_000.0;

/// Nakamoto coefficient at which the score component saturates.
const NAKAMOTO_SATURATION: f64 = 50.0;

const WHALE_PERCENT: f64 = 1.0;
const LARGE_PERCENT: f64 = 0.1;
const MEDIUM_PERCENT: f64 = 0.01;

fn sanitized(balances: &[f64]) -> Vec<f64> {
    balances
        .iter()
        .map(|balance| {
            if balance.is_finite() && *balance > 0.0 {
                *balance
            } else {
                0.0
            }
        })
        .collect()
}

fn sorted_ascending(balances: &[f64]) -> Vec<f64> {
    let mut values = sanitized(balances);
    values.sort_by(f64::total_cmp);
    values
}

fn sorted_descending(balances: &[f64]) -> Vec<f64> {
    let mut values = sanitized(balances);
    values.sort_by(|a, b| b.total_cmp(a));
    values
}

/// Gini coefficient via the sorted-order estimator
/// `2 * sum(i * x_i) / (n * sum(x)) - (n + 1) / n` with 1-based `i`.
pub fn gini(balances: &[f64]) -> f64 {
    let values = sorted_ascending(balances);
    let n = values.len();
    let total: f64 = values.iter().sum();
    if n <= 1 || total <= 0.0 {
        return 0.0;
    }

    let weighted: f64 = values
        .iter()
        .enumerate()
        .map(|(index, value)| (index + 1) as f64 * value)
        .sum();
    let n = n as f64;

    (2.0 * weighted / (n * total) - (n + 1.0) / n).clamp(0.0, 1.0)
}

/// Herfindahl-Hirschman index on both scales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hhi {
    /// Sum of squared shares, `[0, 1]`.
    pub fraction: f64,
    /// Conventional antitrust scale, `[0, 10000]`.
    pub points: f64,
}

pub fn hhi(balances: &[f64]) -> Hhi {
    let values = sanitized(balances);
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return Hhi {
            fraction: 0.0,
            points: 0.0,
        };
    }

    let fraction = values
        .iter()
        .map(|value| (value / total).powi(2))
        .sum::<f64>()
        .clamp(0.0, 1.0);

    Hhi {
        fraction,
        points: fraction * 10_000.0,
    }
}

/// Smallest number of largest holders whose combined share reaches `threshold`.
///
/// Returns the holder count when the threshold cannot be reached (empty or
/// all-zero input, or a threshold above 1).
pub fn nakamoto_coefficient(balances: &[f64], threshold: f64) -> usize {
    let values = sorted_descending(balances);
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return values.len();
    }

    let target = threshold * total;
    let mut cumulative = 0.0;
    for (index, value) in values.iter().enumerate() {
        cumulative += value;
        if cumulative + f64::EPSILON * total >= target {
            return index + 1;
        }
    }
    values.len()
}

/// `-sum(p * log2 p)` over nonzero shares.
pub fn shannon_entropy(balances: &[f64]) -> f64 {
    let values = sanitized(balances);
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }

    values
        .iter()
        .filter(|value| **value > 0.0)
        .map(|value| {
            let share = value / total;
            -share * share.log2()
        })
        .sum::<f64>()
        .max(0.0)
}

/// Entropy divided by `log2(n)`, in `[0, 1]`. Zero for fewer than two holders.
pub fn normalized_entropy(balances: &[f64]) -> f64 {
    let n = balances.len();
    if n <= 1 {
        return 0.0;
    }
    (shannon_entropy(balances) / (n as f64).log2()).clamp(0.0, 1.0)
}

/// Share held by the top 10% divided by the share held by the bottom 40%.
///
/// Both shares are read off the Lorenz curve, so a holder straddling the 40%
/// or 90% population mark counts fractionally. Equal balances give `0.25` for
/// every `n`.
pub fn palma_ratio(balances: &[f64]) -> f64 {
    let values = sorted_ascending(balances);
    let total: f64 = values.iter().sum();
    if values.is_empty() || total <= 0.0 {
        return 0.0;
    }

    let bottom = cumulative_wealth(&values, 0.4);
    let top = total - cumulative_wealth(&values, 0.9);

    if bottom <= 0.0 {
        return PALMA_SENTINEL;
    }
    (top.max(0.0) / bottom).min(PALMA_SENTINEL)
}

/// Wealth held by the poorest `population` fraction of ascending `values`,
/// interpolating linearly inside the holder that spans the mark.
fn cumulative_wealth(values: &[f64], population: f64) -> f64 {
    let position = values.len() as f64 * population;
    let whole = (position.floor() as usize).min(values.len());
    let partial = values
        .get(whole)
        .map_or(0.0, |value| value * (position - whole as f64));
    values[..whole].iter().sum::<f64>() + partial
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LorenzPoint {
    /// Cumulative share of holders, smallest first.
    pub population: f64,
    /// Cumulative share of supply they hold.
    pub wealth: f64,
}

impl LorenzPoint {
    pub const fn new(population: f64, wealth: f64) -> Self {
        Self { population, wealth }
    }
}

/// Lorenz curve over ascending balances, anchored at `(0,0)` and `(1,1)`.
pub fn lorenz_curve(balances: &[f64]) -> Vec<LorenzPoint> {
    let values = sorted_ascending(balances);
    let n = values.len();
    let total: f64 = values.iter().sum();
    if n == 0 || total <= 0.0 {
        return vec![LorenzPoint::new(0.0, 0.0), LorenzPoint::new(1.0, 1.0)];
    }

    let mut points = Vec::with_capacity(n + 1);
    points.push(LorenzPoint::new(0.0, 0.0));

    let mut cumulative = 0.0;
    for (index, value) in values.iter().enumerate() {
        cumulative += value;
        points.push(LorenzPoint::new(
            (index + 1) as f64 / n as f64,
            (cumulative / total).min(1.0),
        ));
    }

    if let Some(last) = points.last_mut() {
        *last = LorenzPoint::new(1.0, 1.0);
    }
    points
}

/// Evenly decimates a curve to at most `max_points`, keeping both anchors.
pub fn sample_lorenz(points: &[LorenzPoint], max_points: usize) -> Vec<LorenzPoint> {
    let max_points = max_points.max(2);
    if points.len() <= max_points {
        return points.to_vec();
    }

    let last = points.len() - 1;
    (0..max_points)
        .map(|k| {
            let index = (k as f64 * last as f64 / (max_points - 1) as f64).round() as usize;
            points[index.min(last)]
        })
        .collect()
}

/// Share of supply held by the largest `fraction` of holders (at least one).
pub fn top_share(balances: &[f64], fraction: f64) -> f64 {
    let values = sorted_descending(balances);
    let total: f64 = values.iter().sum();
    if values.is_empty() || total <= 0.0 {
        return 0.0;
    }

    let count = ((values.len() as f64 * fraction).ceil() as usize).clamp(1, values.len());
    (values[..count].iter().sum::<f64>() / total).clamp(0.0, 1.0)
}

pub fn median(balances: &[f64]) -> f64 {
    let values = sorted_ascending(balances);
    let n = values.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => values[n / 2],
        _ => (values[n / 2 - 1] + values[n / 2]) / 2.0,
    }
}

/// Inequality and concentration metrics for one balance snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionMetrics {
    /// Balances the metrics were computed over.
    pub sampled_holders: usize,
    pub gini: f64,
    /// HHI on the 0-10000 scale.
    pub hhi: f64,
    pub hhi_fraction: f64,
    pub nakamoto_coefficient: usize,
    pub palma_ratio: f64,
    pub shannon_entropy: f64,
    pub normalized_entropy: f64,
    pub top1_percent: f64,
    pub top10_percent: f64,
    pub median_holding: f64,
}

impl DistributionMetrics {
    pub fn compute(balances: &[f64]) -> Self {
        let hhi = hhi(balances);
        Self {
            sampled_holders: balances.len(),
            gini: gini(balances),
            hhi: hhi.points,
            hhi_fraction: hhi.fraction,
            nakamoto_coefficient: nakamoto_coefficient(balances, DEFAULT_NAKAMOTO_THRESHOLD),
            palma_ratio: palma_ratio(balances),
            shannon_entropy: shannon_entropy(balances),
            normalized_entropy: normalized_entropy(balances),
            top1_percent: top_share(balances, 0.01),
            top10_percent: top_share(balances, 0.10),
            median_holding: median(balances),
        }
    }
}

/// Holder counts by percent of supply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderBuckets {
    /// At least 1% of supply.
    pub whales: usize,
    /// 0.1% up to 1%.
    pub large: usize,
    /// 0.01% up to 0.1%.
    pub medium: usize,
    /// Below 0.01%.
    pub small: usize,
}

impl HolderBuckets {
    pub fn from_holders(holders: &[HolderBalance]) -> Self {
        holders
            .iter()
            .fold(Self::default(), |mut buckets, holder| {
                let percent = holder.percent_of_supply;
                if percent >= WHALE_PERCENT {
                    buckets.whales += 1;
                } else if percent >= LARGE_PERCENT {
                    buckets.large += 1;
                } else if percent >= MEDIUM_PERCENT {
                    buckets.medium += 1;
                } else {
                    buckets.small += 1;
                }
                buckets
            })
    }
}

/// Signals supplied from outside the balance snapshot, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSignals {
    pub growth: f64,
    pub stability: f64,
}

impl ScoreSignals {
    pub const NEUTRAL: Self = Self {
        growth: 0.5,
        stability: 0.5,
    };

    pub fn new(growth: f64, stability: f64) -> Self {
        Self {
            growth: unit(growth),
            stability: unit(stability),
        }
    }
}

impl Default for ScoreSignals {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => Self::A,
            s if s >= 65.0 => Self::B,
            s if s >= 50.0 => Self::C,
            s if s >= 35.0 => Self::D,
            _ => Self::F,
        }
    }
}

/// Points contributed by each component of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Up to 25: `min(1, nakamoto / 50)`.
    pub nakamoto: f64,
    /// Up to 20: `1 - gini`, and `0` for a sample of at most one holder.
    pub gini: f64,
    /// Up to 20: normalized entropy.
    pub entropy: f64,
    /// Up to 15: `1 - hhi_fraction`.
    pub hhi: f64,
    /// Up to 10.
    pub growth: f64,
    /// Up to 10.
    pub stability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecentralizationScore {
    /// 0-100.
    pub score: f64,
    pub grade: Grade,
    pub breakdown: ScoreBreakdown,
}

pub fn decentralization_score(
    metrics: &DistributionMetrics,
    signals: ScoreSignals,
) -> DecentralizationScore {
    let breakdown = ScoreBreakdown {
        nakamoto: 25.0 * (metrics.nakamoto_coefficient as f64 / NAKAMOTO_SATURATION).min(1.0),
        // A lone holder has no inequality to measure, but it is a monopoly.
        gini: if metrics.sampled_holders <= 1 {
            0.0
        } else {
            20.0 * unit(1.0 - metrics.gini)
        },
        entropy: 20.0 * unit(metrics.normalized_entropy),
        hhi: 15.0 * unit(1.0 - metrics.hhi_fraction),
        growth: 10.0 * unit(signals.growth),
        stability: 10.0 * unit(signals.stability),
    };

    let score = (breakdown.nakamoto
        + breakdown.gini
        + breakdown.entropy
        + breakdown.hhi
        + breakdown.growth
        + breakdown.stability)
        .clamp(0.0, 100.0);

    DecentralizationScore {
        score,
        grade: Grade::from_score(score),
        breakdown,
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
