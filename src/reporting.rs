//! Named metric series for audit reports.

use serde::{Deserialize, Serialize};

/// How one flock metric behaved over an audit run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric: String,
    pub samples: usize,
    /// Non-finite values rejected by [`MetricSeries::push`].
    pub dropped: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
    /// Share of samples at or below the series budget, in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within_budget_pct: Option<f64>,
}

/// Samples of one metric, one per audited tick.
#[derive(Debug, Clone)]
pub struct MetricSeries {
    name: &'static str,
    budget: Option<f64>,
    samples: Vec<f64>,
    dropped: usize,
}

impl MetricSeries {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            budget: None,
            samples: Vec::new(),
            dropped: 0,
        }
    }

    /// A series whose summary also reports how often samples stayed within `budget`.
    pub fn with_budget(name: &'static str, budget: f64) -> Self {
        Self {
            budget: Some(budget),
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn push(&mut self, value: f64) {
        if value.is_finite() {
            self.samples.push(value);
        } else {
            self.dropped += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn summary(&self) -> MetricSummary {
        let mut summary = MetricSummary {
            metric: self.name.to_string(),
            dropped: self.dropped,
            ..MetricSummary::default()
        };
        if self.samples.is_empty() {
            summary.within_budget_pct = self.budget.map(|_| 0.0);
            return summary;
        }

        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

        summary.samples = sorted.len();
        summary.min = sorted[0];
        summary.max = sorted[sorted.len() - 1];
        summary.mean = mean;
        summary.std_dev = variance.sqrt();
        summary.p50 = interpolated_percentile(&sorted, 0.50);
        summary.p90 = interpolated_percentile(&sorted, 0.90);
        summary.p99 = interpolated_percentile(&sorted, 0.99);
        summary.within_budget_pct = self.budget.map(|budget| {
            let within = sorted.partition_point(|v| *v <= budget);
            within as f64 / n * 100.0
        });
        summary
    }
}

/// Linear interpolation between the two closest ranks of an ascending slice.
fn interpolated_percentile(sorted: &[f64], p: f64) -> f64 {
    let Some(&last) = sorted.last() else {
        return 0.0;
    };
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    if lo >= sorted.len() - 1 {
        return last;
    }
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_interpolates_percentiles() {
        let mut series = MetricSeries::new("avg_speed");
        for i in 1..=100 {
            series.push(i as f64);
        }
        let s = series.summary();
        assert_eq!(s.metric, "avg_speed");
        assert_eq!(s.samples, 100);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 100.0);
        assert!((s.mean - 50.5).abs() < 1e-9);
        assert!((s.p50 - 50.5).abs() < 1e-9);
        assert!((s.p90 - 90.1).abs() < 1e-9);
        assert!((s.p99 - 99.01).abs() < 1e-9);
        assert!((s.std_dev - 28.866070).abs() < 1e-5);
        assert_eq!(s.within_budget_pct, None);
    }

    #[test]
    fn non_finite_samples_are_counted_not_kept() {
        let mut series = MetricSeries::with_budget("step_ms", 10.0);
        series.push(f64::NAN);
        series.push(f64::INFINITY);
        assert!(series.is_empty());
        let empty = series.summary();
        assert_eq!(empty.samples, 0);
        assert_eq!(empty.dropped, 2);
        assert_eq!(empty.within_budget_pct, Some(0.0));

        for v in [5.0, 15.0, 10.0] {
            series.push(v);
        }
        let s = series.summary();
        assert_eq!(series.len(), 3);
        assert_eq!(s.dropped, 2);
        let pct = s.within_budget_pct.unwrap();
        assert!((pct - 66.666666).abs() < 0.01);
    }

    #[test]
    fn single_sample_fills_every_percentile() {
        let mut series = MetricSeries::new("polarization");
        series.push(0.75);
        let s = series.summary();
        assert_eq!((s.p50, s.p90, s.p99), (0.75, 0.75, 0.75));
        assert_eq!(s.std_dev, 0.0);
    }

    #[test]
    fn budget_percentage_is_omitted_from_json_without_budget() {
        let json = serde_json::to_value(MetricSeries::new("avg_neighbors").summary()).unwrap();
        assert!(json.get("within_budget_pct").is_none());
        assert_eq!(json["metric"], "avg_neighbors");
    }
}
