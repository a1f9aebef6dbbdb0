use tdigest::TDigest;

/// Maximum number of centroids kept by a distribution's digest.
pub const COMPRESSION: usize = 200;

/// Bisection steps for [`Distribution::cdf`]; enough to pin `q` below f64 precision.
const CDF_STEPS: usize = 64;

/// Approximate quantile sketch (t-digest) over the finite values of a numeric window.
///
/// Quantiles come straight from the digest and are clamped to the observed
/// `[min, max]`, so both extremes are exact.
#[derive(Debug, Clone)]
pub struct Distribution {
    digest: TDigest,
}

impl Distribution {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        let digest = TDigest::new_with_size(COMPRESSION);
        let digest = if finite.is_empty() {
            digest
        } else {
            digest.merge_unsorted(finite)
        };
        Self { digest }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.digest.count() as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digest.count() == 0.0
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        self.digest.min()
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        self.digest.max()
    }

    /// Value below which a fraction `q` of the weight lies. NaN when empty or
    /// when `q` is outside `[0, 1]`.
    #[must_use]
    pub fn quantile(&self, q: f64) -> f64 {
        if self.is_empty() || !(0.0..=1.0).contains(&q) {
            return f64::NAN;
        }
        let (min, max) = (self.digest.min(), self.digest.max());
        if q == 0.0 {
            return min;
        }
        if q == 1.0 {
            return max;
        }
        self.digest.estimate_quantile(q).clamp(min, max)
    }

    #[must_use]
    pub fn median(&self) -> f64 {
        self.quantile(0.5)
    }

    /// Estimated fraction of values `<= x`; 0 when empty.
    ///
    /// The digest only answers quantiles, so this inverts [`Self::quantile`]
    /// by bisection: the largest `q` whose quantile does not exceed `x`.
    #[must_use]
    pub fn cdf(&self, x: f64) -> f64 {
        if self.is_empty() || x.is_nan() || x < self.digest.min() {
            return 0.0;
        }
        if x >= self.digest.max() {
            return 1.0;
        }
        let (mut low, mut high) = (0.0_f64, 1.0_f64);
        for _ in 0..CDF_STEPS {
            let mid = (low + high) / 2.0;
            if self.quantile(mid) <= x {
                low = mid;
            } else {
                high = mid;
            }
        }
        low
    }

    #[must_use]
    pub fn left_tail(&self, x: f64) -> f64 {
        self.cdf(x)
    }

    /// Estimated fraction of values `> x`; 0 when empty.
    #[must_use]
    pub fn right_tail(&self, x: f64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        1.0 - self.cdf(x)
    }
}

#[cfg(test)]
mod tests {
    use super::Distribution;

    #[test]
    fn extremes_are_exact_and_median_is_close() {
        let dist = Distribution::from_values((1..=100).map(f64::from));
        assert_eq!(dist.count(), 100);
        assert_eq!(dist.quantile(0.0), 1.0);
        assert_eq!(dist.quantile(1.0), 100.0);
        assert!((dist.median() - 50.5).abs() <= 1.0);
        assert!((dist.cdf(50.5) - 0.5).abs() <= 0.02);
    }

    #[test]
    fn quantiles_are_monotone_on_large_input() {
        let values = (0..50_000).map(|i| f64::from((i * 7919) % 50_000));
        let dist = Distribution::from_values(values);

        let mut previous = f64::NEG_INFINITY;
        for step in 0..=100 {
            let q = f64::from(step) / 100.0;
            let value = dist.quantile(q);
            assert!(value >= previous, "quantile({q}) went backwards");
            previous = value;
        }
        assert!((dist.median() - 25_000.0).abs() < 250.0);
        assert!((dist.quantile(0.99) - 49_500.0).abs() < 100.0);
    }

    #[test]
    fn tails_complement_each_other() {
        let dist = Distribution::from_values([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(dist.left_tail(0.0), 0.0);
        assert_eq!(dist.right_tail(10.0), 0.0);
        assert_eq!(dist.left_tail(4.0), 1.0);
        let x = 2.5;
        let left = dist.left_tail(x);
        assert!(left > 0.0 && left < 1.0);
        assert!((left + dist.right_tail(x) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_distribution_answers_nan_and_zero() {
        let dist = Distribution::from_values([f64::NAN, f64::INFINITY]);
        assert!(dist.is_empty());
        assert_eq!(dist.count(), 0);
        assert!(dist.quantile(0.5).is_nan());
        assert!(dist.min().is_nan());
        assert!(dist.max().is_nan());
        assert_eq!(dist.cdf(1.0), 0.0);
        assert_eq!(dist.right_tail(1.0), 0.0);
    }

    #[test]
    fn single_value_distribution_is_degenerate() {
        let dist = Distribution::from_values([4.0]);
        assert_eq!(dist.quantile(0.3), 4.0);
        assert_eq!(dist.cdf(4.0), 1.0);
        assert_eq!(dist.cdf(3.9), 0.0);
        assert!(dist.quantile(1.5).is_nan());
    }
}
