const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Converts a power level in dBm into watt.
#[must_use]
pub fn dbm_to_w(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0) / 1000.0
}

/// Converts a power level in watt into dBm.
#[must_use]
pub fn w_to_dbm(w: f64) -> f64 {
    10.0 * (w * 1000.0).log10()
}

/// Converts a ratio in dB into a linear ratio.
#[must_use]
pub fn db_to_ratio(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// A log-distance propagation loss model. Within the reference distance
/// the free-space loss of the reference distance applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogDistanceLoss {
    exponent: f64,
    reference_distance: f64,
    reference_loss: f64,
}

impl LogDistanceLoss {
    /// The default path loss exponent.
    pub const DEFAULT_EXPONENT: f64 = 3.0;

    /// Creates a model for the given carrier frequency, using the Friis
    /// free-space loss at 1 m as reference loss.
    #[must_use]
    pub fn for_frequency(frequency: u64) -> Self {
        let lambda = SPEED_OF_LIGHT / frequency as f64;
        let reference_distance = 1.0;
        let reference_loss =
            20.0 * (4.0 * std::f64::consts::PI * reference_distance / lambda).log10();
        Self {
            exponent: Self::DEFAULT_EXPONENT,
            reference_distance,
            reference_loss,
        }
    }

    /// Replaces the path loss exponent.
    #[must_use]
    pub fn with_exponent(mut self, exponent: f64) -> Self {
        self.exponent = exponent;
        self
    }

    /// The loss in dB over the given distance in meters.
    #[must_use]
    pub fn loss_db(&self, distance: f64) -> f64 {
        if distance <= self.reference_distance {
            return self.reference_loss;
        }
        self.reference_loss + 10.0 * self.exponent * (distance / self.reference_distance).log10()
    }

    /// The distance at which a signal sent with `tx_dbm` (gains included)
    /// drops to `threshold_dbm`.
    #[must_use]
    pub fn max_distance(&self, tx_dbm: f64, threshold_dbm: f64) -> f64 {
        let budget = tx_dbm - threshold_dbm - self.reference_loss;
        if budget <= 0.0 {
            return self.reference_distance;
        }
        self.reference_distance * 10f64.powf(budget / (10.0 * self.exponent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversion() {
        assert!((dbm_to_w(30.0) - 1.0).abs() < 1e-12);
        assert!((w_to_dbm(0.001)).abs() < 1e-12);
        assert!((db_to_ratio(7.0) - 5.011_872).abs() < 1e-6);
    }

    #[test]
    fn range_inverts_loss() {
        let model = LogDistanceLoss::for_frequency(2_412_000_000);
        // ~40 dB free space loss at 1m for 2.4 GHz
        assert!((model.loss_db(1.0) - 40.09).abs() < 0.1);

        let d = model.max_distance(18.0, -96.0);
        let rx = 18.0 - model.loss_db(d);
        assert!((rx + 96.0).abs() < 1e-9, "{rx}");
        assert!(model.max_distance(18.0, -99.0) > d);
    }
}
