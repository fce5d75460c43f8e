use super::{CodeRate, ModulationClass, WifiMode};

/// Maps a signal-to-noise ratio onto the probability that a chunk of bits
/// survives the channel.
pub trait ErrorRateModel {
    /// The probability that `nbits` bits sent in `mode` at a linear `snr`
    /// are received without error.
    fn chunk_success_rate(&self, mode: &WifiMode, snr: f64, nbits: u64) -> f64;

    /// The smallest linear SNR at which a single bit in `mode` has an
    /// error probability of at most `ber`.
    fn snr_threshold(&self, mode: &WifiMode, ber: f64) -> f64 {
        let mut low = 1e-25;
        let mut high = 1e25;
        while high - low > 1e-12 {
            debug_assert!(high >= low);
            let middle = low + (high - low) / 2.0;
            if 1.0 - self.chunk_success_rate(mode, middle, 1) > ber {
                low = middle;
            } else {
                high = middle;
            }
        }
        low
    }
}

/// The NIST error rate model for OFDM modes, combined with the closed
/// form DSSS model for Clause 15 / 18 rates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NistErrorRateModel;

impl ErrorRateModel for NistErrorRateModel {
    fn chunk_success_rate(&self, mode: &WifiMode, snr: f64, nbits: u64) -> f64 {
        match mode.class() {
            ModulationClass::Ofdm | ModulationClass::ErpOfdm => {
                let ber = match mode.constellation() {
                    2 => bpsk_ber(snr),
                    4 => qpsk_ber(snr),
                    16 => qam16_ber(snr),
                    64 => qam64_ber(snr),
                    c => panic!("constellation size {c} of {mode} is not supported"),
                };
                let b = match mode.code_rate() {
                    CodeRate::R1_2 => 1,
                    CodeRate::R2_3 => 2,
                    CodeRate::R3_4 => 3,
                    CodeRate::Undefined => panic!("OFDM mode {mode} without code rate"),
                };
                fec_success_rate(ber, b, nbits)
            }
            ModulationClass::Dsss => {
                let ber = match mode.data_rate() {
                    1_000_000 => dsss::dbpsk_ber(snr),
                    2_000_000 => dsss::dqpsk_ber(snr),
                    5_500_000 => dsss::cck5_5_ber(snr),
                    11_000_000 => dsss::cck11_ber(snr),
                    r => panic!("DSSS rate {r} of {mode} is not supported"),
                };
                (1.0 - ber).powf(nbits as f64)
            }
        }
    }
}

fn bpsk_ber(snr: f64) -> f64 {
    0.5 * erfc(snr.sqrt())
}

fn qpsk_ber(snr: f64) -> f64 {
    0.5 * erfc((snr / 2.0).sqrt())
}

fn qam16_ber(snr: f64) -> f64 {
    0.75 * 0.5 * erfc((snr / 10.0).sqrt())
}

fn qam64_ber(snr: f64) -> f64 {
    7.0 / 12.0 * 0.5 * erfc((snr / 42.0).sqrt())
}

fn fec_success_rate(ber: f64, b: u8, nbits: u64) -> f64 {
    if ber == 0.0 {
        return 1.0;
    }
    let pe = union_bound(ber, b).min(1.0);
    (1.0 - pe).powf(nbits as f64)
}

/// Union bound of the first error event probability for the K=7
/// convolutional code punctured to the given b value.
fn union_bound(p: f64, b: u8) -> f64 {
    let d = (4.0 * p * (1.0 - p)).sqrt();
    let series = |first: i32, coeffs: &[f64], step: i32| -> f64 {
        coeffs
            .iter()
            .enumerate()
            .map(|(i, c)| c * d.powi(first + step * i as i32))
            .sum()
    };

    match b {
        1 => {
            0.5 * series(
                10,
                &[
                    36.0,
                    211.0,
                    1404.0,
                    11633.0,
                    77433.0,
                    502690.0,
                    3322763.0,
                    21292910.0,
                    134365911.0,
                ],
                2,
            )
        }
        2 => {
            1.0 / 4.0
                * series(
                    6,
                    &[
                        3.0, 70.0, 285.0, 1276.0, 6160.0, 27128.0, 117019.0, 498860.0, 2103891.0,
                        8784123.0,
                    ],
                    1,
                )
        }
        3 => {
            1.0 / 6.0
                * series(
                    5,
                    &[
                        42.0,
                        201.0,
                        1492.0,
                        10469.0,
                        62935.0,
                        379644.0,
                        2253373.0,
                        13073811.0,
                        75152755.0,
                        428005675.0,
                    ],
                    1,
                )
        }
        _ => 1.0,
    }
}

mod dsss {
    const SIR_PERFECT: f64 = 10.0;
    const SIR_IMPOSSIBLE: f64 = 0.1;

    // 22 MHz chip rate over the 1 Msym/s symbol rate
    const PROCESSING_GAIN: f64 = 22.0;

    pub(super) fn dbpsk_ber(snr: f64) -> f64 {
        let eb_n0 = snr * PROCESSING_GAIN;
        0.5 * (-eb_n0).exp()
    }

    pub(super) fn dqpsk_ber(snr: f64) -> f64 {
        let eb_n0 = snr * PROCESSING_GAIN / 2.0;
        let sqrt2 = std::f64::consts::SQRT_2;
        (sqrt2 + 1.0) / (8.0 * std::f64::consts::PI * sqrt2).sqrt() * (1.0 / eb_n0.sqrt())
            * (-(2.0 - sqrt2) * eb_n0).exp()
    }

    pub(super) fn cck5_5_ber(snr: f64) -> f64 {
        if snr > SIR_PERFECT {
            0.0
        } else if snr < SIR_IMPOSSIBLE {
            0.5
        } else {
            let a1 = 5.368_163_434_405_619_5e-1;
            let a2 = 3.309_243_002_560_858_6e-3;
            let a3 = 4.165_437_236_100_4e-1;
            let a4 = 1.028_898_143_435_886_6;
            a1 * (-((snr - a2) / a3).powf(a4)).exp()
        }
    }

    pub(super) fn cck11_ber(snr: f64) -> f64 {
        if snr > SIR_PERFECT {
            0.0
        } else if snr < SIR_IMPOSSIBLE {
            0.5
        } else {
            let a1 = 7.905_674_226_533_345_6e-3;
            let a2 = -1.839_744_939_917_636e-1;
            let a3 = 1.074_068_946_870_724_1;
            let a4 = 1.052_331_690_450_255_3;
            let a5 = 3.055_229_874_649_668_7e-1;
            let a6 = 2.203_271_512_869_843_5;
            (a1 * snr * snr + a2 * snr + a3) / (snr * snr * snr + a4 * snr * snr + a5 * snr + a6)
        }
    }
}

/// The complementary error function (Abramowitz and Stegun 7.1.26,
/// absolute error below 1.5e-7).
#[must_use]
pub fn erfc(x: f64) -> f64 {
    if x < 0.0 {
        return 2.0 - erfc(-x);
    }
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    poly * (-x * x).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::*;

    #[test]
    fn erfc_reference_points() {
        assert!((erfc(0.0) - 1.0).abs() < 1e-6);
        assert!((erfc(1.0) - 0.157_299_2).abs() < 1e-6);
        assert!((erfc(-1.0) - 1.842_700_8).abs() < 1e-6);
        assert!(erfc(6.0) < 1e-15);
    }

    #[test]
    fn success_rate_grows_with_snr() {
        let model = NistErrorRateModel;
        for mode in Standard::G.modes().iter().chain(Standard::A.modes().iter()) {
            let low = model.chunk_success_rate(mode, 0.5, 1000);
            let high = model.chunk_success_rate(mode, 1000.0, 1000);
            assert!(low <= high, "{mode}: {low} > {high}");
            assert!((0.0..=1.0).contains(&low));
            assert!((high - 1.0).abs() < 1e-6, "{mode}: {high}");
        }
    }

    #[test]
    fn thresholds_are_ordered_within_a_class() {
        let model = NistErrorRateModel;
        let thresholds: Vec<f64> = Standard::A
            .modes()
            .iter()
            .map(|m| model.snr_threshold(m, 1e-5))
            .collect();
        assert!(thresholds.iter().all(|t| *t > 0.0));
        assert!(thresholds[0] < thresholds[7]);

        let t = model.snr_threshold(&OFDM_6MBPS, 1e-5);
        let ber = 1.0 - model.chunk_success_rate(&OFDM_6MBPS, t, 1);
        assert!(ber > 1e-5 * 0.99 && ber < 1e-5 * 1.01, "{ber}");
    }
}
