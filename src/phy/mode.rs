use std::{
    cmp::Ordering,
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

/// The PHY rate family a [`WifiMode`] belongs to. Control responses must
/// use the class of the frame they answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModulationClass {
    /// Clause 15 / 18 rates (DSSS and HR/DSSS).
    Dsss,
    /// Clause 19.5 rates (ERP-OFDM, 802.11g).
    ErpOfdm,
    /// Clause 17 rates (OFDM, 802.11a).
    Ofdm,
}

/// The convolutional code rate of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeRate {
    /// No forward error correction (DSSS).
    Undefined,
    /// Rate 1/2.
    R1_2,
    /// Rate 2/3.
    R2_3,
    /// Rate 3/4.
    R3_4,
}

impl CodeRate {
    /// Returns (numerator, denominator). `Undefined` counts as 1/1.
    #[must_use]
    pub const fn ratio(self) -> (u64, u64) {
        match self {
            Self::Undefined => (1, 1),
            Self::R1_2 => (1, 2),
            Self::R2_3 => (2, 3),
            Self::R3_4 => (3, 4),
        }
    }
}

/// A transmission mode of the PHY.
///
/// Two modes are equal if they share a name. Modes are ordered by their data rate.
#[derive(Clone, Copy)]
pub struct WifiMode {
    name: &'static str,
    class: ModulationClass,
    mandatory: bool,
    bandwidth: u32,
    data_rate: u64,
    code_rate: CodeRate,
    constellation: u16,
}

impl WifiMode {
    const fn new(
        name: &'static str,
        class: ModulationClass,
        mandatory: bool,
        bandwidth: u32,
        data_rate: u64,
        code_rate: CodeRate,
        constellation: u16,
    ) -> Self {
        Self {
            name,
            class,
            mandatory,
            bandwidth,
            data_rate,
            code_rate,
            constellation,
        }
    }

    /// The unique name of the mode, e.g. `OfdmRate6Mbps`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The modulation class.
    #[must_use]
    pub fn class(&self) -> ModulationClass {
        self.class
    }

    /// Whether every station of the standard must support this mode.
    #[must_use]
    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// The channel bandwidth in Hz.
    #[must_use]
    pub fn bandwidth(&self) -> u32 {
        self.bandwidth
    }

    /// The user data rate in bit/s.
    #[must_use]
    pub fn data_rate(&self) -> u64 {
        self.data_rate
    }

    /// The raw PHY rate in bit/s, i.e. the data rate before coding.
    #[must_use]
    pub fn phy_rate(&self) -> u64 {
        let (num, den) = self.code_rate.ratio();
        self.data_rate * den / num
    }

    /// The code rate.
    #[must_use]
    pub fn code_rate(&self) -> CodeRate {
        self.code_rate
    }

    /// The size of the modulation constellation.
    #[must_use]
    pub fn constellation(&self) -> u16 {
        self.constellation
    }

    /// Looks up a mode by its name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<WifiMode> {
        ALL_MODES.iter().find(|m| m.name == name).copied()
    }
}

impl PartialEq for WifiMode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for WifiMode {}

impl Hash for WifiMode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for WifiMode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WifiMode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.data_rate
            .cmp(&other.data_rate)
            .then_with(|| self.name.cmp(other.name))
    }
}

impl Debug for WifiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

impl Display for WifiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

use CodeRate::{R1_2, R2_3, R3_4, Undefined};
use ModulationClass::{Dsss, ErpOfdm, Ofdm};

const MHZ_20: u32 = 20_000_000;
const MHZ_22: u32 = 22_000_000;

// Clause 15 / 18 rates (DSSS, HR/DSSS)
pub const DSSS_1MBPS: WifiMode = WifiMode::new("DsssRate1Mbps", Dsss, true, MHZ_22, 1_000_000, Undefined, 2);
pub const DSSS_2MBPS: WifiMode = WifiMode::new("DsssRate2Mbps", Dsss, true, MHZ_22, 2_000_000, Undefined, 4);
pub const DSSS_5_5MBPS: WifiMode = WifiMode::new("DsssRate5_5Mbps", Dsss, true, MHZ_22, 5_500_000, Undefined, 4);
pub const DSSS_11MBPS: WifiMode = WifiMode::new("DsssRate11Mbps", Dsss, true, MHZ_22, 11_000_000, Undefined, 4);

// Clause 19.5 rates (ERP-OFDM)
pub const ERP_OFDM_6MBPS: WifiMode = WifiMode::new("ErpOfdmRate6Mbps", ErpOfdm, true, MHZ_20, 6_000_000, R1_2, 2);
pub const ERP_OFDM_9MBPS: WifiMode = WifiMode::new("ErpOfdmRate9Mbps", ErpOfdm, false, MHZ_20, 9_000_000, R3_4, 2);
pub const ERP_OFDM_12MBPS: WifiMode = WifiMode::new("ErpOfdmRate12Mbps", ErpOfdm, true, MHZ_20, 12_000_000, R1_2, 4);
pub const ERP_OFDM_18MBPS: WifiMode = WifiMode::new("ErpOfdmRate18Mbps", ErpOfdm, false, MHZ_20, 18_000_000, R3_4, 4);
pub const ERP_OFDM_24MBPS: WifiMode = WifiMode::new("ErpOfdmRate24Mbps", ErpOfdm, true, MHZ_20, 24_000_000, R1_2, 16);
pub const ERP_OFDM_36MBPS: WifiMode = WifiMode::new("ErpOfdmRate36Mbps", ErpOfdm, false, MHZ_20, 36_000_000, R3_4, 16);
pub const ERP_OFDM_48MBPS: WifiMode = WifiMode::new("ErpOfdmRate48Mbps", ErpOfdm, false, MHZ_20, 48_000_000, R2_3, 64);
pub const ERP_OFDM_54MBPS: WifiMode = WifiMode::new("ErpOfdmRate54Mbps", ErpOfdm, false, MHZ_20, 54_000_000, R3_4, 64);

// Clause 17 rates (OFDM)
pub const OFDM_6MBPS: WifiMode = WifiMode::new("OfdmRate6Mbps", Ofdm, true, MHZ_20, 6_000_000, R1_2, 2);
pub const OFDM_9MBPS: WifiMode = WifiMode::new("OfdmRate9Mbps", Ofdm, false, MHZ_20, 9_000_000, R3_4, 2);
pub const OFDM_12MBPS: WifiMode = WifiMode::new("OfdmRate12Mbps", Ofdm, true, MHZ_20, 12_000_000, R1_2, 4);
pub const OFDM_18MBPS: WifiMode = WifiMode::new("OfdmRate18Mbps", Ofdm, false, MHZ_20, 18_000_000, R3_4, 4);
pub const OFDM_24MBPS: WifiMode = WifiMode::new("OfdmRate24Mbps", Ofdm, true, MHZ_20, 24_000_000, R1_2, 16);
pub const OFDM_36MBPS: WifiMode = WifiMode::new("OfdmRate36Mbps", Ofdm, false, MHZ_20, 36_000_000, R3_4, 16);
pub const OFDM_48MBPS: WifiMode = WifiMode::new("OfdmRate48Mbps", Ofdm, false, MHZ_20, 48_000_000, R2_3, 64);
pub const OFDM_54MBPS: WifiMode = WifiMode::new("OfdmRate54Mbps", Ofdm, false, MHZ_20, 54_000_000, R3_4, 64);

pub(crate) const DSSS_MODES: [WifiMode; 4] = [DSSS_1MBPS, DSSS_2MBPS, DSSS_5_5MBPS, DSSS_11MBPS];

pub(crate) const ERP_OFDM_MODES: [WifiMode; 8] = [
    ERP_OFDM_6MBPS,
    ERP_OFDM_9MBPS,
    ERP_OFDM_12MBPS,
    ERP_OFDM_18MBPS,
    ERP_OFDM_24MBPS,
    ERP_OFDM_36MBPS,
    ERP_OFDM_48MBPS,
    ERP_OFDM_54MBPS,
];

pub(crate) const OFDM_MODES: [WifiMode; 8] = [
    OFDM_6MBPS,
    OFDM_9MBPS,
    OFDM_12MBPS,
    OFDM_18MBPS,
    OFDM_24MBPS,
    OFDM_36MBPS,
    OFDM_48MBPS,
    OFDM_54MBPS,
];

const ALL_MODES: [WifiMode; 20] = [
    DSSS_1MBPS,
    DSSS_2MBPS,
    DSSS_5_5MBPS,
    DSSS_11MBPS,
    ERP_OFDM_6MBPS,
    ERP_OFDM_9MBPS,
    ERP_OFDM_12MBPS,
    ERP_OFDM_18MBPS,
    ERP_OFDM_24MBPS,
    ERP_OFDM_36MBPS,
    ERP_OFDM_48MBPS,
    ERP_OFDM_54MBPS,
    OFDM_6MBPS,
    OFDM_9MBPS,
    OFDM_12MBPS,
    OFDM_18MBPS,
    OFDM_24MBPS,
    OFDM_36MBPS,
    OFDM_48MBPS,
    OFDM_54MBPS,
];
