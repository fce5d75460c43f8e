//!
//! Convenience re-export of common members.
//!

//
// # Runtime
//

pub use crate::runtime::random;
pub use crate::runtime::Application;
pub use crate::runtime::Builder;
pub use crate::runtime::Event;
pub use crate::runtime::EventLifecycle;
pub use crate::runtime::EventSet;
pub use crate::runtime::Runtime;
pub use crate::runtime::RuntimeError;
pub use crate::runtime::RuntimeLimit;

pub use crate::time::Duration;
pub use crate::time::SimTime;

//
// # MAC
//

pub use crate::mac::rate::RateManager;
pub use crate::mac::rate::RateManagerKind;
pub use crate::mac::ConfigError;
pub use crate::mac::ConfigErrorKind;
pub use crate::mac::DcfManager;
pub use crate::mac::Destination;
pub use crate::mac::DropReason;
pub use crate::mac::LinkFrame;
pub use crate::mac::MacAddress;
pub use crate::mac::MacConfig;
pub use crate::mac::MacEngine;
pub use crate::mac::WifiState;

pub use crate::phy::Standard;
pub use crate::phy::WifiMode;

//
// # Simulation
//

pub use crate::medium::Medium;
pub use crate::medium::Position;
pub use crate::medium::RangedMedium;

pub use crate::sim::schedule_frame;
pub use crate::sim::MacMetrics;
pub use crate::sim::Scenario;
pub use crate::sim::WifiSim;
