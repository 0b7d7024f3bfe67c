//! # Device Power Model
//!
//! Component-level power model of a handset. Every active component contributes an electrical
//! power draw (mW) and a share of it as heat, `heat = power * K_TH`, where K_TH is the fraction
//! of the component's power dissipated inside the device rather than radiated or emitted.
//!
//! | Component | Power (mW) | K_TH |
//! |-----------|------------|------|
//! | CPU       | 121.46 on + util × (4.34 high / 3.42 low) | 0.995 |
//! | LCD       | 2.40 × brightness | 0.85 |
//! | GPS       | 429.55 on / 173.55 sleep | 1.0 |
//! | WiFi      | 20 low / 710 + (48 − 7.68 r_ch) × r_up high | 0.98 / 0.75 |
//! | 3G        | 10 idle / 401 FACH / 570 DCH | 0.98 / 0.70 |
//! | 5G NR     | 35 idle / 150 inactive / 300 + 2 × MHz + 100 × ant (+600 mmWave) | 0.98 / 0.70 |
//! | Audio     | 384.62 playing | 0.99 |

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

const BETA_CPU_UH: f64 = 4.34;
const BETA_CPU_UL: f64 = 3.42;
const BETA_CPU_ON: f64 = 121.46;
const BETA_BR: f64 = 2.40;
const BETA_GPS_ON: f64 = 429.55;
const BETA_GPS_SLEEP: f64 = 173.55;
const BETA_WIFI_L: f64 = 20.0;
const WIFI_HIGH_BASE: f64 = 710.0;
const WIFI_CR_BASE: f64 = 48.0;
const WIFI_CR_FACTOR: f64 = 7.68;
const BETA_3G_IDLE: f64 = 10.0;
const BETA_3G_FACH: f64 = 401.0;
const BETA_3G_DCH: f64 = 570.0;
const BETA_5G_IDLE: f64 = 35.0;
const BETA_5G_INACTIVE: f64 = 150.0;
const BETA_5G_BASE_CONN: f64 = 300.0;
const BETA_5G_BW: f64 = 2.0;
const BETA_5G_MIMO: f64 = 100.0;
const BETA_5G_MMW: f64 = 600.0;
const BETA_AUDIO_ON: f64 = 384.62;

const K_TH_CPU: f64 = 0.995;
const K_TH_LCD: f64 = 0.85;
const K_TH_GPS: f64 = 1.0;
const K_TH_WIFI_LOW: f64 = 0.98;
const K_TH_WIFI_HIGH: f64 = 0.75;
const K_TH_CELL_IDLE: f64 = 0.98;
const K_TH_CELL_ACTIVE: f64 = 0.70;
const K_TH_5G_LOW: f64 = 0.98;
const K_TH_5G_HIGH: f64 = 0.70;
const K_TH_AUDIO: f64 = 0.99;

/// Electrical draw and dissipated heat of one component or a whole device
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerDraw {
    pub power_mw: f64,
    pub heat_mw: f64,
}

impl PowerDraw {
    fn with_heat_fraction(power_mw: f64, k_th: f64) -> Self {
        Self {
            power_mw,
            heat_mw: power_mw * k_th,
        }
    }
}

impl std::ops::Add for PowerDraw {
    type Output = PowerDraw;

    fn add(self, rhs: PowerDraw) -> PowerDraw {
        PowerDraw {
            power_mw: self.power_mw + rhs.power_mw,
            heat_mw: self.heat_mw + rhs.heat_mw,
        }
    }
}

impl std::iter::Sum for PowerDraw {
    fn sum<I: Iterator<Item = PowerDraw>>(iter: I) -> Self {
        iter.fold(PowerDraw::default(), |acc, d| acc + d)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuState {
    pub is_on: bool,
    pub freq_high: bool,
    /// Utilisation in percent
    pub util: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LcdState {
    /// Brightness level (0-255)
    pub brightness: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum GpsMode {
    #[default]
    Off,
    On,
    Sleep,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsState {
    pub state: GpsMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum WifiMode {
    #[default]
    Off,
    Low,
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiState {
    pub state: WifiMode,
    /// Channel rate (Mbps)
    pub r_channel: f64,
    /// Uplink packet rate
    pub r_uplink: f64,
}

/// 3G RRC states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum CellularMode {
    #[default]
    Off,
    Idle,
    Fach,
    Dch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellularState {
    pub state: CellularMode,
}

/// 5G NR RRC states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum NrMode {
    #[default]
    Off,
    Idle,
    Inactive,
    Connected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NrState {
    pub state: NrMode,
    pub bandwidth_mhz: f64,
    pub mimo_antennas: f64,
    pub mmwave: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioState {
    pub is_playing: bool,
}

/// Snapshot of every power-relevant component of the device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceState {
    pub cpu: CpuState,
    pub lcd: LcdState,
    pub gps: GpsState,
    pub wifi: WifiState,
    pub cellular: CellularState,
    pub nr: NrState,
    pub audio: AudioState,
}

impl DeviceState {
    fn cpu(&self) -> PowerDraw {
        if !self.cpu.is_on {
            return PowerDraw::default();
        }
        let beta = if self.cpu.freq_high { BETA_CPU_UH } else { BETA_CPU_UL };
        PowerDraw::with_heat_fraction(BETA_CPU_ON + beta * self.cpu.util, K_TH_CPU)
    }

    fn lcd(&self) -> PowerDraw {
        PowerDraw::with_heat_fraction(BETA_BR * self.lcd.brightness, K_TH_LCD)
    }

    fn gps(&self) -> PowerDraw {
        let power = match self.gps.state {
            GpsMode::On => BETA_GPS_ON,
            GpsMode::Sleep => BETA_GPS_SLEEP,
            GpsMode::Off => 0.0,
        };
        PowerDraw::with_heat_fraction(power, K_TH_GPS)
    }

    fn wifi(&self) -> PowerDraw {
        match self.wifi.state {
            WifiMode::Off => PowerDraw::default(),
            WifiMode::Low => PowerDraw::with_heat_fraction(BETA_WIFI_L, K_TH_WIFI_LOW),
            WifiMode::High => {
                let beta_cr = WIFI_CR_BASE - WIFI_CR_FACTOR * self.wifi.r_channel;
                let power = (WIFI_HIGH_BASE + beta_cr * self.wifi.r_uplink).max(0.0);
                PowerDraw::with_heat_fraction(power, K_TH_WIFI_HIGH)
            }
        }
    }

    fn cellular(&self) -> PowerDraw {
        match self.cellular.state {
            CellularMode::Off => PowerDraw::default(),
            CellularMode::Idle => PowerDraw::with_heat_fraction(BETA_3G_IDLE, K_TH_CELL_IDLE),
            CellularMode::Fach => PowerDraw::with_heat_fraction(BETA_3G_FACH, K_TH_CELL_ACTIVE),
            CellularMode::Dch => PowerDraw::with_heat_fraction(BETA_3G_DCH, K_TH_CELL_ACTIVE),
        }
    }

    fn nr(&self) -> PowerDraw {
        match self.nr.state {
            NrMode::Off => PowerDraw::default(),
            NrMode::Idle => PowerDraw::with_heat_fraction(BETA_5G_IDLE, K_TH_5G_LOW),
            NrMode::Inactive => PowerDraw::with_heat_fraction(BETA_5G_INACTIVE, K_TH_5G_LOW),
            NrMode::Connected => {
                let mut power = BETA_5G_BASE_CONN
                    + BETA_5G_BW * self.nr.bandwidth_mhz
                    + BETA_5G_MIMO * self.nr.mimo_antennas;
                if self.nr.mmwave {
                    power += BETA_5G_MMW;
                }
                PowerDraw::with_heat_fraction(power, K_TH_5G_HIGH)
            }
        }
    }

    fn audio(&self) -> PowerDraw {
        if self.audio.is_playing {
            PowerDraw::with_heat_fraction(BETA_AUDIO_ON, K_TH_AUDIO)
        } else {
            PowerDraw::default()
        }
    }

    /// Total draw of the device
    pub fn draw(&self) -> PowerDraw {
        [
            self.cpu(),
            self.lcd(),
            self.gps(),
            self.wifi(),
            self.cellular(),
            self.nr(),
            self.audio(),
        ]
        .into_iter()
        .sum()
    }

    pub fn power_mw(&self) -> f64 {
        self.draw().power_mw
    }

    pub fn heat_mw(&self) -> f64 {
        self.draw().heat_mw
    }
}
