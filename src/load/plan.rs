//! Load plans: named device profiles plus a timeline saying which one is active when.
//!
//! ```json
//! {
//!   "profiles": { "idle": { "lcd": { "brightness": 20 } } },
//!   "timeline": [ { "time": 0, "use_profile": "idle" } ]
//! }
//! ```

use super::device::{DeviceState, PowerDraw};
use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Load seen by the cell at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSample<'a> {
    pub profile: &'a str,
    pub draw: PowerDraw,
}

impl LoadSample<'_> {
    /// Electrical power per cell (W) and device heat (W) for a pack of `n_parallel` cells
    pub fn per_cell(&self, n_parallel: f64) -> (f64, f64) {
        (
            self.draw.power_mw / 1000.0 / n_parallel,
            self.draw.heat_mw / 1000.0,
        )
    }
}

/// Anything that can say what the device draws at simulated time `t`
pub trait LoadProvider {
    /// `None` when no profile is active at `t`
    fn load_at(&self, t: f64) -> Option<LoadSample<'_>>;
}

/// One timeline entry: from `time` on, `use_profile` is active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub time: f64,
    pub use_profile: String,
}

#[derive(Deserialize)]
struct RawPlan {
    profiles: BTreeMap<String, DeviceState>,
    #[serde(default)]
    timeline: Vec<TimelineEvent>,
}

impl From<RawPlan> for SimulationPlan {
    fn from(raw: RawPlan) -> Self {
        SimulationPlan::new(raw.profiles, raw.timeline)
    }
}

/// Named device profiles and a time-sorted activation timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPlan")]
pub struct SimulationPlan {
    profiles: BTreeMap<String, DeviceState>,
    timeline: Vec<TimelineEvent>,
}

impl SimulationPlan {
    pub fn new(profiles: BTreeMap<String, DeviceState>, mut timeline: Vec<TimelineEvent>) -> Self {
        // Stable sort keeps file order for events sharing a timestamp
        timeline.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { profiles, timeline }
    }

    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Profile names in sorted order
    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn timeline(&self) -> &[TimelineEvent] {
        &self.timeline
    }

    /// Name of the profile the timeline selects at `t`, known or not
    pub fn scheduled_profile(&self, t: f64) -> Option<&str> {
        let idx = self.timeline.partition_point(|event| event.time <= t);
        idx.checked_sub(1)
            .map(|i| self.timeline[i].use_profile.as_str())
    }

    /// Hold one profile of this plan for the whole run
    pub fn static_load(&self, name: &str) -> Result<StaticLoad<'_>, SimError> {
        self.profiles
            .get_key_value(name)
            .map(|(name, device)| StaticLoad::new(name, device))
            .ok_or_else(|| SimError::ProfileNotFound(name.to_string()))
    }
}

impl LoadProvider for SimulationPlan {
    fn load_at(&self, t: f64) -> Option<LoadSample<'_>> {
        let name = self.scheduled_profile(t)?;
        let (name, device) = self.profiles.get_key_value(name)?;
        Some(LoadSample {
            profile: name,
            draw: device.draw(),
        })
    }
}

/// A single profile held regardless of time
#[derive(Debug, Clone)]
pub struct StaticLoad<'a> {
    name: &'a str,
    draw: PowerDraw,
}

impl<'a> StaticLoad<'a> {
    pub fn new(name: &'a str, device: &DeviceState) -> Self {
        Self {
            name,
            draw: device.draw(),
        }
    }
}

impl LoadProvider for StaticLoad<'_> {
    fn load_at(&self, _t: f64) -> Option<LoadSample<'_>> {
        Some(LoadSample {
            profile: self.name,
            draw: self.draw,
        })
    }
}
