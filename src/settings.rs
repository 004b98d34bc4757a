//! Race settings and preferences
//!
//! Timings here exist to line the simulation up with presentation (fades,
//! countdown labels). Persisted in LocalStorage, separate from track data.

use serde::{Deserialize, Serialize};

/// Race settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    // === Selection ===
    /// Built-in track to race on
    pub track: String,
    /// Built-in vehicle the player drives
    pub vehicle: String,

    // === Race ===
    /// Laps to complete before the race finishes
    pub laps: u32,
    /// CPU opponents on the grid
    pub cpu_count: usize,
    /// Lateral spacing between grid slots
    pub grid_spacing: f32,

    // === Countdown (ms since the race was loaded) ===
    /// Screen fade-in before the countdown shows
    pub fade_in_ms: f32,
    /// Length of the 3-2-1 count
    pub countdown_ms: f32,
    /// When the "GO!" label disappears
    pub go_hidden_at_ms: f32,

    // === Respawn ===
    /// Fade-to-black before teleporting
    pub respawn_fade_ms: f32,
    /// Movement lock after teleporting
    pub respawn_lock_ms: f32,
    /// Falling below this height starts a respawn
    pub out_of_bounds_y: f32,

    // === Thrust ===
    /// Player thrust at the start line, 0.0 - 1.0
    pub initial_thrust: f32,
    /// Change per arrow key press
    pub thrust_step: f32,
    /// Constant CPU thrust
    pub cpu_thrust: f32,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            track: "speedway".to_string(),
            vehicle: "speeder_1".to_string(),

            laps: 2,
            cpu_count: 3,
            grid_spacing: 4.0,

            fade_in_ms: 3000.0,
            countdown_ms: 3000.0,
            go_hidden_at_ms: 7000.0,

            respawn_fade_ms: 900.0,
            respawn_lock_ms: 1000.0,
            out_of_bounds_y: -30.0,

            initial_thrust: 0.5,
            thrust_step: 0.02,
            cpu_thrust: 0.5,
        }
    }
}

impl RaceSettings {
    /// Clock time at which vehicles are released
    pub fn start_ms(&self) -> f32 {
        self.fade_in_ms + self.countdown_ms
    }

    /// Countdown label at `clock_ms`, `None` while hidden
    pub fn countdown_label(&self, clock_ms: f32) -> Option<String> {
        let start = self.start_ms();
        if clock_ms < self.fade_in_ms || clock_ms > self.go_hidden_at_ms {
            None
        } else if clock_ms < start {
            Some(((start - clock_ms) / 1000.0).ceil().to_string())
        } else {
            Some("GO!".to_string())
        }
    }

    /// LocalStorage key
    pub const STORAGE_KEY: &'static str = "hover_racer_settings";

    /// Settings from a stored blob; missing or unreadable blobs give defaults
    pub fn from_stored(json: Option<&str>) -> Self {
        match json.map(serde_json::from_str::<Self>) {
            Some(Ok(settings)) => settings,
            Some(Err(e)) => {
                log::warn!("Ignoring stored settings: {e}");
                Self::default()
            }
            None => Self::default(),
        }
    }

    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    #[cfg(target_arch = "wasm32")]
    fn local_storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }

    /// Load settings from LocalStorage
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let stored = Self::local_storage().and_then(|s| s.get_item(Self::STORAGE_KEY).ok().flatten());
        Self::from_stored(stored.as_deref())
    }

    /// Remember the selection (and everything else) for the next visit
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let Some(storage) = Self::local_storage() else {
            return;
        };
        match self.to_stored() {
            Ok(json) => {
                if storage.set_item(Self::STORAGE_KEY, &json).is_err() {
                    log::warn!("LocalStorage refused the settings");
                }
            }
            Err(e) => log::warn!("Settings not saved: {e}"),
        }
    }

    /// Native builds have no preference store
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}
