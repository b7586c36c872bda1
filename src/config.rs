use std::collections::BTreeSet;
use std::fs;
use log::{error, info};
use rocket::figment::Figment;
use rocket::serde::{Deserialize, Serialize};
use crate::slot::SlotTime;

/// Club catalog and booking policy. The default values are the mock
/// dataset; a real deployment overrides them from `Rocket.toml`
/// (`[default.club]`), `TEEBOX_CLUB_*` environment or a YAML file
/// pointed to by the `club_yaml` config key.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ClubConfig {
    pub locations: Vec<String>,
    pub bays: Vec<String>,
    /// Globally unavailable times, independent of location and bay.
    /// Stand-in for a real schedule feed.
    pub blocked_slots: BTreeSet<SlotTime>,
    pub free_guest_passes_per_month: u32,
    /// Dollars per guest above the monthly free allowance.
    pub guest_pass_charge: i64,
    /// Artificial latency of the submission uplink.
    pub submit_delay_ms: u64,
}

impl Default for ClubConfig {
    fn default() -> Self {
        let blocked = [
            "1:00 AM", "1:30 AM", "9:30 AM", "10:00 AM",
            "2:00 PM", "2:30 PM", "11:00 PM", "11:30 PM",
        ];
        Self {
            locations: vec!["Location 1".to_string(), "Location 2".to_string()],
            bays: vec!["Bay 1".to_string(), "Bay 2".to_string(), "Bay 3".to_string()],
            blocked_slots: blocked.iter()
                .map(|s| SlotTime::parse(s).expect("valid blocked slot"))
                .collect(),
            free_guest_passes_per_month: 2,
            guest_pass_charge: 10,
            submit_delay_ms: 1000,
        }
    }
}

impl ClubConfig {
    pub fn load(figment: &Figment) -> ClubConfig {
        if let Ok(path) = figment.extract_inner::<String>("club_yaml") {
            match Self::from_yaml_file(&path) {
                Ok(cfg) => {
                    info!("Club catalog loaded from: {path}");
                    return cfg;
                }
                Err(e) => error!("Cannot read club catalog file: {path} - {e}"),
            }
        }
        figment.extract_inner::<ClubConfig>("club").ok().unwrap_or_default()
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<ClubConfig> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_yaml_file(path: &str) -> anyhow::Result<ClubConfig> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog() {
        let cfg = ClubConfig::default();
        assert_eq!(cfg.locations.len(), 2);
        assert_eq!(cfg.bays.len(), 3);
        assert_eq!(cfg.blocked_slots.len(), 8);
        assert!(cfg.blocked_slots.contains(&SlotTime::parse("9:30 AM").unwrap()));
        assert_eq!(cfg.free_guest_passes_per_month, 2);
        assert_eq!(cfg.guest_pass_charge, 10);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = ClubConfig::from_yaml("
locations:
  - North Range
blocked_slots:
  - \"7:00 AM\"
").unwrap();
        assert_eq!(cfg.locations, vec!["North Range".to_string()]);
        assert_eq!(cfg.blocked_slots.len(), 1);
        assert!(cfg.blocked_slots.contains(&SlotTime::parse("7:00 AM").unwrap()));
        // untouched keys fall back to the stock catalog
        assert_eq!(cfg.bays.len(), 3);
        assert_eq!(cfg.guest_pass_charge, 10);
    }

    #[test]
    fn bad_yaml_is_an_error() {
        assert!(ClubConfig::from_yaml("blocked_slots: [\"25:00 XM\"]").is_err());
    }
}
