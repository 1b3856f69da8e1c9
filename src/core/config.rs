//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized policy settings for the supervisor,
//! and [`FileConfig`], its on-disk TOML form.
//!
//! Config is read in two ways:
//! 1. **Supervisor creation**: `Supervisor::builder(config)`
//! 2. **Explicit setters**: `Supervisor::set_*` update the live copy owned by the actor
//!
//! ## Sentinel values
//! - `zero_output_grace = 0s` → zero-hashrate evaluation starts with the first sample
//! - `stall_interval = 0s` → stall detector disabled
//! - `restart_cooldown = 0s` → restart immediately after the stop completes

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::policies::RestartPolicy;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `restart`: what a restart request does (`Auto` = stop+start, `Manual` = stop only)
/// - `max_zero_samples`: consecutive `0.00 Mh/s` samples tolerated before a restart
/// - `restart_cooldown`: fixed delay between the stop and the start of a restart
/// - `zero_output_grace`: warmup window during which zero samples are not counted
/// - `stall_interval`: stall detector period (`0s` = disabled)
/// - `stop_timeout`: bounded wait for a graceful exit before the forced kill
/// - `share_only`: only accepted/rejected share lines reach the log sink
/// - `restart_on_exit`: raise a restart request when a running worker exits on its own (off by default)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `donation`: mode-switch schedule
#[derive(Clone, Debug)]
pub struct Config {
    /// Restart policy applied to watchdog, worker-error and manual restarts.
    pub restart: RestartPolicy,

    /// Number of consecutive zero samples tolerated.
    ///
    /// The restart fires when the counter **exceeds** this value, so `5` means
    /// the sixth zero sample in a row triggers it.
    pub max_zero_samples: u32,

    /// Fixed delay between stop and start of a restart sequence.
    pub restart_cooldown: Duration,

    /// Warmup window after each start during which samples are not evaluated.
    pub zero_output_grace: Duration,

    /// Period of the stall detector.
    ///
    /// - `Duration::ZERO` = disabled
    /// - `> 0` = restart when no hashrate sample arrived during one full period
    pub stall_interval: Duration,

    /// Maximum time to wait for the worker to exit after the termination signal.
    pub stop_timeout: Duration,

    /// Display filter: only share accept/reject lines are forwarded as log lines.
    pub share_only: bool,

    /// Raise an `UnexpectedExit` restart request when a worker that reached
    /// Running exits by itself. Off by default: an exit is only reported.
    pub restart_on_exit: bool,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Donation (mode-switch) schedule.
    pub donation: DonationConfig,
}

impl Config {
    /// Returns the stall detector period as an `Option`.
    ///
    /// - `None` → stall detection disabled
    /// - `Some(d)` → tick every `d`
    #[inline]
    pub fn stall_period(&self) -> Option<Duration> {
        if self.stall_interval == Duration::ZERO {
            None
        } else {
            Some(self.stall_interval)
        }
    }

    /// Returns the zero-output grace as an `Option`.
    ///
    /// - `None` → samples are eligible immediately
    /// - `Some(d)` → eligible once `d` has elapsed since the start
    #[inline]
    pub fn grace_period(&self) -> Option<Duration> {
        if self.zero_output_grace == Duration::ZERO {
            None
        } else {
            Some(self.zero_output_grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `restart = Auto`
    /// - `max_zero_samples = 5`
    /// - `restart_cooldown = 2s`
    /// - `zero_output_grace = 0s`
    /// - `stall_interval = 30s`
    /// - `stop_timeout = 5s`
    /// - `share_only = false`, `restart_on_exit = false`
    /// - `bus_capacity = 1024`
    /// - `donation = DonationConfig::default()` (disabled)
    fn default() -> Self {
        Self {
            restart: RestartPolicy::Auto,
            max_zero_samples: 5,
            restart_cooldown: Duration::from_secs(2),
            zero_output_grace: Duration::ZERO,
            stall_interval: Duration::from_secs(30),
            stop_timeout: Duration::from_secs(5),
            share_only: false,
            restart_on_exit: false,
            bus_capacity: 1024,
            donation: DonationConfig::default(),
        }
    }
}

/// Alternate argument set used during the donation window.
///
/// Selected when `keyword` occurs in the worker executable's file name
/// (e.g. `"ethash"` matches `/opt/rigs/ethash.rn`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AlternateProfile {
    /// Substring looked up in the executable file name.
    pub keyword: String,
    /// Argument string substituted while the window is active.
    pub args: String,
}

/// Schedule of the donation (mode-switch) window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DonationConfig {
    /// Whether the scheduler runs at all.
    pub enabled: bool,
    /// Length of the normal phase.
    pub normal_phase: Duration,
    /// Length of the alternate phase.
    pub alternate_phase: Duration,
    /// Candidate alternate argument sets, first match wins.
    pub profiles: Vec<AlternateProfile>,
}

impl DonationConfig {
    /// Returns the first profile whose keyword occurs in `executable`'s file name.
    pub fn profile_for(&self, executable: &Path) -> Option<&AlternateProfile> {
        let name = executable.file_name()?.to_string_lossy();
        self.profiles
            .iter()
            .find(|p| !p.keyword.is_empty() && name.contains(p.keyword.as_str()))
    }
}

impl Default for DonationConfig {
    /// Disabled; 58 minutes normal, 2 minutes alternate, no profiles.
    fn default() -> Self {
        Self {
            enabled: false,
            normal_phase: Duration::from_secs(58 * 60),
            alternate_phase: Duration::from_secs(120),
            profiles: Vec::new(),
        }
    }
}

/// On-disk configuration (TOML). Every field is optional; missing fields keep
/// the [`Config::default`] value.
///
/// ```toml
/// auto_restart = true
/// max_zero_samples = 5
/// restart_cooldown_secs = 2
/// zero_output_grace_secs = 60
/// stall_interval_secs = 30
/// share_only = false
///
/// [worker]
/// path = "/opt/rigs/ethash.rn"
/// args = "-P stratum://pool:4444"
///
/// [donation]
/// enabled = true
/// normal_phase_secs = 3480
/// alternate_phase_secs = 120
///
/// [[donation.profiles]]
/// keyword = "ethash"
/// args = "-P stratum://donate:4444"
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub auto_restart: Option<bool>,
    pub max_zero_samples: Option<u32>,
    pub restart_cooldown_secs: Option<u64>,
    pub zero_output_grace_secs: Option<u64>,
    pub stall_interval_secs: Option<u64>,
    pub stop_timeout_secs: Option<u64>,
    pub share_only: Option<bool>,
    pub restart_on_exit: Option<bool>,
    pub bus_capacity: Option<usize>,
    pub worker: Option<FileWorker>,
    pub donation: Option<FileDonation>,
}

/// `[worker]` table: what to launch.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileWorker {
    pub path: String,
    #[serde(default)]
    pub args: String,
}

/// `[donation]` table.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileDonation {
    pub enabled: Option<bool>,
    pub normal_phase_secs: Option<u64>,
    pub alternate_phase_secs: Option<u64>,
    pub profiles: Vec<AlternateProfile>,
}

impl FileConfig {
    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlays the file values on top of [`Config::default`].
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let mut cfg = Config::default();
        if let Some(v) = self.auto_restart {
            cfg.restart = RestartPolicy::from_flag(v);
        }
        if let Some(v) = self.max_zero_samples {
            cfg.max_zero_samples = v;
        }
        if let Some(v) = self.restart_cooldown_secs {
            cfg.restart_cooldown = Duration::from_secs(v);
        }
        if let Some(v) = self.zero_output_grace_secs {
            cfg.zero_output_grace = Duration::from_secs(v);
        }
        if let Some(v) = self.stall_interval_secs {
            cfg.stall_interval = Duration::from_secs(v);
        }
        if let Some(v) = self.stop_timeout_secs {
            cfg.stop_timeout = Duration::from_secs(v);
        }
        if let Some(v) = self.share_only {
            cfg.share_only = v;
        }
        if let Some(v) = self.restart_on_exit {
            cfg.restart_on_exit = v;
        }
        if let Some(v) = self.bus_capacity {
            cfg.bus_capacity = v;
        }
        if let Some(d) = self.donation {
            if let Some(v) = d.enabled {
                cfg.donation.enabled = v;
            }
            if let Some(v) = d.normal_phase_secs {
                cfg.donation.normal_phase = Duration::from_secs(v);
            }
            if let Some(v) = d.alternate_phase_secs {
                cfg.donation.alternate_phase = Duration::from_secs(v);
            }
            cfg.donation.profiles = d.profiles;
        }

        if cfg.donation.enabled
            && (cfg.donation.normal_phase.is_zero() || cfg.donation.alternate_phase.is_zero())
        {
            return Err(ConfigError::Invalid(
                "donation phases must be longer than zero".into(),
            ));
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert!(cfg.restart.is_auto());
        assert_eq!(cfg.max_zero_samples, 5);
        assert_eq!(cfg.restart_cooldown, Duration::from_secs(2));
        assert_eq!(cfg.grace_period(), None);
        assert_eq!(cfg.stall_period(), Some(Duration::from_secs(30)));
        assert!(!cfg.donation.enabled);
        assert!(!cfg.restart_on_exit);
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn file_config_overlays_defaults() {
        let raw = r#"
            auto_restart = false
            max_zero_samples = 3
            zero_output_grace_secs = 60
            stall_interval_secs = 0

            [worker]
            path = "/opt/rigs/ethash.rn"
            args = "-P stratum://pool:4444"

            [donation]
            enabled = true
            normal_phase_secs = 600
            alternate_phase_secs = 30

            [[donation.profiles]]
            keyword = "ethash"
            args = "-P stratum://donate:4444"
        "#;
        let file: FileConfig = toml::from_str(raw).unwrap();
        assert_eq!(file.worker.as_ref().unwrap().path, "/opt/rigs/ethash.rn");

        let cfg = file.into_config().unwrap();
        assert_eq!(cfg.restart, RestartPolicy::Manual);
        assert_eq!(cfg.max_zero_samples, 3);
        assert_eq!(cfg.grace_period(), Some(Duration::from_secs(60)));
        assert_eq!(cfg.stall_period(), None);
        assert_eq!(cfg.restart_cooldown, Duration::from_secs(2));
        assert!(cfg.donation.enabled);
        assert_eq!(cfg.donation.alternate_phase, Duration::from_secs(30));
        assert_eq!(cfg.donation.profiles.len(), 1);
    }

    #[test]
    fn zero_length_donation_phase_is_rejected() {
        let raw = "[donation]\nenabled = true\nalternate_phase_secs = 0\n";
        let file: FileConfig = toml::from_str(raw).unwrap();
        let err = file.into_config().unwrap_err();
        assert_eq!(err.as_label(), "config_invalid");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("auto_restrat = true").is_err());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rigvisor.toml");
        std::fs::write(&path, "share_only = true\n").unwrap();
        let cfg = FileConfig::load(&path).unwrap().into_config().unwrap();
        assert!(cfg.share_only);

        let missing = FileConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert_eq!(missing.as_label(), "config_read");
    }

    #[test]
    fn profile_matches_on_file_name_keyword() {
        let donation = DonationConfig {
            profiles: vec![
                AlternateProfile {
                    keyword: "cryptonight".into(),
                    args: "--xmr".into(),
                },
                AlternateProfile {
                    keyword: "ethash".into(),
                    args: "--eth".into(),
                },
            ],
            ..DonationConfig::default()
        };
        let hit = donation.profile_for(Path::new("/opt/ethash/bin/ethash.rn")).unwrap();
        assert_eq!(hit.args, "--eth");
        assert!(donation.profile_for(Path::new("/opt/cryptonight/equihash.rn")).is_none());
    }
}
