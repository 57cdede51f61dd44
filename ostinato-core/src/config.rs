use std::path::{Path, PathBuf};

use serde::Deserialize;

use ostinato_types::{clamp_bpm, ArpeggiatorConfig, ArpeggiatorPatch, DEFAULT_BPM};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    arpeggiator: ArpeggiatorPatch,
    #[serde(default)]
    midi: MidiConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    bpm: Option<f32>,
}

#[derive(Deserialize, Default)]
struct MidiConfig {
    channel: Option<u8>,
}

/// Error loading an explicit config file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Toml(e) => write!(f, "TOML error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    defaults: DefaultsConfig,
    arpeggiator: ArpeggiatorPatch,
    midi: MidiConfig,
}

impl Config {
    /// Embedded defaults overlaid with the user config, if one exists and parses.
    pub fn load() -> Self {
        let mut config = Self::embedded();

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => config.merge(user),
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        config
    }

    /// Embedded defaults overlaid with the file at `path`. Unlike [`Config::load`],
    /// a missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let user: ConfigFile = toml::from_str(&contents)?;
        let mut config = Self::embedded();
        config.merge(user);
        log::debug!(target: "config", "loaded {}", path.display());
        Ok(config)
    }

    fn embedded() -> Self {
        let base: ConfigFile = match toml::from_str(DEFAULT_CONFIG) {
            Ok(base) => base,
            Err(e) => {
                log::error!(target: "config", "embedded config.toml is invalid: {}", e);
                ConfigFile::default()
            }
        };
        Config {
            defaults: base.defaults,
            arpeggiator: base.arpeggiator,
            midi: base.midi,
        }
    }

    fn merge(&mut self, user: ConfigFile) {
        if user.defaults.bpm.is_some() {
            self.defaults.bpm = user.defaults.bpm;
        }
        if user.midi.channel.is_some() {
            self.midi.channel = user.midi.channel;
        }
        merge_patch(&mut self.arpeggiator, user.arpeggiator);
    }

    /// Tempo in BPM, clamped to the supported range.
    pub fn bpm(&self) -> f32 {
        clamp_bpm(self.defaults.bpm.unwrap_or(DEFAULT_BPM))
    }

    /// Initial arpeggiator settings, clamped.
    pub fn arpeggiator(&self) -> ArpeggiatorConfig {
        ArpeggiatorConfig::default().merged(&self.arpeggiator)
    }

    /// MIDI output channel (0-15).
    pub fn midi_channel(&self) -> u8 {
        self.midi.channel.unwrap_or(0).min(15)
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ostinato").join("config.toml"))
}

fn merge_patch(base: &mut ArpeggiatorPatch, user: ArpeggiatorPatch) {
    macro_rules! take {
        ($($field:ident),* $(,)?) => {
            $(if user.$field.is_some() {
                base.$field = user.$field;
            })*
        };
    }
    take!(
        enabled,
        mode,
        octaves,
        octave_mode,
        rate,
        gate_percent,
        swing_percent,
        timing_jitter_ms,
        velocity_spread_percent,
        gate_spread_percent,
        drunk,
        probability_percent,
        random_octave_chance_percent,
        shuffle_percent,
        latch,
        sync,
    );
}
