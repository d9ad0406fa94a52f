//! Runtime configuration read from the environment.
use std::{env, path::PathBuf, str::FromStr, time::Duration};

use tracing::warn;

pub const DATA_DIR_VAR: &str = "KAMBIT_DATA_DIR";
pub const SETTLEMENT_DELAY_VAR: &str = "KAMBIT_SETTLEMENT_DELAY_MS";
pub const CHANNEL_SIZE_VAR: &str = "KAMBIT_CHANNEL_SIZE";

const DEFAULT_DATA_DIR: &str = ".kambit";
const DEFAULT_SETTLEMENT_DELAY_MS: u64 = 2000;
/// The size of the channel feeding the session loop.
const DEFAULT_CHANNEL_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the persisted snapshot.
    pub data_dir: PathBuf,
    /// Simulated wait before a flow settles.
    pub settlement_delay: Duration,
    pub channel_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            settlement_delay: Duration::from_millis(DEFAULT_SETTLEMENT_DELAY_MS),
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable lookup. Unset variables take their
    /// defaults; unparsable ones are reported and take their defaults too.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        let data_dir = lookup(DATA_DIR_VAR)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let settlement_delay = parse_var(&lookup, SETTLEMENT_DELAY_VAR)
            .map(Duration::from_millis)
            .unwrap_or(defaults.settlement_delay);
        let channel_size = parse_var(&lookup, CHANNEL_SIZE_VAR)
            .filter(|size: &usize| *size > 0)
            .unwrap_or(defaults.channel_size);
        Config {
            data_dir,
            settlement_delay,
            channel_size,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring invalid {name}={raw}");
            None
        }
    }
}
