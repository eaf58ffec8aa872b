/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::StatsOptions;

/// How to start the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the engine executable. Absolute paths are the most reliable.
    pub path: PathBuf,

    /// Arguments passed to the engine on startup.
    pub args: Vec<String>,
}

/// Settings read from a TOML file.
///
/// ```toml
/// log_info_lines = false
///
/// [engine]
/// path = "/opt/lc0/lc0"
/// args = ["--backend=cuda"]
///
/// [options]
/// MultiPV = 10
///
/// [stats]
/// wdl = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The engine to analyse with, if any.
    pub engine: Option<EngineConfig>,

    /// Whether the engine's `info` lines are logged.
    pub log_info_lines: bool,

    /// UCI options sent to the engine after it starts, on top of [`Config::default_options`].
    pub options: BTreeMap<String, toml::Value>,

    /// Which statistics to show for each move.
    pub stats: StatsOptions,
}

impl Config {
    /// Options sent to every engine unless overridden.
    ///
    /// These ask Leela for the per-move statistics that the analysis table is built from.
    pub fn default_options() -> BTreeMap<String, toml::Value> {
        [
            ("VerboseMoveStats", toml::Value::Boolean(true)),
            ("LogLiveStats", toml::Value::Boolean(true)),
            ("MultiPV", toml::Value::Integer(500)),
            ("SmartPruningFactor", toml::Value::Integer(0)),
            ("ScoreType", toml::Value::String(String::from("centipawn"))),
            ("UCI_ShowWDL", toml::Value::Boolean(true)),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }

    /// Reads a [`Config`] from the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path:?}"))?;

        contents
            .parse()
            .with_context(|| format!("Failed to parse config file {path:?}"))
    }

    /// Renders a UCI option value the way `setoption` expects it.
    pub fn option_value_string(value: &toml::Value) -> String {
        match value {
            toml::Value::String(s) => s.clone(),
            toml::Value::Integer(n) => n.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            other => other.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: None,
            log_info_lines: false,
            options: Self::default_options(),
            stats: StatsOptions::default(),
        }
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;
    /// Parses a [`Config`] from TOML. Options given in the file are merged over the defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut config: Self = toml::from_str(s)?;

        let mut options = Self::default_options();
        options.append(&mut config.options);
        config.options = options;

        Ok(config)
    }
}
