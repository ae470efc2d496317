/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

use sealed::sealed;
use serde::{Deserialize, Serialize};

use crate::error::PampacError;
use crate::json::{open_file_reader, ToJson};
use crate::types::*;

pub trait Configurable: Sized {
    //// Obtain the configuration
    fn config(&self) -> &Config;

    //// Obtain the configuration mutably
    fn config_mut(&mut self) -> &mut Config;

    ///Builder pattern to associate a configuration
    fn with_config(mut self, config: Config) -> Self {
        self.set_config(config);
        self
    }

    ///Setter to associate a configuration
    fn set_config(&mut self, config: Config) -> &mut Self;
}

/// This holds the configuration. It is not limited to configuring a single part of the model, but unifies all in a single configuration.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Debug mode
    pub(crate) debug: bool,

    /// Maximum number of match results that may be produced while evaluating a single rule at a single scan position.
    pub(crate) max_results: usize,

    /// Maximum number of repetitions for an `N` combinator that has no explicit maximum.
    pub(crate) max_repeat: usize,

    /// Maximum number of positions a `Find` combinator may try, unbounded (up to the end of the document) if not set.
    pub(crate) find_window: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            max_results: 100_000,
            max_repeat: 10_000,
            find_window: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable debug mode. In debug mode, verbose output is emitted as `tracing` debug events (target `pampac`)
    pub fn with_debug(mut self, value: bool) -> Self {
        self.debug = value;
        self
    }

    /// Is debug mode enabled or not?
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Sets the maximum number of match results a single rule may produce at a single scan position.
    /// Exceeding it is reported as [`PampacError::LimitExceeded`].
    pub fn with_max_results(mut self, value: usize) -> Self {
        self.max_results = value;
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Sets the repetition cap for `N` combinators without an explicit maximum.
    pub fn with_max_repeat(mut self, value: usize) -> Self {
        self.max_repeat = value;
        self
    }

    pub fn max_repeat(&self) -> usize {
        self.max_repeat
    }

    /// Sets the maximum number of positions a `Find` combinator tries before giving up with an error.
    pub fn with_find_window(mut self, value: Option<usize>) -> Self {
        self.find_window = value;
        self
    }

    pub fn find_window(&self) -> Option<usize> {
        self.find_window
    }

    /// Loads configuration from a JSON file
    pub fn from_file(filename: &str) -> Result<Self, PampacError> {
        let reader = open_file_reader(filename)?;
        let deserializer = &mut serde_json::Deserializer::from_reader(reader);
        let result: Result<Self, _> = serde_path_to_error::deserialize(deserializer);
        result.map_err(|e| {
            PampacError::JsonError(e, filename.to_string(), "Reading config from file")
        })
    }

    /// Loads configuration from a JSON string
    pub fn from_json_str(string: &str) -> Result<Self, PampacError> {
        let deserializer = &mut serde_json::Deserializer::from_str(string);
        let result: Result<Self, _> = serde_path_to_error::deserialize(deserializer);
        result.map_err(|e| PampacError::JsonError(e, String::new(), "Reading config from string"))
    }
}

#[sealed]
impl TypeInfo for Config {
    fn typeinfo() -> Type {
        Type::Config
    }
}

impl ToJson for Config {}
