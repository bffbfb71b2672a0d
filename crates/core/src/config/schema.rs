//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ConfigSchema {
    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// How command lines are executed and how xcodebuild is driven
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildConfig {
    /// Shell that runs every command line (`<shell> -c <line>`)
    #[serde(default = "default_shell")]
    pub shell: String,

    /// xcodebuild `-configuration`
    #[serde(default = "default_configuration")]
    pub configuration: String,

    /// Whether the installed toolchain still emits bitcode.
    /// Swift 5.7 and later dropped it, so this is off unless set.
    #[serde(default)]
    pub bitcode: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            configuration: default_configuration(),
            bitcode: false,
        }
    }
}

fn default_shell() -> String {
    crate::process::DEFAULT_SHELL.to_string()
}

fn default_configuration() -> String {
    "Release".to_string()
}

/// Defaults applied when the matching CLI flag is absent
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DefaultsConfig {
    /// Platform names used when `--platforms` is not given
    #[serde(default)]
    pub platforms: Vec<String>,

    /// Build with library evolution enabled
    #[serde(default)]
    pub enable_library_evolution: bool,

    /// Reveal the output folder when done
    #[serde(default)]
    pub show_output: bool,
}
