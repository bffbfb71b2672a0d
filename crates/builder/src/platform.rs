//! Target platforms
//!
//! The closed set of platforms a package can be built for, each with the
//! xcodebuild parameters that select it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Platform used when none is requested
pub const DEFAULT_PLATFORM: Platform = Platform::Ios;

/// A platform name that is not one of [`Platform::ALL`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown platform '{0}' (expected one of: ios, simulator, watchos, watchsimulator)")]
pub struct UnknownPlatform(pub String);

/// xcodebuild parameters for one platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformDescriptor {
    /// Identifier used on the command line and as the scratch folder name
    pub name: &'static str,
    /// Value of xcodebuild's `-destination`
    pub destination: &'static str,
    /// Value of xcodebuild's `-sdk`
    pub sdk: &'static str,
    /// Space separated `ARCHS`
    pub archs: &'static str,
    /// Whether the platform can carry bitcode at all
    pub bitcode_capable: bool,
    /// Folder under `Build/Products` holding this platform's release products
    pub build_folder: &'static str,
}

const IOS: PlatformDescriptor = PlatformDescriptor {
    name: "ios",
    destination: "generic/platform=iOS",
    sdk: "iphoneos",
    archs: "arm64",
    bitcode_capable: true,
    build_folder: "Release-iphoneos",
};

const SIMULATOR: PlatformDescriptor = PlatformDescriptor {
    name: "simulator",
    destination: "generic/platform=iOS Simulator",
    sdk: "iphonesimulator",
    archs: "x86_64 arm64",
    bitcode_capable: false,
    build_folder: "Release-iphonesimulator",
};

const WATCHOS: PlatformDescriptor = PlatformDescriptor {
    name: "watchos",
    destination: "generic/platform=watchOS",
    sdk: "watchos",
    archs: "arm64_32",
    bitcode_capable: true,
    build_folder: "Release-watchos",
};

const WATCH_SIMULATOR: PlatformDescriptor = PlatformDescriptor {
    name: "watchsimulator",
    destination: "generic/platform=watchOS Simulator",
    sdk: "watchsimulator",
    archs: "x86_64 arm64",
    bitcode_capable: false,
    build_folder: "Release-watchsimulator",
};

/// A target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// iOS devices
    Ios,
    /// iOS Simulator
    Simulator,
    /// watchOS devices
    #[serde(rename = "watchos")]
    WatchOs,
    /// watchOS Simulator
    #[serde(rename = "watchsimulator")]
    WatchSimulator,
}

impl Platform {
    /// Every platform, in declaration order
    pub const ALL: [Platform; 4] = [
        Platform::Ios,
        Platform::Simulator,
        Platform::WatchOs,
        Platform::WatchSimulator,
    ];

    /// The build parameters for this platform
    #[must_use]
    pub const fn descriptor(self) -> &'static PlatformDescriptor {
        match self {
            Platform::Ios => &IOS,
            Platform::Simulator => &SIMULATOR,
            Platform::WatchOs => &WATCHOS,
            Platform::WatchSimulator => &WATCH_SIMULATOR,
        }
    }

    /// Command-line name
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Look a platform up by its command-line name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Whether this platform's build emits bitcode, given whether the
    /// toolchain in use still supports it
    #[must_use]
    pub const fn emits_bitcode(self, toolchain_supports_bitcode: bool) -> bool {
        self.descriptor().bitcode_capable && toolchain_supports_bitcode
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownPlatform(s.to_string()))
    }
}

/// Parse a whitespace separated platform list
///
/// Unknown names are dropped (and logged); repeated names keep their first
/// position only.
#[must_use]
pub fn parse_platform_list(list: &str) -> Vec<Platform> {
    from_names(list.split_whitespace())
}

/// Resolve platform names, dropping unknown and repeated ones
pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<Platform> {
    let mut platforms = Vec::new();
    for name in names {
        match name.parse::<Platform>() {
            Ok(platform) if !platforms.contains(&platform) => platforms.push(platform),
            Ok(_) => {}
            Err(e) => tracing::warn!("Ignoring {e}"),
        }
    }
    platforms
}
