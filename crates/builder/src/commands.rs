//! Command lines for every pipeline step
//!
//! [`CommandBuilder`] is a pure function of [`BuilderOptions`]: it never
//! touches the filesystem and never fails. Steps hand work to each other
//! through the output directory:
//!
//! | step | reads | writes |
//! |------|-------|--------|
//! | build | package sources | `<out>/.build/Build/Products/<folder>` |
//! | create folders | | `<out>/<platform>` |
//! | framework names | `<out>/.build/Build/Products/<folder>/*.o` | |
//! | create framework | products, intermediates | `<out>/<platform>/<Name>.framework` |
//! | copy resources | `<products>/*_<Name>.bundle` | `<out>/<platform>/<Name>.framework` |
//! | xcframework | every `<out>/<platform>/<Name>.framework` | `<out>/<Name>.xcframework` |
//! | cleanup | | removes `<out>/.build` and `<out>/<platform>` |

use crate::platform::{Platform, DEFAULT_PLATFORM};
use spm_xcf_core::process::{CommandLine, Invocation};
use std::path::{Path, PathBuf};

/// xcodebuild configuration used unless overridden
pub const DEFAULT_CONFIGURATION: &str = "Release";

/// Suffix of the per-module object files xcodebuild leaves in the products
/// folder of a Swift package build
pub const OBJECT_SUFFIX: &str = ".o";

/// Build settings added when library evolution is enabled: a stable
/// `.swiftinterface` per module and the generated compatibility header
pub const LIBRARY_EVOLUTION_SETTINGS: [&str; 3] = [
    "BUILD_LIBRARY_FOR_DISTRIBUTION=YES",
    "SWIFT_EMIT_MODULE_INTERFACE=YES",
    "SWIFT_INSTALL_OBJC_HEADER=YES",
];

const XCODEBUILD: &str = "xcodebuild";
const DERIVED_DATA_DIR: &str = ".build";

/// Inputs of a build, as given by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderOptions {
    /// Swift package (and scheme) name
    pub package_name: String,
    /// Output directory; defaults to `<cwd>/<package_name>-XCFrameworks`
    pub output: Option<PathBuf>,
    /// Package root; defaults to the current directory
    pub path: Option<PathBuf>,
    /// Build with library evolution and module interfaces
    pub enable_library_evolution: bool,
    /// Whether the toolchain still supports bitcode
    pub bitcode: bool,
    /// xcodebuild `-configuration`
    pub configuration: String,
    /// Requested platforms in request order; empty means [`DEFAULT_PLATFORM`]
    pub platforms: Vec<Platform>,
}

impl BuilderOptions {
    /// Options for `package_name` with every other setting at its default
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            output: None,
            path: None,
            enable_library_evolution: false,
            bitcode: false,
            configuration: DEFAULT_CONFIGURATION.to_string(),
            platforms: Vec::new(),
        }
    }

    #[must_use]
    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn library_evolution(mut self, enabled: bool) -> Self {
        self.enable_library_evolution = enabled;
        self
    }

    #[must_use]
    pub fn bitcode(mut self, enabled: bool) -> Self {
        self.bitcode = enabled;
        self
    }

    #[must_use]
    pub fn configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = configuration.into();
        self
    }

    #[must_use]
    pub fn platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> Self {
        self.platforms = platforms.into_iter().collect();
        self
    }
}

/// Renders the command line of every pipeline step
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    scheme: String,
    source_dir: PathBuf,
    output_dir: PathBuf,
    enable_library_evolution: bool,
    bitcode: bool,
    configuration: String,
    platforms: Vec<Platform>,
}

impl CommandBuilder {
    /// Resolve `options` against `cwd`
    ///
    /// Relative paths are joined onto `cwd` because every xcodebuild call
    /// runs from the package root, not from where the tool was started.
    pub fn new(options: BuilderOptions, cwd: &Path) -> Self {
        let source_dir = options
            .path
            .map_or_else(|| cwd.to_path_buf(), |p| cwd.join(p));
        let output_dir = options.output.map_or_else(
            || cwd.join(format!("{}-XCFrameworks", options.package_name)),
            |p| cwd.join(p),
        );

        let platforms = if options.platforms.is_empty() {
            tracing::warn!(
                "No platforms requested, building for '{}' only",
                DEFAULT_PLATFORM
            );
            vec![DEFAULT_PLATFORM]
        } else {
            options.platforms
        };

        Self {
            scheme: options.package_name,
            source_dir,
            output_dir,
            enable_library_evolution: options.enable_library_evolution,
            bitcode: options.bitcode,
            configuration: options.configuration,
            platforms,
        }
    }

    /// Package/scheme name
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Package root every build runs from
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Directory receiving the `.xcframework` bundles
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Platforms to build, never empty
    #[must_use]
    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    /// Platform used for framework-name discovery and resource copying
    #[must_use]
    pub fn reference_platform(&self) -> Platform {
        self.platforms.first().copied().unwrap_or(DEFAULT_PLATFORM)
    }

    /// `-derivedDataPath` shared by every build
    #[must_use]
    pub fn derived_data_dir(&self) -> PathBuf {
        self.output_dir.join(DERIVED_DATA_DIR)
    }

    /// Folder name xcodebuild uses for `platform`'s products
    #[must_use]
    pub fn build_folder(&self, platform: Platform) -> String {
        let descriptor = platform.descriptor();
        if self.configuration == DEFAULT_CONFIGURATION {
            descriptor.build_folder.to_string()
        } else {
            format!("{}-{}", self.configuration, descriptor.sdk)
        }
    }

    /// Where the build of `platform` leaves its products
    #[must_use]
    pub fn products_dir(&self, platform: Platform) -> PathBuf {
        self.derived_data_dir()
            .join("Build")
            .join("Products")
            .join(self.build_folder(platform))
    }

    /// Scratch folder holding `platform`'s assembled frameworks
    #[must_use]
    pub fn platform_dir(&self, platform: Platform) -> PathBuf {
        self.output_dir.join(platform.name())
    }

    /// Assembled framework of module `name` for `platform`
    #[must_use]
    pub fn framework_path(&self, name: &str, platform: Platform) -> PathBuf {
        self.platform_dir(platform).join(format!("{name}.framework"))
    }

    /// Final artifact for module `name`
    #[must_use]
    pub fn xcframework_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.xcframework"))
    }

    /// Clean the scheme's build artifacts
    #[must_use]
    pub fn clean_command(&self) -> CommandLine {
        CommandLine::single(Invocation::new(XCODEBUILD).args(["clean", "-scheme", &self.scheme]))
            .in_dir(&self.source_dir)
    }

    /// The xcodebuild build of one platform
    #[must_use]
    pub fn build_command(&self, platform: Platform) -> CommandLine {
        let descriptor = platform.descriptor();
        let mut build = Invocation::new(XCODEBUILD)
            .args(["build", "-scheme", &self.scheme])
            .args(["-destination", descriptor.destination])
            .args(["-sdk", descriptor.sdk])
            .args(["-configuration", &self.configuration])
            .arg("-derivedDataPath")
            .path_arg(self.derived_data_dir())
            .arg(format!("ARCHS={}", descriptor.archs))
            .args(["ONLY_ACTIVE_ARCH=NO", "SKIP_INSTALL=NO"]);

        build = if platform.emits_bitcode(self.bitcode) {
            build.args(["ENABLE_BITCODE=YES", "BITCODE_GENERATION_MODE=bitcode"])
        } else {
            build.arg("ENABLE_BITCODE=NO")
        };

        if self.enable_library_evolution {
            build = build.args(LIBRARY_EVOLUTION_SETTINGS);
        }

        CommandLine::single(build).in_dir(&self.source_dir)
    }

    /// One build per platform, in request order
    #[must_use]
    pub fn build_commands(&self) -> Vec<(Platform, CommandLine)> {
        self.platforms
            .iter()
            .map(|&platform| (platform, self.build_command(platform)))
            .collect()
    }

    /// Create every per-platform scratch folder; safe to repeat
    #[must_use]
    pub fn create_folders_commands(&self) -> Vec<CommandLine> {
        self.platforms
            .iter()
            .map(|&platform| {
                CommandLine::single(
                    Invocation::new("mkdir")
                        .arg("-p")
                        .path_arg(self.platform_dir(platform)),
                )
            })
            .collect()
    }

    /// List the module object files built for `platform`, one path per line
    #[must_use]
    pub fn framework_names_command(&self, platform: Platform) -> CommandLine {
        CommandLine::single(
            Invocation::new("find")
                .path_arg(self.products_dir(platform))
                .args(["-maxdepth", "1", "-name"])
                .arg(format!("*{OBJECT_SUFFIX}")),
        )
    }

    /// Assemble `<Name>.framework` for `platform`: static binary, Swift
    /// module, generated header and module map
    ///
    /// The module map is written only when `<Name>-Swift.h` was found, so a
    /// framework never names a header it does not ship.
    #[must_use]
    pub fn create_framework_command(&self, name: &str, platform: Platform) -> CommandLine {
        let products = self.products_dir(platform);
        let framework = self.framework_path(name, platform);
        let headers = framework.join("Headers");
        let modules = framework.join("Modules");
        let swift_header = headers.join(format!("{name}-Swift.h"));
        let intermediates = self
            .derived_data_dir()
            .join("Build")
            .join("Intermediates.noindex");

        CommandLine::new()
            .then(
                Invocation::new("mkdir")
                    .arg("-p")
                    .path_arg(&headers)
                    .path_arg(&modules),
            )
            .then(
                Invocation::new("libtool")
                    .args(["-static", "-o"])
                    .path_arg(framework.join(name))
                    .path_arg(products.join(format!("{name}{OBJECT_SUFFIX}"))),
            )
            .then(
                Invocation::new("find")
                    .path_arg(&products)
                    .args(["-maxdepth", "1", "-name"])
                    .arg(format!("{name}.swiftmodule"))
                    .args(["-exec", "cp", "-R", "{}"])
                    .path_arg(&modules)
                    .arg(";"),
            )
            .then(
                Invocation::new("find")
                    .path_arg(intermediates)
                    .arg("-path")
                    .arg(format!("*/{}/*", self.build_folder(platform)))
                    .arg("-name")
                    .arg(format!("{name}-Swift.h"))
                    .args(["-exec", "cp", "{}"])
                    .path_arg(&headers)
                    .arg(";"),
            )
            .then(
                Invocation::new("printf")
                    .arg("framework module %s {\\n    header \"%s-Swift.h\"\\n    requires objc\\n}\\n")
                    .args([name, name])
                    .stdout_to(modules.join("module.modulemap"))
                    .only_if_file(swift_header),
            )
    }

    /// Copy `name`'s resource bundles from `platform`'s products into its
    /// assembled framework; no bundles is not an error
    #[must_use]
    pub fn copy_resources_command(&self, name: &str, platform: Platform) -> CommandLine {
        CommandLine::single(
            Invocation::new("find")
                .path_arg(self.products_dir(platform))
                .args(["-maxdepth", "1", "-name"])
                .arg(format!("*_{name}.bundle"))
                .args(["-exec", "cp", "-R", "{}"])
                .path_arg(self.framework_path(name, platform))
                .arg(";"),
        )
    }

    /// Package every platform's `<Name>.framework` into `<Name>.xcframework`,
    /// replacing a previous one
    #[must_use]
    pub fn xcframework_command(&self, name: &str) -> CommandLine {
        let output = self.xcframework_path(name);
        let create = self.platforms.iter().fold(
            Invocation::new(XCODEBUILD).arg("-create-xcframework"),
            |inv, &platform| {
                inv.arg("-framework")
                    .path_arg(self.framework_path(name, platform))
            },
        );

        CommandLine::single(Invocation::new("rm").arg("-rf").path_arg(&output))
            .then(create.arg("-output").path_arg(&output))
    }

    /// Remove derived data and the per-platform scratch folders
    #[must_use]
    pub fn cleanup_command(&self) -> CommandLine {
        let remove = self
            .platforms
            .iter()
            .fold(
                Invocation::new("rm").arg("-rf").path_arg(self.derived_data_dir()),
                |inv, &platform| inv.path_arg(self.platform_dir(platform)),
            );
        CommandLine::single(remove)
    }

    /// Reveal the output directory in Finder
    #[must_use]
    pub fn open_folder_command(&self) -> CommandLine {
        CommandLine::single(Invocation::new("open").path_arg(&self.output_dir))
    }
}
