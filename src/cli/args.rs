//! Command line argument parsing and validation.
//!
//! The tool is designed to "just work": point it at a packaging file and it
//! produces the image. Flags override the matching packaging-file options.

use crate::bundler::GeneratorConfig;
use clap::Parser;
use std::path::PathBuf;

/// Package a staged install tree into a macOS disk image
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_dmg",
    version,
    about = "Package a staged install tree into a macOS disk image",
    long_about = "Stage files listed in a packaging file and build a drag-and-drop DMG with hdiutil.

Usage:
  kodegen_bundler_dmg dmg.toml
  kodegen_bundler_dmg dmg.toml --volume-name MyApp --format lzfse
  kodegen_bundler_dmg dmg.toml --output dist/MyApp-1.0.0.dmg --json
  kodegen_bundler_dmg --list-generators"
)]
pub struct Args {
    /// Packaging file (TOML) describing the image and its contents
    #[arg(index = 1, value_name = "PACKAGING_FILE")]
    pub packaging_file: Option<PathBuf>,

    /// Generator to use (overrides `generator` in the packaging file)
    #[arg(short, long, value_name = "NAME")]
    pub generator: Option<String>,

    /// Volume name shown when the image is mounted
    #[arg(long, value_name = "NAME")]
    pub volume_name: Option<String>,

    /// Output image path
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Compression format: none, zlib, bzip2, lzfse, lzma (or an hdiutil code)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Root inside the image under which files are staged
    #[arg(long, value_name = "PATH")]
    pub install_prefix: Option<PathBuf>,

    /// Explicit path to hdiutil
    #[arg(long, value_name = "PATH", env = "KODEGEN_HDIUTIL")]
    pub hdiutil: Option<PathBuf>,

    /// Kill hdiutil after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not add an Applications symlink to the image root
    #[arg(long)]
    pub no_applications_symlink: bool,

    /// Keep the staging directory after packaging
    #[arg(long)]
    pub keep_staging: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// List registered generators and exit
    #[arg(long)]
    pub list_generators: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.list_generators {
            return Ok(());
        }

        match &self.packaging_file {
            None => Err("Packaging file is required".to_string()),
            Some(path) if path.as_os_str().is_empty() => {
                Err("Packaging file path is empty".to_string())
            }
            Some(_) if self.timeout == Some(0) => {
                Err("--timeout must be greater than zero".to_string())
            }
            Some(_) => Ok(()),
        }
    }

    /// Applies command line overrides on top of packaging-file configuration.
    pub fn apply_overrides(&self, mut config: GeneratorConfig) -> GeneratorConfig {
        if let Some(name) = &self.volume_name {
            config.volume_name = Some(name.clone());
        }
        if let Some(output) = &self.output {
            config.output_path = Some(output.clone());
        }
        if let Some(format) = &self.format {
            config.compression_format = Some(format.clone());
        }
        if let Some(prefix) = &self.install_prefix {
            config.install_prefix = Some(prefix.clone());
        }
        if let Some(hdiutil) = &self.hdiutil {
            config.hdiutil = Some(hdiutil.clone());
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = Some(secs);
        }
        if self.no_applications_symlink {
            config.applications_symlink = Some(false);
        }
        config.keep_staging |= self.keep_staging;
        config
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
    json: bool,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(json: bool) -> Self {
        Self {
            // JSON mode keeps stdout machine-readable
            output: super::OutputManager::new(json),
            json,
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Whether results are printed as JSON
    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.json)
    }
}
