//! Plugin module formats.
//!
//! - [`Platform`] - per-platform rules for which files are VST 3 module candidates
//! - [`moduleinfo`] - class listing read from a bundle's `moduleinfo.json`

pub mod moduleinfo;

use clap::ValueEnum;

use crate::harvest::traits::ModuleFilter;

/// Platform whose VST 3 file naming rules select discovery candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Platform {
    /// `*.vst3` files, plus extension-less names containing `.vst3`
    Windows,

    /// `*.vst3` and `*.bundle` files
    #[value(name = "macos")]
    MacOs,

    /// `*.vst3` and `*.so` files
    Linux,
}

impl Platform {
    /// Platform the binary was compiled for. Anything that is neither
    /// Windows nor macOS uses the Linux rules.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }
}

impl ModuleFilter for Platform {
    fn matches(&self, extension: &str, file_name: &str) -> bool {
        match self {
            Platform::Windows => {
                // A trailing dot is an empty extension, not a missing one.
                extension == "vst3"
                    || (extension.is_empty()
                        && !file_name.ends_with('.')
                        && file_name.contains(".vst3"))
            }
            Platform::MacOs => extension == "vst3" || extension == "bundle",
            Platform::Linux => extension == "vst3" || extension == "so",
        }
    }
}
