//! Renderer lookup: explicit path, then vendored bundle, then `PATH`.

use std::path::PathBuf;

use which::which;

use crate::vendor;

/// Name of the Graphviz renderer looked up on `PATH`.
pub const DEFAULT_RENDERER: &str = "dot";

/// Resolves the renderer executable for an export.
///
/// An explicit path that does not exist is a miss, not a fallthrough: a
/// caller who pinned a binary should not silently get a different one.
#[derive(Debug, Clone)]
pub struct RendererLocator {
    explicit: Option<PathBuf>,
    vendor_root: Option<PathBuf>,
    binary_name: String,
}

impl RendererLocator {
    pub fn new() -> Self {
        Self {
            explicit: None,
            vendor_root: None,
            binary_name: DEFAULT_RENDERER.to_string(),
        }
    }

    /// Pin the renderer to an explicit executable path.
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Search a vendored Graphviz bundle before `PATH`.
    pub fn with_vendor_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.vendor_root = Some(root.into());
        self
    }

    /// Look up a different binary name on `PATH` (default `dot`).
    pub fn with_binary_name(mut self, name: impl Into<String>) -> Self {
        self.binary_name = name.into();
        self
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    pub fn locate(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit {
            if path.is_file() {
                return Some(path.clone());
            }
            return None;
        }
        if let Some(root) = &self.vendor_root {
            if let Some(found) = vendor::find_vendored_renderer(root) {
                return Some(found);
            }
        }
        which(&self.binary_name).ok()
    }

    /// Diagnostic for a failed lookup, naming what was searched.
    pub fn describe_miss(&self) -> String {
        match &self.explicit {
            Some(path) => format!(
                "renderer '{}' not found or not a file",
                path.display()
            ),
            None => format!(
                "renderer '{}' not found on the executable search path",
                self.binary_name
            ),
        }
    }
}

impl Default for RendererLocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn explicit_existing_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("dot");
        fs::write(&binary, b"elf").unwrap();
        let locator = RendererLocator::new().with_explicit(&binary);
        assert_eq!(locator.locate(), Some(binary));
    }

    #[test]
    fn explicit_missing_file_is_a_miss_not_a_fallthrough() {
        let locator = RendererLocator::new()
            .with_explicit("/no/such/dot")
            .with_binary_name("sh");
        assert!(locator.locate().is_none());
        assert!(locator.describe_miss().contains("/no/such/dot"));
    }

    #[test]
    fn vendored_binary_found_before_path() {
        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        fs::write(bin_dir.join("dot"), b"elf").unwrap();
        let locator = RendererLocator::new().with_vendor_root(dir.path());
        let located = locator.locate().unwrap();
        assert!(located.ends_with("dot"));
        assert!(located.starts_with(dir.path().canonicalize().unwrap()));
    }

    #[test]
    fn unknown_binary_name_misses() {
        let locator =
            RendererLocator::new().with_binary_name("dotsmith-no-such-renderer-on-path");
        assert!(locator.locate().is_none());
        assert!(locator.describe_miss().contains("search path"));
    }
}
