//! Namespace path parsing

use std::fmt;

use featfs_utils::{FeatfsError, Result};

/// Normalized absolute path inside the namespace
///
/// Empty components and `.` are dropped, `..` walks up (stopping at the
/// root). Relative input is taken from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NsPath {
    components: Vec<String>,
}

impl NsPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(path: &str) -> Result<Self> {
        if path.contains('\0') {
            return Err(FeatfsError::invalid_input("path contains a NUL byte"));
        }
        let mut components: Vec<String> = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    components.pop();
                }
                name => components.push(name.to_string()),
            }
        }
        Ok(Self { components })
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Last component, `None` for the root
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// Split into parent path and last component
    pub fn split_last(&self) -> Option<(NsPath, &str)> {
        let (last, parent) = self.components.split_last()?;
        Some((
            NsPath {
                components: parent.to_vec(),
            },
            last.as_str(),
        ))
    }

    pub fn join(&self, name: &str) -> NsPath {
        let mut components = self.components.clone();
        components.push(name.to_string());
        NsPath { components }
    }
}

impl fmt::Display for NsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}
