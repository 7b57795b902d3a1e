//! Normalized path value type

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A file path stored with forward slashes
///
/// Paths are compared and hashed by their normalized text, which makes them
/// usable as set and map keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(String);

impl Path {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(path.as_ref().replace('\\', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Final component of the path
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Extension of the final component, without the dot
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(i) => Some(&name[i + 1..]),
        }
    }

    /// Join a relative component onto this path
    pub fn join(&self, other: impl AsRef<str>) -> Self {
        let other = other.as_ref();
        if self.0.is_empty() {
            return Self::new(other);
        }
        let base = self.0.trim_end_matches('/');
        Self::new(format!("{}/{}", base, other.trim_start_matches(['/', '\\'])))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_normalizes_separators() {
        let path = Path::new("assets\\meshes\\crate.mesh");
        assert_eq!(path.as_str(), "assets/meshes/crate.mesh");
        assert_eq!(path.file_name(), "crate.mesh");
        assert_eq!(path.extension(), Some("mesh"));
    }

    #[test]
    fn test_path_join() {
        let base = Path::new("assets/");
        assert_eq!(base.join("/textures/a.png").as_str(), "assets/textures/a.png");
        assert_eq!(Path::default().join("a").as_str(), "a");
    }

    #[test]
    fn test_hidden_file_has_no_extension() {
        assert_eq!(Path::new(".config").extension(), None);
    }
}
