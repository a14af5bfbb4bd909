//! Attribute paths as the host addresses them (`spec.taints[0].effect`)

use std::fmt;

/// One step of an attribute path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Named attribute
    Attribute(String),
    /// Position in a list
    Index(usize),
    /// Key in a map
    Key(String),
}

/// Path to an attribute, in schema (snake_case) names
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributePath {
    steps: Vec<PathStep>,
}

impl AttributePath {
    /// Empty path (the root of the configuration)
    pub fn root() -> Self {
        Self::default()
    }

    /// Path starting at a top-level attribute
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::root().with_attribute(name)
    }

    /// Parse a dotted path such as `metadata.name`
    ///
    /// Only attribute steps are recognised; this is meant for static paths in code and tests.
    pub fn parse(dotted: &str) -> Self {
        Self {
            steps: dotted
                .split('.')
                .filter(|s| !s.is_empty())
                .map(|s| PathStep::Attribute(s.to_string()))
                .collect(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.steps.push(PathStep::Attribute(name.into()));
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.steps.push(PathStep::Index(index));
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.steps.push(PathStep::Key(key.into()));
        self
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("(root)");
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Attribute(name) if i == 0 => write!(f, "{}", name)?,
                PathStep::Attribute(name) => write!(f, ".{}", name)?,
                PathStep::Index(idx) => write!(f, "[{}]", idx)?,
                PathStep::Key(key) => write!(f, "[\"{}\"]", key)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mixed_steps() {
        let path = AttributePath::attribute("spec")
            .with_attribute("taints")
            .with_index(0)
            .with_attribute("effect");
        assert_eq!(path.to_string(), "spec.taints[0].effect");

        let labels = AttributePath::parse("metadata.labels").with_key("app");
        assert_eq!(labels.to_string(), "metadata.labels[\"app\"]");
    }

    #[test]
    fn test_root_display() {
        assert_eq!(AttributePath::root().to_string(), "(root)");
        assert!(AttributePath::parse("").is_root());
    }
}
