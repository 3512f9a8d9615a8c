//! View configuration.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use fromenv::FromEnv;
use prism_orm::{Dialect, config_error};

/// Options loaded from the environment.
#[derive(Debug, Clone, FromEnv)]
pub struct ViewOptions {
    /// Dialect name, see [`Dialect`].
    #[env(from = "PRISM_DIALECT", default = "postgres")]
    pub dialect: String,
    /// Fallback batch size for SELECT fetched attributes.
    #[env(from = "PRISM_DEFAULT_BATCH_SIZE", default = "1")]
    pub default_batch_size: String,
}

/// Configuration shared by every view query of a [`crate::ViewManager`].
#[derive(Debug, Clone)]
pub struct ViewConfig {
    dialect: Dialect,
    default_batch_size: usize,
    batch_sizes: HashMap<String, usize>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self { dialect: Dialect::default(), default_batch_size: 1, batch_sizes: HashMap::new() }
    }
}

impl ViewConfig {
    /// Loads the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be loaded or are invalid.
    pub fn from_env() -> Result<Self> {
        let options = ViewOptions::from_env().finalize().context("issue loading view options")?;
        Self::try_from(options)
    }

    /// Configuration for `dialect` with default batching.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect, ..Self::default() }
    }

    /// Sets the batch size used when neither the attribute nor its view
    /// declares one.
    #[must_use]
    pub const fn with_default_batch_size(mut self, batch_size: usize) -> Self {
        self.default_batch_size = batch_size;
        self
    }

    /// Overrides the batch size of one attribute, addressed by its path from
    /// the queried view, e.g. `comments.author`.
    #[must_use]
    pub fn with_batch_size(mut self, path: impl Into<String>, batch_size: usize) -> Self {
        self.batch_sizes.insert(path.into(), batch_size);
        self
    }

    /// The configured dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The fallback batch size.
    #[must_use]
    pub const fn default_batch_size(&self) -> usize {
        self.default_batch_size
    }

    /// The override for the attribute at `path`, if any.
    #[must_use]
    pub fn batch_size(&self, path: &str) -> Option<usize> {
        self.batch_sizes.get(path).copied()
    }
}

impl TryFrom<ViewOptions> for ViewConfig {
    type Error = anyhow::Error;

    fn try_from(options: ViewOptions) -> Result<Self> {
        let dialect = options.dialect.parse::<Dialect>()?;
        let default_batch_size = options
            .default_batch_size
            .parse::<usize>()
            .with_context(|| format!("invalid default batch size {}", options.default_batch_size))?;
        if default_batch_size == 0 {
            bail!(config_error!("the default batch size must be at least 1"));
        }
        Ok(Self { dialect, default_batch_size, batch_sizes: HashMap::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_parsed() {
        let options =
            ViewOptions { dialect: "sqlite".to_string(), default_batch_size: "16".to_string() };
        let config = ViewConfig::try_from(options).expect("valid options");
        assert_eq!(config.dialect(), Dialect::Sqlite);
        assert_eq!(config.default_batch_size(), 16);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let options =
            ViewOptions { dialect: "postgres".to_string(), default_batch_size: "0".to_string() };
        ViewConfig::try_from(options).expect_err("zero batch size");
    }

    #[test]
    fn overrides_are_addressed_by_path() {
        let config = ViewConfig::default().with_batch_size("comments.author", 8);
        assert_eq!(config.batch_size("comments.author"), Some(8));
        assert_eq!(config.batch_size("comments"), None);
    }
}
