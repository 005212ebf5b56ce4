//! Ruleset loading from TOML files.
//!
//! One TOML file per site, collected from a rules directory. Invalid files
//! are logged and skipped so one broken ruleset never takes down the rest.

use crate::definition::SiteRules;
use crate::error::{Result, RulesetError};
use gleaner_core::SiteId;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Loader for site rulesets from a directory of TOML files.
pub struct RulesetLoader {
    /// Base directory containing ruleset files
    rules_dir: PathBuf,
}

impl RulesetLoader {
    /// Create a loader for the given rules directory.
    ///
    /// # Errors
    /// Returns error if the directory doesn't exist.
    pub fn new(rules_dir: impl Into<PathBuf>) -> Result<Self> {
        let rules_dir = rules_dir.into();

        if !rules_dir.is_dir() {
            return Err(RulesetError::DirectoryNotFound {
                path: rules_dir.display().to_string(),
            });
        }

        Ok(Self { rules_dir })
    }

    /// Load a single ruleset file, validating it.
    pub fn load_file(path: impl AsRef<Path>) -> Result<SiteRules> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| RulesetError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let rules: SiteRules = toml::from_str(&contents).map_err(|source| RulesetError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        rules.validate()?;

        debug!(
            site_id = %rules.site.id,
            name = %rules.site.name,
            path = %path.display(),
            "loaded site ruleset"
        );

        Ok(rules)
    }

    /// Load all rulesets from the rules directory.
    ///
    /// Invalid files are logged as warnings and skipped.
    pub fn load_all(&self) -> Result<Vec<SiteRules>> {
        let mut rulesets = Vec::new();
        Self::walk_and_load(&self.rules_dir, &mut rulesets)?;

        info!(
            count = rulesets.len(),
            dir = %self.rules_dir.display(),
            "loaded site rulesets"
        );

        Ok(rulesets)
    }

    /// Load the ruleset for a specific site.
    ///
    /// Falls back to the built-in default when the site matches it.
    pub fn find(&self, site_id: &SiteId) -> Result<SiteRules> {
        for rules in self.load_all()? {
            if &rules.site.id == site_id {
                return Ok(rules);
            }
        }

        let builtin = SiteRules::builtin();
        if &builtin.site.id == site_id {
            return Ok(builtin);
        }

        Err(RulesetError::UnknownSite {
            site_id: site_id.to_string(),
        })
    }

    /// Recursively walk a directory and load all TOML files.
    fn walk_and_load(dir: &Path, rulesets: &mut Vec<SiteRules>) -> Result<()> {
        let entries = std::fs::read_dir(dir).map_err(|source| RulesetError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| RulesetError::Io {
                path: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();

            if path.is_dir() {
                Self::walk_and_load(&path, rulesets)?;
            } else if path.extension().is_some_and(|ext| ext == "toml") {
                match Self::load_file(&path) {
                    Ok(rules) => rulesets.push(rules),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping invalid ruleset");
                    }
                }
            }
        }

        Ok(())
    }
}
