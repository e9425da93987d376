//! Investor profiles: named rule sets that bias raw deck scores.
//!
//! Profiles are read once from `profiles.yaml` at startup and shared
//! read-only afterwards. The file carries a top-level `profiles` collection,
//! either as a mapping keyed by name or as a list of entries with a `name`.

pub mod adjust;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub use adjust::adjust;

const PROFILES_RELATIVE_PATH: &str = "config/profiles.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("profiles.yaml not found; tried: {}", .0.join(" | "))]
    NotFound(Vec<String>),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{path} was loaded but has no `profiles` collection")]
    MissingProfiles { path: String },

    #[error("invalid profile in {path}: {reason}")]
    InvalidProfile { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub boosts: BTreeMap<String, f64>,
    #[serde(default)]
    pub caps: BTreeMap<String, f64>,
    #[serde(default)]
    pub red_flags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProfilesFile {
    #[serde(default)]
    profiles: Option<ProfileCollection>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileCollection {
    Named(BTreeMap<String, ProfileBody>),
    Listed(Vec<Profile>),
}

#[derive(Debug, Deserialize)]
struct ProfileBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    boosts: BTreeMap<String, f64>,
    #[serde(default)]
    caps: BTreeMap<String, f64>,
    #[serde(default)]
    red_flags: Vec<String>,
}

/// Immutable name → profile lookup built at startup.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileStore {
    /// Loads from `explicit` when given, otherwise from the first candidate
    /// location that exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidates = candidate_paths();
        match candidates.iter().find(|p| p.exists()) {
            Some(path) => Self::load(path),
            None => Err(ConfigError::NotFound(
                candidates.iter().map(|p| p.display().to_string()).collect(),
            )),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        if !path.exists() {
            return Err(ConfigError::NotFound(vec![origin]));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: origin.clone(),
            source,
        })?;
        let store = Self::from_yaml_str(&raw, &origin)?;
        info!("[profiles] Loaded {} investor profile(s) from {origin}", store.len());
        Ok(store)
    }

    pub fn from_yaml_str(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: ProfilesFile = serde_yaml::from_str(raw).map_err(|source| ConfigError::Yaml {
            path: origin.to_string(),
            source,
        })?;

        let collection = file.profiles.ok_or_else(|| ConfigError::MissingProfiles {
            path: origin.to_string(),
        })?;

        let listed = match collection {
            ProfileCollection::Listed(list) => list,
            ProfileCollection::Named(map) => map
                .into_iter()
                .map(|(key, body)| match body.name {
                    Some(name) if name != key => Err(ConfigError::InvalidProfile {
                        path: origin.to_string(),
                        reason: format!("profile key '{key}' does not match its name '{name}'"),
                    }),
                    _ => Ok(Profile {
                        name: key,
                        boosts: body.boosts,
                        caps: body.caps,
                        red_flags: body.red_flags,
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        let mut profiles = BTreeMap::new();
        for profile in listed {
            validate_profile(&profile).map_err(|reason| ConfigError::InvalidProfile {
                path: origin.to_string(),
                reason,
            })?;
            if profiles.contains_key(&profile.name) {
                return Err(ConfigError::InvalidProfile {
                    path: origin.to_string(),
                    reason: format!("duplicate profile name '{}'", profile.name),
                });
            }
            profiles.insert(profile.name.clone(), profile);
        }

        Ok(Self { profiles })
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }
}

fn validate_profile(profile: &Profile) -> Result<(), String> {
    if profile.name.trim().is_empty() {
        return Err("profile name must not be empty".to_string());
    }
    for (category, boost) in &profile.boosts {
        if !boost.is_finite() || *boost <= 0.0 {
            return Err(format!(
                "profile '{}': boost for '{category}' must be a positive number",
                profile.name
            ));
        }
    }
    for (category, cap) in &profile.caps {
        if !cap.is_finite() {
            return Err(format!(
                "profile '{}': cap for '{category}' must be a number",
                profile.name
            ));
        }
    }
    Ok(())
}

/// Working directory first, then next to the binary, then the crate itself
/// (covers `cargo run` from the workspace root).
fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(PROFILES_RELATIVE_PATH));
    }
    if let Some(dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        candidates.push(dir.join(PROFILES_RELATIVE_PATH));
    }
    candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join(PROFILES_RELATIVE_PATH));
    candidates.dedup();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const NAMED: &str = r#"
profiles:
  seed-vc:
    boosts: { team: 1.2, market: 1.1 }
    caps: { financials: 6 }
    red_flags: ["No technical co-founder"]
  growth-pe:
    caps: { team: 8 }
"#;

    #[test]
    fn test_load_named_profiles() {
        let store = ProfileStore::from_yaml_str(NAMED, "inline").unwrap();
        assert_eq!(store.len(), 2);
        let seed = store.get("seed-vc").unwrap();
        assert_eq!(seed.boosts["team"], 1.2);
        assert_eq!(seed.caps["financials"], 6.0);
        assert_eq!(seed.red_flags, vec!["No technical co-founder".to_string()]);
        assert!(store.get("growth-pe").unwrap().boosts.is_empty());
    }

    #[test]
    fn test_load_listed_profiles() {
        let yaml = r#"
profiles:
  - name: angel
    boosts: { team: 1.5 }
  - name: corporate
    red_flags: ["Channel conflict"]
"#;
        let store = ProfileStore::from_yaml_str(yaml, "inline").unwrap();
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["angel", "corporate"]);
    }

    #[test]
    fn test_missing_profiles_key() {
        let err = ProfileStore::from_yaml_str("investors: []", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::MissingProfiles { .. }));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let yaml = "profiles:\n  - name: a\n  - name: a\n";
        let err = ProfileStore::from_yaml_str(yaml, "inline").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProfile { .. }));
    }

    #[test]
    fn test_empty_name_rejected() {
        let yaml = "profiles:\n  - name: \"  \"\n";
        assert!(ProfileStore::from_yaml_str(yaml, "inline").is_err());
    }

    #[test]
    fn test_mismatched_key_and_name_rejected() {
        let yaml = "profiles:\n  seed-vc:\n    name: angel\n";
        assert!(ProfileStore::from_yaml_str(yaml, "inline").is_err());
    }

    #[test]
    fn test_non_positive_boost_rejected() {
        let yaml = "profiles:\n  - name: a\n    boosts: { team: 0 }\n";
        assert!(ProfileStore::from_yaml_str(yaml, "inline").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(NAMED.as_bytes()).unwrap();
        let store = ProfileStore::discover(Some(file.path())).unwrap();
        assert!(store.get("seed-vc").is_some());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProfileStore::load(&dir.path().join("profiles.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_shipped_profiles_parse() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(PROFILES_RELATIVE_PATH);
        let store = ProfileStore::load(&path).unwrap();
        assert!(store.get("seed-vc").is_some());
    }
}
