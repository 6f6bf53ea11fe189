//! Configuration loading and management

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Default language for the classifier
const DEFAULT_LANGUAGE_CODE: &str = "en-US";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Realtime database; in-memory store when absent
    pub database: Option<DatabaseConfig>,

    /// Intent classifier; voice commands fail when absent
    pub classifier: Option<ClassifierConfig>,
}

/// Realtime database connection
#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth: Option<String>,
}

/// Dialogflow agent credentials
#[derive(Clone)]
pub struct ClassifierConfig {
    pub project_id: String,
    pub access_token: String,
    pub language_code: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url)
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl std::fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("project_id", &self.project_id)
            .field("access_token", &"<redacted>")
            .field("language_code", &self.language_code)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let home = var("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("home-dashboard");

        let socket_path = var("DASHBOARD_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let database = var("DASHBOARD_DATABASE_URL").map(|url| DatabaseConfig {
            url,
            auth: var("DASHBOARD_DATABASE_AUTH"),
        });

        let classifier = match (var("DIALOGFLOW_PROJECT_ID"), var("DIALOGFLOW_ACCESS_TOKEN")) {
            (Some(project_id), Some(access_token)) => Some(ClassifierConfig {
                project_id,
                access_token,
                language_code: var("DIALOGFLOW_LANGUAGE_CODE")
                    .unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_string()),
            }),
            (Some(_), None) => anyhow::bail!("DIALOGFLOW_PROJECT_ID is set but DIALOGFLOW_ACCESS_TOKEN is not"),
            _ => None,
        };

        Ok(Self {
            socket_path,
            data_dir,
            database,
            classifier,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_local_defaults() {
        let config = load(&[("HOME", "/home/pat")]).unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/home/pat/.local/share/home-dashboard/daemon.sock")
        );
        assert!(config.database.is_none());
        assert!(config.classifier.is_none());
    }

    #[test]
    fn test_full_environment() {
        let config = load(&[
            ("HOME", "/home/pat"),
            ("DASHBOARD_SOCKET", "/tmp/dash.sock"),
            ("DASHBOARD_DATABASE_URL", "https://home-1234.firebaseio.com"),
            ("DASHBOARD_DATABASE_AUTH", "db-secret"),
            ("DIALOGFLOW_PROJECT_ID", "home-agent"),
            ("DIALOGFLOW_ACCESS_TOKEN", "ya29.token"),
        ])
        .unwrap();

        assert_eq!(config.socket_path, PathBuf::from("/tmp/dash.sock"));
        let database = config.database.as_ref().unwrap();
        assert_eq!(database.auth.as_deref(), Some("db-secret"));
        let classifier = config.classifier.as_ref().unwrap();
        assert_eq!(classifier.language_code, "en-US");

        let debug = format!("{config:?}");
        assert!(!debug.contains("db-secret"));
        assert!(!debug.contains("ya29.token"));
    }

    #[test]
    fn test_project_without_token_is_an_error() {
        let result = load(&[("HOME", "/home/pat"), ("DIALOGFLOW_PROJECT_ID", "home-agent")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_home_is_an_error() {
        assert!(load(&[]).is_err());
    }
}
