use crate::error::{CoreError, Result};
use jinspect_bytecode::classfile::DEFAULT_MAX_MAJOR_VERSION;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Settings of one analysis session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Highest class-file major version accepted by the bytecode reader.
    pub max_major_version: u16,
    /// Worker threads; 0 lets rayon decide.
    pub threads: usize,
    /// Decode bytecode method bodies while resolving instead of on request.
    pub decode_bytecode_bodies: bool,
    /// Packages imported on demand into every compilation unit.
    pub implicit_imports: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_major_version: DEFAULT_MAX_MAJOR_VERSION,
            threads: 0,
            decode_bytecode_bodies: false,
            implicit_imports: vec!["java.lang".to_string()],
        }
    }
}

impl SessionConfig {
    /// Reads `path` as JSON when given, then applies `JINSPECT_*` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)?;
                serde_json::from_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        debug!(?config, "session configuration loaded");
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = var("JINSPECT_MAX_CLASS_VERSION") {
            self.max_major_version = v
                .trim()
                .parse()
                .map_err(|_| CoreError::Config(format!("JINSPECT_MAX_CLASS_VERSION={v}")))?;
        }
        if let Some(v) = var("JINSPECT_THREADS") {
            self.threads = v
                .trim()
                .parse()
                .map_err(|_| CoreError::Config(format!("JINSPECT_THREADS={v}")))?;
        }
        if let Some(v) = var("JINSPECT_DECODE_BODIES") {
            self.decode_bytecode_bodies = matches!(v.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jinspect.json");
        std::fs::write(&path, r#"{ "threads": 3 }"#).unwrap();
        let mut config: SessionConfig =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        config.apply_env(|_| None).unwrap();
        assert_eq!(config.threads, 3);
        assert_eq!(config.max_major_version, DEFAULT_MAX_MAJOR_VERSION);
        assert_eq!(config.implicit_imports, vec!["java.lang".to_string()]);
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("JINSPECT_MAX_CLASS_VERSION", "65"),
            ("JINSPECT_DECODE_BODIES", "true"),
        ]
        .into();
        let mut config = SessionConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.max_major_version, 65);
        assert!(config.decode_bytecode_bodies);
    }

    #[test]
    fn malformed_override_is_rejected() {
        let mut config = SessionConfig::default();
        let err = config
            .apply_env(|k| (k == "JINSPECT_THREADS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
