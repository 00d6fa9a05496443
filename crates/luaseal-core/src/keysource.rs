//! Master key discovery chain

use luaseal_crypto::MasterKey;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;

use crate::config::{expand_tilde, KeyConfig, DEFAULT_MASTER_KEY_ENV};
use crate::error::{LuasealError, LuasealResult};

/// A parsed master key and a description of where it came from.
///
/// `source` never contains key material.
#[derive(Debug)]
pub struct LoadedKey {
    pub key: MasterKey,
    pub source: String,
}

/// Discover and load the master key using the priority chain:
///   1. `override_file` (the `--key-file` flag)
///   2. the environment variable named by `config.master_key_env`
///   3. `config.master_key_file` (from luaseal.toml)
///
/// Key text is hex; surrounding whitespace is ignored.
pub fn load_master_key(config: &KeyConfig, override_file: Option<&Path>) -> LuasealResult<LoadedKey> {
    // 1. Explicit flag
    if let Some(path) = override_file {
        let text = read_key_file(path)?;
        return parse(&text, format!("file:{}", path.display()));
    }

    // 2. Environment variable
    if !config.master_key_env.is_empty() {
        if let Ok(value) = std::env::var(&config.master_key_env) {
            let text = SecretString::from(value);
            if !text.expose_secret().trim().is_empty() {
                return parse(&text, format!("env:{}", config.master_key_env));
            }
        }
    }

    // 3. Config path
    if let Some(path) = &config.master_key_file {
        let expanded = expand_tilde(path);
        let text = read_key_file(&expanded)?;
        return parse(&text, format!("config:{}", expanded.display()));
    }

    Err(LuasealError::Key(format!(
        "no master key found\n\
         Provide one of:\n\
         \t--key-file <path>\n\
         \texport {}=<hex key>\n\
         \t[key] master_key_file = \"<path>\" in luaseal.toml",
        if config.master_key_env.is_empty() {
            DEFAULT_MASTER_KEY_ENV
        } else {
            config.master_key_env.as_str()
        }
    )))
}

fn read_key_file(path: &Path) -> LuasealResult<SecretString> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| LuasealError::Key(format!("reading key file {}: {e}", path.display())))?;
    Ok(SecretString::from(text))
}

fn parse(text: &SecretString, source: String) -> LuasealResult<LoadedKey> {
    let key = MasterKey::from_hex(text.expose_secret())
        .map_err(|e| LuasealError::Key(format!("{source}: {e}")))?;
    tracing::debug!(source = %source, key_len = key.len(), "master key loaded");
    Ok(LoadedKey { key, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const KEY_HEX: &str = "432A462D4A614E645267556A586E3272357538782F413F4428472B4B62506553";

    fn config_with_env(var: &str) -> KeyConfig {
        KeyConfig {
            master_key_file: None,
            master_key_env: var.into(),
        }
    }

    #[test]
    fn test_override_file_wins() {
        let tmp = tempfile::TempDir::new().unwrap();
        let flag_path = tmp.path().join("flag.hex");
        let config_path = tmp.path().join("config.hex");
        std::fs::write(&flag_path, format!("{KEY_HEX}\n")).unwrap();
        std::fs::write(&config_path, "00").unwrap();

        let config = KeyConfig {
            master_key_file: Some(config_path),
            master_key_env: String::new(),
        };
        let loaded = load_master_key(&config, Some(&flag_path)).unwrap();

        assert_eq!(loaded.key.len(), 32);
        assert!(loaded.source.starts_with("file:"));
    }

    #[test]
    fn test_env_var_used() {
        let var = "LUASEAL_TEST_KEY_ENV_USED";
        std::env::set_var(var, KEY_HEX);
        let loaded = load_master_key(&config_with_env(var), None).unwrap();
        std::env::remove_var(var);

        assert_eq!(loaded.key.len(), 32);
        assert_eq!(loaded.source, format!("env:{var}"));
    }

    #[test]
    fn test_blank_env_var_falls_through_to_config_file() {
        let var = "LUASEAL_TEST_KEY_ENV_BLANK";
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("master.hex");
        std::fs::write(&path, KEY_HEX).unwrap();

        std::env::set_var(var, "   ");
        let config = KeyConfig {
            master_key_file: Some(path),
            master_key_env: var.into(),
        };
        let loaded = load_master_key(&config, None).unwrap();
        std::env::remove_var(var);

        assert!(loaded.source.starts_with("config:"));
    }

    #[test]
    fn test_nothing_configured() {
        let err = load_master_key(&config_with_env("LUASEAL_TEST_KEY_ENV_UNSET"), None).unwrap_err();
        assert!(matches!(err, LuasealError::Key(_)));
        assert!(err.to_string().contains("LUASEAL_TEST_KEY_ENV_UNSET"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let config = config_with_env("");
        let err = load_master_key(&config, Some(&PathBuf::from("/nonexistent/master.hex"))).unwrap_err();
        assert!(matches!(err, LuasealError::Key(_)));
    }

    #[test]
    fn test_invalid_hex_does_not_echo_key_text() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bad.hex");
        std::fs::write(&path, "zz-secret-zz").unwrap();

        let err = load_master_key(&config_with_env(""), Some(&path)).unwrap_err();
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_invalid_hex_is_key_error_naming_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bad.hex");
        std::fs::write(&path, "not hex").unwrap();

        match load_master_key(&config_with_env(""), Some(&path)).unwrap_err() {
            LuasealError::Key(msg) => assert!(msg.starts_with(&format!("file:{}", path.display()))),
            other => panic!("expected key error, got {other:?}"),
        }
    }

    #[test]
    fn test_debug_of_loaded_key_is_redacted() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("master.hex");
        std::fs::write(&path, KEY_HEX).unwrap();

        let loaded = load_master_key(&config_with_env(""), Some(&path)).unwrap();
        let rendered = format!("{loaded:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.to_lowercase().contains("432a46"));
    }
}
