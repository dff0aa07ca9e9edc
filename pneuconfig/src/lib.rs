//! # pneuconfig - Configuration de PneuShop
//!
//! Singleton de configuration YAML partagé par le serveur, le panneau TV et
//! la CLI :
//! - valeurs par défaut intégrées (`pneu.yaml`) fusionnées avec
//!   `<répertoire>/config.yaml`, puis réécrites sur disque
//! - surcharges par variables d'environnement `PNEU_CONFIG__SECTION__CLE=valeur`
//! - clés normalisées en minuscules
//! - répertoires gérés (base SQLite, fichiers médias) créés à la demande
//!
//! ```no_run
//! use pneuconfig::get_config;
//!
//! let config = get_config();
//! let port = config.get_http_port();
//! let queue_dir = config.get_managed_dir(&["queue", "directory"], "queue")?;
//! config.set_http_port(9000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Les crates métier (`pneuqueue`, `pneumedia`, `pneudisplay`) n'ajoutent pas
//! de getters ici : elles définissent leurs propres traits d'extension sur
//! [`Config`] et s'appuient sur les accesseurs génériques (`get_u64_or`,
//! `get_string_or`, `get_string_list`, `get_string_map`).

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use pneuutils::guess_local_ip;
use serde_yaml::{Mapping, Number, Value};
use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{info, warn};

#[cfg(feature = "api")]
pub mod api;
#[cfg(feature = "api")]
pub mod openapi;

#[cfg(feature = "api")]
pub use openapi::ApiDoc;

const DEFAULT_CONFIG: &str = include_str!("pneu.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load PneuShop configuration"));
}

const ENV_CONFIG_DIR: &str = "PNEU_CONFIG";
const ENV_PREFIX: &str = "PNEU_CONFIG__";
const CONFIG_DIR_NAME: &str = ".pneushop";
const CONFIG_FILE_NAME: &str = "config.yaml";

const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Getter/setter d'un entier `usize` avec valeur par défaut
macro_rules! usize_setting {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            Ok(match self.get_value($path)? {
                Value::Number(n) => n.as_u64().map(|n| n as usize).unwrap_or($default),
                _ => $default,
            })
        }

        pub fn $setter(&self, size: usize) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(size)))
        }
    };
}

/// Getter/setter d'un booléen avec valeur par défaut
macro_rules! bool_setting {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            Ok(match self.get_value($path)? {
                Value::Bool(b) => b,
                _ => $default,
            })
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Configuration chargée, protégée par un mutex et réécrite à chaque modification
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.data.lock().unwrap().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Premier candidat retenu : argument, `PNEU_CONFIG`, `./.pneushop`,
    /// `~/.pneushop`, sinon `.pneushop` (créé)
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(from_env) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %from_env, "Config directory from environment");
            return from_env;
        }

        let local = Path::new(CONFIG_DIR_NAME);
        if local.is_dir() {
            return CONFIG_DIR_NAME.to_string();
        }

        home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME))
            .filter(|dir| dir.is_dir())
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_else(|| CONFIG_DIR_NAME.to_string())
    }

    /// Crée le répertoire au besoin et vérifie qu'il est accessible en écriture
    fn ensure_writable_dir(path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let probe = path.join(".write_test");
        fs::write(&probe, b"pneushop")?;
        fs::remove_file(&probe)?;
        Ok(())
    }

    /// Répertoire de configuration retenu, créé et vérifié
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir = Self::find_config_dir(directory);
        Self::ensure_writable_dir(Path::new(&dir))?;
        Ok(dir)
    }

    /// Charge la configuration du répertoire (voir [`Config::config_dir`])
    ///
    /// Défauts intégrés, puis `config.yaml` s'il existe, puis variables
    /// d'environnement ; le résultat est réécrit dans `config.yaml`.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir = %config_dir, "Using config directory");

        let path = Path::new(&config_dir)
            .join(CONFIG_FILE_NAME)
            .to_string_lossy()
            .into_owned();

        let mut merged = lower_keys(serde_yaml::from_str(DEFAULT_CONFIG)?);
        match fs::read(&path) {
            Ok(bytes) => {
                info!(config_file = %path, "Loaded config file");
                let external: Value = serde_yaml::from_slice(&bytes)?;
                merge_yaml(&mut merged, &lower_keys(external));
            }
            Err(_) => info!(config_file = %path, "No config file, using embedded defaults"),
        }

        Self::apply_env_overrides(&mut merged);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(merged),
        };
        config.save()?;
        Ok(config)
    }

    /// Réécrit `config.yaml`
    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().unwrap();
        let yaml = serde_yaml::to_string(&*data)?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Répertoire de configuration effectivement utilisé
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    /// Modifie la valeur à `path` (ex: `&["host", "http_port"]`) et sauvegarde
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        Self::set_value_internal(&mut data, path, value)?;
        drop(data);
        self.save()?;
        Ok(())
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key = path[0].to_lowercase();
            let key_value = Value::String(key);
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Valeur à `path`, erreur si le chemin n'existe pas
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();

                if let Some(next) = map.get(&Value::String(key)) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    /// `PNEU_CONFIG__DISPLAY__ROTATION_PERIOD_SECS=8` → `display.rotation_period_secs: 8`
    ///
    /// La valeur est lue comme du YAML (nombre, booléen, liste) et reste une
    /// chaîne sinon.
    fn apply_env_overrides(config: &mut Value) {
        for (key, raw) in env::vars() {
            let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let path: Vec<&str> = stripped.split("__").collect();
            if let Err(e) = Self::set_value_internal(config, &path, env_value(&raw)) {
                warn!(variable = %key, "Ignoring environment override: {}", e);
            }
        }
    }

    /// Résout un chemin relatif au répertoire de configuration
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.config_dir).join(path)
        }
    }

    /// Résout un chemin relatif ou absolu et crée le répertoire si nécessaire
    fn resolve_and_create_dir(&self, dir_path: &str) -> Result<String> {
        let absolute_path = self.resolve_path(dir_path);

        if !absolute_path.exists() {
            fs::create_dir_all(&absolute_path)?;
            info!(directory=%absolute_path.display(), "Created managed directory");
        }

        Ok(absolute_path.to_string_lossy().to_string())
    }

    /// Récupère un répertoire géré par la configuration
    ///
    /// Le répertoire peut être absolu ou relatif au répertoire de
    /// configuration. Il est créé s'il n'existe pas. Si la clé est absente,
    /// `default` est enregistré dans la configuration puis utilisé.
    ///
    /// # Exemple
    ///
    /// ```no_run
    /// use pneuconfig::get_config;
    ///
    /// let config = get_config();
    /// let dir = config.get_managed_dir(&["queue", "directory"], "queue")?;
    /// println!("Queue database directory: {}", dir);
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<String> {
        let dir_path = match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => {
                self.set_managed_dir(path, default.to_string())?;
                default.to_string()
            }
        };
        self.resolve_and_create_dir(&dir_path)
    }

    /// Définit un répertoire géré par la configuration
    pub fn set_managed_dir(&self, path: &[&str], directory: String) -> Result<()> {
        self.set_value(path, Value::String(directory))
    }

    /// Entier non signé à `path`, ou `default` si absent ou mal typé
    pub fn get_u64_or(&self, path: &[&str], default: u64) -> u64 {
        match self.get_value(path) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or(default),
            Ok(Value::String(s)) => s.trim().parse().unwrap_or_else(|_| {
                warn!("Invalid integer '{}' at {}, using {}", s, path.join("."), default);
                default
            }),
            _ => default,
        }
    }

    /// Chaîne à `path`, ou `default` si absente, vide ou mal typée
    pub fn get_string_or(&self, path: &[&str], default: &str) -> String {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            Ok(Value::Number(n)) => n.to_string(),
            _ => default.to_string(),
        }
    }

    /// Liste de chaînes à `path` (vide si absente)
    ///
    /// Une chaîne simple est acceptée et découpée sur les espaces, ce qui
    /// permet d'écrire `PNEU_CONFIG__DISPLAY__ANNOUNCEMENT__AUDIO_COMMAND="mpv --no-video"`.
    pub fn get_string_list(&self, path: &[&str]) -> Vec<String> {
        match self.get_value(path) {
            Ok(Value::Sequence(seq)) => seq
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Ok(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    /// Table clé → chaîne à `path` (vide si absente)
    pub fn get_string_map(&self, path: &[&str]) -> BTreeMap<String, String> {
        match self.get_value(path) {
            Ok(Value::Mapping(map)) => map
                .into_iter()
                .filter_map(|(k, v)| match (k, v) {
                    (Value::String(k), Value::String(v)) => Some((k, v)),
                    _ => None,
                })
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Hôte annoncé par le serveur, IP locale devinée si non configuré
    pub fn get_base_url(&self) -> String {
        match self.get_value(&["host", "base_url"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            Ok(_) => guess_local_ip(),
            Err(err) => {
                warn!("host.base_url unavailable ({}), guessing local IP", err);
                guess_local_ip()
            }
        }
    }

    /// Port HTTP, 8080 si absent ou invalide
    pub fn get_http_port(&self) -> u16 {
        let port = match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Ok(Value::String(s)) => s.trim().parse::<u16>().ok(),
            _ => None,
        };
        port.unwrap_or_else(|| {
            warn!("Invalid or missing host.http_port, using {}", DEFAULT_HTTP_PORT);
            DEFAULT_HTTP_PORT
        })
    }

    pub fn set_http_port(&self, port: u16) -> Result<()> {
        self.set_value(&["host", "http_port"], Value::Number(Number::from(port)))
    }

    usize_setting!(
        get_log_cache_size,
        set_log_cache_size,
        &["host", "logger", "buffer_capacity"],
        DEFAULT_LOG_BUFFER_CAPACITY
    );

    bool_setting!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"])? {
            Value::String(s) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    /// Définit le niveau de log minimum dans la configuration
    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

fn env_value(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Normalise toutes les clés de mapping en minuscules
fn lower_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lower_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys).collect()),
        other => other,
    }
}

/// Configuration globale, chargée au premier accès
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Fusion récursive des mappings ; scalaires et séquences sont remplacés
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_defaults_are_loaded_and_saved() {
        let (dir, config) = temp_config();

        assert_eq!(config.get_http_port(), 8080);
        assert_eq!(config.get_u64_or(&["display", "rotation_period_secs"], 0), 6);
        assert_eq!(
            config.get_u64_or(&["display", "announcement", "cap_secs"], 0),
            30
        );
        assert!(dir.path().join("config.yaml").exists());
    }

    #[test]
    fn test_external_file_is_merged_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "HOST:\n  HTTP_PORT: 9090\ndisplay:\n  rotation_period_secs: 8\n",
        )
        .unwrap();

        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

        assert_eq!(config.get_http_port(), 9090);
        assert_eq!(config.get_u64_or(&["display", "rotation_period_secs"], 0), 8);
        // Les clés non surchargées gardent la valeur embarquée
        assert_eq!(config.get_u64_or(&["display", "queue_poll_secs"], 0), 30);
        assert_eq!(config.get_log_cache_size().unwrap(), 1000);
    }

    #[test]
    fn test_set_value_persists() {
        let (dir, config) = temp_config();
        config.set_http_port(7070).unwrap();

        let reloaded = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(reloaded.get_http_port(), 7070);
    }

    #[test]
    fn test_string_list_accepts_sequence_or_words() {
        let (_dir, config) = temp_config();

        assert_eq!(
            config.get_string_list(&["display", "announcement", "speech_command"]),
            vec!["espeak-ng", "-v", "pt-br"]
        );

        config
            .set_value(
                &["display", "announcement", "audio_command"],
                Value::String("mpv --no-video".into()),
            )
            .unwrap();
        assert_eq!(
            config.get_string_list(&["display", "announcement", "audio_command"]),
            vec!["mpv", "--no-video"]
        );
        assert!(config.get_string_list(&["does", "not", "exist"]).is_empty());
    }

    #[test]
    fn test_managed_dir_is_created_relative_to_config_dir() {
        let (dir, config) = temp_config();

        let queue_dir = config.get_managed_dir(&["queue", "directory"], "queue").unwrap();
        assert_eq!(Path::new(&queue_dir), dir.path().join("queue"));
        assert!(Path::new(&queue_dir).is_dir());
    }

    #[test]
    fn test_env_values_are_parsed_as_yaml() {
        assert_eq!(env_value("42"), Value::Number(Number::from(42)));
        assert_eq!(env_value("true"), Value::Bool(true));
        assert_eq!(env_value("pt-br"), Value::String("pt-br".into()));

        let mut config = lower_keys(serde_yaml::from_str("Display: {Queue_Poll_Secs: 30}").unwrap());
        Config::set_value_internal(&mut config, &["DISPLAY", "QUEUE_POLL_SECS"], env_value("10"))
            .unwrap();
        let expected: Value = serde_yaml::from_str("display: {queue_poll_secs: 10}").unwrap();
        assert_eq!(config, expected);
    }

    #[test]
    fn test_merge_yaml_replaces_sequences() {
        let mut default: Value = serde_yaml::from_str("a: [1, 2]\nb: {c: 1, d: 2}").unwrap();
        let external: Value = serde_yaml::from_str("a: [3]\nb: {d: 5}").unwrap();
        merge_yaml(&mut default, &external);

        let expected: Value = serde_yaml::from_str("a: [3]\nb: {c: 1, d: 5}").unwrap();
        assert_eq!(default, expected);
    }
}
