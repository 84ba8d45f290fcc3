use crate::domain::config::{ConfigFile, DeviceConfig, FilterCtlConfig, GlobalConfig};
use crate::domain::error::{FilterCtlError, FilterCtlResult};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = ".filterctl";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> FilterCtlResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Manager reading from explicit locations instead of the user's home
    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Load configuration: defaults, then the global file, then the
    /// project file. Each file only overrides the sections it contains.
    pub fn load_config(&self) -> FilterCtlResult<FilterCtlConfig> {
        let mut config = FilterCtlConfig::default();

        if self.global_config_path.exists() {
            config.merge(self.load_file(&self.global_config_path)?);
        }

        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                config.merge(self.load_file(project_path)?);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a single file on top of the defaults
    pub fn load_config_from_path(&self, path: &Path) -> FilterCtlResult<FilterCtlConfig> {
        let mut config = FilterCtlConfig::default();
        config.merge(self.load_file(path)?);
        config.validate()?;
        Ok(config)
    }

    fn load_file(&self, path: &Path) -> FilterCtlResult<ConfigFile> {
        let content = fs::read_to_string(path).map_err(|e| FilterCtlError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| FilterCtlError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path, creating parent directories
    pub fn save_config_to_path(&self, path: &Path, config: &FilterCtlConfig) -> FilterCtlResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FilterCtlError::Config {
                message: format!("Failed to create config directory {}: {}", parent.display(), e),
            })?;
        }

        let content = toml::to_string_pretty(&ConfigFile::from(config.clone())).map_err(|e| {
            FilterCtlError::Config {
                message: format!("Failed to serialize config: {}", e),
            }
        })?;

        fs::write(path, content).map_err(|e| FilterCtlError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create default project configuration under `path/.filterctl`
    pub fn init_project_config(&self, path: &Path) -> FilterCtlResult<PathBuf> {
        let config_file = path.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);

        if config_file.exists() {
            return Err(FilterCtlError::Config {
                message: format!("Project configuration already exists at {}", config_file.display()),
            });
        }

        let default_config = FilterCtlConfig {
            global: GlobalConfig::default(),
            device: DeviceConfig {
                port: Some(default_port_name().to_string()),
                ..DeviceConfig::default()
            },
        };

        self.save_config_to_path(&config_file, &default_config)?;
        Ok(config_file)
    }

    /// Get global configuration path
    fn get_global_config_path() -> FilterCtlResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| FilterCtlError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("filterctl").join(CONFIG_FILE_NAME))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Get the current project config path (if any)
    pub fn get_project_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path.as_ref()
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}

fn default_port_name() -> &'static str {
    if cfg!(windows) {
        "COM3"
    } else if cfg!(target_os = "macos") {
        "/dev/tty.usbserial"
    } else {
        "/dev/ttyUSB0"
    }
}
