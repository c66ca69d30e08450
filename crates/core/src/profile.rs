//! Bucket profile management
//!
//! Profiles are named references to one bucket of a BucketFS service,
//! including connection details, credentials and the synchronization
//! monitor to use for blocking uploads.

use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;
use crate::error::{Error, Result};
use crate::identity::{BucketIdentity, DEFAULT_SERVICE, Protocol};
use crate::monitor::MonitorConfig;
use crate::path::is_valid_profile_name;

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

/// A named bucket of a BucketFS service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketProfile {
    /// Unique name for this profile
    pub name: String,

    #[serde(default)]
    pub protocol: Protocol,

    pub host: String,

    pub port: u16,

    /// BucketFS service name
    #[serde(default = "default_service")]
    pub service: String,

    /// Bucket name
    pub bucket: String,

    /// Password of the read user
    #[serde(default)]
    pub read_password: String,

    /// Password of the write user; without it the bucket is read-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_password: Option<String>,

    /// Accept invalid TLS certificates
    #[serde(default)]
    pub insecure: bool,

    /// Synchronization monitor
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl BucketProfile {
    /// Create a read-only profile on the default service without monitor
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            protocol: Protocol::Http,
            host: host.into(),
            port,
            service: default_service(),
            bucket: bucket.into(),
            read_password: String::new(),
            write_password: None,
            insecure: false,
            monitor: MonitorConfig::None,
        }
    }

    /// Identity of the bucket this profile points at
    pub fn to_identity(&self) -> BucketIdentity {
        let identity = BucketIdentity::new(self.host.clone(), self.port, self.bucket.clone())
            .with_protocol(self.protocol)
            .with_service(self.service.clone())
            .with_read_password(self.read_password.clone());
        match &self.write_password {
            Some(password) => identity.with_write_password(password.clone()),
            None => identity,
        }
    }
}

/// Manager for profile operations
pub struct ProfileManager {
    config_manager: ConfigManager,
}

impl ProfileManager {
    /// Create a new ProfileManager with a specific ConfigManager
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Create a new ProfileManager using the default config location
    pub fn new() -> Result<Self> {
        let config_manager = ConfigManager::new()?;
        Ok(Self { config_manager })
    }

    pub fn config_manager(&self) -> &ConfigManager {
        &self.config_manager
    }

    /// List all configured profiles
    pub fn list(&self) -> Result<Vec<BucketProfile>> {
        let config = self.config_manager.load()?;
        Ok(config.profiles)
    }

    /// Get a profile by name
    pub fn get(&self, name: &str) -> Result<BucketProfile> {
        let config = self.config_manager.load()?;
        config
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    /// Add or update a profile
    pub fn set(&self, profile: BucketProfile) -> Result<()> {
        if !is_valid_profile_name(&profile.name) {
            return Err(Error::Config(format!(
                "Invalid profile name '{}'. Use letters, digits, '-' and '_'.",
                profile.name
            )));
        }
        let mut config = self.config_manager.load()?;

        config.profiles.retain(|p| p.name != profile.name);
        config.profiles.push(profile);

        self.config_manager.save(&config)
    }

    /// Add a profile, failing if one with the same name exists
    pub fn add(&self, profile: BucketProfile) -> Result<()> {
        if self.exists(&profile.name)? {
            return Err(Error::ProfileExists(profile.name));
        }
        self.set(profile)
    }

    /// Remove a profile
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.profiles.len();

        config.profiles.retain(|p| p.name != name);

        if config.profiles.len() == original_len {
            return Err(Error::ProfileNotFound(name.to_string()));
        }

        self.config_manager.save(&config)
    }

    /// Check if a profile exists
    pub fn exists(&self, name: &str) -> Result<bool> {
        let config = self.config_manager.load()?;
        Ok(config.profiles.iter().any(|p| p.name == name))
    }
}
