//! Profile management commands
//!
//! Profiles are named references to one bucket of a BucketFS service,
//! including connection details, credentials and the synchronization
//! monitor used by blocking uploads.

use std::path::PathBuf;

use clap::Subcommand;
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;

use bfs_core::monitor::{DEFAULT_LOG_FILE_PATTERN, DEFAULT_TIMESTAMP_FORMAT};
use bfs_core::{BucketProfile, Error, MonitorConfig, ProfileManager, Protocol};

use super::{exit_code_for, fail};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Profile subcommands for managing bucket connections
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add or update a profile
    Set(SetArgs),

    /// List all configured profiles
    List,

    /// Remove a profile
    Remove(RemoveArgs),
}

/// Arguments for the `profile set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Profile name (e.g., "local", "prod-udfs")
    pub name: String,

    /// Host running the BucketFS service
    pub host: String,

    /// Port of the BucketFS service
    pub port: u16,

    /// Bucket name
    #[arg(default_value = bfs_core::identity::DEFAULT_BUCKET)]
    pub bucket: String,

    /// Protocol: http or https
    #[arg(long, default_value = "http")]
    pub protocol: Protocol,

    /// BucketFS service name
    #[arg(long, default_value = bfs_core::identity::DEFAULT_SERVICE)]
    pub service: String,

    /// Password of the read user
    #[arg(long, env = "BFS_READ_PASSWORD", default_value = "", hide_env_values = true)]
    pub read_password: String,

    /// Password of the write user; without it the bucket is read-only
    #[arg(long, env = "BFS_WRITE_PASSWORD", hide_env_values = true)]
    pub write_password: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, default_value = "false")]
    pub insecure: bool,

    /// Wait for synchronization by scanning daemon logs in this directory
    #[arg(long, conflicts_with = "status_endpoint")]
    pub log_dir: Option<PathBuf>,

    /// Glob matching the daemon log files
    #[arg(long, default_value = DEFAULT_LOG_FILE_PATTERN, requires = "log_dir")]
    pub log_pattern: String,

    /// strptime format of the log line timestamps
    #[arg(long, default_value = DEFAULT_TIMESTAMP_FORMAT, requires = "log_dir")]
    pub timestamp_format: String,

    /// Wait for synchronization by querying this status endpoint
    #[arg(long)]
    pub status_endpoint: Option<String>,
}

impl SetArgs {
    fn monitor(&self) -> MonitorConfig {
        if let Some(directory) = &self.log_dir {
            MonitorConfig::Log {
                directory: directory.clone(),
                file_pattern: self.log_pattern.clone(),
                timestamp_format: self.timestamp_format.clone(),
            }
        } else if let Some(endpoint) = &self.status_endpoint {
            MonitorConfig::Api {
                endpoint: endpoint.clone(),
            }
        } else {
            MonitorConfig::None
        }
    }

    fn to_profile(&self) -> BucketProfile {
        let mut profile =
            BucketProfile::new(&self.name, &self.host, self.port, &self.bucket);
        profile.protocol = self.protocol;
        profile.service = self.service.clone();
        profile.read_password = self.read_password.clone();
        profile.write_password = self.write_password.clone();
        profile.insecure = self.insecure;
        profile.monitor = self.monitor();
        profile
    }
}

/// Arguments for the `profile remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the profile to remove
    pub name: String,
}

/// JSON output for profile list
#[derive(Serialize)]
struct ProfileListOutput {
    profiles: Vec<ProfileInfo>,
}

/// Profile information for output (without passwords)
#[derive(Serialize)]
struct ProfileInfo {
    name: String,
    url: String,
    writable: bool,
    monitor: String,
}

impl From<&BucketProfile> for ProfileInfo {
    fn from(profile: &BucketProfile) -> Self {
        let monitor = match &profile.monitor {
            MonitorConfig::None => "none".to_string(),
            MonitorConfig::Log { directory, .. } => format!("log ({})", directory.display()),
            MonitorConfig::Api { endpoint } => format!("api ({endpoint})"),
        };
        Self {
            name: profile.name.clone(),
            url: profile.to_identity().to_string(),
            writable: profile.write_password.is_some(),
            monitor,
        }
    }
}

/// JSON output for profile set/remove operations
#[derive(Serialize)]
struct ProfileOperationOutput {
    success: bool,
    profile: String,
    message: String,
}

/// Execute a profile subcommand
pub async fn execute(cmd: ProfileCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let manager = match ProfileManager::new() {
        Ok(manager) => manager,
        Err(e) => return fail(&formatter, "Failed to load profiles", &e),
    };

    match cmd {
        ProfileCommands::Set(args) => execute_set(args, &manager, &formatter),
        ProfileCommands::List => execute_list(&manager, &formatter),
        ProfileCommands::Remove(args) => execute_remove(args, &manager, &formatter),
    }
}

fn execute_set(args: SetArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    if args.host.is_empty() {
        formatter.error("Host cannot be empty");
        return ExitCode::UsageError;
    }

    match manager.set(args.to_profile()) {
        Ok(()) => {
            let message = format!("Profile '{}' configured successfully", args.name);
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: args.name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => fail(formatter, "Failed to save profile", &e),
    }
}

fn execute_list(manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    let profiles = match manager.list() {
        Ok(profiles) => profiles,
        Err(e) => return fail(formatter, "Failed to load profiles", &e),
    };
    let infos: Vec<ProfileInfo> = profiles.iter().map(ProfileInfo::from).collect();

    if formatter.is_json() {
        formatter.json(&ProfileListOutput { profiles: infos });
    } else if infos.is_empty() {
        formatter.println("No profiles configured.");
    } else {
        formatter.println(&profile_table(&infos).to_string());
    }
    ExitCode::Success
}

fn profile_table(infos: &[ProfileInfo]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_header(["Name", "URL", "Writable", "Monitor"]);
    for info in infos {
        table.add_row([
            info.name.clone(),
            info.url.clone(),
            if info.writable { "yes" } else { "no" }.to_string(),
            info.monitor.clone(),
        ]);
    }
    table
}

fn execute_remove(args: RemoveArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            let message = format!("Profile '{}' removed successfully", args.name);
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: args.name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e @ Error::ProfileNotFound(_)) => {
            formatter.error(&format!("Profile '{}' not found", args.name));
            exit_code_for(&e)
        }
        Err(e) => fail(formatter, "Failed to remove profile", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: ProfileCommands,
    }

    fn parse_set(args: &[&str]) -> SetArgs {
        let mut argv = vec!["bfs", "set"];
        argv.extend_from_slice(args);
        match Harness::try_parse_from(argv).unwrap().command {
            ProfileCommands::Set(args) => args,
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn test_set_args_defaults() {
        let args = parse_set(&["local", "localhost", "2580"]);
        let profile = args.to_profile();
        assert_eq!(profile.bucket, "default");
        assert_eq!(profile.service, "bfsdefault");
        assert_eq!(profile.protocol, Protocol::Http);
        assert_eq!(profile.monitor, MonitorConfig::None);
        assert!(!profile.insecure);
    }

    #[test]
    fn test_set_args_log_monitor() {
        let args = parse_set(&["local", "db1", "6583", "udfs", "--log-dir", "/exa/logs"]);
        assert_eq!(
            args.monitor(),
            MonitorConfig::Log {
                directory: PathBuf::from("/exa/logs"),
                file_pattern: "bucketfsd*.log".into(),
                timestamp_format: "%y%m%d %H:%M:%S".into(),
            }
        );
    }

    #[test]
    fn test_set_args_api_monitor() {
        let args = parse_set(&[
            "local",
            "db1",
            "6583",
            "--protocol",
            "https",
            "--status-endpoint",
            "https://db1:6584/status",
        ]);
        let profile = args.to_profile();
        assert_eq!(profile.protocol, Protocol::Https);
        assert_eq!(
            profile.monitor,
            MonitorConfig::Api {
                endpoint: "https://db1:6584/status".into()
            }
        );
    }

    #[test]
    fn test_monitors_conflict() {
        assert!(Harness::try_parse_from([
            "bfs",
            "set",
            "local",
            "h",
            "1",
            "--log-dir",
            "/x",
            "--status-endpoint",
            "http://h/status",
        ])
        .is_err());
    }

    #[test]
    fn test_profile_info_hides_passwords() {
        let mut profile = BucketProfile::new("local", "localhost", 2580, "default");
        profile.write_password = Some("secret".into());
        let info = ProfileInfo::from(&profile);
        assert_eq!(info.url, "http://localhost:2580/bfsdefault/default");
        assert!(info.writable);
        assert!(!serde_json::to_string(&info).unwrap().contains("secret"));
    }

    #[test]
    fn test_profile_table() {
        let profile = BucketProfile::new("local", "localhost", 2580, "default");
        let table = profile_table(&[ProfileInfo::from(&profile)]).to_string();
        assert!(table.contains("local"));
        assert!(table.contains("none"));
    }
}
