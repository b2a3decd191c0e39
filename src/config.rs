//! Configuration handling for the forwarder.

use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::{Ipv4Addr, SocketAddr};

use crate::enums::Rcode;
use crate::error::ConfigError;

/// Default locations searched when `--config` isn't given.
const CONFIG_LOCATIONS: &[&str] = &["./dns-forward.json", "~/.config/dns-forward.json"];

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// The forwarder's configuration blob — write it as JSON and load it with
/// [`ConfigFile::try_from`].
pub struct ConfigFile {
    /// The upstream recursive resolver's IPv4 address.
    pub dns_server: Ipv4Addr,
    /// Port the upstream resolver listens on. Default 53.
    pub dns_server_port: u16,
    /// Ordered collection of domain strings to refuse. Lowercased at load.
    pub blacklist: Vec<String>,
    /// RCODE returned for refused queries, in 1..=5. Typically 5 (REFUSED).
    pub refuse_r_code: u8,
    /// Local bind address for the client-facing UDP socket. Default 0.0.0.0.
    pub address: String,
    /// Local bind port. Default 53 — binding it needs elevated privileges.
    pub port: u16,
    /// Default "info". Overridable by `RUST_LOG`.
    pub log_level: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            dns_server: Ipv4Addr::new(1, 1, 1, 1),
            dns_server_port: 53,
            blacklist: vec![],
            refuse_r_code: Rcode::Refused as u8,
            address: "0.0.0.0".to_string(),
            port: 53,
            log_level: "info".to_string(),
        }
    }
}

impl Display for ConfigFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "upstream={}:{} listen={}:{} blacklist_entries={} refuse_r_code={} log_level={}",
            self.dns_server,
            self.dns_server_port,
            self.address,
            self.port,
            self.blacklist.len(),
            self.refuse_r_code,
            self.log_level,
        )
    }
}

impl ConfigFile {
    /// Socket address the forwarder listens on for client queries.
    pub fn listen_address(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.address, self.port)
            .parse()
            .map_err(|e| ConfigError::InvalidListenAddress(self.address.clone(), e))
    }

    /// Socket address of the configured upstream resolver.
    pub fn upstream_address(&self) -> SocketAddr {
        SocketAddr::from((self.dns_server, self.dns_server_port))
    }

    /// The refusal RCODE, validated at load time.
    pub fn refuse_rcode(&self) -> Rcode {
        Rcode::try_from(self.refuse_r_code)
            .expect("refuse_r_code is validated in range at load time")
    }

    /// The blacklist, lowercased for exact-match comparison.
    pub fn blacklist(&self) -> crate::policy::Blacklist {
        crate::policy::Blacklist::from_entries(&self.blacklist)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if !(1..=5).contains(&self.refuse_r_code) {
            return Err(ConfigError::RcodeOutOfRange(self.refuse_r_code));
        }
        Ok(self)
    }

    /// Loads configuration from `config_path`, or from the default search
    /// locations if `None`. The first file found is parsed as JSON; any
    /// parse or validation failure is a fatal startup error (§7).
    pub fn try_from(config_path: Option<&str>) -> Result<ConfigFile, ConfigError> {
        let file_locations: Vec<String> = match config_path {
            Some(value) => vec![value.to_owned()],
            None => CONFIG_LOCATIONS.iter().map(|s| s.to_string()).collect(),
        };

        let found_files: Vec<String> = file_locations
            .iter()
            .filter_map(|f| {
                let path = shellexpand::tilde(f).into_owned();
                std::path::Path::new(&path).exists().then_some(path)
            })
            .collect();

        let Some(config_filename) = found_files.into_iter().next() else {
            return Err(ConfigError::NotFound(file_locations.join(", ")));
        };

        let builder = Config::builder()
            .add_source(File::new(&config_filename, config::FileFormat::Json))
            .add_source(config::Environment::with_prefix("dns_forward"));

        let config = builder.build().map_err(|source| ConfigError::Load {
            path: config_filename.clone(),
            source,
        })?;

        let config_file: ConfigFile = config.try_deserialize().map_err(|source| ConfigError::Load {
            path: config_filename,
            source,
        })?;

        config_file.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ConfigFile::default().validate().unwrap();
        assert_eq!(config.refuse_rcode(), Rcode::Refused);
    }

    #[test]
    fn rcode_out_of_range_fails_validation() {
        let config = ConfigFile {
            refuse_r_code: 0,
            ..ConfigFile::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RcodeOutOfRange(0))
        ));

        let config = ConfigFile {
            refuse_r_code: 6,
            ..ConfigFile::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RcodeOutOfRange(6))
        ));
    }

    #[test]
    fn not_found_when_no_file_exists() {
        let err = ConfigFile::try_from(Some("/nonexistent/path/dns-forward.json"));
        assert!(matches!(err, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn blacklist_is_lowercased() {
        let config = ConfigFile {
            blacklist: vec!["BLOCKED.Test".to_string()],
            ..ConfigFile::default()
        };
        assert!(config.blacklist().contains("blocked.test"));
    }

    #[test]
    fn loads_from_an_explicit_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dns-forward.json");
        std::fs::write(
            &path,
            serde_json::to_string(&ConfigFile {
                dns_server: Ipv4Addr::new(9, 9, 9, 9),
                blacklist: vec!["example.test".to_string()],
                ..ConfigFile::default()
            })
            .unwrap(),
        )
        .unwrap();

        let config = ConfigFile::try_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.dns_server, Ipv4Addr::new(9, 9, 9, 9));
        assert!(config.blacklist().contains("example.test"));
    }
}
