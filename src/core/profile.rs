/// Connection profiles for remote Odoo databases
///
/// A profile is the stored payload (`ProfileData`) plus the id assigned by the
/// store. The wire protocol is derived from the server version once, when the
/// profile is built, instead of on every backup.

use std::fmt;

use bincode::{Decode, Encode};

use crate::core::error::ValidationError;
use crate::utils::{LEGACY_QUERY_VERSION, MIN_SERVER_VERSION};

/// Request shape expected by the remote server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// `GET` with every parameter in the query string (8.0 servers)
    LegacyQuery,
    /// `POST` with a form-encoded body (every later version)
    FormBased,
}

impl Protocol {
    pub fn for_version(version: f64) -> Self {
        if version == LEGACY_QUERY_VERSION {
            Protocol::LegacyQuery
        } else {
            Protocol::FormBased
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::LegacyQuery => write!(f, "query"),
            Protocol::FormBased => write!(f, "form"),
        }
    }
}

/// The persisted part of a profile. The id is never part of the payload, it
/// comes from the storage key.
#[derive(Clone, PartialEq, Encode, Decode)]
pub struct ProfileData {
    pub server_url: String,
    pub database_name: String,
    pub master_secret: String,
    pub backup_directory: String,
    pub server_version: f64,
}

impl ProfileData {
    pub fn new(
        server_url: impl Into<String>,
        database_name: impl Into<String>,
        master_secret: impl Into<String>,
        backup_directory: impl Into<String>,
        server_version: f64,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            database_name: database_name.into(),
            master_secret: master_secret.into(),
            backup_directory: backup_directory.into(),
            server_version,
        }
    }

    /// Check every field is present and the version is supported
    pub fn validate(&self) -> Result<Protocol, ValidationError> {
        let required = [
            ("url", &self.server_url),
            ("db_name", &self.database_name),
            ("password", &self.master_secret),
            ("backup_dir", &self.backup_directory),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }

        if self.server_version == 0.0 || self.server_version.is_nan() {
            return Err(ValidationError::MissingField("version"));
        }
        if self.server_version < MIN_SERVER_VERSION {
            return Err(ValidationError::UnsupportedVersion(self.server_version));
        }

        Ok(Protocol::for_version(self.server_version))
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::error::EncodeError> {
        bincode::encode_to_vec(self, bincode::config::standard())
    }

    /// Decode a stored payload, rejecting trailing bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, String> {
        let (data, read): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| e.to_string())?;
        if read != bytes.len() {
            return Err(format!("{} trailing bytes after payload", bytes.len() - read));
        }
        Ok(data)
    }
}

// Keeps the master secret out of logs and panic messages
impl fmt::Debug for ProfileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileData")
            .field("server_url", &self.server_url)
            .field("database_name", &self.database_name)
            .field("master_secret", &"<redacted>")
            .field("backup_directory", &self.backup_directory)
            .field("server_version", &self.server_version)
            .finish()
    }
}

/// A stored profile with its store-assigned id
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: u64,
    pub data: ProfileData,
    protocol: Protocol,
}

impl Profile {
    pub(crate) fn from_record(id: u64, data: ProfileData) -> Self {
        let protocol = Protocol::for_version(data.server_version);
        Self { id, data, protocol }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn server_url(&self) -> &str {
        &self.data.server_url
    }

    pub fn database_name(&self) -> &str {
        &self.data.database_name
    }
}
