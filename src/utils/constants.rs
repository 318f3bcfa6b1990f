/// odoobup constants: storage layout, wire protocol and version policy

/// Directory under `$HOME` holding the profile store
pub const DATA_DIR_NAME: &str = ".odoobup";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "ODOOBUP_HOME";

/// Store file inside the data directory
pub const STORE_FILE_NAME: &str = "config.db";

/// Name of the profile collection (and its sequence)
pub const PROFILES_COLLECTION: &str = "profiles";

/// Directory under the user config dir holding `config.toml`
pub const CONFIG_DIR_NAME: &str = "odoobup";

/// Database manager endpoint on the Odoo server
pub const BACKUP_PATH: &str = "/web/database/backup";

/// Archive format requested from the server
pub const BACKUP_FORMAT: &str = "zip";

/// Prefix Odoo puts in front of the file name in `Content-Disposition`
pub const CONTENT_DISPOSITION_PREFIX: &str = "attachment; filename*=UTF-8''";

/// Servers at exactly this version only accept the query-string request
pub const LEGACY_QUERY_VERSION: f64 = 8.0;

/// Oldest server version odoobup can back up
pub const MIN_SERVER_VERSION: f64 = 8.0;
