/// Backup dispatch for stored profiles
///
/// Each profile is handled on its own: build the request for its protocol,
/// send it, create the destination file named by the server and stream the
/// body into it. A failing profile is reported and the batch moves on.

use std::path::{Path, PathBuf};

use reqwest::header::CONTENT_DISPOSITION;
use reqwest::{Client, Request, Response};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::core::error::{BackupError, StoreError};
use crate::core::profile::{Profile, Protocol};
use crate::core::progress::{ProgressReporter, TransferProgress};
use crate::core::store::ProfileStore;
use crate::utils::{now_millis, BACKUP_FORMAT, BACKUP_PATH, CONTENT_DISPOSITION_PREFIX};

/// A completed backup file
#[derive(Debug, Clone, PartialEq)]
pub struct BackupSummary {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Outcome for one requested or stored profile
#[derive(Debug)]
pub struct BackupReport {
    pub id: u64,
    /// Empty when the id could not be resolved to a profile
    pub server_url: String,
    pub database: String,
    pub outcome: Result<BackupSummary, BackupError>,
}

impl BackupReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

pub struct BackupDispatcher<'a> {
    store: &'a ProfileStore,
    client: Client,
    progress: Box<dyn ProgressReporter>,
}

impl<'a> BackupDispatcher<'a> {
    pub fn new(store: &'a ProfileStore, progress: Box<dyn ProgressReporter>) -> Self {
        Self::with_client(store, Client::new(), progress)
    }

    pub fn with_client(
        store: &'a ProfileStore,
        client: Client,
        progress: Box<dyn ProgressReporter>,
    ) -> Self {
        Self {
            store,
            client,
            progress,
        }
    }

    /// Back up the given ids in order, or every stored profile when `targets`
    /// is empty.
    ///
    /// Only a failure to list the store aborts the batch; everything else is
    /// recorded in that item's report.
    pub async fn run_backups(&self, targets: &[u64]) -> Result<Vec<BackupReport>, StoreError> {
        let mut reports = Vec::new();

        if targets.is_empty() {
            for profile in self.store.list()? {
                reports.push(self.report_for(&profile).await);
            }
            return Ok(reports);
        }

        for &id in targets {
            match self.store.get(id) {
                Ok(profile) => reports.push(self.report_for(&profile).await),
                Err(err) => {
                    tracing::warn!(id, error = %err, "could not resolve profile");
                    reports.push(BackupReport {
                        id,
                        server_url: String::new(),
                        database: String::new(),
                        outcome: Err(BackupError::Resolve(err)),
                    });
                }
            }
        }

        Ok(reports)
    }

    async fn report_for(&self, profile: &Profile) -> BackupReport {
        BackupReport {
            id: profile.id,
            server_url: profile.server_url().to_string(),
            database: profile.database_name().to_string(),
            outcome: self.backup_one(profile).await,
        }
    }

    /// Run the request -> create file -> stream copy sequence for one profile
    pub async fn backup_one(&self, profile: &Profile) -> Result<BackupSummary, BackupError> {
        let server_url = profile.server_url();
        let database = profile.database_name();

        // reqwest errors carry the request URL, which holds the secret for
        // query-protocol requests
        let request = build_request(&self.client, profile).map_err(|source| {
            BackupError::Transport {
                server_url: server_url.to_string(),
                database: database.to_string(),
                source: source.without_url(),
            }
        })?;

        tracing::debug!(id = profile.id, server_url, database, protocol = %profile.protocol(), "sending backup request");

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(source) => {
                let source = source.without_url();
                tracing::warn!(id = profile.id, server_url, database, error = %source, "backup request failed");
                return Err(BackupError::Transport {
                    server_url: server_url.to_string(),
                    database: database.to_string(),
                    source,
                });
            }
        };

        tracing::debug!(id = profile.id, status = %response.status(), content_length = ?response.content_length(), "backup response received");

        let header = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let filename = derive_filename(header);

        if !is_safe_filename(filename) && !filename.is_empty() {
            tracing::warn!(id = profile.id, server_url, database, filename, "unsafe backup file name");
            return Err(BackupError::UnsafeFilename {
                server_url: server_url.to_string(),
                database: database.to_string(),
                filename: filename.to_string(),
            });
        }

        let path = Path::new(&profile.data.backup_directory).join(filename);
        let file = match create_backup_file(&path, filename).await {
            Ok(file) => file,
            Err(source) => {
                tracing::warn!(id = profile.id, server_url, database, path = %path.display(), error = %source, "could not create backup file");
                return Err(BackupError::FileOpen {
                    server_url: server_url.to_string(),
                    database: database.to_string(),
                    path,
                    source,
                });
            }
        };

        let label = format!("Get: {}, database:{}... ", server_url, database);
        let mut progress = self.progress.start(&label, response.content_length());

        match stream_to_file(response, file, progress.as_mut()).await {
            Ok(bytes) => {
                progress.finish();
                tracing::info!(id = profile.id, server_url, database, path = %path.display(), bytes, "backup complete");
                Ok(BackupSummary { path, bytes })
            }
            Err(source) => {
                // The partial file stays on disk
                progress.abandon();
                tracing::warn!(id = profile.id, server_url, database, error = %source, "backup transfer failed");
                Err(BackupError::StreamCopy {
                    server_url: server_url.to_string(),
                    database: database.to_string(),
                    source,
                })
            }
        }
    }
}

/// Build the backup request for the profile's protocol
pub fn build_request(client: &Client, profile: &Profile) -> reqwest::Result<Request> {
    let url = format!(
        "{}{}",
        profile.data.server_url.trim_end_matches('/'),
        BACKUP_PATH
    );

    match profile.protocol() {
        Protocol::LegacyQuery => {
            // The token only has to be unique; the client never checks it
            let token = now_millis().to_string();
            client
                .get(url)
                .query(&[
                    ("token", token.as_str()),
                    ("backup_db", profile.data.database_name.as_str()),
                    ("backup_format", BACKUP_FORMAT),
                    ("backup_pwd", profile.data.master_secret.as_str()),
                ])
                .build()
        }
        Protocol::FormBased => client
            .post(url)
            .form(&[
                ("master_pwd", profile.data.master_secret.as_str()),
                ("name", profile.data.database_name.as_str()),
                ("backup_format", BACKUP_FORMAT),
            ])
            .build(),
    }
}

/// File name from a `Content-Disposition` value, with Odoo's UTF-8 prefix
/// stripped. Values without the prefix are returned unchanged.
pub fn derive_filename(header: &str) -> &str {
    header
        .strip_prefix(CONTENT_DISPOSITION_PREFIX)
        .unwrap_or(header)
}

/// A name that stays inside the backup directory
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

async fn create_backup_file(path: &Path, filename: &str) -> std::io::Result<File> {
    // No file name means the server answered with an error page
    if filename.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "response carried no backup file name",
        ));
    }
    File::create(path).await
}

/// Copy the body chunk by chunk, never holding more than one chunk in memory
async fn stream_to_file(
    mut response: Response,
    mut file: File,
    progress: &mut dyn TransferProgress,
) -> std::io::Result<u64> {
    let copied = copy_body(&mut response, &mut file, progress).await;

    // Whatever arrived stays on disk, complete or not
    file.flush().await?;
    copied
}

async fn copy_body(
    response: &mut Response,
    file: &mut File,
    progress: &mut dyn TransferProgress,
) -> std::io::Result<u64> {
    let mut written = 0u64;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.without_url()))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        progress.advance(chunk.len() as u64);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::profile::ProfileData;

    fn profile(version: f64) -> Profile {
        Profile::from_record(
            1,
            ProfileData::new(
                "http://odoo.example.com:8069/",
                "production",
                "s3cret pass",
                "/var/backups",
                version,
            ),
        )
    }

    #[test]
    fn test_legacy_query_request() {
        let client = Client::new();
        let request = build_request(&client, &profile(8.0)).unwrap();

        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().path(), "/web/database/backup");
        assert!(request.body().is_none());

        let pairs: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        assert!(get("token").parse::<i64>().unwrap() > 0);
        assert_eq!(get("backup_db"), "production");
        assert_eq!(get("backup_format"), "zip");
        assert_eq!(get("backup_pwd"), "s3cret pass");
    }

    #[test]
    fn test_form_request() {
        let client = Client::new();
        for version in [8.1, 9.0, 16.0] {
            let request = build_request(&client, &profile(version)).unwrap();

            assert_eq!(request.method(), reqwest::Method::POST);
            assert_eq!(
                request.url().as_str(),
                "http://odoo.example.com:8069/web/database/backup"
            );
            let body = request.body().and_then(|b| b.as_bytes()).unwrap();
            let body = std::str::from_utf8(body).unwrap();
            assert_eq!(
                body,
                "master_pwd=s3cret+pass&name=production&backup_format=zip"
            );
        }
    }

    #[test]
    fn test_derive_filename() {
        assert_eq!(
            derive_filename("attachment; filename*=UTF-8''backup_2024.zip"),
            "backup_2024.zip"
        );
        assert_eq!(derive_filename("backup.zip"), "backup.zip");
        assert_eq!(
            derive_filename("attachment; filename=\"x.zip\""),
            "attachment; filename=\"x.zip\""
        );
        assert_eq!(derive_filename(""), "");
    }

    #[test]
    fn test_unsafe_filenames() {
        assert!(is_safe_filename("production_2024-01-01_00-00-00.zip"));
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename(".."));
        assert!(!is_safe_filename("../etc/passwd"));
        assert!(!is_safe_filename("dir/file.zip"));
        assert!(!is_safe_filename("dir\\file.zip"));
    }
}
