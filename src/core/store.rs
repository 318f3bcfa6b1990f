/// Durable profile storage
///
/// Profiles live in a single redb file. Each record is keyed by the id as an
/// 8-digit zero-padded decimal so key order and id order agree, and ids come
/// from a per-collection sequence that is never rewound.

use std::fs;
use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, TableDefinition};

use crate::core::error::StoreError;
use crate::core::profile::{Profile, ProfileData};
use crate::utils::{PROFILES_COLLECTION, STORE_FILE_NAME};

/// Profiles table: zero-padded id -> bincode payload
const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new(PROFILES_COLLECTION);

/// Sequences table: collection name -> last allocated id
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub struct ProfileStore {
    db: Database,
    path: PathBuf,
}

impl ProfileStore {
    /// Open (or create) the store inside `data_dir`.
    ///
    /// Any failure here leaves the process without usable state, so the
    /// binary exits on error instead of retrying.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        create_data_dir(data_dir).map_err(|e| StoreError::Init {
            path: data_dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let path = data_dir.join(STORE_FILE_NAME);
        let init_err = |reason: String| StoreError::Init {
            path: path.clone(),
            reason,
        };

        let db = Database::create(&path).map_err(|e| init_err(e.to_string()))?;

        // Make sure both tables exist so read transactions can open them
        let txn = db.begin_write().map_err(|e| init_err(e.to_string()))?;
        txn.open_table(PROFILES).map_err(|e| init_err(e.to_string()))?;
        txn.open_table(SEQUENCES).map_err(|e| init_err(e.to_string()))?;
        txn.commit().map_err(|e| init_err(e.to_string()))?;

        tracing::debug!(path = %path.display(), "profile store opened");

        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate `data`, allocate the next id and persist the record in one
    /// write transaction.
    pub fn create(&self, data: ProfileData) -> Result<Profile, StoreError> {
        let protocol = data.validate()?;
        let payload = data.encode()?;

        let txn = self.db.begin_write()?;
        let id = {
            let mut sequences = txn.open_table(SEQUENCES)?;
            let next = sequences
                .get(PROFILES_COLLECTION)?
                .map(|seq| seq.value())
                .unwrap_or(0)
                + 1;
            sequences.insert(PROFILES_COLLECTION, next)?;

            let mut profiles = txn.open_table(PROFILES)?;
            profiles.insert(record_key(next).as_str(), payload.as_slice())?;
            next
        };
        txn.commit()?;

        tracing::debug!(id, %protocol, server_url = %data.server_url, database = %data.database_name, "profile created");

        Ok(Profile::from_record(id, data))
    }

    pub fn get(&self, id: u64) -> Result<Profile, StoreError> {
        let key = record_key(id);
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PROFILES)?;

        let value = table.get(key.as_str())?.ok_or(StoreError::NotFound { id })?;
        let data = decode_record(&key, value.value())?;

        Ok(Profile::from_record(id, data))
    }

    /// Every profile in ascending id order. One bad record fails the whole
    /// listing.
    pub fn list(&self) -> Result<Vec<Profile>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PROFILES)?;

        let mut profiles = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let key = key.value();
            let id = key.parse::<u64>().map_err(|e| StoreError::CorruptRecord {
                key: key.to_string(),
                reason: format!("invalid id key: {}", e),
            })?;
            let data = decode_record(key, value.value())?;
            profiles.push(Profile::from_record(id, data));
        }

        Ok(profiles)
    }

    /// Remove a profile. Deleting an id that does not exist is not an error.
    pub fn delete(&self, id: u64) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(PROFILES)?;
            let old = table.remove(record_key(id).as_str())?;
            old.is_some()
        };
        txn.commit()?;

        tracing::debug!(id, removed, "profile delete");
        Ok(())
    }

    /// Release the store file
    pub fn close(self) {
        tracing::debug!(path = %self.path.display(), "profile store closed");
        drop(self.db);
    }
}

fn record_key(id: u64) -> String {
    format!("{:08}", id)
}

fn decode_record(key: &str, bytes: &[u8]) -> Result<ProfileData, StoreError> {
    ProfileData::decode(bytes).map_err(|reason| StoreError::CorruptRecord {
        key: key.to_string(),
        reason,
    })
}

fn create_data_dir(dir: &Path) -> std::io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}
