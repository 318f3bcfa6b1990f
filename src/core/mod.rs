pub mod backup;
pub mod error;
pub mod profile;
pub mod progress;
pub mod store;

pub use backup::{BackupDispatcher, BackupReport, BackupSummary};
pub use error::{BackupError, StoreError, ValidationError};
pub use profile::{Profile, ProfileData, Protocol};
pub use progress::{ProgressReporter, TerminalProgress, TransferProgress};
pub use store::ProfileStore;
