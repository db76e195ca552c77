use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use ldapd_domain::replication::ReplicationRecord;
use ldapd_domain_handlers::handler::ReplicationLogHandler;
use tracing::{debug, warn};

/// Appends every record, in LDIF, to a file shared by all backends.
pub struct FileReplicationLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileReplicationLog {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_owned(),
            file: Mutex::new(file),
        })
    }
}

impl ReplicationLogHandler for FileReplicationLog {
    fn log_replication(&self, record: ReplicationRecord) {
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        match file.write_all(record.to_string().as_bytes()) {
            Ok(()) => debug!(dn = %record.dn, "Logged change for replication"),
            Err(e) => warn!(
                path = %self.path.display(),
                dn = %record.dn,
                "Could not write replication record: {e:#}"
            ),
        }
    }
}

/// Used when no replication log is configured.
pub struct NoopReplicationLog;

impl ReplicationLogHandler for NoopReplicationLog {
    fn log_replication(&self, record: ReplicationRecord) {
        debug!(dn = %record.dn, "No replication log configured, dropping record");
    }
}
