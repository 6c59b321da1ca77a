use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Write},
    ops::Deref,
    path::{Path, PathBuf},
};

use fs4::fs_std::FileExt;
use tracing::debug;

use super::{activity::ActivityMapping, store::StoreError};

/// Interface for abstracting storage of activities. Implementations always hand over the whole
/// collection; there is no partial update.
pub trait ActivityStorage {
    /// Reads every stored record in order. `None` means nothing has been stored yet.
    fn load(&self) -> Result<Option<Vec<ActivityMapping>>, StoreError>;

    /// Replaces everything stored with `records`.
    fn save(&self, records: &[ActivityMapping]) -> Result<(), StoreError>;
}

impl<T: Deref> ActivityStorage for T
where
    T::Target: ActivityStorage,
{
    fn load(&self) -> Result<Option<Vec<ActivityMapping>>, StoreError> {
        self.deref().load()
    }

    fn save(&self, records: &[ActivityMapping]) -> Result<(), StoreError> {
        self.deref().save(records)
    }
}

/// The main realization of [ActivityStorage]: a single JSON array in one file.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_records(file: &File, records: &[ActivityMapping]) -> Result<(), StoreError> {
        // Truncate only once the lock is held so a concurrent reader never sees a half-empty file.
        file.set_len(0)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, records)?;
        writer.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

impl ActivityStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<Vec<ActivityMapping>>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No data file at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        FileExt::lock_shared(&file)?;
        let records = serde_json::from_reader::<_, Vec<ActivityMapping>>(BufReader::new(&file));
        FileExt::unlock(&file)?;

        let records = records?;
        debug!("Loaded {} records from {:?}", records.len(), self.path);
        Ok(Some(records))
    }

    fn save(&self, records: &[ActivityMapping]) -> Result<(), StoreError> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        FileExt::lock_exclusive(&file)?;
        let result = Self::write_records(&file, records);
        FileExt::unlock(&file)?;

        debug!("Saved {} records to {:?}", records.len(), self.path);
        result
    }
}
