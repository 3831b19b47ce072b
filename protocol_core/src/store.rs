//! Persistence of templates and instances.
//!
//! All records live in one [`StoreDocument`]. [`MemoryStore`] keeps it in
//! memory; [`FileStore`] keeps it in a JSON file and rewrites the whole file
//! atomically, so an instance and its full subtree become visible together.

use crate::{
    BlockId, Error, InstanceId, Protocol, ProtocolId, Result, UserId, WorkoutBlock,
    WorkoutInstance,
};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Storage collaborator used by the session service.
///
/// Calls are synchronous and assumed already authorized.
pub trait Store {
    fn load_protocol(&self, id: ProtocolId) -> Result<Option<Protocol>>;

    /// All protocols, sorted by name
    fn list_protocols(&self) -> Result<Vec<Protocol>>;

    fn save_protocol(&mut self, protocol: &Protocol) -> Result<()>;

    fn remove_protocol(&mut self, id: ProtocolId) -> Result<Option<Protocol>>;

    /// Standalone block, or a block owned by any stored protocol
    fn load_block(&self, id: BlockId) -> Result<Option<WorkoutBlock>>;

    /// Save a standalone (reusable) block
    fn save_block(&mut self, block: &WorkoutBlock) -> Result<()>;

    fn load_instance(&self, id: InstanceId) -> Result<Option<WorkoutInstance>>;

    /// Every instance, newest first
    fn list_all_instances(&self) -> Result<Vec<WorkoutInstance>>;

    fn save_instance(&mut self, instance: &WorkoutInstance) -> Result<()>;

    /// Ordered blocks of a protocol
    fn list_blocks(&self, protocol: ProtocolId) -> Result<Vec<WorkoutBlock>> {
        self.load_protocol(protocol)?
            .map(|p| p.blocks)
            .ok_or_else(|| Error::not_found("protocol", protocol))
    }

    /// Load an instance, apply `f`, and save it back.
    ///
    /// Nothing is written if `f` fails.
    fn modify_instance<T, F>(&mut self, id: InstanceId, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut WorkoutInstance) -> Result<T>,
    {
        let mut instance = self
            .load_instance(id)?
            .ok_or_else(|| Error::not_found("instance", id))?;
        let out = f(&mut instance)?;
        self.save_instance(&instance)?;
        Ok(out)
    }

    /// Remove a protocol after `check` accepts the instances that reference it.
    ///
    /// The check and the removal form one step: no instance can be saved
    /// between them.
    fn remove_protocol_if<F>(&mut self, id: ProtocolId, check: F) -> Result<Option<Protocol>>
    where
        Self: Sized,
        F: FnOnce(&[WorkoutInstance]) -> Result<()>,
    {
        let referencing: Vec<_> = self
            .list_all_instances()?
            .into_iter()
            .filter(|i| i.template_id == Some(id))
            .collect();
        check(&referencing)?;
        self.remove_protocol(id)
    }

    /// Save a new instance, provided its source protocol still exists
    fn insert_instance(&mut self, instance: &WorkoutInstance) -> Result<()>
    where
        Self: Sized,
    {
        if let Some(protocol) = instance.template_id {
            if self.load_protocol(protocol)?.is_none() {
                return Err(Error::not_found("protocol", protocol));
            }
        }
        self.save_instance(instance)
    }

    /// Instances owned by `user`, newest first
    fn list_instances(&self, user: UserId) -> Result<Vec<WorkoutInstance>> {
        Ok(self
            .list_all_instances()?
            .into_iter()
            .filter(|i| i.user_id == user)
            .collect())
    }
}

/// Serialized form of everything the store holds
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreDocument {
    #[serde(default)]
    pub protocols: BTreeMap<ProtocolId, Protocol>,
    #[serde(default)]
    pub blocks: BTreeMap<BlockId, WorkoutBlock>,
    #[serde(default)]
    pub instances: BTreeMap<InstanceId, WorkoutInstance>,
}

/// In-memory store
pub type MemoryStore = StoreDocument;

impl Store for StoreDocument {
    fn load_protocol(&self, id: ProtocolId) -> Result<Option<Protocol>> {
        Ok(self.protocols.get(&id).cloned())
    }

    fn list_protocols(&self) -> Result<Vec<Protocol>> {
        let mut protocols: Vec<_> = self.protocols.values().cloned().collect();
        protocols.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(protocols)
    }

    fn save_protocol(&mut self, protocol: &Protocol) -> Result<()> {
        self.protocols.insert(protocol.id, protocol.clone());
        Ok(())
    }

    fn remove_protocol(&mut self, id: ProtocolId) -> Result<Option<Protocol>> {
        Ok(self.protocols.remove(&id))
    }

    fn load_block(&self, id: BlockId) -> Result<Option<WorkoutBlock>> {
        if let Some(block) = self.blocks.get(&id) {
            return Ok(Some(block.clone()));
        }
        Ok(self
            .protocols
            .values()
            .find_map(|p| p.block(id))
            .cloned())
    }

    fn save_block(&mut self, block: &WorkoutBlock) -> Result<()> {
        self.blocks.insert(block.id, block.clone());
        Ok(())
    }

    fn load_instance(&self, id: InstanceId) -> Result<Option<WorkoutInstance>> {
        Ok(self.instances.get(&id).cloned())
    }

    fn list_all_instances(&self) -> Result<Vec<WorkoutInstance>> {
        let mut instances: Vec<_> = self.instances.values().cloned().collect();
        instances.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(instances)
    }

    fn save_instance(&mut self, instance: &WorkoutInstance) -> Result<()> {
        self.instances.insert(instance.id, instance.clone());
        Ok(())
    }
}

impl StoreDocument {
    /// Load a document. A missing file is an empty store.
    ///
    /// Writers replace the file by rename, so a reader always sees one whole
    /// version. A file that exists but does not parse is an error: silently
    /// starting over would drop every protocol and session on the next write.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No store file at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let doc: StoreDocument = serde_json::from_str(&contents)?;
        tracing::debug!(
            "Loaded store from {:?}: {} protocols, {} blocks, {} instances",
            path,
            doc.protocols.len(),
            doc.blocks.len(),
            doc.instances.len()
        );
        Ok(doc)
    }

    /// Save the document atomically
    ///
    /// Writes a temp file in the same directory, syncs it, then renames it
    /// over the original.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().ok_or_else(|| {
            Error::Other(format!("store path {:?} has no parent directory", path))
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved store to {:?}", path);
        Ok(())
    }
}

/// JSON-file backed store
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoreDocument> {
        StoreDocument::load(&self.path)
    }

    /// Load, modify, and save under an exclusive lock held for the whole cycle
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreDocument) -> Result<T>,
    {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.path.with_extension("lock"))?;
        lock.lock_exclusive()?;

        let result = self.read_modify_write(f);

        // Closing the handle releases the lock too, so a failed unlock only
        // needs reporting
        if let Err(e) = lock.unlock() {
            tracing::warn!("Failed to release store lock: {}", e);
        }
        result
    }

    fn read_modify_write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreDocument) -> Result<T>,
    {
        let mut doc = self.read()?;
        let out = f(&mut doc)?;
        doc.save(&self.path)?;
        Ok(out)
    }
}

impl Store for FileStore {
    fn load_protocol(&self, id: ProtocolId) -> Result<Option<Protocol>> {
        self.read()?.load_protocol(id)
    }

    fn list_protocols(&self) -> Result<Vec<Protocol>> {
        self.read()?.list_protocols()
    }

    fn save_protocol(&mut self, protocol: &Protocol) -> Result<()> {
        self.update(|doc| doc.save_protocol(protocol))
    }

    fn remove_protocol(&mut self, id: ProtocolId) -> Result<Option<Protocol>> {
        self.update(|doc| doc.remove_protocol(id))
    }

    fn load_block(&self, id: BlockId) -> Result<Option<WorkoutBlock>> {
        self.read()?.load_block(id)
    }

    fn save_block(&mut self, block: &WorkoutBlock) -> Result<()> {
        self.update(|doc| doc.save_block(block))
    }

    fn load_instance(&self, id: InstanceId) -> Result<Option<WorkoutInstance>> {
        self.read()?.load_instance(id)
    }

    fn list_all_instances(&self) -> Result<Vec<WorkoutInstance>> {
        self.read()?.list_all_instances()
    }

    fn save_instance(&mut self, instance: &WorkoutInstance) -> Result<()> {
        self.update(|doc| doc.save_instance(instance))
    }

    fn remove_protocol_if<F>(&mut self, id: ProtocolId, check: F) -> Result<Option<Protocol>>
    where
        F: FnOnce(&[WorkoutInstance]) -> Result<()>,
    {
        self.update(|doc| doc.remove_protocol_if(id, check))
    }

    fn insert_instance(&mut self, instance: &WorkoutInstance) -> Result<()> {
        self.update(|doc| doc.insert_instance(instance))
    }

    /// Runs under the store lock so concurrent leaf updates are not lost
    fn modify_instance<T, F>(&mut self, id: InstanceId, f: F) -> Result<T>
    where
        F: FnOnce(&mut WorkoutInstance) -> Result<T>,
    {
        self.update(|doc| doc.modify_instance(id, f))
    }
}
