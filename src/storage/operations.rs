//! Storage operations
//!
//! Every filesystem mutation plus the one read (listing). Each mutation is
//! atomic with respect to concurrent requests on the same destination and
//! publishes exactly one change event on success (two for move).

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use log::{error, info};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::events::ChangeBroadcaster;
use crate::storage::depth::FolderDepthPolicy;
use crate::storage::resolver::{
    join_virtual, normalized, parent_of, validate_entry_name, PathResolver,
};
use crate::storage::results::{DirectoryEntry, Download, ListResult};

/// Suffix of in-flight upload temp files. A `.part` file both hides partial
/// bytes from observers and reserves its final name against concurrent
/// uploads.
const PART_SUFFIX: &str = ".part";

/// The sandboxed file operations layer.
///
/// All name-collision checks and their following mutation run under one
/// coarse lock; two requests racing on the same destination can therefore
/// never both observe a free name.
pub struct FileStore {
    resolver: PathResolver,
    depth: FolderDepthPolicy,
    events: Arc<ChangeBroadcaster>,
    mutation_lock: Mutex<()>,
    /// Real paths of `.part` files currently being written. Only these are
    /// hidden from listings; a user file that merely ends in `.part` is a
    /// regular entry.
    pending_parts: Mutex<HashSet<PathBuf>>,
    max_upload_bytes: u64,
}

impl FileStore {
    pub fn new(
        resolver: PathResolver,
        depth: FolderDepthPolicy,
        events: Arc<ChangeBroadcaster>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            resolver,
            depth,
            events,
            mutation_lock: Mutex::new(()),
            pending_parts: Mutex::new(HashSet::new()),
            max_upload_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Lists a directory: folders first, then files, lexical by name.
    pub async fn list(&self, path: &str) -> Result<ListResult, StoreError> {
        let path = normalized(path);
        let real = self.resolver.resolve(path)?;
        let meta = fs::metadata(&real)
            .await
            .map_err(|_| StoreError::NotFound(path.to_string()))?;
        if !meta.is_dir() {
            return Err(StoreError::NotFound(path.to_string()));
        }

        let pending = self.pending_parts.lock().await.clone();
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&real).await?;
        while let Some(entry) = dir.next_entry().await? {
            // Skip in-flight upload temp files and unreadable entries.
            if pending.contains(&entry.path()) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            let is_dir = meta.is_dir();
            entries.push(DirectoryEntry {
                path: join_virtual(path, &name),
                size: if is_dir { None } else { Some(meta.len()) },
                name,
                is_dir,
            });
        }
        entries.sort_by(|a, b| {
            b.is_dir
                .cmp(&a.is_dir)
                .then_with(|| a.name.cmp(&b.name))
        });

        info!("listed {:?} - {} entries", path, entries.len());
        Ok(ListResult {
            can_create_folder: self.depth.can_create_in(path),
            entries,
        })
    }

    /// Creates an empty folder under `parent`.
    pub async fn create_folder(&self, parent: &str, name: &str) -> Result<(), StoreError> {
        let parent = normalized(parent);
        validate_entry_name(name)?;
        let parent_real = self.resolver.resolve(parent)?;
        if !is_dir(&parent_real).await {
            return Err(StoreError::NotFound(parent.to_string()));
        }
        if !self.depth.can_create_in(parent) {
            return Err(StoreError::DepthExceeded(self.depth.max_depth()));
        }

        let target = parent_real.join(name);
        {
            let _guard = self.mutation_lock.lock().await;
            if entry_exists(&target).await? {
                return Err(StoreError::Conflict(join_virtual(parent, name)));
            }
            fs::create_dir(&target).await?;
        }

        info!("created folder {:?} in {:?}", name, parent);
        self.events.publish(parent).await;
        Ok(())
    }

    /// Saves one uploaded file, streaming its bytes to disk.
    ///
    /// Never overwrites: when the name is taken, a numeric suffix is added
    /// before the extension until a free name is found. Bytes go to a
    /// `.part` temp file that is renamed into place on success and removed
    /// on any failure, so an aborted transfer leaves nothing behind.
    ///
    /// Does not publish; the caller reports the whole batch through
    /// [`FileStore::finish_upload`].
    pub async fn save_stream<S>(
        &self,
        dest: &str,
        original_name: &str,
        mut data: S,
    ) -> Result<String, StoreError>
    where
        S: Stream<Item = io::Result<Bytes>> + Unpin,
    {
        let dest = normalized(dest);
        validate_entry_name(original_name)?;
        let dest_real = self.resolver.resolve(dest)?;
        if !is_dir(&dest_real).await {
            return Err(StoreError::NotFound(dest.to_string()));
        }

        // Reserve a collision-free name by creating its .part file under
        // the lock; the actual byte transfer then runs unlocked.
        let (mut file, part_path, final_name) = {
            let _guard = self.mutation_lock.lock().await;
            self.reserve_upload_slot(&dest_real, original_name).await?
        };

        let mut received = 0u64;
        while let Some(chunk) = data.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    error!("upload of {:?} aborted: {}", original_name, e);
                    return self.discard_part(&part_path, e.into()).await;
                }
            };
            received += chunk.len() as u64;
            if received > self.max_upload_bytes {
                error!(
                    "upload of {:?} rejected at {} bytes (limit {})",
                    original_name, received, self.max_upload_bytes
                );
                return self
                    .discard_part(&part_path, StoreError::TooLarge(self.max_upload_bytes))
                    .await;
            }
            if let Err(e) = file.write_all(&chunk).await {
                error!("failed writing upload {:?}: {}", original_name, e);
                return self.discard_part(&part_path, e.into()).await;
            }
        }
        if let Err(e) = file.flush().await {
            return self.discard_part(&part_path, e.into()).await;
        }
        drop(file);

        let final_name = match self.finalize_upload(&dest_real, &part_path, final_name).await {
            Ok(name) => name,
            Err(e) => return self.discard_part(&part_path, e).await,
        };

        info!(
            "saved upload {:?} as {:?} in {:?} ({} bytes)",
            original_name, final_name, dest, received
        );
        Ok(final_name)
    }

    /// Publishes the single change event for an upload batch.
    pub async fn finish_upload(&self, dest: &str, saved: usize) {
        if saved > 0 {
            self.events.publish(normalized(dest)).await;
        }
    }

    /// Opens a file for download. Read-only; no event.
    pub async fn download(&self, path: &str) -> Result<Download, StoreError> {
        let path = normalized(path);
        let real = self.resolver.resolve(path)?;
        let meta = fs::metadata(&real)
            .await
            .map_err(|_| StoreError::NotFound(path.to_string()))?;
        if meta.is_dir() {
            return Err(StoreError::IsDirectory(path.to_string()));
        }

        let file = fs::File::open(&real).await?;
        let filename = basename(path).to_string();
        info!("serving download {:?} ({} bytes)", path, meta.len());
        Ok(Download {
            filename,
            size: meta.len(),
            file,
        })
    }

    /// Removes a file, or a directory with its entire contents.
    pub async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let path = normalized(path);
        if path.is_empty() {
            return Err(StoreError::RootForbidden);
        }
        let real = self.resolver.resolve(path)?;

        {
            let _guard = self.mutation_lock.lock().await;
            let meta = fs::metadata(&real)
                .await
                .map_err(|_| StoreError::NotFound(path.to_string()))?;
            if meta.is_dir() {
                fs::remove_dir_all(&real).await?;
            } else {
                fs::remove_file(&real).await?;
            }
        }

        info!("deleted {:?}", path);
        self.events.publish(parent_of(path)).await;
        Ok(())
    }

    /// Renames an entry in place; the parent does not change.
    pub async fn rename(&self, path: &str, new_name: &str) -> Result<(), StoreError> {
        let path = normalized(path);
        if path.is_empty() {
            return Err(StoreError::RootForbidden);
        }
        validate_entry_name(new_name)?;
        let real = self.resolver.resolve(path)?;
        let parent = parent_of(path);
        let target = self.resolver.resolve(parent)?.join(new_name);

        {
            let _guard = self.mutation_lock.lock().await;
            if !entry_exists(&real).await? {
                return Err(StoreError::NotFound(path.to_string()));
            }
            if entry_exists(&target).await? {
                return Err(StoreError::Conflict(join_virtual(parent, new_name)));
            }
            fs::rename(&real, &target).await?;
        }

        info!("renamed {:?} to {:?}", path, new_name);
        self.events.publish(parent).await;
        Ok(())
    }

    /// Relocates an entry to a different parent, keeping its base name.
    pub async fn move_entry(&self, path: &str, dest_parent: &str) -> Result<(), StoreError> {
        let path = normalized(path);
        let dest_parent = normalized(dest_parent);
        if path.is_empty() {
            return Err(StoreError::RootForbidden);
        }
        // A directory can never be moved into itself or below itself.
        if dest_parent == path || dest_parent.starts_with(format!("{}/", path).as_str()) {
            return Err(StoreError::InvalidDestination(path.to_string()));
        }

        let real = self.resolver.resolve(path)?;
        let dest_real = self.resolver.resolve(dest_parent)?;
        if !is_dir(&dest_real).await {
            return Err(StoreError::NotFound(dest_parent.to_string()));
        }
        let name = basename(path);
        let target = dest_real.join(name);

        {
            let _guard = self.mutation_lock.lock().await;
            if !entry_exists(&real).await? {
                return Err(StoreError::NotFound(path.to_string()));
            }
            if entry_exists(&target).await? {
                return Err(StoreError::Conflict(join_virtual(dest_parent, name)));
            }
            fs::rename(&real, &target).await?;
        }

        info!("moved {:?} into {:?}", path, dest_parent);
        self.events.publish(parent_of(path)).await;
        self.events.publish(dest_parent).await;
        Ok(())
    }

    /// Picks a free final name and creates its `.part` file. Caller must
    /// hold the mutation lock.
    async fn reserve_upload_slot(
        &self,
        dest_real: &Path,
        original_name: &str,
    ) -> Result<(fs::File, PathBuf, String), StoreError> {
        let mut attempt = 0;
        loop {
            let candidate = suffixed_name(original_name, attempt);
            let final_path = dest_real.join(&candidate);
            let part_path = dest_real.join(format!("{}{}", candidate, PART_SUFFIX));
            if !entry_exists(&final_path).await? && !entry_exists(&part_path).await? {
                match fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&part_path)
                    .await
                {
                    Ok(file) => {
                        self.pending_parts.lock().await.insert(part_path.clone());
                        return Ok((file, part_path, candidate));
                    }
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                    Err(e) => return Err(e.into()),
                }
            }
            attempt += 1;
        }
    }

    /// Moves a finished `.part` file into place under the lock so the
    /// completed file appears atomically. Re-picks the name if something
    /// claimed it while the bytes were streaming.
    async fn finalize_upload(
        &self,
        dest_real: &Path,
        part_path: &Path,
        mut final_name: String,
    ) -> Result<String, StoreError> {
        let _guard = self.mutation_lock.lock().await;
        let mut final_path = dest_real.join(&final_name);
        if entry_exists(&final_path).await? {
            let mut attempt = 1;
            loop {
                let candidate = suffixed_name(&final_name, attempt);
                let candidate_path = dest_real.join(&candidate);
                if !entry_exists(&candidate_path).await? {
                    final_name = candidate;
                    final_path = candidate_path;
                    break;
                }
                attempt += 1;
            }
        }
        fs::rename(part_path, &final_path).await?;
        self.pending_parts.lock().await.remove(part_path);
        Ok(final_name)
    }

    /// Drops a failed upload's temp file and propagates the failure.
    async fn discard_part(&self, part_path: &Path, error: StoreError) -> Result<String, StoreError> {
        let _ = fs::remove_file(part_path).await;
        self.pending_parts.lock().await.remove(part_path);
        Err(error)
    }
}

/// `report.txt` -> `report(1).txt`, `report(2).txt`, ... Attempt 0 keeps
/// the original name.
fn suffixed_name(original: &str, attempt: usize) -> String {
    if attempt == 0 {
        return original.to_string();
    }
    match original.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}({}).{}", stem, attempt, ext),
        _ => format!("{}({})", original, attempt),
    }
}

fn basename(relative: &str) -> &str {
    let relative = normalized(relative);
    relative.rsplit('/').next().unwrap_or(relative)
}

async fn entry_exists(path: &Path) -> Result<bool, StoreError> {
    Ok(fs::try_exists(path).await?)
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tempfile::TempDir;
    use tokio::sync::mpsc::Receiver;
    use tokio::time::{timeout, Duration};

    use crate::events::ChangeEvent;

    fn store_with(dir: &TempDir) -> (FileStore, Arc<ChangeBroadcaster>) {
        let events = Arc::new(ChangeBroadcaster::new(16));
        let resolver = PathResolver::new(dir.path()).unwrap();
        let store = FileStore::new(
            resolver,
            FolderDepthPolicy::new(5),
            Arc::clone(&events),
            1024 * 1024,
        );
        (store, events)
    }

    fn body(bytes: &'static [u8]) -> impl Stream<Item = io::Result<Bytes>> + Unpin {
        stream::iter(vec![Ok(Bytes::from_static(bytes))])
    }

    async fn next_event(rx: &mut Receiver<ChangeEvent>) -> ChangeEvent {
        timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("no event within timeout")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn list_orders_folders_before_files() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);
        store.create_folder("", "zeta").await.unwrap();
        store
            .save_stream("", "alpha.txt", body(b"hello"))
            .await
            .unwrap();

        let listing = store.list("").await.unwrap();
        let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha.txt"]);
        assert_eq!(listing.entries[1].size, Some(5));
        assert!(listing.can_create_folder);
    }

    #[tokio::test]
    async fn list_of_missing_or_file_path_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);
        store.save_stream("", "a.txt", body(b"x")).await.unwrap();

        assert!(matches!(
            store.list("missing").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.list("a.txt").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn create_folder_conflicts_and_depth_gate() {
        let dir = TempDir::new().unwrap();
        let events = Arc::new(ChangeBroadcaster::new(16));
        let resolver = PathResolver::new(dir.path()).unwrap();
        let store = FileStore::new(
            resolver,
            FolderDepthPolicy::new(2),
            Arc::clone(&events),
            1024,
        );

        store.create_folder("", "a").await.unwrap();
        assert!(matches!(
            store.create_folder("", "a").await,
            Err(StoreError::Conflict(_))
        ));
        store.create_folder("a", "b").await.unwrap();
        assert!(matches!(
            store.create_folder("a/b", "c").await,
            Err(StoreError::DepthExceeded(2))
        ));
        assert!(store.list("a").await.unwrap().can_create_folder);
        assert!(!store.list("a/b").await.unwrap().can_create_folder);
    }

    #[tokio::test]
    async fn upload_never_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);

        let first = store
            .save_stream("", "report.txt", body(b"original"))
            .await
            .unwrap();
        let second = store
            .save_stream("", "report.txt", body(b"new"))
            .await
            .unwrap();
        assert_eq!(first, "report.txt");
        assert_eq!(second, "report(1).txt");

        let original = std::fs::read(dir.path().join("report.txt")).unwrap();
        assert_eq!(original, b"original");
        let listing = store.list("").await.unwrap();
        assert_eq!(listing.entries.len(), 2);
    }

    #[tokio::test]
    async fn part_suffixed_filename_is_listed_and_served() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);

        let name = store
            .save_stream("", "notes.part", body(b"text"))
            .await
            .unwrap();
        assert_eq!(name, "notes.part");
        assert!(dir.path().join("notes.part").is_file());

        let listing = store.list("").await.unwrap();
        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].name, "notes.part");
        assert_eq!(listing.entries[0].size, Some(4));

        let download = store.download("notes.part").await.unwrap();
        assert_eq!(download.filename, "notes.part");
    }

    #[tokio::test]
    async fn in_flight_upload_stays_out_of_listings() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);
        let store = Arc::new(store);

        let (release, gate) = tokio::sync::oneshot::channel::<()>();
        let uploader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let data = Box::pin(async_stream::stream! {
                    yield Ok::<Bytes, io::Error>(Bytes::from_static(b"first"));
                    let _ = gate.await;
                    yield Ok(Bytes::from_static(b"rest"));
                });
                store.save_stream("", "slow.bin", data).await
            })
        };

        // Wait for the reservation to land on disk.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while std::fs::read_dir(dir.path()).unwrap().count() == 0 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "upload never started"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(store.list("").await.unwrap().entries.is_empty());

        release.send(()).unwrap();
        let name = uploader.await.unwrap().unwrap();
        assert_eq!(name, "slow.bin");

        let listing = store.list("").await.unwrap();
        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].name, "slow.bin");
        assert_eq!(listing.entries[0].size, Some(9));
    }

    #[tokio::test]
    async fn aborted_upload_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);

        let chunks: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionAborted, "client gone")),
        ];
        let result = store
            .save_stream("", "big.bin", stream::iter(chunks))
            .await;
        assert!(matches!(result, Err(StoreError::Io(_))));

        assert!(store.list("").await.unwrap().entries.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_and_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let events = Arc::new(ChangeBroadcaster::new(16));
        let resolver = PathResolver::new(dir.path()).unwrap();
        let store = FileStore::new(resolver, FolderDepthPolicy::new(5), events, 4);

        let result = store.save_stream("", "big.bin", body(b"exceeds")).await;
        assert!(matches!(result, Err(StoreError::TooLarge(4))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn delete_root_is_forbidden() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);
        assert!(matches!(
            store.delete("").await,
            Err(StoreError::RootForbidden)
        ));
        assert!(matches!(
            store.delete("/").await,
            Err(StoreError::RootForbidden)
        ));
    }

    #[tokio::test]
    async fn delete_removes_directories_recursively() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);
        store.create_folder("", "a").await.unwrap();
        store.create_folder("a", "b").await.unwrap();
        store
            .save_stream("a/b", "nested.txt", body(b"x"))
            .await
            .unwrap();

        store.delete("a/b").await.unwrap();

        let names: Vec<_> = store
            .list("a")
            .await
            .unwrap()
            .entries
            .iter()
            .map(|e| e.name.clone())
            .collect();
        assert!(names.is_empty());
        assert!(matches!(
            store.delete("a/b").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn rename_validates_name_and_collisions() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);
        store.save_stream("", "a.txt", body(b"a")).await.unwrap();
        store.save_stream("", "b.txt", body(b"b")).await.unwrap();

        assert!(matches!(
            store.rename("a.txt", "b.txt").await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.rename("a.txt", "bad/name").await,
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            store.rename("missing.txt", "c.txt").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.rename("", "c").await,
            Err(StoreError::RootForbidden)
        ));

        store.rename("a.txt", "c.txt").await.unwrap();
        let names: Vec<_> = store
            .list("")
            .await
            .unwrap()
            .entries
            .iter()
            .map(|e| e.name.clone())
            .collect();
        assert_eq!(names, ["b.txt", "c.txt"]);
    }

    #[tokio::test]
    async fn move_into_own_descendant_is_rejected_unchanged() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);
        store.create_folder("", "a").await.unwrap();
        store.create_folder("a", "b").await.unwrap();
        store.create_folder("a/b", "c").await.unwrap();

        assert!(matches!(
            store.move_entry("a/b", "a/b/c").await,
            Err(StoreError::InvalidDestination(_))
        ));
        assert!(matches!(
            store.move_entry("a/b", "a/b").await,
            Err(StoreError::InvalidDestination(_))
        ));

        // Filesystem unchanged.
        assert!(dir.path().join("a/b/c").is_dir());
    }

    #[tokio::test]
    async fn move_relocates_with_contents_and_checks_conflicts() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);
        store.create_folder("", "src").await.unwrap();
        store.create_folder("", "dst").await.unwrap();
        store
            .save_stream("src", "file.txt", body(b"payload"))
            .await
            .unwrap();

        store.move_entry("src/file.txt", "dst").await.unwrap();
        assert!(dir.path().join("dst/file.txt").is_file());
        assert!(!dir.path().join("src/file.txt").exists());

        store
            .save_stream("src", "file.txt", body(b"other"))
            .await
            .unwrap();
        assert!(matches!(
            store.move_entry("src/file.txt", "dst").await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.move_entry("src/file.txt", "nowhere").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn mutations_publish_the_affected_parent() {
        let dir = TempDir::new().unwrap();
        let (store, events) = store_with(&dir);
        store.create_folder("", "a").await.unwrap();
        store.create_folder("", "b").await.unwrap();

        let (_id, mut rx) = events.subscribe().await;

        store.create_folder("a", "sub").await.unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            ChangeEvent::DirChanged { path: "a".into() }
        );

        store.save_stream("a", "f.txt", body(b"x")).await.unwrap();
        store.finish_upload("a", 1).await;
        assert_eq!(
            next_event(&mut rx).await,
            ChangeEvent::DirChanged { path: "a".into() }
        );

        store.move_entry("a/f.txt", "b").await.unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            ChangeEvent::DirChanged { path: "a".into() }
        );
        assert_eq!(
            next_event(&mut rx).await,
            ChangeEvent::DirChanged { path: "b".into() }
        );

        store.delete("b/f.txt").await.unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            ChangeEvent::DirChanged { path: "b".into() }
        );

        // Failed mutations and empty upload batches publish nothing.
        assert!(store.create_folder("a", "sub").await.is_err());
        store.finish_upload("a", 0).await;
        assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_folder_creation_yields_one_winner() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.create_folder("", "shared").await
            }));
        }

        let mut ok = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => ok += 1,
                Err(StoreError::Conflict(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn concurrent_uploads_of_same_name_get_distinct_files() {
        let dir = TempDir::new().unwrap();
        let (store, _events) = store_with(&dir);
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..4u8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let data = stream::iter(vec![Ok(Bytes::from(vec![i; 16]))]);
                store.save_stream("", "clash.bin", data).await
            }));
        }

        let mut names = Vec::new();
        for handle in handles {
            names.push(handle.await.unwrap().unwrap());
        }
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
        assert_eq!(store.list("").await.unwrap().entries.len(), 4);
    }

    #[test]
    fn numeric_suffix_goes_before_the_extension() {
        assert_eq!(suffixed_name("report.txt", 0), "report.txt");
        assert_eq!(suffixed_name("report.txt", 1), "report(1).txt");
        assert_eq!(suffixed_name("archive.tar.gz", 2), "archive.tar(2).gz");
        assert_eq!(suffixed_name("README", 1), "README(1)");
        assert_eq!(suffixed_name(".hidden", 1), ".hidden(1)");
    }
}
