//! Streaming zip export of a folder tree.
//!
//! The archive is produced on a blocking thread and handed to the response
//! body through a bounded channel, one chunk at a time. Blob contents are
//! copied straight from the provider stream into the zip entry, so no file
//! is ever held in memory whole.

use std::collections::VecDeque;
use std::io::{self, Seek, Write};
use std::sync::Arc;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use phynix_auth::EffectivePermissionResolver;
use phynix_core::error::{AppError, ErrorKind};
use phynix_core::result::AppResult;
use phynix_core::traits::storage::{ByteStream, StorageProvider};
use phynix_database::{FileStore, FolderStore};
use phynix_entity::folder::Folder;
use phynix_entity::permission::{ResourceType, ShareRole};

use crate::context::RequestContext;

/// Bytes buffered before a chunk is handed to the response.
const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks in flight between the archive writer and the response.
const CHANNEL_DEPTH: usize = 8;

/// A zip archive being streamed to the caller.
pub struct ZipDownload {
    /// Suggested archive name.
    pub file_name: String,
    /// Archive bytes. Dropping the stream cancels the export.
    pub stream: ByteStream,
}

impl std::fmt::Debug for ZipDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipDownload")
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// Builds zip archives of folder trees.
#[derive(Clone)]
pub struct FolderExport {
    folders: Arc<dyn FolderStore>,
    files: Arc<dyn FileStore>,
    storage: Arc<dyn StorageProvider>,
    resolver: Arc<EffectivePermissionResolver>,
}

impl std::fmt::Debug for FolderExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderExport").finish()
    }
}

impl FolderExport {
    /// Creates a new folder export service.
    pub fn new(
        folders: Arc<dyn FolderStore>,
        files: Arc<dyn FileStore>,
        storage: Arc<dyn StorageProvider>,
        resolver: Arc<EffectivePermissionResolver>,
    ) -> Self {
        Self {
            folders,
            files,
            storage,
            resolver,
        }
    }

    /// Start streaming a zip of every active file beneath a folder.
    ///
    /// Access and existence are checked before the first byte. After that
    /// point failures are logged and end the stream early. `cancel` stops the
    /// export between files and between folder levels.
    pub async fn export(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
        cancel: CancellationToken,
    ) -> AppResult<ZipDownload> {
        self.resolver
            .require_permission(ctx.user_id, ResourceType::Folder, folder_id, ShareRole::Viewer)
            .await?;
        let folder = self
            .folders
            .find_folder(folder_id)
            .await?
            .filter(Folder::is_active)
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;

        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let job = ExportJob {
            folders: self.folders.clone(),
            files: self.files.clone(),
            storage: self.storage.clone(),
            handle: Handle::current(),
            cancel: cancel.clone(),
        };
        let root = folder.clone();
        let user_id = ctx.user_id;

        tokio::task::spawn_blocking(move || {
            let failed = CancellationToken::new();
            let writer = ChannelWriter::new(tx.clone(), job.cancel.clone(), failed.clone());
            match job.write_archive(root.id, writer, &failed) {
                Ok(files) => info!(user_id = %user_id, folder_id = %root.id, files, "Folder export finished"),
                Err(e) => {
                    warn!(user_id = %user_id, folder_id = %root.id, error = %e, "Folder export stopped");
                    // The body must end in an error so the client never
                    // mistakes a truncated archive for a complete one.
                    if !job.cancel.is_cancelled() && tx.blocking_send(Err(io::Error::other(e.message))).is_err() {
                        warn!(folder_id = %root.id, "Download closed before export error was delivered");
                    }
                }
            }
        });

        let guard = cancel.drop_guard();
        let stream = futures::stream::unfold((rx, guard), |(mut rx, guard)| async move {
            rx.recv().await.map(|chunk| (chunk, (rx, guard)))
        });

        Ok(ZipDownload {
            file_name: format!("{}.zip", folder.name),
            stream: Box::pin(stream),
        })
    }
}

/// State moved onto the blocking thread.
struct ExportJob {
    folders: Arc<dyn FolderStore>,
    files: Arc<dyn FileStore>,
    storage: Arc<dyn StorageProvider>,
    handle: Handle,
    cancel: CancellationToken,
}

impl ExportJob {
    /// Write and finalize the archive.
    ///
    /// On failure `failed` is tripped before the zip writer drops, so no
    /// central directory is written after a partial entry.
    fn write_archive(&self, root_id: Uuid, writer: ChannelWriter, failed: &CancellationToken) -> AppResult<usize> {
        let mut zip = ZipWriter::new_stream(writer);
        match self.write_entries(root_id, &mut zip) {
            Ok(written) => {
                zip.finish().map_err(zip_error)?;
                Ok(written)
            }
            Err(e) => {
                failed.cancel();
                Err(e)
            }
        }
    }

    /// Write the tree breadth-first: a level's files, then its subfolders.
    fn write_entries<W: Write + Seek>(&self, root_id: Uuid, zip: &mut ZipWriter<W>) -> AppResult<usize> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut pending = VecDeque::from([(root_id, String::new())]);
        let mut written = 0;

        while let Some((folder_id, prefix)) = pending.pop_front() {
            self.check_cancelled()?;

            for file in self.handle.block_on(self.files.list_folder_files(folder_id))? {
                self.check_cancelled()?;
                let entry = format!("{prefix}{}", file.name);
                match self.copy_blob(zip, &entry, &file.storage_key, options) {
                    Ok(()) => written += 1,
                    Err(e) if e.kind == ErrorKind::NotFound => {
                        warn!(file_id = %file.id, entry = %entry, "Blob missing, skipping zip entry");
                    }
                    Err(e) => return Err(e),
                }
            }

            for child in self.handle.block_on(self.folders.list_child_folders(folder_id))? {
                let dir = format!("{prefix}{}/", child.name);
                zip.add_directory(dir.clone(), options).map_err(zip_error)?;
                pending.push_back((child.id, dir));
            }
        }

        Ok(written)
    }

    fn copy_blob<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        entry: &str,
        key: &str,
        options: SimpleFileOptions,
    ) -> AppResult<()> {
        let stream = self.handle.block_on(self.storage.get(key))?;
        zip.start_file(entry.to_string(), options).map_err(zip_error)?;
        let mut reader = SyncIoBridge::new_with_handle(StreamReader::new(stream), self.handle.clone());
        io::copy(&mut reader, zip)?;
        Ok(())
    }

    fn check_cancelled(&self) -> AppResult<()> {
        if self.cancel.is_cancelled() {
            return Err(AppError::service_unavailable("Folder export cancelled"));
        }
        Ok(())
    }
}

fn zip_error(err: zip::result::ZipError) -> AppError {
    AppError::with_source(ErrorKind::Storage, format!("Zip write failed: {err}"), err)
}

/// `Write` adapter feeding fixed-size chunks into the response channel.
///
/// Refuses further writes once cancelled, once the export failed, or once
/// the receiver is gone, so an abandoned archive is never finalized.
struct ChannelWriter {
    tx: mpsc::Sender<Result<Bytes, io::Error>>,
    cancel: CancellationToken,
    failed: CancellationToken,
    buf: Vec<u8>,
}

impl ChannelWriter {
    fn new(
        tx: mpsc::Sender<Result<Bytes, io::Error>>,
        cancel: CancellationToken,
        failed: CancellationToken,
    ) -> Self {
        Self {
            tx,
            cancel,
            failed,
            buf: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn check_open(&self) -> io::Result<()> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "export cancelled"));
        }
        if self.failed.is_cancelled() {
            return Err(io::Error::other("export failed"));
        }
        Ok(())
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        self.check_open()?;
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE)));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "download closed"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.check_open()?;
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_SIZE {
            self.send_buffered()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        if let Err(e) = self.send_buffered() {
            if !self.buf.is_empty() {
                warn!(error = %e, "Dropped unsent archive bytes");
            }
        }
    }
}
