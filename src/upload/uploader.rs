//! Upload orchestrator
//!
//! Drives one upload through `prepare → chunks → finalize → commit`. Every
//! request is awaited before the next one is issued, so chunks always reach
//! the server in order and never overlap.
//!
//! # Example
//!
//! ```no_run
//! use asset_uploadr::client::HttpRequestSender;
//! use asset_uploadr::upload::{AssetMetadata, Uploader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sender = HttpRequestSender::builder()
//!     .base_url("https://assets.example.com")
//!     .token("permanent-token")
//!     .build()?;
//! let uploader = Uploader::new(sender);
//!
//! let metadata = AssetMetadata::for_new_asset("brand-1").with("name", "Holiday");
//! let result = uploader.upload("photo.jpg", metadata).await;
//! println!("{}", serde_json::to_string(&result)?);
//! # Ok(())
//! # }
//! ```

use super::chunk::{chunk_count, reader_digest, ChunkDescriptor, ChunkReader};
use super::metadata::{AssetMetadata, CommitTarget};
use super::{
    FileId, SaveResponse, UploadError, UploadResult, UploadState, UploadStep, UploadSummary,
};
use crate::client::{RequestOptions, RequestSender};
use crate::metrics;
use reqwest::Method;
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncSeekExt;
use tokio_util::sync::CancellationToken;

/// Header carrying the per-chunk digest
pub const CONTENT_SHA256_HEADER: &str = "content-sha256";

/// Prepare response keys holding the file id, in lookup order
const FILE_ID_KEYS: [&str; 2] = ["file_id", "fileId"];

/// Protocol paths, relative to the API base URL
pub mod paths {
    use super::FileId;
    use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

    const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'_')
        .remove(b'.')
        .remove(b'~');

    pub const PREPARE: &str = "v7/file_cmds/upload/prepare";

    fn segment(value: &str) -> String {
        utf8_percent_encode(value, PATH_SEGMENT).to_string()
    }

    pub fn chunk(file_id: &FileId, index: u64) -> String {
        format!(
            "v7/file_cmds/upload/{}/chunk/{}",
            segment(file_id.as_str()),
            index
        )
    }

    pub fn finalize(file_id: &FileId) -> String {
        format!(
            "v7/file_cmds/upload/{}/finalise_api",
            segment(file_id.as_str())
        )
    }

    pub fn save_new(file_id: &FileId) -> String {
        format!("api/v4/media/save/{}", segment(file_id.as_str()))
    }

    pub fn save_version(media_id: &str, file_id: &FileId) -> String {
        format!(
            "api/v4/media/{}/save/{}",
            segment(media_id),
            segment(file_id.as_str())
        )
    }
}

/// Chunked upload client
///
/// Holds nothing but the request sender, so one instance can drive any
/// number of concurrent uploads.
pub struct Uploader<S> {
    sender: Arc<S>,
}

impl<S> Clone for Uploader<S> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<S: RequestSender> Uploader<S> {
    /// Create an uploader around a request sender
    pub fn new(sender: S) -> Self {
        Self::from_arc(Arc::new(sender))
    }

    /// Create an uploader around a shared request sender
    pub fn from_arc(sender: Arc<S>) -> Self {
        Self { sender }
    }

    /// Get the request sender
    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Upload a file and commit it as an asset
    ///
    /// Never fails: faults are reported as [`UploadResult::Failed`].
    pub async fn upload<P: AsRef<Path>>(&self, path: P, metadata: AssetMetadata) -> UploadResult {
        self.upload_with_cancel(path, metadata, CancellationToken::new())
            .await
    }

    /// Like [`Uploader::upload`], stopping between chunks once `cancel` fires
    pub async fn upload_with_cancel<P: AsRef<Path>>(
        &self,
        path: P,
        metadata: AssetMetadata,
        cancel: CancellationToken,
    ) -> UploadResult {
        match self.try_upload_with_cancel(path, metadata, cancel).await {
            Ok(saved) => saved.into(),
            Err(e) => e.into(),
        }
    }

    /// Upload a file, returning the raw error on failure
    pub async fn try_upload<P: AsRef<Path>>(
        &self,
        path: P,
        metadata: AssetMetadata,
    ) -> Result<SaveResponse, UploadError> {
        self.try_upload_with_cancel(path, metadata, CancellationToken::new())
            .await
    }

    /// Upload a file with cancellation, returning the raw error on failure
    pub async fn try_upload_with_cancel<P: AsRef<Path>>(
        &self,
        path: P,
        metadata: AssetMetadata,
        cancel: CancellationToken,
    ) -> Result<SaveResponse, UploadError> {
        let path = path.as_ref();
        let target = if metadata.media_id().is_some() {
            "new_version"
        } else {
            "new_asset"
        };

        let started = Instant::now();
        let mut state = UploadState::Init;
        let result = self.run(path, metadata, &cancel, &mut state).await;

        match &result {
            Ok(saved) => {
                metrics::record_upload_success(target);
                tracing::info!(
                    path = %path.display(),
                    success = saved.success,
                    mediaid = ?saved.mediaid,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Upload committed"
                );
            }
            Err(e) => {
                metrics::record_upload_failure(target);
                metrics::record_error(e.kind());
                tracing::warn!(
                    path = %path.display(),
                    state = %state,
                    error = %e,
                    "Upload failed"
                );
                transition(&mut state, UploadState::Failed);
            }
        }

        result
    }

    #[tracing::instrument(
        name = "upload",
        skip(self, metadata, cancel, state),
        fields(
            file.path = %path.display(),
            file_id = tracing::field::Empty,
            upload.bytes = tracing::field::Empty,
            upload.chunks = tracing::field::Empty
        )
    )]
    async fn run(
        &self,
        path: &Path,
        metadata: AssetMetadata,
        cancel: &CancellationToken,
        state: &mut UploadState,
    ) -> Result<SaveResponse, UploadError> {
        check_cancelled(cancel, 0, 0)?;

        let file_id = self.prepare().await?;
        tracing::Span::current().record("file_id", file_id.as_str());
        transition(state, UploadState::Prepared);

        // One handle serves both passes; it is closed on every exit path.
        let mut file = tokio::fs::File::open(path).await?;
        let file_size = file.metadata().await?.len();
        let sha256 = reader_digest(&mut file).await?;
        file.seek(SeekFrom::Start(0)).await?;

        let total = chunk_count(file_size);
        let span = tracing::Span::current();
        span.record("upload.bytes", file_size);
        span.record("upload.chunks", total);
        transition(state, UploadState::Uploading { sent: 0, total });

        let mut reader = ChunkReader::new(file, file_id.clone());
        while let Some(chunk) = reader.next_chunk().await? {
            if chunk.index >= total {
                // File grew since its size was taken
                return Err(UploadError::ChunkCountMismatch {
                    expected: total,
                    sent: chunk.index + 1,
                });
            }
            check_cancelled(cancel, chunk.index, total)?;

            self.upload_chunk(&chunk).await?;
            transition(
                state,
                UploadState::Uploading {
                    sent: chunk.index + 1,
                    total,
                },
            );
        }

        // Once every chunk is acknowledged the upload runs to completion.
        let sent = reader.chunks_read();
        drop(reader);
        if sent != total {
            return Err(UploadError::ChunkCountMismatch {
                expected: total,
                sent,
            });
        }

        let summary = UploadSummary {
            file_id: file_id.clone(),
            file_name: file_name(path),
            file_size,
            chunk_count: total,
            sha256,
        };
        self.finalize(&summary).await?;
        transition(state, UploadState::Finalized);

        let saved = self.commit(&file_id, metadata).await?;
        transition(state, UploadState::Committed);

        Ok(saved)
    }

    /// Request a new file id
    #[tracing::instrument(name = "upload.prepare", skip(self), err)]
    pub async fn prepare(&self) -> Result<FileId, UploadError> {
        let started = Instant::now();
        let response = self
            .sender
            .send(Method::POST, paths::PREPARE, RequestOptions::new())
            .await
            .map_err(UploadError::transport(UploadStep::Prepare))?;
        metrics::record_step_duration(UploadStep::Prepare.as_str(), started.elapsed().as_secs_f64());

        let file_id = FILE_ID_KEYS
            .iter()
            .filter_map(|key| response.get(key).and_then(serde_json::Value::as_str))
            .find(|id| !id.trim().is_empty())
            .ok_or_else(|| UploadError::UnexpectedResponse {
                step: UploadStep::Prepare,
                reason: "missing file_id".into(),
            })?;

        tracing::info!(file_id = %file_id, "Prepared upload");
        Ok(FileId::new(file_id))
    }

    /// Send one chunk and wait for its acknowledgment
    #[tracing::instrument(
        name = "upload.chunk",
        skip(self, chunk),
        fields(
            file_id = %chunk.file_id,
            chunk.index = chunk.index,
            upload.bytes = chunk.data.len()
        ),
        err
    )]
    pub async fn upload_chunk(&self, chunk: &ChunkDescriptor) -> Result<(), UploadError> {
        let started = Instant::now();
        let options = RequestOptions::new()
            .header(CONTENT_SHA256_HEADER, chunk.digest.as_str())
            .bytes(chunk.data.clone());

        self.sender
            .send(
                Method::POST,
                &paths::chunk(&chunk.file_id, chunk.index),
                options,
            )
            .await
            .map_err(UploadError::transport(UploadStep::Chunk))?;

        metrics::record_step_duration(UploadStep::Chunk.as_str(), started.elapsed().as_secs_f64());
        metrics::record_chunk(chunk.data.len() as u64);
        tracing::debug!(index = chunk.index, size = chunk.data.len(), "Uploaded chunk");
        Ok(())
    }

    /// Declare the chunk stream complete
    #[tracing::instrument(
        name = "upload.finalize",
        skip(self, summary),
        fields(
            file_id = %summary.file_id,
            upload.bytes = summary.file_size,
            upload.chunks = summary.chunk_count
        ),
        err
    )]
    pub async fn finalize(&self, summary: &UploadSummary) -> Result<(), UploadError> {
        let started = Instant::now();
        self.sender
            .send(
                Method::POST,
                &paths::finalize(&summary.file_id),
                RequestOptions::new().form(summary.form_fields()),
            )
            .await
            .map_err(UploadError::transport(UploadStep::Finalize))?;

        metrics::record_step_duration(
            UploadStep::Finalize.as_str(),
            started.elapsed().as_secs_f64(),
        );
        metrics::record_finalized(summary.chunk_count);
        tracing::info!(
            file_id = %summary.file_id,
            chunks = summary.chunk_count,
            "Finalized upload"
        );
        Ok(())
    }

    /// Commit a finalized upload as a new asset or a new version
    ///
    /// Validates the metadata before any request is made.
    #[tracing::instrument(
        name = "upload.commit",
        skip(self, metadata),
        fields(file_id = %file_id, commit.target = tracing::field::Empty),
        err
    )]
    pub async fn commit(
        &self,
        file_id: &FileId,
        mut metadata: AssetMetadata,
    ) -> Result<SaveResponse, UploadError> {
        let target = metadata.resolve_target()?;
        tracing::Span::current().record("commit.target", target.kind());

        let path = match &target {
            CommitTarget::NewAsset => paths::save_new(file_id),
            CommitTarget::NewVersion { media_id } => paths::save_version(media_id, file_id),
        };

        let started = Instant::now();
        let response = self
            .sender
            .send(
                Method::POST,
                &path,
                RequestOptions::new().form(metadata.into_form()),
            )
            .await
            .map_err(UploadError::transport(UploadStep::Commit))?;
        metrics::record_step_duration(UploadStep::Commit.as_str(), started.elapsed().as_secs_f64());

        let saved: SaveResponse =
            serde_json::from_value(response).map_err(|e| UploadError::UnexpectedResponse {
                step: UploadStep::Commit,
                reason: e.to_string(),
            })?;

        if !saved.success {
            tracing::warn!(file_id = %file_id, "Service reported unsuccessful save");
        }
        Ok(saved)
    }
}

fn transition(state: &mut UploadState, next: UploadState) {
    tracing::debug!(from = %state, to = %next, "Upload state transition");
    *state = next;
}

fn check_cancelled(cancel: &CancellationToken, sent: u64, total: u64) -> Result<(), UploadError> {
    if cancel.is_cancelled() {
        Err(UploadError::Aborted { sent, total })
    } else {
        Ok(())
    }
}

/// Final path component, as sent in `fileName`
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
