//! Chunked media upload: `INIT`, concurrent `APPEND`s, `FINALIZE` and the
//! optional `STATUS` check.

use std::{fmt, ops::Range, time::Duration};

use futures::{
    future::{AbortRegistration, Abortable},
    stream, StreamExt,
};
use http::Method;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info, warn};

use crate::{
    Client, CommandError, HttpResponse, HttpTransport, SignedRequest, UploadError, UploadResult,
};

/// Media upload endpoint of the reference service.
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://upload.twitter.com/1.1/media/upload.json";
/// 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
pub const DEFAULT_CHECK_AFTER: Duration = Duration::from_secs(5);

const COMMAND_KEY: &str = "command";
const MEDIA_ID_KEY: &str = "media_id";

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MediaId(pub u64);

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    InProgress,
    Failed,
    Succeeded,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProcessingInfo {
    pub state: ProcessingState,
    pub check_after_secs: Option<u64>,
}

/// Body of the `FINALIZE` and `STATUS` responses.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProcessingResponse {
    pub media_id: MediaId,
    pub processing_info: Option<ProcessingInfo>,
}

#[derive(Deserialize, Debug)]
struct InitResponse {
    media_id: MediaId,
}

/// A finished upload. `index` is the value handed to [`MediaUploader::new`],
/// so concurrent uploads can be matched back to their submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOutcome {
    pub media_id: MediaId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Init,
    Append,
    Finalize,
    Status,
}

impl Command {
    fn as_str(self) -> &'static str {
        match self {
            Command::Init => "INIT",
            Command::Append => "APPEND",
            Command::Finalize => "FINALIZE",
            Command::Status => "STATUS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    endpoint: String,
    chunk_size: usize,
    default_check_after: Duration,
    status_checks: u32,
    max_concurrent_appends: Option<usize>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        UploadOptions {
            endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            default_check_after: DEFAULT_CHECK_AFTER,
            status_checks: 1,
            max_concurrent_appends: None,
        }
    }
}

impl UploadOptions {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn endpoint<T: Into<String>>(self, endpoint: T) -> Self {
        UploadOptions {
            endpoint: endpoint.into(),
            ..self
        }
    }

    /// Size of every `APPEND` segment but the last. Zero is treated as one.
    pub fn chunk_size(self, chunk_size: usize) -> Self {
        UploadOptions {
            chunk_size: chunk_size.max(1),
            ..self
        }
    }

    /// Delay before a `STATUS` check when the server gave no `check_after_secs`.
    pub fn default_check_after(self, delay: Duration) -> Self {
        UploadOptions {
            default_check_after: delay,
            ..self
        }
    }

    /// How many `STATUS` checks are made while the media is still
    /// `pending` or `in_progress` before giving up.
    ///
    /// # Note
    /// The default is a single check. Zero is treated as one.
    pub fn status_checks(self, checks: u32) -> Self {
        UploadOptions {
            status_checks: checks.max(1),
            ..self
        }
    }

    /// Limits the number of `APPEND` requests in flight. By default every
    /// segment is sent at once.
    pub fn max_concurrent_appends(self, limit: usize) -> Self {
        UploadOptions {
            max_concurrent_appends: Some(limit.max(1)),
            ..self
        }
    }
}

/// Byte ranges of the `APPEND` segments for a payload of `total` bytes.
///
/// There is always at least one segment; an empty payload yields one empty
/// segment.
pub fn chunk_ranges(total: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let chunk_size = chunk_size.max(1);
    let count = (total / chunk_size + usize::from(total % chunk_size != 0)).max(1);
    (0..count)
        .map(|i| {
            let start = i * chunk_size;
            start..total.min(start + chunk_size)
        })
        .collect()
}

/// Uploads one piece of media. The uploader is consumed by
/// [`upload`](MediaUploader::upload); a failed upload has to be started over
/// with a new instance.
pub struct MediaUploader<'u, 'a, T> {
    client: &'u Client<'a, T>,
    media: &'u [u8],
    media_type: &'u str,
    index: usize,
    options: UploadOptions,
}

impl<'u, 'a, T> MediaUploader<'u, 'a, T>
where
    T: HttpTransport,
{
    pub fn new(client: &'u Client<'a, T>, media: &'u [u8], media_type: &'u str, index: usize) -> Self {
        MediaUploader {
            client,
            media,
            media_type,
            index,
            options: UploadOptions::default(),
        }
    }

    pub fn options(self, options: UploadOptions) -> Self {
        MediaUploader { options, ..self }
    }

    /// Runs the whole upload.
    ///
    /// # Errors
    ///
    /// Each phase fails with its own [`UploadError`] variant; no media id is
    /// returned unless every phase succeeded.
    pub async fn upload(self) -> UploadResult<UploadOutcome> {
        let media_id = self.init().await.map_err(|e| {
            warn!(error = %e, "INIT failed");
            UploadError::InitFailed(e)
        })?;
        info!(%media_id, total_bytes = self.media.len(), "media upload initialized");

        self.append(media_id).await?;

        let finalized = self
            .command::<ProcessingResponse>(Method::POST, Command::Finalize, media_id)
            .await
            .map_err(|e| {
                warn!(%media_id, error = %e, "FINALIZE failed");
                UploadError::FinalizeFailed(e)
            })?;

        match finalized.processing_info {
            None => {
                info!(media_id = %finalized.media_id, "media upload finished");
                Ok(UploadOutcome {
                    media_id: finalized.media_id,
                    index: self.index,
                })
            }
            Some(processing_info) => self.poll(media_id, processing_info).await,
        }
    }

    /// Runs the upload until it finishes or `registration` is aborted.
    ///
    /// Aborting drops every in-flight request of the upload, including all
    /// outstanding `APPEND`s, and yields [`UploadError::Cancelled`].
    pub async fn upload_abortable(self, registration: AbortRegistration) -> UploadResult<UploadOutcome> {
        match Abortable::new(self.upload(), registration).await {
            Ok(result) => result,
            Err(_) => {
                warn!("media upload cancelled");
                Err(UploadError::Cancelled)
            }
        }
    }

    async fn init(&self) -> Result<MediaId, CommandError> {
        let request = self
            .client
            .post(&self.options.endpoint)
            .parameters(vec![
                (COMMAND_KEY, Command::Init.as_str().to_string()),
                ("total_bytes", self.media.len().to_string()),
                ("media_type", self.media_type.to_string()),
            ])
            .build()?;
        let response: InitResponse = decode(self.send(request).await?)?;
        Ok(response.media_id)
    }

    async fn append(&self, media_id: MediaId) -> UploadResult<()> {
        let ranges = chunk_ranges(self.media.len(), self.options.chunk_size);
        let limit = self.options.max_concurrent_appends.unwrap_or(ranges.len());

        // all segments have to finish before the outcome is known
        let results = stream::iter(ranges.into_iter().enumerate())
            .map(|(segment_index, range)| async move {
                let result = self
                    .append_segment(media_id, segment_index, &self.media[range])
                    .await;
                (segment_index, result)
            })
            .buffer_unordered(limit)
            .collect::<Vec<_>>()
            .await;

        let segments = results.len();
        let mut failures = results
            .into_iter()
            .filter_map(|(segment_index, result)| result.err().map(|e| (segment_index, e)))
            .collect::<Vec<_>>();
        failures.sort_by_key(|(segment_index, _)| *segment_index);

        let failed_segments = failures.len();
        match failures.into_iter().next() {
            None => {
                info!(%media_id, segments, "all segments appended");
                Ok(())
            }
            Some((segment_index, source)) => {
                warn!(%media_id, segment_index, failed_segments, error = %source, "APPEND failed");
                Err(UploadError::AppendFailed {
                    segment_index,
                    failed_segments,
                    source,
                })
            }
        }
    }

    async fn append_segment(
        &self,
        media_id: MediaId,
        segment_index: usize,
        chunk: &[u8],
    ) -> Result<(), CommandError> {
        let request = self
            .client
            .post(&self.options.endpoint)
            .parameters(vec![
                (COMMAND_KEY, Command::Append.as_str().to_string()),
                (MEDIA_ID_KEY, media_id.to_string()),
                ("segment_index", segment_index.to_string()),
            ])
            .media(chunk)
            .build()?;
        let response = self.send(request).await?;
        if response.status.is_success() {
            debug!(%media_id, segment_index, bytes = chunk.len(), "segment appended");
            Ok(())
        } else {
            Err(CommandError::Status(response.status, response.text()))
        }
    }

    async fn poll(&self, media_id: MediaId, mut processing_info: ProcessingInfo) -> UploadResult<UploadOutcome> {
        let mut checks = 0;
        loop {
            let delay = processing_info
                .check_after_secs
                .map(Duration::from_secs)
                .unwrap_or(self.options.default_check_after);
            debug!(%media_id, state = ?processing_info.state, ?delay, "waiting for media processing");
            tokio::time::sleep(delay).await;
            checks += 1;

            let status = match self
                .command::<ProcessingResponse>(Method::GET, Command::Status, media_id)
                .await
            {
                Ok(status) => status,
                Err(e) => {
                    warn!(%media_id, error = %e, "STATUS failed");
                    return Err(UploadError::GiveUp {
                        state: Some(processing_info.state),
                        recovery_hint: "status check failed; upload the media again".to_string(),
                        source: Some(e),
                    });
                }
            };

            match status.processing_info {
                Some(ProcessingInfo {
                    state: ProcessingState::Succeeded,
                    ..
                }) => {
                    info!(media_id = %status.media_id, checks, "media processing succeeded");
                    return Ok(UploadOutcome {
                        media_id: status.media_id,
                        index: self.index,
                    });
                }
                Some(next)
                    if next.state != ProcessingState::Failed
                        && checks < self.options.status_checks =>
                {
                    processing_info = next;
                }
                other => {
                    let state = other.map(|info| info.state);
                    warn!(%media_id, ?state, checks, "giving up on media processing");
                    return Err(UploadError::GiveUp {
                        state,
                        recovery_hint: format!(
                            "media was not processed after {} status check(s); upload the media again",
                            checks
                        ),
                        source: None,
                    });
                }
            }
        }
    }

    async fn command<R: DeserializeOwned>(
        &self,
        method: Method,
        command: Command,
        media_id: MediaId,
    ) -> Result<R, CommandError> {
        let request = self
            .client
            .request(method, &self.options.endpoint)
            .parameters(vec![
                (COMMAND_KEY, command.as_str().to_string()),
                (MEDIA_ID_KEY, media_id.to_string()),
            ])
            .build()?;
        decode(self.send(request).await?)
    }

    async fn send(&self, request: SignedRequest) -> Result<HttpResponse, CommandError> {
        debug!(method = %request.method, url = %request.url, "sending upload command");
        Ok(self.client.transport().send(request).await?)
    }
}

fn decode<R: DeserializeOwned>(response: HttpResponse) -> Result<R, CommandError> {
    if !response.status.is_success() {
        return Err(CommandError::Status(response.status, response.text()));
    }
    Ok(response.json()?)
}
