use crate::error::{AppError, AppResult};
use futures::{Stream, TryStreamExt, stream};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use std::io;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

const FILE_SENTINEL: char = '@';
const CHUNK_SIZE: usize = 64 * 1024;

/// Boxed body type handed to hyper, whatever the source.
pub type RequestBody = UnsyncBoxBody<Bytes, io::Error>;

/// Where the request body comes from.
#[derive(Debug)]
pub enum BodySource {
    Empty,
    Inline(Bytes),
    /// Open handle; closed when the body is dropped, on success or failure.
    File { path: PathBuf, file: File },
}

impl BodySource {
    /// Resolves a `-d` specifier: empty means no body, `@name` streams the
    /// file `name`, anything else is sent verbatim.
    pub async fn resolve(specifier: &str) -> AppResult<Self> {
        if specifier.is_empty() {
            return Ok(Self::Empty);
        }

        match specifier.strip_prefix(FILE_SENTINEL) {
            Some(name) => {
                let file = File::open(name).await.map_err(|e| AppError::Body {
                    specifier: specifier.to_string(),
                    cause: e.into(),
                })?;
                debug!(path = name, "request body streams from file");
                Ok(Self::File {
                    path: PathBuf::from(name),
                    file,
                })
            }
            None => {
                debug!(bytes = specifier.len(), "request body given inline");
                Ok(Self::Inline(Bytes::copy_from_slice(specifier.as_bytes())))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn into_http_body(self) -> RequestBody {
        match self {
            Self::Empty => Empty::<Bytes>::new().map_err(|never| match never {}).boxed_unsync(),
            Self::Inline(bytes) => Full::new(bytes).map_err(|never| match never {}).boxed_unsync(),
            Self::File { path, file } => {
                debug!(path = %path.display(), "streaming request body from file");
                StreamBody::new(file_chunks(file).map_ok(Frame::data)).boxed_unsync()
            }
        }
    }
}

fn file_chunks(file: File) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let read = file.read(&mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        buf.truncate(read);
        Ok(Some((Bytes::from(buf), file)))
    })
}
