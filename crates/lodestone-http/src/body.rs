//! Adapts axum's request body stream into [`lodestone_core::ports::ByteStream`] (spec §5
//! Backpressure: the wire layer must not buffer a publish/push body before handing it to
//! the core).
use axum::body::BodyStream;
use bytes::Bytes;
use futures_core::Stream;

use lodestone_core::ports::ByteStream;
use lodestone_core::Error;

/// Wraps `body` so every chunk's transport error becomes a [`lodestone_core::Error`]
/// instead of `axum::Error`, without reading ahead or buffering.
pub fn into_byte_stream(body: BodyStream) -> ByteStream {
    use futures::StreamExt;

    Box::pin(body.map(|chunk| chunk.map_err(|e| Error::StorageError(e.to_string()))))
}

/// Buffers a stream fully in memory. Only used for document bodies the spec's own design
/// notes describe as small and whole-in-hand (OCI manifests, §4.2 "Manifest operations are
/// stateless"; ecosystem publish envelopes already collected once inside their adapter).
pub async fn collect(body: impl Stream<Item = Result<Bytes, axum::Error>> + Send) -> Result<Bytes, Error> {
    use futures::StreamExt;

    let mut buf = bytes::BytesMut::new();
    let mut body = Box::pin(body);
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| Error::InvalidRequest(e.to_string()))?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Counts the total byte length of a stream without retaining any of its contents, used by
/// `HEAD` handlers that need `Content-Length` but must not hold the whole blob in memory.
pub async fn stream_len(body: ByteStream) -> Result<u64, Error> {
    use futures::StreamExt;

    let mut body = body;
    let mut total: u64 = 0;
    while let Some(chunk) = body.next().await {
        total += chunk?.len() as u64;
    }
    Ok(total)
}
