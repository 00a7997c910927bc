//! Streaming body wrappers used while a blob is in flight (spec §5 Backpressure: "the
//! implementation MUST NOT buffer full bodies in memory").
use core::pin::Pin;
use core::task::{Context, Poll};
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use futures_core::stream::Stream;
use pin_project::pin_project;

use crate::digest::Digester;
use crate::errors::{Error, Result};
use crate::ports::ByteStream;

/// Wraps a [`ByteStream`], incrementally feeding every chunk that passes through into a
/// shared [`Digester`] so the core can compute a blob's digest while it streams to the
/// blob store, without a second read pass.
#[pin_project]
pub struct DigestBody {
    #[pin]
    body: ByteStream,
    digester: Arc<Mutex<Digester>>,
}

impl DigestBody {
    pub fn new(body: ByteStream, digester: Arc<Mutex<Digester>>) -> ByteStream {
        Box::pin(Self { body, digester })
    }
}

impl Stream for DigestBody {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match this.body.poll_next(cx) {
            Poll::Ready(Some(Ok(bytes))) => {
                this.digester
                    .lock()
                    .expect("digester mutex poisoned")
                    .update(bytes.as_ref());
                Poll::Ready(Some(Ok(bytes)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

const CHUNK_SIZE: usize = 6 * 1024 * 1024;

/// Re-chunks an arbitrarily-segmented [`ByteStream`] (e.g. many small OCI PATCH bodies)
/// into fixed-size buffers before it reaches the blob store backend, bounding the number
/// of small writes without ever holding more than one chunk in memory at a time.
#[pin_project]
pub struct ChunkedBody {
    #[pin]
    body: ByteStream,
    buffer: BytesMut,
}

impl ChunkedBody {
    pub fn new(body: ByteStream) -> ByteStream {
        Box::pin(Self {
            body,
            buffer: BytesMut::with_capacity(CHUNK_SIZE),
        })
    }
}

impl Stream for ChunkedBody {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        match this.body.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(mut bytes))) => {
                let remaining = CHUNK_SIZE - this.buffer.len();
                if bytes.len() < remaining {
                    this.buffer.extend_from_slice(&bytes);
                    Poll::Pending
                } else if bytes.len() == remaining {
                    this.buffer.extend_from_slice(&bytes);
                    let buf = this.buffer.split();
                    Poll::Ready(Some(Ok(buf.freeze())))
                } else {
                    let exact = bytes.split_to(remaining);
                    this.buffer.extend_from_slice(&exact);
                    let buf = this.buffer.split();
                    this.buffer.extend_from_slice(&bytes);
                    Poll::Ready(Some(Ok(buf.freeze())))
                }
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => {
                if !this.buffer.is_empty() {
                    let buf = this.buffer.split();
                    Poll::Ready(Some(Ok(buf.freeze())))
                } else {
                    Poll::Ready(None)
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Reads an entire [`ByteStream`] into memory. Only used where the spec requires a whole
/// document in hand before acting (OCI manifest bodies, which are capped small JSON, and
/// adapter container parsing that needs random access into a zip/tar central directory) —
/// never for the primary upload path, which stays streaming end to end.
pub async fn collect(mut body: ByteStream) -> Result<Bytes> {
    use futures::StreamExt;

    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

pub fn once(bytes: Bytes) -> ByteStream {
    Box::pin(futures::stream::once(async move { Ok::<_, Error>(bytes) }))
}

#[cfg(test)]
mod test {
    use futures::StreamExt;

    use super::*;
    use crate::digest::OciDigest;

    fn stream_of(chunks: Vec<&'static str>) -> ByteStream {
        Box::pin(futures::stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from(c))),
        ))
    }

    #[tokio::test]
    async fn digest_body_computes_digest_while_passing_bytes_through() {
        let digest = OciDigest::from_bytes(b"helloworld");
        let digester = Arc::new(Mutex::new(digest.digester()));
        let body = DigestBody::new(stream_of(vec!["hello", "world"]), digester.clone());
        let collected = collect(body).await.unwrap();
        assert_eq!(collected, Bytes::from("helloworld"));

        let computed = Arc::try_unwrap(digester)
            .unwrap_or_else(|_| panic!("digester still shared"))
            .into_inner()
            .unwrap()
            .finalize_oci();
        assert_eq!(computed, digest);
    }

    #[tokio::test]
    async fn chunked_body_rebuffers_to_fixed_size() {
        let small = vec!["a"; 10];
        let body = ChunkedBody::new(stream_of(small));
        let mut body = body;
        let mut total = 0;
        while let Some(chunk) = body.next().await {
            total += chunk.unwrap().len();
        }
        assert_eq!(total, 10);
    }
}
