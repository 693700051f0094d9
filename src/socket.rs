//! # Summary
//!
//! This module abstracts over connections between nodes and to the tracker.
//!
//! Currently uses `tokio-serde`'s bincode format on top of `tokio-util`'s
//! length-delimited codec, which in turn wraps `tokio`'s TCP stream. This
//! allows us to send and receive Rust structs through a TCP connection with
//! minimal boilerplate on both ends.
//!
//! Every connection carries request/response pairs in lockstep: the server
//! side answers each request before reading the next one.

use std::future::Future;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_serde::formats::Bincode;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;

/// Bidirectional channel that reads `R` and writes `T`.
pub type Channel<R, T> = tokio_serde::Framed<
    Framed<TcpStream, LengthDelimitedCodec>,
    R,
    T,
    Bincode<R, T>,
>;

/// Wrap a `tokio::net::TcpStream` into a channel capable of reading and
/// writing bincode-encoded data.
pub fn channel<R, T>(stream: TcpStream) -> Channel<R, T>
where R: serde::de::DeserializeOwned,
      T: serde::Serialize,
{
    stream.set_nodelay(true).ok();
    tokio_serde::Framed::new(
        Framed::new(stream, LengthDelimitedCodec::new()),
        Bincode::default(),
    )
}

/// Something that answers requests arriving on a listener.
pub trait Handler: Send + Sync + 'static {
    type Request: serde::de::DeserializeOwned + std::fmt::Debug + Send + Unpin + 'static;
    type Response: serde::Serialize + std::fmt::Debug + Send + Unpin + 'static;

    fn handle(&self, request: Self::Request) -> impl Future<Output = Self::Response> + Send;
}

/// Accepts connections until `shutdown` fires, serving each on its own task.
pub async fn serve<H: Handler>(listener: TcpListener, handler: Arc<H>, shutdown: CancellationToken) {
    loop {
        let stream = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
            | Ok((stream, addr)) => {
                trace!("accepted connection from {}", addr);
                stream
            }
            | Err(error) => {
                warn!("failed to accept connection: {}", error);
                continue
            }
            },
        };
        let handler = handler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => (),
                _ = connection(stream, handler) => (),
            }
        });
    }
    debug!("stopped listening on {:?}", listener.local_addr());
}

async fn connection<H: Handler>(stream: TcpStream, handler: Arc<H>) {
    let mut channel: Channel<H::Request, H::Response> = channel(stream);
    while let Some(Ok(request)) = channel.next().await {
        trace!("received {:?}", request);
        let response = handler.handle(request).await;
        trace!("sending {:?}", response);
        if channel.send(response).await.is_err() {
            break
        }
    }
}
