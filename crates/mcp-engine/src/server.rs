//! MCP Server
//!
//! Owns the read -> dispatch -> write cycle. One frame is fully handled, tool
//! call included, before the next one is read, so responses come out in
//! request order without any reordering by id.

use std::future::Future;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::{info, warn};

use crate::dispatch::Dispatcher;
use crate::frame::{Frame, FrameReader, FramingError};
use crate::session::Session;
use crate::writer::ResponseWriter;

/// MCP Server that communicates over line-delimited JSON-RPC
pub struct Server {
    dispatcher: Dispatcher,
    session: Session,
}

impl Server {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve on the process's stdin/stdout until EOF or Ctrl-C.
    pub async fn serve_stdio(&mut self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        };

        self.serve_with_shutdown(reader, tokio::io::stdout(), shutdown)
            .await
    }

    /// Serve until the input reaches end of stream.
    pub async fn serve<R, W>(&mut self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.serve_with_shutdown(reader, writer, std::future::pending())
            .await
    }

    /// Serve until end of stream or until `shutdown` resolves. Shutdown only
    /// interrupts the wait for the next frame; a request already being
    /// dispatched still gets its response.
    pub async fn serve_with_shutdown<R, W, S>(
        &mut self,
        reader: R,
        writer: W,
        shutdown: S,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        let mut frames = FrameReader::new(reader);
        let mut responses = ResponseWriter::new(writer);
        tokio::pin!(shutdown);

        info!(
            tools = self.dispatcher.tools().len(),
            "Serving MCP over line-delimited JSON-RPC"
        );

        while !self.session.is_closed() {
            let frame = tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.session.close();
                    break;
                }
                frame = frames.next_frame() => frame.context("Failed to read from input")?,
            };

            match frame {
                Frame::EndOfStream => {
                    info!("Client disconnected");
                    self.session.close();
                }
                Frame::Malformed(err) => {
                    if let Some(response) = reject(err) {
                        responses.write(&response).await?;
                    }
                }
                Frame::Request(request) => {
                    let dispatched = self.dispatcher.dispatch(request, &self.session).await;
                    if let Some(transition) = dispatched.transition {
                        self.session.apply(transition);
                    }
                    if let Some(response) = dispatched.response {
                        responses.write(&response).await?;
                    }
                }
            }
        }

        Ok(())
    }
}

fn reject(err: FramingError) -> Option<crate::protocol::Response> {
    const MAX_LOGGED: usize = 200;
    let raw: String = err.raw_line.chars().take(MAX_LOGGED).collect();

    match &err.id {
        Some(id) => warn!(id = %id, error = %err.cause, raw = %raw, "Rejecting malformed frame"),
        None => warn!(error = %err.cause, raw = %raw, "Dropping malformed frame without id"),
    }

    err.into_response()
}
