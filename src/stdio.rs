//! Line-delimited JSON-RPC over a byte stream
//!
//! One request per line, answered strictly in order. Partial lines are held across
//! reads; whatever remains at end of input is treated as a final request.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::mcp::{rpc::RpcResponse, server::Dispatcher};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Accumulates raw chunks and yields complete, non-blank lines.
///
/// Buffering is byte-level so a multi-byte character split across two reads is
/// reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and drains every line terminated by `\n`, trimmed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|byte| *byte == b'\n') else {
            return Vec::new();
        };

        let remainder = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, remainder);

        complete
            .split(|byte| *byte == b'\n')
            .filter_map(decode_line)
            .collect()
    }

    /// Drains the unterminated tail left at end of input, if it is not blank.
    pub fn finish(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.pending);
        decode_line(&tail)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// Serves requests read from `input` until end of input or until `shutdown`
/// resolves, writing one response line per request to `output`.
///
/// `shutdown` is only observed while waiting for input, so a response that has
/// started writing is always completed. A partial line pending at shutdown is
/// discarded.
pub async fn serve_stream<R, W, F>(
    dispatcher: &Dispatcher,
    mut input: R,
    mut output: W,
    shutdown: F,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    let mut buffer = LineBuffer::new();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    tokio::pin!(shutdown);

    loop {
        let read = tokio::select! {
            read = input.read(&mut chunk) => read?,
            () = &mut shutdown => {
                info!(pending = !buffer.is_empty(), "shutdown requested, closing stream");
                return Ok(());
            }
        };
        if read == 0 {
            break;
        }

        for line in buffer.push(&chunk[..read]) {
            respond(dispatcher, &line, &mut output).await?;
        }
    }

    if let Some(line) = buffer.finish() {
        respond(dispatcher, &line, &mut output).await?;
    }

    info!("input stream closed");
    Ok(())
}

async fn respond<W>(dispatcher: &Dispatcher, line: &str, output: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    debug!(bytes = line.len(), "received line");
    let response = dispatcher.handle_raw(line.as_bytes());
    write_response(output, &response).await
}

async fn write_response<W>(output: &mut W, response: &RpcResponse) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = serde_json::to_vec(response)?;
    encoded.push(b'\n');
    output.write_all(&encoded).await?;
    output.flush().await
}

/// Runs the stream transport over the process's stdin and stdout.
///
/// A stdin read that is pending at shutdown keeps occupying a blocking-pool
/// thread, so the caller must not wait for the runtime's blocking pool to drain.
pub async fn run_stdio<F>(dispatcher: &Dispatcher, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    info!("serving MCP over stdio");
    serve_stream(
        dispatcher,
        tokio::io::stdin(),
        tokio::io::stdout(),
        shutdown,
    )
    .await
}
