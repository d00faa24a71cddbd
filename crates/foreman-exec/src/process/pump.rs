use std::time::Duration;

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::{Instant, timeout_at},
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{
    ExecError,
    process::{OutputStream, ProcessHooks},
};

/// Total time a pump keeps draining after the process exited.
///
/// Grandchildren may inherit the pipe and keep writing to it indefinitely.
const DRAIN_WINDOW: Duration = Duration::from_millis(250);

/// Forward chunks of `reader` to `hooks` until EOF.
///
/// Once `exited` fires the pump drains for at most [`DRAIN_WINDOW`] more.
pub(crate) async fn pump<R>(
    mut reader: R,
    stream: OutputStream,
    hooks: &dyn ProcessHooks,
    exited: &CancellationToken,
    chunk_size: usize,
) -> Result<(), ExecError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut pending = Vec::new();
    let mut drain_until: Option<Instant> = None;

    loop {
        let n = if let Some(deadline) = drain_until {
            match timeout_at(deadline, reader.read(&mut buf)).await {
                Ok(res) => res?,
                Err(_) => {
                    trace!(stream = stream.as_str(), "drain window elapsed");
                    break;
                }
            }
        } else {
            tokio::select! {
                res = reader.read(&mut buf) => res?,
                _ = exited.cancelled() => {
                    drain_until = Some(Instant::now() + DRAIN_WINDOW);
                    continue;
                }
            }
        };
        if n == 0 {
            break;
        }

        pending.extend_from_slice(&buf[..n]);
        let text = take_utf8(&mut pending);
        if !text.is_empty() {
            hooks.output(stream, &text).await?;
        }
    }

    if !pending.is_empty() {
        let rest = String::from_utf8_lossy(&pending).into_owned();
        hooks.output(stream, &rest).await?;
    }
    trace!(stream = stream.as_str(), "output pump finished");
    Ok(())
}

/// Decode the longest valid UTF-8 prefix of `pending`, keeping an incomplete
/// trailing sequence for the next read. Invalid bytes are replaced.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let rest = pending.split_off(valid);
            let text = String::from_utf8_lossy(pending).into_owned();
            *pending = rest;
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}
