use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    process::ChildStdin,
    sync::Mutex,
};
use tracing::trace;

use crate::ExecError;

/// Late-bound handle to the standard input of the live process.
///
/// The orchestrator binds it after spawn and unbinds it on exit; writes while
/// unbound fail with [`ExecError::NotConnected`].
#[derive(Debug)]
pub struct StdinProxy<W = ChildStdin> {
    inner: Mutex<Option<W>>,
}

impl<W> Default for StdinProxy<W> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }
}

impl<W> StdinProxy<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to a freshly spawned process, replacing any previous binding.
    pub async fn bind(&self, writer: W) {
        *self.inner.lock().await = Some(writer);
        trace!("stdin bound");
    }

    /// Detach and drop the stream, which closes it.
    pub async fn unbind(&self) {
        if self.inner.lock().await.take().is_some() {
            trace!("stdin unbound");
        }
    }

    /// Close the process input; same as [`unbind`](Self::unbind).
    pub async fn close(&self) {
        self.unbind().await;
    }

    pub async fn is_bound(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Write `line` plus a newline and flush.
    pub async fn write_line(&self, line: &str) -> Result<(), ExecError> {
        let mut guard = self.inner.lock().await;
        let writer = guard.as_mut().ok_or(ExecError::NotConnected)?;

        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}
