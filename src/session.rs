//! Line-oriented command session
//!
//! Reads commands line by line from any async reader, runs them through a
//! [`Dispatcher`] and writes replies to an async writer. A session stops at
//! end of input, at `END`, or when its shutdown handle fires.

use crate::{
    config::{OutputFormat, SessionConfig},
    dispatcher::{Dispatch, Dispatcher},
    error::{LayerKvError, Result},
    protocol::{Command, Output, Reply},
    store::Store,
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::broadcast,
};
use tracing::{debug, info};

/// Counters reported when a session finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub lines: usize,
    pub executed: usize,
    pub ignored: usize,
    /// Whether the session stopped because of `END`
    pub ended: bool,
}

/// Stops a running session at the next line boundary
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    /// Trigger graceful shutdown
    pub fn shutdown(&self) -> Result<()> {
        self.tx
            .send(())
            .map_err(|_| LayerKvError::Session("Failed to send shutdown signal".to_string()))?;
        Ok(())
    }
}

/// One command session over a single store
pub struct Session<S: Store> {
    dispatcher: Dispatcher<S>,
    config: SessionConfig,
    shutdown_tx: broadcast::Sender<()>,
    // Held from construction so a shutdown sent before `run` is not lost.
    shutdown_rx: broadcast::Receiver<()>,
}

impl<S: Store> Session<S> {
    pub fn new(store: S, config: SessionConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        Self {
            dispatcher: Dispatcher::new(store),
            config,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn store(&self) -> &S {
        self.dispatcher.store()
    }

    pub fn into_store(self) -> S {
        self.dispatcher.into_store()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Process lines from `reader` until EOF, `END` or shutdown.
    ///
    /// Lines that are not valid UTF-8 are ignored like any other malformed input.
    pub async fn run<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<SessionStats>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = Vec::new();
        let mut stats = SessionStats::default();

        loop {
            line.clear();

            tokio::select! {
                // Read the next command
                result = reader.read_until(b'\n', &mut line) => {
                    if result? == 0 {
                        break;
                    }
                    stats.lines += 1;

                    match self.dispatcher.dispatch_raw_line(&line) {
                        Dispatch::Executed { command, output } => {
                            stats.executed += 1;
                            self.write_reply(&mut writer, &command, output.as_ref()).await?;
                        }
                        Dispatch::Ignored => stats.ignored += 1,
                        Dispatch::End => {
                            debug!("END received");
                            stats.ended = true;
                            break;
                        }
                    }
                }

                // Handle shutdown signal
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping session");
                    break;
                }
            }
        }

        writer.flush().await?;
        info!(
            lines = stats.lines,
            executed = stats.executed,
            ignored = stats.ignored,
            depth = self.store().depth(),
            "session finished"
        );
        Ok(stats)
    }

    async fn write_reply<W>(
        &self,
        writer: &mut W,
        command: &Command,
        output: Option<&Output>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match self.config.output_format {
            OutputFormat::Text => {
                if let Some(output) = output {
                    writer.write_all(&output.to_bytes()).await?;
                }
            }
            OutputFormat::Json => {
                let line = Reply { command, output }.to_bytes()?;
                writer.write_all(&line).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TransactionalStore;
    use tokio::io::BufReader;

    async fn run_script(script: &str, config: SessionConfig) -> (String, SessionStats) {
        let mut session = Session::new(TransactionalStore::new(), config);
        let mut output = Vec::new();
        let stats = session
            .run(BufReader::new(script.as_bytes()), &mut output)
            .await
            .unwrap();
        (String::from_utf8(output).unwrap(), stats)
    }

    #[tokio::test]
    async fn test_text_session() {
        let script = "SET a 10\nGET a\nGET b\nNUMEQUALTO 10\nROLLBACK\n";
        let (output, stats) = run_script(script, SessionConfig::default()).await;

        assert_eq!(output, "10\nNULL\n1\nNO TRANSACTION\n");
        assert_eq!(stats.lines, 5);
        assert_eq!(stats.executed, 5);
        assert!(!stats.ended);
    }

    #[tokio::test]
    async fn test_end_stops_processing() {
        let script = "SET a 1\nEND\nGET a\n";
        let (output, stats) = run_script(script, SessionConfig::default()).await;

        assert_eq!(output, "");
        assert_eq!(stats.lines, 2);
        assert!(stats.ended);
    }

    #[tokio::test]
    async fn test_ignored_lines_are_counted() {
        let script = "\nHELLO world\nSET a\nGET a\n";
        let (output, stats) = run_script(script, SessionConfig::default()).await;

        assert_eq!(output, "NULL\n");
        assert_eq!(stats.ignored, 3);
        assert_eq!(stats.executed, 1);
    }

    #[tokio::test]
    async fn test_json_session() {
        let config = SessionConfig {
            output_format: OutputFormat::Json,
            ..SessionConfig::default()
        };
        let (output, _) = run_script("SET a 10\nGET a\n", config).await;

        let replies: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(
            replies[0],
            serde_json::json!({ "command": "SET", "key": "a", "value": "10" })
        );
        assert_eq!(replies[1]["output"]["value"], "10");
    }

    #[tokio::test]
    async fn test_shutdown_stops_session() {
        let mut session = Session::new(TransactionalStore::new(), SessionConfig::default());
        let handle = session.shutdown_handle();

        // The reader never yields a line, so only shutdown can end the run.
        let (client, server) = tokio::io::duplex(64);
        let shutdown = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            handle.shutdown().unwrap();
        });

        let mut output = Vec::new();
        let stats = session
            .run(BufReader::new(server), &mut output)
            .await
            .unwrap();
        shutdown.await.unwrap();
        drop(client);

        assert_eq!(stats, SessionStats::default());
    }

    #[tokio::test]
    async fn test_shutdown_before_run_is_kept() {
        let mut session = Session::new(TransactionalStore::new(), SessionConfig::default());
        session.shutdown_handle().shutdown().unwrap();

        let (_client, server) = tokio::io::duplex(64);
        let mut output = Vec::new();
        let stats = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            session.run(BufReader::new(server), &mut output),
        )
        .await
        .expect("session should stop on an earlier shutdown")
        .unwrap();

        assert_eq!(stats, SessionStats::default());
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_end_session() {
        let mut session = Session::new(TransactionalStore::new(), SessionConfig::default());
        let input: &[u8] = b"SET a 10\nSET b \xff\xfe\nGET a\nNUMEQUALTO 10\n";

        let mut output = Vec::new();
        let stats = session
            .run(BufReader::new(input), &mut output)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "10\n1\n");
        assert_eq!(stats.lines, 4);
        assert_eq!(stats.ignored, 1);
        assert_eq!(session.store().get("b"), None);
    }
}
