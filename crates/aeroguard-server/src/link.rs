//! Line-delimited vehicle link.
//!
//! Each inbound line is one JSON [`TelemetryRecord`]; each accepted record is
//! answered with the feedback signal (`SAFE`, `ALERT_YELLOW`, `ALERT_RED`)
//! followed by a newline. A serial bridge such as `socat` can sit in front of
//! the TCP listener to reach a vehicle on a UART.

use aeroguard_core::TelemetryRecord;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use crate::state::{AppState, IngestSource};

/// Accept link connections until the listener fails.
pub async fn run_link_listener(state: Arc<AppState>, addr: String) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Vehicle link listening on {}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            tracing::info!(%peer, "Vehicle link connected");
            let (read_half, write_half) = stream.into_split();
            match serve_lines(&state, BufReader::new(read_half), write_half).await {
                Ok(handled) => tracing::info!(%peer, handled, "Vehicle link closed"),
                Err(err) => tracing::warn!(%peer, "Vehicle link error: {}", err),
            }
        });
    }
}

/// Process records until EOF. Returns the number of records answered.
pub async fn serve_lines<R, W>(state: &AppState, reader: R, mut writer: W) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0usize;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: TelemetryRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!("Undecodable link record: {}", err);
                continue;
            }
        };

        match state.ingest(record, IngestSource::Link).await {
            Ok(outcome) => {
                let signal = outcome.verdict.feedback().as_wire();
                writer.write_all(signal.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
                handled += 1;
            }
            Err(err) => tracing::warn!("Link record rejected: {}", err),
        }
    }

    Ok(handled)
}
