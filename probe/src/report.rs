use std::io::{self, Write};

use common::collectors::{
    list_logged_in_users, list_network_files, list_network_sessions, list_network_shares,
    list_open_files,
};
use common::config::{ReportKind, WardenConfig};
use common::error::WardenError;
use common::telemetry::unix_timestamp_now;
use serde::Serialize;

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    seq: u64,
    ts: i64,
    host: &'a str,
    kind: ReportKind,
    record: &'a T,
}

/// One JSON object per line, numbered across the life of the process.
pub struct ReportWriter<W: Write> {
    out: W,
    host: String,
    seq: u64,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W, host: String) -> Self {
        Self { out, host, seq: 0 }
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Runs every selected kind once. A failing kind is logged and skipped;
    /// only output errors stop the round.
    pub fn run_round(&mut self, cfg: &WardenConfig) -> io::Result<()> {
        for &kind in &cfg.report.include {
            match kind {
                ReportKind::OpenFiles => self.emit(kind, list_open_files(&cfg.enumeration))?,
                ReportKind::NetworkFiles => {
                    self.emit(kind, list_network_files(&cfg.enumeration))?;
                }
                ReportKind::NetworkShares => {
                    self.emit(kind, list_network_shares(&cfg.enumeration))?;
                }
                ReportKind::NetworkSessions => {
                    self.emit(kind, list_network_sessions(&cfg.enumeration))?;
                }
                ReportKind::LoggedInUsers => {
                    self.emit(kind, list_logged_in_users(&cfg.sessions))?;
                }
            }
        }
        Ok(())
    }

    pub fn emit<T: Serialize>(
        &mut self,
        kind: ReportKind,
        result: Result<Vec<T>, WardenError>,
    ) -> io::Result<()> {
        let records = match result {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    kind = %kind,
                    code = e.code().map(|c| c.as_str()),
                    error = %e,
                    "enumeration failed"
                );
                return Ok(());
            }
        };
        let mut written = 0usize;
        for record in &records {
            let envelope = Envelope {
                seq: self.seq + 1,
                ts: unix_timestamp_now(),
                host: &self.host,
                kind,
                record,
            };
            // A record that cannot be encoded must not leave half a line behind.
            let mut line = match serde_json::to_vec(&envelope) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "record not serializable, skipping");
                    continue;
                }
            };
            line.push(b'\n');
            self.out.write_all(&line)?;
            self.seq += 1;
            written += 1;
        }
        tracing::info!(kind = %kind, records = written, "kind reported");
        Ok(())
    }
}
