use std::io::{IsTerminal, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
    Hex,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    seq: usize,
    framing: &'a str,
    length: usize,
    payload: Option<&'a str>,
    payload_hex: String,
    timestamp: String,
}

#[derive(Serialize)]
struct SentOutput<'a> {
    path: &'a str,
    framing: &'a str,
    payload_size: usize,
    bytes_written: usize,
}

/// Print one reassembled message.
pub fn print_message(seq: usize, payload: &[u8], framing: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                seq,
                framing,
                length: payload.len(),
                payload: std::str::from_utf8(payload).ok(),
                payload_hex: hex::encode(payload),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "LENGTH", "PAYLOAD"])
                .add_row(vec![
                    seq.to_string(),
                    payload.len().to_string(),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "message #{seq} length={} payload={}",
                payload.len(),
                payload_preview(payload)
            );
        }
        OutputFormat::Raw => print_raw(payload),
        OutputFormat::Hex => println!("{}", hex::encode(payload)),
    }
}

/// Print the result of a send.
pub fn print_sent(
    path: &Path,
    framing: &str,
    payload_size: usize,
    bytes_written: usize,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let path = path.to_string_lossy();
            let out = SentOutput {
                path: &path,
                framing,
                payload_size,
                bytes_written,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Raw | OutputFormat::Hex => {}
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "{bytes_written} bytes sent out of {} (+{})",
                payload_size,
                bytes_written.saturating_sub(payload_size)
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sent_summary_tolerates_short_count() {
        print_sent(Path::new("/tmp/cfifo"), "u16", 10, 4, OutputFormat::Pretty);
    }

    #[test]
    fn binary_preview() {
        assert_eq!(payload_preview(b"text"), "text");
        assert_eq!(payload_preview(&[0xff, 0xfe]), "<binary 2 bytes>");
    }
}
