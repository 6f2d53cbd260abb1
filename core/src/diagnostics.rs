//! Receivers for the diagnostics the scanner emits while it works.

use std::io::{self, BufWriter, Write};

/// An interface for an object that can receive diagnostics as they are discovered.
///
/// Whether a report is fatal is up to the caller. A sink that tracks an "had an error" state
/// must be reset by its owner between independent inputs.
pub trait DiagnosticSink {
    fn report(&mut self, line: u32, message: &str);
}

/// Drops every report. Callers that only inspect [`crate::scanner::Scanned::errors`] use this.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnosticSink;

impl DiagnosticSink for NullDiagnosticSink {
    fn report(&mut self, _line: u32, _message: &str) {}
}

impl DiagnosticSink for Vec<(u32, String)> {
    fn report(&mut self, line: u32, message: &str) {
        self.push((line, message.to_string()));
    }
}

/// Writes each report as a `[line N] Error: message` line.
pub struct StreamDiagnosticSink<W: Write> {
    stream: BufWriter<W>,
    reported: usize,
}

impl<W: Write> StreamDiagnosticSink<W> {
    pub fn new(stream: W) -> Self {
        StreamDiagnosticSink {
            stream: BufWriter::new(stream),
            reported: 0,
        }
    }

    /// Number of reports received since construction or the last [`Self::reset`].
    pub fn reported(&self) -> usize {
        self.reported
    }

    pub fn reset(&mut self) {
        self.reported = 0;
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.stream.into_inner().map_err(|err| err.into_error())
    }
}

impl<W: Write> DiagnosticSink for StreamDiagnosticSink<W> {
    fn report(&mut self, line: u32, message: &str) {
        self.reported += 1;
        // A failed write to the diagnostic stream has nowhere left to be reported.
        let _ = writeln!(self.stream, "[line {}] Error: {}", line, message);
    }
}

pub fn console_diagnostic_sink() -> StreamDiagnosticSink<io::Stderr> {
    StreamDiagnosticSink::new(io::stderr())
}
