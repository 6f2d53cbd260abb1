use std::{
    fs,
    io::{self, BufRead, Write},
    path::Path,
};

use thiserror::Error;

use crate::{
    diagnostics::{console_diagnostic_sink, DiagnosticSink, StreamDiagnosticSink},
    scanner::{ScanError, Scanner},
};

pub type RoxResult = Result<(), RoxError>;

#[derive(Debug, Error)]
pub enum RoxError {
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Every error was already written to the diagnostic stream when it was found.
    #[error("{} scan error(s)", .errors.len())]
    Scan { errors: Vec<ScanError> },
}

/// File and prompt front end: scans source text and prints the resulting tokens, one per
/// line. Diagnostics go to a separate stream.
pub struct Rox<O: Write, E: Write> {
    out: O,
    diagnostics: StreamDiagnosticSink<E>,
}

impl Rox<io::Stdout, io::Stderr> {
    pub fn stdio() -> Self {
        Rox {
            out: io::stdout(),
            diagnostics: console_diagnostic_sink(),
        }
    }
}

impl<O: Write, E: Write> Rox<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Rox {
            out,
            diagnostics: StreamDiagnosticSink::new(err),
        }
    }

    pub fn run_file<P: AsRef<Path>>(&mut self, path: P) -> RoxResult {
        let source = fs::read_to_string(path)?;

        self.run(source)
    }

    /// Runs each line of `input` as its own source buffer. Errors in one line are reported
    /// and forgotten before the next one is read.
    pub fn run_prompt<R: BufRead>(&mut self, input: R) -> RoxResult {
        self.prompt()?;

        for line in input.lines() {
            match line {
                Ok(line) => match self.run(line) {
                    Ok(()) | Err(RoxError::Scan { .. }) => {}
                    Err(err) => return Err(err),
                },
                // The bad line has been consumed, so the session can go on
                Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                    self.diagnostics.report(1, &err.to_string());
                    self.diagnostics.flush()?;
                }
                Err(err) => return Err(err.into()),
            };

            self.diagnostics.reset();
            self.prompt()?;
        }

        Ok(())
    }

    pub fn run(&mut self, source: String) -> RoxResult {
        let scanned = Scanner::new(source).scan_tokens(&mut self.diagnostics);
        self.diagnostics.flush()?;

        // For now just print the tokens
        for token in scanned.tokens() {
            writeln!(self.out, "{}", token)?;
        }
        self.out.flush()?;

        let (_, errors) = scanned.into_parts();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RoxError::Scan { errors })
        }
    }

    /// Number of diagnostics reported since the last prompt entry, or since construction.
    pub fn reported(&self) -> usize {
        self.diagnostics.reported()
    }

    pub fn into_parts(self) -> io::Result<(O, E)> {
        let err = self.diagnostics.into_inner()?;
        Ok((self.out, err))
    }

    fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()
    }
}
