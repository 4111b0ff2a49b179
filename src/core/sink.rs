// Output side of the dumper. Every rendered line goes through a LineSink, one emit call per
// logical line, so the engine itself never touches stdout or a log backend directly. LogSink
// forwards to the log facade at info level, WriterSink writes to any io::Write (the lirdump
// binary uses it for stdout), and Vec<String> collects lines for tests and the check runner.

//! Line sinks for dump output.

use std::io::Write;

/// Receives dump output one logical line at a time.
pub trait LineSink {
    fn emit(&mut self, line: &str);
}

/// Forwards lines to `log::info!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LineSink for LogSink {
    fn emit(&mut self, line: &str) {
        log::info!("{}", line);
    }
}

impl LineSink for Vec<String> {
    fn emit(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Writes each line, newline-terminated, to an [`std::io::Write`].
///
/// Write failures are remembered instead of returned; check
/// [`WriterSink::finish`] once the dump is done.
pub struct WriterSink<W: Write> {
    out: W,
    error: Option<std::io::Error>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    /// Flushes and reports the first write error, if any.
    pub fn finish(mut self) -> std::io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> LineSink for WriterSink<W> {
    fn emit(&mut self, line: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = writeln!(self.out, "{line}") {
            self.error = Some(err);
        }
    }
}
