use std::io::{self, Write};

use mos_kernel::OutputSink;

/// Console sink. The first write error is kept and reported by [`WriteSink::flush`]; later output
/// is dropped.
pub struct WriteSink<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> WriteSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self.error.take() {
            Some(err) => Err(err),
            None => self.out.flush(),
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.out.write_all(bytes) {
            self.error = Some(err);
        }
    }
}

impl<W: Write> OutputSink for WriteSink<W> {
    fn put_text(&mut self, text: &str) {
        self.write(text.as_bytes());
    }

    fn advance_line(&mut self) {
        self.write(b"\n");
    }
}
