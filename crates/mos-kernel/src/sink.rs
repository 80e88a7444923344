/// Destination for human-readable machine output (SYS output, termination notices).
pub trait OutputSink {
    fn put_text(&mut self, text: &str);
    fn advance_line(&mut self);
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn put_text(&mut self, text: &str) {
        (**self).put_text(text);
    }

    fn advance_line(&mut self) {
        (**self).advance_line();
    }
}

impl<T: OutputSink + ?Sized> OutputSink for Box<T> {
    fn put_text(&mut self, text: &str) {
        (**self).put_text(text);
    }

    fn advance_line(&mut self) {
        (**self).advance_line();
    }
}

/// Collects output in memory, one entry per completed line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferSink {
    lines: Vec<String>,
    current: String,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Text written since the last line advance.
    pub fn current_line(&self) -> &str {
        &self.current
    }

    /// Everything written so far, lines joined with `\n`.
    pub fn text(&self) -> String {
        let mut out = self.lines.join("\n");
        if !self.lines.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.current);
        out
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.current.clear();
    }
}

impl OutputSink for BufferSink {
    fn put_text(&mut self, text: &str) {
        self.current.push_str(text);
    }

    fn advance_line(&mut self) {
        self.lines.push(std::mem::take(&mut self.current));
    }
}
