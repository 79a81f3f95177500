//! Run-scoped template state
//!
//! A `TemplateContext` is created when a TEMPLATE-type generation run starts
//! and dropped when it ends. It holds the current indentation depth and the
//! text emitted so far. `st:incr()` / `st:decr()` mutate the depth; template
//! emission reads it when starting a new line.
//!
//! The handle is cheap to clone so that a nested template PERFORM can share
//! its caller's state. Independent runs each own their own context.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Text buffer that indents every line by the current depth
#[derive(Debug, Clone)]
pub struct IndentedWriter {
    buf: String,
    depth: i32,
    unit: usize,
    at_line_start: bool,
}

impl IndentedWriter {
    /// Create a writer with `unit` spaces per indentation level
    pub fn new(unit: usize) -> Self {
        Self {
            buf: String::new(),
            depth: 0,
            unit,
            at_line_start: true,
        }
    }

    /// Current depth (may be negative after unbalanced `decr`)
    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn incr(&mut self) {
        self.depth += 1;
    }

    pub fn decr(&mut self) {
        self.depth -= 1;
    }

    /// Append text; each non-empty line is prefixed with the indentation in
    /// effect when its first character is written
    pub fn write(&mut self, text: &str) {
        for c in text.chars() {
            if self.at_line_start && c != '\n' {
                let pad = self.depth.max(0) as usize * self.unit;
                self.buf.extend(std::iter::repeat(' ').take(pad));
                self.at_line_start = false;
            }
            self.buf.push(c);
            if c == '\n' {
                self.at_line_start = true;
            }
        }
    }

    /// Text written so far
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Take the text written so far, keeping depth
    pub fn take(&mut self) -> String {
        self.at_line_start = true;
        std::mem::take(&mut self.buf)
    }
}

/// Shared handle to the state of one template run
#[derive(Clone)]
pub struct TemplateContext {
    writer: Arc<Mutex<IndentedWriter>>,
}

impl TemplateContext {
    /// Start a new template run
    pub fn new(indent_unit: usize) -> Self {
        Self {
            writer: Arc::new(Mutex::new(IndentedWriter::new(indent_unit))),
        }
    }

    pub fn incr(&self) {
        self.writer.lock().incr();
    }

    pub fn decr(&self) {
        self.writer.lock().decr();
    }

    pub fn depth(&self) -> i32 {
        self.writer.lock().depth()
    }

    /// Emit template text
    pub fn write(&self, text: &str) {
        self.writer.lock().write(text);
    }

    /// Copy of the text emitted so far
    pub fn output(&self) -> String {
        self.writer.lock().as_str().to_string()
    }

    /// Take the text emitted so far
    pub fn take_output(&self) -> String {
        self.writer.lock().take()
    }

    /// Whether two handles refer to the same run
    pub fn same_run(&self, other: &TemplateContext) -> bool {
        Arc::ptr_eq(&self.writer, &other.writer)
    }
}

impl fmt::Debug for TemplateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let writer = self.writer.lock();
        f.debug_struct("TemplateContext")
            .field("depth", &writer.depth())
            .field("bytes", &writer.as_str().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incr_incr_decr_nets_one() {
        let ctx = TemplateContext::new(2);
        ctx.incr();
        ctx.incr();
        ctx.decr();
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_indentation_applies_to_following_lines() {
        let mut w = IndentedWriter::new(2);
        w.write("a {\n");
        w.incr();
        w.write("b;\nc;\n");
        w.decr();
        w.write("}");
        assert_eq!(w.as_str(), "a {\n  b;\n  c;\n}");
    }

    #[test]
    fn test_indent_taken_when_line_starts() {
        let mut w = IndentedWriter::new(4);
        w.write("x");
        // depth change mid-line does not touch the current line
        w.incr();
        w.write("y\n\nz");
        assert_eq!(w.as_str(), "xy\n\n    z");
    }

    #[test]
    fn test_negative_depth_renders_flat() {
        let mut w = IndentedWriter::new(2);
        w.decr();
        w.write("a\nb");
        assert_eq!(w.depth(), -1);
        assert_eq!(w.as_str(), "a\nb");
    }

    #[test]
    fn test_shared_handle() {
        let ctx = TemplateContext::new(2);
        let shared = ctx.clone();
        shared.incr();
        shared.write("x");
        assert_eq!(ctx.depth(), 1);
        assert_eq!(ctx.output(), "  x");
        assert!(ctx.same_run(&shared));
        assert!(!ctx.same_run(&TemplateContext::new(2)));
        assert_eq!(ctx.take_output(), "  x");
        assert_eq!(ctx.output(), "");
    }
}
