const INDENT: &str = "    ";

/// Text sink for generated CSS.
///
/// `line_break` always breaks the line; `optional_line_break` and
/// indentation are dropped when minifying.
#[derive(Debug)]
pub struct Output {
    buf: String,
    minify: bool,
    indent: usize,
    at_line_start: bool,
}

impl Output {
    pub fn new(minify: bool) -> Self {
        Self {
            buf: String::new(),
            minify,
            indent: 0,
            at_line_start: true,
        }
    }

    pub fn is_minified(&self) -> bool {
        self.minify
    }

    pub fn output(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.at_line_start && !self.minify {
            for _ in 0..self.indent {
                self.buf.push_str(INDENT);
            }
        }
        self.at_line_start = false;
        self.buf.push_str(text);
    }

    pub fn line_break(&mut self) {
        self.buf.push('\n');
        self.at_line_start = true;
    }

    pub fn optional_line_break(&mut self) {
        if !self.minify {
            self.line_break();
        }
    }

    pub fn increase_indent(&mut self) {
        self.indent += 1;
    }

    pub fn decrease_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_at_line_start_only() {
        let mut out = Output::new(false);
        out.increase_indent();
        out.output("a");
        out.output("b");
        out.line_break();
        out.output("c");
        assert_eq!(out.into_string(), "    ab\n    c");
    }

    #[test]
    fn minified_keeps_hard_breaks_only() {
        let mut out = Output::new(true);
        out.increase_indent();
        out.output("a");
        out.optional_line_break();
        out.output("b");
        out.line_break();
        assert_eq!(out.into_string(), "ab\n");
    }
}
