//! AST-directed pretty printing
//!
//! Every tree node carries a format string; printing walks the format and
//! recurses into children at each `%*`. Newlines are requested lazily and
//! materialized just before the next printable character, so consecutive
//! requests collapse. When an identifier-like character would directly
//! follow another one across two prints, a single space keeps the C tokens
//! separated without the formats having to spell every space out.

use crate::arena::Arena;
use crate::ast::{Node, Value};
use crate::intern::Interner;
use crate::sink::Sink;

const INDENT_WIDTH: usize = 4;

#[inline]
fn is_ident_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

/// Escape one byte for a character or string literal with delimiter `del`.
fn put_literal_char(out: &mut dyn Sink, ch: u8, del: u8) {
    match ch {
        0 => out.put_str("\\0"),
        b'\n' => out.put_str("\\n"),
        b'\r' => out.put_str("\\r"),
        b'\\' => out.put_str("\\\\"),
        ch if ch == del => {
            out.put(b'\\');
            out.put(del);
        }
        ch => out.put(ch),
    }
}

/// The unparser. One instance carries the indentation and pending-newline
/// state across everything printed into one output.
#[derive(Debug, Default)]
pub struct Unparser {
    indent: i32,
    start_line: bool,
    need_sp: bool,
}

impl Unparser {
    /// Create an unparser at indentation zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize a pending newline request, with indentation.
    fn flush_line(&mut self, out: &mut dyn Sink) {
        if self.start_line {
            out.put(b'\n');
            for _ in 0..(self.indent.max(0) as usize) * INDENT_WIDTH {
                out.put(b' ');
            }
            self.start_line = false;
            self.need_sp = false;
        }
    }

    /// Request a newline before whatever prints next.
    pub fn newline(&mut self) {
        self.start_line = true;
        self.need_sp = false;
    }

    /// Print literal text through the same lazy-newline machinery the
    /// formats use. The driver uses this for generated scaffolding.
    pub fn text(&mut self, s: &str, out: &mut dyn Sink) {
        let mut is_alphanum = false;
        for &ch in s.as_bytes() {
            if ch == b'\n' {
                if self.start_line {
                    out.put(b'\n');
                }
                self.start_line = true;
                self.need_sp = false;
                is_alphanum = false;
            } else {
                self.flush_line(out);
                is_alphanum = is_ident_char(ch);
                if self.need_sp && is_alphanum {
                    out.put(b' ');
                }
                out.put(ch);
                self.need_sp = false;
            }
        }
        if is_alphanum {
            self.need_sp = true;
        }
    }

    /// Print a parse value.
    pub fn unparse(&mut self, arena: &Arena, interner: &Interner, v: Value, out: &mut dyn Sink) {
        let Value::Node(id) = v else { return };
        match arena.node(id) {
            Node::Tree { tag, children, .. } => {
                if tag.is_list() {
                    for (i, child) in children.iter().enumerate() {
                        if i > 0 && !tag.fmt.is_empty() {
                            self.text(tag.fmt, out);
                        }
                        self.unparse(arena, interner, *child, out);
                    }
                } else {
                    self.unparse_fmt(arena, interner, tag.fmt, children, out);
                }
            }
            Node::Ident { name, .. } => {
                let text = interner.resolve(*name);
                self.flush_line(out);
                if self.need_sp {
                    out.put(b' ');
                }
                out.put_str(text);
                self.need_sp = true;
            }
            Node::Char { ch, .. } => {
                self.flush_line(out);
                if self.need_sp {
                    out.put(b' ');
                }
                out.put(b'\'');
                put_literal_char(out, *ch, b'\'');
                out.put(b'\'');
                self.need_sp = true;
            }
            Node::Str { start, len, .. } => {
                let content: Vec<u8> = arena.str_content(*start, *len).to_vec();
                self.flush_line(out);
                if self.need_sp {
                    out.put(b' ');
                }
                out.put(b'"');
                for ch in content {
                    put_literal_char(out, ch, b'"');
                }
                out.put(b'"');
                self.need_sp = true;
            }
            Node::Int { value, .. } => {
                self.flush_line(out);
                if self.need_sp {
                    out.put(b' ');
                }
                out.put_str(&value.to_string());
                self.need_sp = true;
            }
        }
    }

    fn unparse_fmt(
        &mut self,
        arena: &Arena,
        interner: &Interner,
        fmt: &str,
        children: &[Value],
        out: &mut dyn Sink,
    ) {
        let bytes = fmt.as_bytes();
        let mut child = 0usize;
        let mut is_alphanum = false;
        let mut i = 0usize;
        while i < bytes.len() {
            let ch = bytes[i];
            if ch == b'%' && i + 1 < bytes.len() {
                match bytes[i + 1] {
                    b'*' => {
                        if is_alphanum {
                            self.need_sp = true;
                            is_alphanum = false;
                        }
                        if child < children.len() {
                            self.unparse(arena, interner, children[child], out);
                            child += 1;
                        } else {
                            log::warn!("format {fmt:?} asks for child {child} of {}", children.len());
                        }
                    }
                    b'%' => out.put(b'%'),
                    b'<' => self.indent -= 1,
                    b'>' => self.indent += 1,
                    other => log::warn!("bad directive %{} in format {fmt:?}", other as char),
                }
                i += 2;
                continue;
            }
            if ch == b'\n' {
                if self.start_line {
                    out.put(b'\n');
                }
                self.start_line = true;
                self.need_sp = false;
                is_alphanum = false;
            } else {
                self.flush_line(out);
                is_alphanum = is_ident_char(ch);
                if self.need_sp && is_alphanum {
                    out.put(b' ');
                }
                out.put(ch);
                self.need_sp = false;
            }
            i += 1;
        }
        if is_alphanum {
            self.need_sp = true;
        }
        if child < children.len() {
            log::warn!(
                "format {fmt:?} leaves {} of {} children unprinted",
                children.len() - child,
                children.len()
            );
        }
    }
}
