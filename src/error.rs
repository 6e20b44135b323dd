//! Expectation tracking and parse errors
//!
//! While parsing, every element that fails to match records what it
//! expected at the position it failed. Only the furthest-reached position
//! matters: reaching a later position discards everything recorded before
//! it. Each record keeps a snapshot of the non-terminal stack so the report
//! can show the full parsing context, the way a reader of the failing
//! source would retrace it.

use std::fmt;

use crate::char_set::CharSet;
use crate::grammar::{ElemKind, Element, Grammar};
use crate::intern::{Interner, Name};
use crate::text::TextPos;

/// Upper bound on expectation records kept at the furthest position.
pub const MAX_EXPECTED: usize = 200;

/// One frame of the non-terminal stack: which non-terminal was being
/// parsed, entered at which position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFrame {
    /// The non-terminal's name
    pub nt: Name,
    /// Position where its parse began
    pub pos: TextPos,
}

/// One expectation record.
#[derive(Debug, Clone)]
pub struct Expectation {
    /// Rendered description of the element that failed
    pub desc: String,
    /// The non-terminal stack at the failure, outermost first
    pub stack: Vec<StackFrame>,
    /// Identity of the failing element, for deduplication
    elem_key: usize,
}

/// The expectation tracker.
#[derive(Debug, Default)]
pub struct Expectations {
    /// The furthest position any element attempt reached
    pub highest: TextPos,
    records: Vec<Expectation>,
}

impl Expectations {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self {
            highest: TextPos::default(),
            records: Vec::new(),
        }
    }

    /// Record a failed element attempt at `pos`. Earlier positions are
    /// ignored; a later position displaces everything recorded so far.
    pub fn record(
        &mut self,
        pos: TextPos,
        stack: &[StackFrame],
        elem_key: usize,
        describe: impl FnOnce() -> String,
    ) {
        if pos.offset < self.highest.offset {
            return;
        }
        if pos.offset > self.highest.offset {
            self.highest = pos;
            self.records.clear();
        }
        if self
            .records
            .iter()
            .any(|r| r.elem_key == elem_key && r.stack == stack)
        {
            return;
        }
        if self.records.len() < MAX_EXPECTED {
            self.records.push(Expectation {
                desc: describe(),
                stack: stack.to_vec(),
                elem_key,
            });
        }
    }

    /// The records at the furthest position
    pub fn records(&self) -> &[Expectation] {
        &self.records
    }

    /// Render the report the driver prints on parse failure.
    pub fn report(&self, interner: &Interner) -> String {
        let mut out = String::new();
        out.push_str(&format!("Expect at {}:\n", self.highest));
        for record in &self.records {
            out.push_str(&format!("- expect {}", record.desc));
            for frame in record.stack.iter().rev() {
                out.push_str(&format!(
                    " in {} at {}",
                    interner.resolve(frame.nt),
                    frame.pos
                ));
            }
            out.push('\n');
        }
        out
    }
}

/// Render an element for an expectation record.
pub fn describe_element(elem: &Element, grammar: &Grammar, interner: &Interner) -> String {
    if let Some(msg) = elem.expect_msg {
        return msg.to_string();
    }
    let mut out = match &elem.kind {
        ElemKind::NonTerm(id) => interner.resolve(grammar.nt(*id).name).to_string(),
        ElemKind::Char(ch) => format!("'{}'", escape_char(*ch)),
        ElemKind::Set(set) => render_set(set),
        ElemKind::End => "<eof>".to_string(),
        ElemKind::Group(rules) => format!("({} alternatives)", rules.len()),
        ElemKind::Terminal(_) => "<term>".to_string(),
    };
    if elem.sequence {
        out.push_str(" SEQ");
        if elem.back_tracking {
            out.push_str(" BACK_TRACKING");
        }
    }
    if elem.optional {
        out.push_str(" OPT");
    }
    if elem.avoid {
        out.push_str(" AVOID");
    }
    out
}

fn escape_char(ch: u8) -> String {
    match ch {
        0 => "\\0".into(),
        b'\n' => "\\n".into(),
        b'\r' => "\\r".into(),
        b'\t' => "\\t".into(),
        b'\\' => "\\\\".into(),
        b'\'' => "\\'".into(),
        ch if ch < b' ' || ch >= 127 => format!("\\{ch:03o}"),
        ch => (ch as char).to_string(),
    }
}

fn render_set(set: &CharSet) -> String {
    set.to_string()
}

/// Error returned by the public parse entry points.
#[derive(Debug, Clone)]
pub enum ParseError {
    /// No parse of the start symbol covers the whole input. The report is
    /// the rendered expectation dump.
    Syntax {
        /// The furthest position reached
        pos: TextPos,
        /// Rendered expectation report
        report: String,
    },
    /// The requested start non-terminal does not exist in the grammar
    UnknownStart {
        /// The name that was requested
        name: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax { pos, report } => {
                write!(f, "parse failed at {pos}\n{report}")
            }
            ParseError::UnknownStart { name } => {
                write!(f, "unknown start non-terminal {name:?}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(interner: &mut Interner, name: &str, offset: u32) -> StackFrame {
        StackFrame {
            nt: interner.intern(name),
            pos: TextPos {
                offset,
                line: 1,
                column: offset + 1,
            },
        }
    }

    #[test]
    fn test_later_position_displaces_records() {
        let mut interner = Interner::new();
        let mut exp = Expectations::new();
        let stack = vec![frame(&mut interner, "expr", 0)];
        let early = TextPos { offset: 1, line: 1, column: 2 };
        let late = TextPos { offset: 4, line: 1, column: 5 };
        exp.record(early, &stack, 1, || "'a'".into());
        assert_eq!(exp.records().len(), 1);
        exp.record(late, &stack, 2, || "'b'".into());
        assert_eq!(exp.records().len(), 1);
        assert_eq!(exp.highest, late);
        assert_eq!(exp.records()[0].desc, "'b'");
        // Earlier failures are ignored from now on.
        exp.record(early, &stack, 3, || "'c'".into());
        assert_eq!(exp.records().len(), 1);
    }

    #[test]
    fn test_deduplication() {
        let mut interner = Interner::new();
        let mut exp = Expectations::new();
        let stack = vec![frame(&mut interner, "expr", 0)];
        let pos = TextPos { offset: 2, line: 1, column: 3 };
        exp.record(pos, &stack, 7, || "'x'".into());
        exp.record(pos, &stack, 7, || "'x'".into());
        assert_eq!(exp.records().len(), 1);
        // Same element under a different stack is a separate record.
        let other = vec![frame(&mut interner, "stmt", 0)];
        exp.record(pos, &other, 7, || "'x'".into());
        assert_eq!(exp.records().len(), 2);
    }

    #[test]
    fn test_bounded() {
        let mut interner = Interner::new();
        let mut exp = Expectations::new();
        let stack = vec![frame(&mut interner, "expr", 0)];
        let pos = TextPos { offset: 0, line: 1, column: 1 };
        for key in 0..MAX_EXPECTED + 50 {
            exp.record(pos, &stack, key, || "'x'".into());
        }
        assert_eq!(exp.records().len(), MAX_EXPECTED);
    }

    #[test]
    fn test_report_shows_stack() {
        let mut interner = Interner::new();
        let mut exp = Expectations::new();
        let stack = vec![
            frame(&mut interner, "expr", 0),
            frame(&mut interner, "cast_expr", 4),
        ];
        let pos = TextPos { offset: 4, line: 1, column: 5 };
        exp.record(pos, &stack, 1, || "[a-z]".into());
        let report = exp.report(&interner);
        assert!(report.contains("Expect at 1.5"));
        assert!(report.contains("[a-z]"));
        // Innermost frame first.
        let cast = report.find("cast_expr").unwrap();
        let expr = report.find(" in expr").unwrap();
        assert!(cast < expr);
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::Syntax {
            pos: TextPos { offset: 4, line: 1, column: 5 },
            report: "Expect at 1.5:\n- expect ';'\n".into(),
        };
        let text = err.to_string();
        assert!(text.contains("1.5"));
        assert!(text.contains("';'"));
    }
}
