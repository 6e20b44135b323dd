//! The back-tracking recursive-descent parser
//!
//! Given a grammar, an input buffer, and a start non-terminal, the engine
//! either produces a result value with the cursor advanced past the match,
//! or fails with the cursor restored to where the attempt began. Three
//! procedures recurse into each other:
//!
//! - [`parse_nt`](Parser::parse_nt) consults the packrat cache, tries the
//!   normal rules in declaration order, then grows the result through the
//!   left-recursive rules until none fires.
//! - `parse_rule` walks a rule's elements, carrying the accumulator that
//!   becomes the rule result, handling optional skips and sequences.
//! - `parse_element` dispatches on the element kind and applies the
//!   condition, fold, and position hooks.
//!
//! Failures record expectations for diagnostics; the furthest-reached
//! position wins.

use crate::arena::Arena;
use crate::ast::Value;
use crate::cache::{Memo, PackratCache, Probe};
use crate::error::{describe_element, Expectations, ParseError, StackFrame};
use crate::grammar::{AddHook, BeginSeq, CharHook, ElemKind, Element, Grammar, NtId, Rule, SkipHook};
use crate::intern::Interner;
use crate::text::TextBuffer;

/// The parser engine.
pub struct Parser<'a> {
    grammar: &'a Grammar,
    buf: TextBuffer<'a>,
    arena: &'a mut Arena,
    interner: &'a mut Interner,
    cache: PackratCache,
    nt_stack: Vec<StackFrame>,
    expect: Expectations,
}

impl<'a> Parser<'a> {
    /// Create a parser over `input`.
    pub fn new(
        grammar: &'a Grammar,
        input: &'a [u8],
        arena: &'a mut Arena,
        interner: &'a mut Interner,
    ) -> Self {
        let cache = PackratCache::for_input(input.len());
        Self {
            grammar,
            buf: TextBuffer::new(input),
            arena,
            interner,
            cache,
            nt_stack: Vec::with_capacity(64),
            expect: Expectations::new(),
        }
    }

    /// Parse the whole input as the named non-terminal.
    ///
    /// # Errors
    /// Fails when the non-terminal does not exist, when no rule matches, or
    /// when a match does not consume the entire input. The error carries
    /// the rendered expectation report.
    pub fn parse(&mut self, start: &str) -> Result<Value, ParseError> {
        let name = self.interner.intern(start);
        let Some(nt) = self.grammar.find(name) else {
            return Err(ParseError::UnknownStart {
                name: start.to_string(),
            });
        };
        match self.parse_nt(nt) {
            Some(value) if self.buf.at_end() => Ok(value),
            _ => Err(ParseError::Syntax {
                pos: self.expect.highest,
                report: self.expect.report(self.interner),
            }),
        }
    }

    /// The expectation tracker, for inspection after a failure
    pub fn expectations(&self) -> &Expectations {
        &self.expect
    }

    /// Cache statistics: (hits, misses)
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }

    // ------------------------------------------------------------------
    // Non-terminals
    // ------------------------------------------------------------------

    fn parse_nt(&mut self, id: NtId) -> Option<Value> {
        let grammar = self.grammar;
        let nt = grammar.nt(id);
        let entry_pos = self.buf.pos();
        let key_pos = entry_pos.offset.min(self.buf.len() as u32);

        let idx = match self.cache.probe(key_pos, id.0 as u16) {
            Probe::Found(idx) => match self.cache.entry(idx).memo {
                Memo::Success { value, next } => {
                    self.buf.set_pos(next);
                    return Some(value);
                }
                Memo::Fail => return None,
            },
            Probe::Inserted(idx) => idx,
        };

        self.nt_stack.push(StackFrame {
            nt: nt.name,
            pos: entry_pos,
        });
        log::trace!(
            "enter {} at {}",
            self.interner.resolve(nt.name),
            entry_pos
        );

        let mut result = None;
        for rule in &nt.normal {
            if let Some(v) = self.parse_rule(Some(rule), &rule.elements, Value::None) {
                result = Some(v);
                break;
            }
        }

        let Some(mut value) = result else {
            log::trace!("fail {}", self.interner.resolve(nt.name));
            self.nt_stack.pop();
            return None;
        };

        // Iterative growth: keep applying left-recursive rules, seeding
        // each attempt with the result so far, until a full pass fires
        // none of them.
        loop {
            let mut fired = false;
            for rule in &nt.recursive {
                let seed = rule.rec_start.apply(self.arena, value);
                if let Some(v) = self.parse_rule(Some(rule), &rule.elements, seed) {
                    value = v;
                    fired = true;
                    break;
                }
            }
            if !fired {
                break;
            }
        }

        self.cache.promote(idx, value, self.buf.pos());
        log::trace!("parsed {}", self.interner.resolve(nt.name));
        self.nt_stack.pop();
        Some(value)
    }

    // ------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------

    /// The skip value of an optional element that is not consumed: the
    /// skip hook if set, else the fold hook applied to an empty value,
    /// else the previous result unchanged.
    fn skip_value(&mut self, elem: &Element, prev: Value) -> Option<Value> {
        match elem.add_skip {
            SkipHook::PassPrev => Some(prev),
            SkipHook::None => match elem.add {
                AddHook::None => Some(prev),
                hook => hook.apply(self.arena, prev, Value::None),
            },
        }
    }

    fn apply_end(&mut self, rule: Option<&Rule>, seed: Value) -> Option<Value> {
        match rule {
            None => Some(seed),
            Some(r) => r.end.apply(self.arena, self.interner, seed),
        }
    }

    fn parse_rule(
        &mut self,
        rule: Option<&Rule>,
        elems: &[Element],
        prev: Value,
    ) -> Option<Value> {
        let Some((first, rest)) = elems.split_first() else {
            return self.apply_end(rule, prev);
        };

        // An optional element to be avoided: try the remainder without it
        // first. A failing skip hook fails the whole rule.
        if first.optional && first.avoid {
            let skip = self.skip_value(first, prev)?;
            if let Some(v) = self.parse_rule(rule, rest, skip) {
                return Some(v);
            }
        }

        let sp = self.buf.pos();

        if first.sequence {
            let seq_begin = match first.begin_seq {
                BeginSeq::PassPrev => prev,
                BeginSeq::Empty => Value::None,
            };
            if let Some(first_item) = self.parse_element(first, seq_begin) {
                if first.back_tracking {
                    if let Some(v) = self.parse_seq(first, rest, rule, first_item, prev) {
                        return Some(v);
                    }
                } else if let Some(v) = self.parse_seq_inline(first, rest, rule, first_item, prev)
                {
                    return Some(v);
                }
            }
        } else if let Some(combined) = self.parse_element(first, prev) {
            if let Some(v) = self.parse_rule(rule, rest, combined) {
                return Some(v);
            }
        }

        self.buf.set_pos(sp);

        if first.optional && !first.avoid {
            let skip = self.skip_value(first, prev)?;
            if let Some(v) = self.parse_rule(rule, rest, skip) {
                return Some(v);
            }
        }

        None
    }

    /// The default sequence strategy: an inlined loop that commits to each
    /// item as it grows, then tries to finish the rule once the next item
    /// fails. With `avoid`, finishing is attempted before every growth
    /// step instead.
    fn parse_seq_inline(
        &mut self,
        elem: &Element,
        rest: &[Element],
        rule: Option<&Rule>,
        first_item: Value,
        prev: Value,
    ) -> Option<Value> {
        let mut acc = first_item;
        loop {
            if elem.avoid {
                match elem.add_seq.apply(self.arena, prev, acc) {
                    Some(combined) => {
                        if let Some(v) = self.parse_rule(rule, rest, combined) {
                            return Some(v);
                        }
                    }
                    None => break,
                }
            }

            let sp = self.buf.pos();
            if !elem.chain.is_empty()
                && self.parse_rule(None, &elem.chain, Value::None).is_none()
            {
                break;
            }
            match self.parse_element(elem, acc) {
                Some(next) => acc = next,
                None => {
                    self.buf.set_pos(sp);
                    break;
                }
            }
        }

        let combined = elem.add_seq.apply(self.arena, prev, acc)?;
        self.parse_rule(rule, rest, combined)
    }

    /// The back-tracking sequence strategy: one recursive frame per item,
    /// so a failure further down the rule can retract items one at a time.
    fn parse_seq(
        &mut self,
        elem: &Element,
        rest: &[Element],
        rule: Option<&Rule>,
        acc: Value,
        prev: Value,
    ) -> Option<Value> {
        if elem.avoid {
            let combined = elem.add_seq.apply(self.arena, prev, acc)?;
            if let Some(v) = self.parse_rule(rule, rest, combined) {
                return Some(v);
            }
        }

        let sp = self.buf.pos();
        let mut grow = true;
        if !elem.chain.is_empty() {
            grow = self.parse_rule(None, &elem.chain, Value::None).is_some();
        }
        if grow {
            if let Some(item) = self.parse_element(elem, acc) {
                if let Some(v) = self.parse_seq(elem, rest, rule, item, prev) {
                    return Some(v);
                }
            }
        }
        self.buf.set_pos(sp);

        if !elem.avoid {
            let combined = elem.add_seq.apply(self.arena, prev, acc)?;
            if let Some(v) = self.parse_rule(rule, rest, combined) {
                return Some(v);
            }
        }

        None
    }

    // ------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------

    fn parse_element(&mut self, elem: &Element, prev: Value) -> Option<Value> {
        let sp = self.buf.pos();

        let mut result = match &elem.kind {
            ElemKind::NonTerm(id) => {
                let v = self.parse_nt(*id)?;
                if !elem.condition.check(self.arena, self.interner, v) {
                    self.buf.set_pos(sp);
                    return None;
                }
                match elem.add {
                    AddHook::None => prev,
                    hook => match hook.apply(self.arena, prev, v) {
                        Some(combined) => combined,
                        None => {
                            self.buf.set_pos(sp);
                            return None;
                        }
                    },
                }
            }

            ElemKind::Group(rules) => {
                let mut matched = None;
                for rule in rules {
                    let start = match elem.add {
                        AddHook::None => prev,
                        _ => Value::None,
                    };
                    if let Some(v) = self.parse_rule(Some(rule), &rule.elements, start) {
                        matched = Some(v);
                        break;
                    }
                }
                let v = matched?;
                match elem.add {
                    AddHook::None => v,
                    hook => match hook.apply(self.arena, prev, v) {
                        Some(combined) => combined,
                        None => {
                            self.buf.set_pos(sp);
                            return None;
                        }
                    },
                }
            }

            ElemKind::End => {
                if !self.buf.at_end() {
                    self.expect_fail(elem);
                    return None;
                }
                prev
            }

            ElemKind::Char(expected) => {
                if self.buf.peek() != Some(*expected) {
                    self.expect_fail(elem);
                    return None;
                }
                self.buf.next();
                match elem.add_char {
                    CharHook::None => prev,
                    hook => hook.apply(self.arena, prev, *expected)?,
                }
            }

            ElemKind::Set(set) => {
                let Some(ch) = self.buf.peek().filter(|ch| set.contains(*ch)) else {
                    self.expect_fail(elem);
                    return None;
                };
                self.buf.next();
                match elem.add_char {
                    CharHook::None => prev,
                    hook => hook.apply(self.arena, prev, ch)?,
                }
            }

            ElemKind::Terminal(scan) => {
                let Some((consumed, v)) = scan(self.buf.remaining()).filter(|(n, _)| *n > 0)
                else {
                    self.expect_fail(elem);
                    return None;
                };
                for _ in 0..consumed {
                    self.buf.next();
                }
                v
            }
        };

        result = elem.set_pos.apply(self.arena, result, sp);
        Some(result)
    }

    /// Record an expectation for a failed element attempt.
    fn expect_fail(&mut self, elem: &Element) {
        let pos = self.buf.pos();
        let key = elem as *const Element as usize;
        let grammar = self.grammar;
        let interner: &Interner = self.interner;
        let stack: &[StackFrame] = &self.nt_stack;
        self.expect
            .record(pos, stack, key, || describe_element(elem, grammar, interner));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::char_set::CharSet;
    use crate::grammar::{BeginSeq, GrammarBuilder, PosHook, SeqHook, SkipHook};

    fn digits() -> CharSet {
        CharSet::new().with_range(b'0', b'9')
    }

    fn parse_with(grammar: &Grammar, interner: &mut Interner, start: &str, input: &[u8]) -> Result<Value, ParseError> {
        let mut arena = Arena::new();
        let mut parser = Parser::new(grammar, input, &mut arena, interner);
        parser.parse(start)
    }

    #[test]
    fn test_char_match_and_fail() {
        let mut interner = Interner::new();
        let mut b = GrammarBuilder::new(&mut interner);
        b.nt("x", |nt| {
            nt.rule(|r| {
                r.ch('x');
            });
        });
        let g = b.finish();
        assert!(parse_with(&g, &mut interner, "x", b"x").is_ok());
        assert!(parse_with(&g, &mut interner, "x", b"y").is_err());
        assert!(parse_with(&g, &mut interner, "x", b"xx").is_err());
    }

    #[test]
    fn test_unknown_start() {
        let mut interner = Interner::new();
        let b = GrammarBuilder::new(&mut interner);
        let g = b.finish();
        match parse_with(&g, &mut interner, "nope", b"") {
            Err(ParseError::UnknownStart { name }) => assert_eq!(name, "nope"),
            other => panic!("expected unknown start, got {other:?}"),
        }
    }

    #[test]
    fn test_sequence_accumulates() {
        let mut interner = Interner::new();
        let mut b = GrammarBuilder::new(&mut interner);
        b.nt("number", |nt| {
            nt.rule(|r| {
                r.set(digits(), CharHook::Number)
                    .seq(BeginSeq::Empty, SeqHook::UseSeq);
            });
        });
        let g = b.finish();
        let v = parse_with(&g, &mut interner, "number", b"409").unwrap();
        assert_eq!(v, Value::Num { value: 409 });
    }

    #[test]
    fn test_optional_skip() {
        let mut interner = Interner::new();
        let mut b = GrammarBuilder::new(&mut interner);
        b.nt("signed", |nt| {
            nt.rule(|r| {
                r.ch('-').opt().skip(SkipHook::PassPrev);
                r.set(digits(), CharHook::Number)
                    .seq(BeginSeq::PassPrev, SeqHook::UseSeq);
            });
        });
        let g = b.finish();
        assert!(parse_with(&g, &mut interner, "signed", b"-5").is_ok());
        assert!(parse_with(&g, &mut interner, "signed", b"5").is_ok());
        assert!(parse_with(&g, &mut interner, "signed", b"-").is_err());
    }

    #[test]
    fn test_left_recursion_grows() {
        // expr := digit | expr '+' digit, built as nested add trees.
        let mut interner = Interner::new();
        let mut b = GrammarBuilder::new(&mut interner);
        b.nt("digit", |nt| {
            nt.rule(|r| {
                r.set(digits(), CharHook::Number);
            });
        });
        b.nt("expr", |nt| {
            nt.rule(|r| {
                r.nt_pass("digit");
            });
            nt.rec_rule(|r| {
                r.ch('+');
                r.nt("digit");
                r.tree("add", "%* + %*");
            });
        });
        let g = b.finish();
        let mut arena = Arena::new();
        let mut parser = Parser::new(&g, b"1+2+3", &mut arena, &mut interner);
        let v = parser.parse("expr").unwrap();
        // ((1+2)+3): outermost add has the inner add as first child.
        assert!(arena.tree_is(v, "add"));
        let left = arena.tree_child(v, 1).unwrap();
        assert!(arena.tree_is(left, "add"));
    }

    #[test]
    fn test_chain_rule_separates_items() {
        let mut interner = Interner::new();
        let mut b = GrammarBuilder::new(&mut interner);
        b.nt("list", |nt| {
            nt.rule(|r| {
                r.set(digits(), CharHook::Number)
                    .seq(BeginSeq::Empty, SeqHook::UseSeq)
                    .chain(|c| {
                        c.ch(',');
                    });
            });
        });
        let g = b.finish();
        assert!(parse_with(&g, &mut interner, "list", b"1,2,3").is_ok());
        assert!(parse_with(&g, &mut interner, "list", b"1,2,").is_err());
    }

    #[test]
    fn test_avoid_prefers_short_match() {
        // body := any* 'end' with avoid on the sequence, so the sequence
        // stops at the first possible 'end'.
        let mut interner = Interner::new();
        let mut b = GrammarBuilder::new(&mut interner);
        b.nt("body", |nt| {
            nt.rule(|r| {
                r.set(CharSet::new().with_range(b'a', b'z'), CharHook::None)
                    .seq_plain()
                    .opt()
                    .avoid();
                r.ch('e');
                r.ch('n');
                r.ch('d');
            });
        });
        let g = b.finish();
        assert!(parse_with(&g, &mut interner, "body", b"xyzend").is_ok());
        assert!(parse_with(&g, &mut interner, "body", b"end").is_ok());
        assert!(parse_with(&g, &mut interner, "body", b"xyz").is_err());
    }

    #[test]
    fn test_back_tracking_sequence() {
        // args := item SEQ BACK_TRACKING ',' -chained, then ", x" tail.
        // Without back-tracking the inline loop would eat the last item
        // and fail; with it, the sequence retracts one item.
        let mut interner = Interner::new();
        let mut b = GrammarBuilder::new(&mut interner);
        b.nt("args", |nt| {
            nt.rule(|r| {
                r.set(digits(), CharHook::None)
                    .seq(BeginSeq::Empty, SeqHook::None)
                    .back_tracking()
                    .chain(|c| {
                        c.ch(',');
                    });
                r.ch(',');
                r.ch('x');
            });
        });
        let g = b.finish();
        assert!(parse_with(&g, &mut interner, "args", b"1,2,x").is_ok());
        assert!(parse_with(&g, &mut interner, "args", b"1,x").is_ok());
    }

    #[test]
    fn test_terminal_function() {
        fn three_as(input: &[u8]) -> Option<(usize, Value)> {
            if input.starts_with(b"aaa") {
                Some((3, Value::Num { value: 3 }))
            } else {
                None
            }
        }
        let mut interner = Interner::new();
        let mut b = GrammarBuilder::new(&mut interner);
        b.nt("t", |nt| {
            nt.rule(|r| {
                r.terminal(three_as).pos(PosHook::None);
            });
        });
        let g = b.finish();
        let v = parse_with(&g, &mut interner, "t", b"aaa").unwrap();
        assert_eq!(v, Value::Num { value: 3 });
        assert!(parse_with(&g, &mut interner, "t", b"aab").is_err());
    }

    #[test]
    fn test_expectations_at_furthest_position() {
        let mut interner = Interner::new();
        let mut b = GrammarBuilder::new(&mut interner);
        b.nt("pair", |nt| {
            nt.rule(|r| {
                r.ch('(');
                r.ch(')');
            });
        });
        let g = b.finish();
        let mut arena = Arena::new();
        let mut parser = Parser::new(&g, b"(x", &mut arena, &mut interner);
        let err = parser.parse("pair").unwrap_err();
        match err {
            ParseError::Syntax { pos, report } => {
                assert_eq!(pos.offset, 1);
                assert!(report.contains("')'"), "report: {report}");
                assert!(report.contains("in pair"), "report: {report}");
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_memoization_hits() {
        // A grammar that tries two alternatives both starting with the
        // same non-terminal exercises the cache.
        let mut interner = Interner::new();
        let mut b = GrammarBuilder::new(&mut interner);
        b.nt("num", |nt| {
            nt.rule(|r| {
                r.set(digits(), CharHook::Number)
                    .seq(BeginSeq::Empty, SeqHook::UseSeq);
            });
        });
        b.nt("top", |nt| {
            nt.rule(|r| {
                r.nt_pass("num");
                r.ch('!');
            });
            nt.rule(|r| {
                r.nt_pass("num");
                r.ch('?');
            });
        });
        let g = b.finish();
        let mut arena = Arena::new();
        let mut parser = Parser::new(&g, b"42?", &mut arena, &mut interner);
        let v = parser.parse("top").unwrap();
        assert_eq!(v, Value::Num { value: 42 });
        let (hits, _) = parser.cache_stats();
        assert!(hits >= 1, "second alternative should hit the cache");
    }
}
