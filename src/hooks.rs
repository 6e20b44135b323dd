//! Hook dispatch
//!
//! The grammar's hooks are a closed vocabulary, so each hook family is an
//! enum and dispatch is a match. A hook that returns `None` fails the
//! element or rule it is attached to, and the parser back-tracks.

use crate::arena::Arena;
use crate::ast::{IntState, Node, Value};
use crate::grammar::{AddHook, CharHook, Condition, EndHook, PosHook, RecStart, SeqHook};
use crate::intern::Interner;
use crate::text::TextPos;

/// Translate a character-literal escape: the alphabet is `0"'\abfnrtv`.
fn char_escape(ch: u8) -> u8 {
    match ch {
        b'0' => 0,
        b'a' => 7,
        b'b' => 8,
        b'f' => 12,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'v' => 11,
        other => other,
    }
}

/// Translate a string-literal escape; strings map only `0`, `n` and `r`,
/// the quote and backslash escapes are themselves.
fn string_escape(ch: u8) -> u8 {
    match ch {
        b'0' => 0,
        b'n' => b'\n',
        b'r' => b'\r',
        other => other,
    }
}

impl CharHook {
    /// Fold one matched character into the running result.
    pub(crate) fn apply(self, arena: &mut Arena, prev: Value, ch: u8) -> Option<Value> {
        match self {
            CharHook::None => Some(prev),

            CharHook::Number => {
                let value = match prev {
                    Value::None => 0,
                    Value::Num { value } => value,
                    _ => return None,
                };
                Some(Value::Num {
                    value: 10 * value + i64::from(ch - b'0'),
                })
            }

            CharHook::Ident => match prev {
                Value::None => {
                    arena.ident_buf[0] = ch;
                    arena.ident_len = 1;
                    Some(Value::IdentScan {
                        pos: TextPos::default(),
                        len: 1,
                    })
                }
                Value::IdentScan { pos, len } => {
                    // Only the first 64 bytes are significant; the rest are
                    // consumed but dropped.
                    let mut len = len;
                    if (len as usize) < arena.ident_buf.len() {
                        arena.ident_buf[len as usize] = ch;
                        arena.ident_len = len as usize + 1;
                        len += 1;
                    }
                    Some(Value::IdentScan { pos, len })
                }
                _ => None,
            },

            CharHook::Int => int_add_char(prev, ch),

            CharHook::CharNormal => match prev {
                Value::CharScan { pos, .. } => Some(Value::CharScan { pos, ch }),
                _ => None,
            },
            CharHook::CharEscaped => {
                CharHook::CharNormal.apply(arena, prev, char_escape(ch))
            }

            CharHook::StrNormal => match prev {
                Value::StrScan { pos, len, octal } => {
                    arena.str_scratch_write(len, ch);
                    Some(Value::StrScan {
                        pos,
                        len: len + 1,
                        octal,
                    })
                }
                _ => None,
            },
            CharHook::StrEscaped => {
                CharHook::StrNormal.apply(arena, prev, string_escape(ch))
            }
            CharHook::StrOctal1 => match prev {
                Value::StrScan { pos, len, .. } => Some(Value::StrScan {
                    pos,
                    len,
                    octal: (ch - b'0') << 6,
                }),
                _ => None,
            },
            CharHook::StrOctal2 => match prev {
                Value::StrScan { pos, len, octal } => Some(Value::StrScan {
                    pos,
                    len,
                    octal: octal | ((ch - b'0') << 3),
                }),
                _ => None,
            },
            CharHook::StrOctal3 => match prev {
                Value::StrScan { octal, .. } => {
                    CharHook::StrNormal.apply(arena, prev, octal | (ch - b'0'))
                }
                _ => None,
            },
        }
    }
}

/// The integer scanner: sign, then hexadecimal, octal, or decimal digits.
/// The state field survives across character additions; a character the
/// current state cannot accept fails the element.
fn int_add_char(prev: Value, ch: u8) -> Option<Value> {
    let (pos, have_pos, value, neg, state) = match prev {
        Value::None => (TextPos::default(), false, 0, false, IntState::Start),
        Value::IntScan {
            pos,
            have_pos,
            value,
            neg,
            state,
        } => (pos, have_pos, value, neg, state),
        _ => return None,
    };
    let digit = |ch: u8| i64::from(ch - b'0');
    let next = |value, neg, state| {
        Some(Value::IntScan {
            pos,
            have_pos,
            value,
            neg,
            state,
        })
    };
    match state {
        IntState::Start | IntState::AfterSign => match ch {
            b'-' if state == IntState::Start => next(value, true, IntState::AfterSign),
            b'0' => next(value, neg, IntState::AfterZero),
            b'1'..=b'9' => next(digit(ch), neg, IntState::Decimal),
            _ => None,
        },
        IntState::AfterZero => match ch {
            b'x' => next(value, neg, IntState::AfterHexMark),
            b'0'..=b'7' => next(8 * value + digit(ch), neg, IntState::Octal),
            _ => None,
        },
        IntState::AfterHexMark | IntState::Hex => {
            let d = match ch {
                b'0'..=b'9' => digit(ch),
                b'A'..=b'F' => i64::from(ch - b'A') + 10,
                b'a'..=b'f' => i64::from(ch - b'a') + 10,
                _ => return None,
            };
            next(16 * value + d, neg, IntState::Hex)
        }
        IntState::Octal => match ch {
            b'0'..=b'7' => next(8 * value + digit(ch), neg, IntState::Octal),
            _ => None,
        },
        IntState::Decimal => match ch {
            b'0'..=b'9' => next(10 * value + digit(ch), neg, IntState::Decimal),
            _ => None,
        },
    }
}

impl AddHook {
    /// Combine an element result with the previous result.
    pub(crate) fn apply(self, arena: &mut Arena, prev: Value, elem: Value) -> Option<Value> {
        match self {
            AddHook::None => Some(prev),
            AddHook::Child => Some(arena.push_child(prev, elem)),
            AddHook::TakeChild => Some(elem),
        }
    }
}

impl SeqHook {
    /// Combine a finished sequence accumulator with the previous result.
    pub(crate) fn apply(self, arena: &mut Arena, prev: Value, seq: Value) -> Option<Value> {
        match self {
            SeqHook::None => Some(Value::None),
            SeqHook::UseSeq => Some(seq),
            SeqHook::AsList(tag) => {
                let list = arena.make_tree(tag, seq);
                Some(arena.push_child(prev, Value::Node(list)))
            }
        }
    }
}

impl RecStart {
    /// Seed a left-recursive rule from the already parsed left result.
    pub(crate) fn apply(self, arena: &mut Arena, left: Value) -> Value {
        match self {
            RecStart::Discard => Value::None,
            RecStart::SeedChild => arena.push_child(Value::None, left),
        }
    }
}

impl Condition {
    /// Evaluate the condition on an element result.
    pub(crate) fn check(self, arena: &Arena, interner: &Interner, v: Value) -> bool {
        match self {
            Condition::None => true,
            Condition::IsKeyword(expected) => match arena.node_of(v) {
                Some(id) => matches!(arena.node(id), Node::Ident { name, .. } if *name == expected),
                None => false,
            },
            Condition::NotKeyword => match arena.node_of(v) {
                Some(id) => match arena.node(id) {
                    Node::Ident { name, keyword, .. } => {
                        !*keyword && !interner.is_keyword(*name)
                    }
                    _ => false,
                },
                None => false,
            },
        }
    }
}

impl PosHook {
    /// Stamp the element's start position onto the result.
    pub(crate) fn apply(self, arena: &mut Arena, v: Value, pos: TextPos) -> Value {
        match self {
            PosHook::None => v,
            PosHook::Ident => match v {
                Value::IdentScan { len, .. } => Value::IdentScan { pos, len },
                other => other,
            },
            PosHook::Int => match v {
                Value::IntScan {
                    have_pos: false,
                    value,
                    neg,
                    state,
                    ..
                } => Value::IntScan {
                    pos,
                    have_pos: true,
                    value,
                    neg,
                    state,
                },
                other => other,
            },
            PosHook::Char => Value::CharScan { pos, ch: 0 },
            PosHook::Str => match v {
                Value::None => Value::StrScan {
                    pos,
                    len: 0,
                    octal: 0,
                },
                other => other,
            },
            PosHook::Node => {
                if let Value::Node(id) = v {
                    match arena.node_mut(id) {
                        Node::Ident { pos: p, .. }
                        | Node::Char { pos: p, .. }
                        | Node::Str { pos: p, .. }
                        | Node::Int { pos: p, .. }
                        | Node::Tree { pos: p, .. } => *p = pos,
                    }
                }
                v
            }
        }
    }
}

impl EndHook {
    /// Compute a rule's final result from its accumulator.
    pub(crate) fn apply(
        self,
        arena: &mut Arena,
        interner: &mut Interner,
        seed: Value,
    ) -> Option<Value> {
        match self {
            EndHook::None => Some(seed),

            EndHook::MakeTree(tag) => Some(Value::Node(arena.make_tree(tag, seed))),
            EndHook::MakeTreeFromList(tag) => {
                Some(Value::Node(arena.make_tree_from_list(tag, seed)))
            }
            EndHook::PassTree => match seed {
                Value::Children(id) => Some(arena.cell(id).child),
                _ => None,
            },

            EndHook::IdentTree => match seed {
                Value::IdentScan { pos, len } => {
                    let text = std::str::from_utf8(&arena.ident_buf[..len as usize]).ok()?;
                    let text = text.to_owned();
                    let name = interner.intern(&text);
                    let keyword = interner.is_keyword(name);
                    Some(Value::Node(arena.alloc(Node::Ident { name, keyword, pos })))
                }
                Value::None => Some(Value::None),
                _ => None,
            },

            EndHook::CharTree => match seed {
                Value::CharScan { pos, ch } => {
                    Some(Value::Node(arena.alloc(Node::Char { ch, pos })))
                }
                _ => None,
            },

            EndHook::StringTree => match seed {
                Value::StrScan { pos, len, .. } => {
                    let content: Vec<u8> = arena.str_scratch[..len as usize].to_vec();
                    let (start, len) = arena.store_bytes(&content);
                    Some(Value::Node(arena.alloc(Node::Str { start, len, pos })))
                }
                _ => None,
            },

            EndHook::IntTree => match seed {
                Value::IntScan {
                    pos, value, neg, ..
                } => {
                    let value = if neg { -value } else { value };
                    Some(Value::Node(arena.alloc(Node::Int { value, pos })))
                }
                _ => None,
            },

            EndHook::NumberTree => match seed {
                Value::Num { value } => Some(Value::Node(arena.alloc(Node::Int {
                    value,
                    pos: TextPos::default(),
                }))),
                _ => None,
            },
        }
    }
}
