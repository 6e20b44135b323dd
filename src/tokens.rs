//! Token grammars
//!
//! The scanner is integrated with the parser: white space, identifiers,
//! and literals are ordinary non-terminals whose rules match characters
//! and fold them through the scan hooks. Keywords are not recognized here;
//! the surrounding grammar matches `ident` and checks the result against
//! an interned keyword name.

use crate::char_set::CharSet;
use crate::grammar::{BeginSeq, CharHook, EndHook, GrammarBuilder, PosHook, SeqHook};

fn digits() -> CharSet {
    CharSet::new().with_range(b'0', b'9')
}

/// `white_space`: any run of blanks, `//` line comments and `/* */`
/// comments. The comment body carries the avoid modifier so `*/` ends the
/// comment at the first opportunity.
pub fn install_white_space(b: &mut GrammarBuilder<'_>) {
    b.nt("white_space", |nt| {
        nt.rule(|r| {
            r.group(|g| {
                g.rule(|r| {
                    r.set(
                        CharSet::new().with(b' ').with(b'\t').with(b'\n').with(b'\r'),
                        CharHook::None,
                    );
                });
                g.rule(|r| {
                    r.ch('/');
                    r.ch('/');
                    r.set(
                        CharSet::new().with_range(b' ', 255).with(b'\t'),
                        CharHook::None,
                    )
                    .seq_plain()
                    .opt();
                    r.ch('\r').opt();
                    r.ch('\n');
                });
                g.rule(|r| {
                    r.ch('/');
                    r.ch('*');
                    r.set(
                        CharSet::new()
                            .with_range(b' ', 255)
                            .with(b'\t')
                            .with(b'\n')
                            .with(b'\r'),
                        CharHook::None,
                    )
                    .seq_plain()
                    .opt()
                    .avoid();
                    r.ch('*');
                    r.ch('/');
                });
            })
            .seq_plain()
            .opt();
        });
    });
}

/// `number`: a plain digit run, folded into an integer node.
pub fn install_number(b: &mut GrammarBuilder<'_>) {
    b.nt("number", |nt| {
        nt.rule(|r| {
            r.set(digits(), CharHook::Number)
                .seq(BeginSeq::Empty, SeqHook::UseSeq);
            r.end_hook(EndHook::NumberTree);
        });
    });
}

/// `ident`: `[A-Za-z_][A-Za-z_0-9]*`, at most 64 significant bytes. The
/// end hook interns the name and records the keyword flag as of now.
pub fn install_ident(b: &mut GrammarBuilder<'_>) {
    let first = CharSet::new()
        .with_range(b'a', b'z')
        .with_range(b'A', b'Z')
        .with(b'_');
    let rest = first.with_range(b'0', b'9');
    b.nt("ident", |nt| {
        nt.rule(move |r| {
            r.set(first, CharHook::Ident).pos(PosHook::Ident);
            r.set(rest, CharHook::Ident)
                .seq(BeginSeq::PassPrev, SeqHook::UseSeq)
                .opt();
            r.end_hook(EndHook::IdentTree);
        });
    });
}

/// `char`: a single-quoted character with the escape alphabet
/// ``0"'\abfnrtv``.
pub fn install_char(b: &mut GrammarBuilder<'_>) {
    let escapes = CharSet::new()
        .with(b'0')
        .with(b'"')
        .with(b'\'')
        .with(b'\\')
        .with(b'a')
        .with(b'b')
        .with(b'f')
        .with(b'n')
        .with(b'r')
        .with(b't')
        .with(b'v');
    let plain = CharSet::new().with_range(b' ', 126).without(b'\\').without(b'\'');
    b.nt("char", |nt| {
        nt.rule(move |r| {
            r.ch('\'').pos(PosHook::Char);
            r.group(move |g| {
                g.rule(move |r| {
                    r.ch('\\');
                    r.set(escapes, CharHook::CharEscaped);
                });
                g.rule(move |r| {
                    r.set(plain, CharHook::CharNormal);
                });
            });
            r.ch('\'');
            r.end_hook(EndHook::CharTree);
        });
    });
}

/// `string`: one or more double-quoted runs separated by white space and
/// concatenated into a single owned byte array with a trailing NUL.
/// Escapes are `0`, the quotes, backslash, `n`, `r`, and 3-digit octal.
pub fn install_string(b: &mut GrammarBuilder<'_>) {
    let octal_first = CharSet::new().with(b'0').with(b'1');
    let octal = CharSet::new().with_range(b'0', b'7');
    let escapes = CharSet::new()
        .with(b'0')
        .with(b'\'')
        .with(b'"')
        .with(b'\\')
        .with(b'n')
        .with(b'r');
    let plain = CharSet::new().with_range(b' ', 126).without(b'\\').without(b'"');
    b.nt("string", |nt| {
        nt.rule(move |r| {
            r.group(move |g| {
                g.rule(move |r| {
                    r.ch('"').pos(PosHook::Str);
                    r.group(move |g| {
                        g.rule(move |r| {
                            r.ch('\\');
                            r.set(octal_first, CharHook::StrOctal1);
                            r.set(octal, CharHook::StrOctal2);
                            r.set(octal, CharHook::StrOctal3);
                        });
                        g.rule(move |r| {
                            r.ch('\\');
                            r.set(escapes, CharHook::StrEscaped);
                        });
                        g.rule(move |r| {
                            r.set(plain, CharHook::StrNormal);
                        });
                    })
                    .seq(BeginSeq::PassPrev, SeqHook::UseSeq)
                    .opt();
                    r.ch('"');
                });
            })
            .seq(BeginSeq::PassPrev, SeqHook::UseSeq)
            .chain(|c| {
                c.ws();
            });
            r.end_hook(EndHook::StringTree);
        });
    });
}

/// `int`: optional sign, then hexadecimal, octal, or decimal digits, with
/// optional `U`, `L`, `L` suffixes. One scanner state machine accumulates
/// the value across all the character elements.
pub fn install_int(b: &mut GrammarBuilder<'_>) {
    let hex = CharSet::new()
        .with_range(b'0', b'9')
        .with_range(b'A', b'F')
        .with_range(b'a', b'f');
    let octal = CharSet::new().with_range(b'0', b'7');
    let nonzero = CharSet::new().with_range(b'1', b'9');
    b.nt("int", |nt| {
        nt.rule(move |r| {
            r.ch_f('-', CharHook::Int).opt().pos(PosHook::Int);
            r.group(move |g| {
                g.rule(move |r| {
                    r.ch_f('0', CharHook::Int).pos(PosHook::Int);
                    r.ch_f('x', CharHook::Int);
                    r.set(hex, CharHook::Int)
                        .seq(BeginSeq::PassPrev, SeqHook::UseSeq);
                });
                g.rule(move |r| {
                    r.ch_f('0', CharHook::Int).pos(PosHook::Int);
                    r.set(octal, CharHook::Int)
                        .seq(BeginSeq::PassPrev, SeqHook::UseSeq)
                        .opt();
                });
                g.rule(move |r| {
                    r.set(nonzero, CharHook::Int).pos(PosHook::Int);
                    r.set(digits(), CharHook::Int)
                        .seq(BeginSeq::PassPrev, SeqHook::UseSeq)
                        .opt();
                });
            });
            r.ch('U').opt();
            r.ch('L').opt();
            r.ch('L').opt();
            r.end_hook(EndHook::IntTree);
        });
    });
}

/// Install every token grammar.
pub fn install_all(b: &mut GrammarBuilder<'_>) {
    install_white_space(b);
    install_number(b);
    install_ident(b);
    install_char(b);
    install_string(b);
    install_int(b);
}
