//! Property tests: canonical interning, deterministic parsing, and the
//! token-stream round trip over generated expressions.

use proptest::prelude::*;

use tcposc::c_grammar::c_grammar;
use tcposc::{Arena, Interner, Parser, Unparser};

/// Generate identifier-shaped strings.
fn ident_strategy() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,6}".prop_filter("keywords are not identifiers", |s| {
        !matches!(
            s.as_str(),
            "if" | "else" | "while" | "do" | "for" | "switch" | "case" | "default" | "goto"
                | "continue" | "break" | "return" | "sizeof" | "int" | "char" | "short" | "long"
                | "signed" | "unsigned" | "float" | "double" | "const" | "volatile" | "void"
                | "struct" | "union" | "enum" | "typedef" | "extern" | "inline" | "static"
                | "auto" | "register" | "task" | "queue" | "poll" | "at" | "most" | "timer"
                | "every" | "start" | "do_"
        )
    })
}

/// Generate arithmetic expression source text.
fn expr_strategy() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        ident_strategy(),
        (0i64..100_000).prop_map(|n| n.to_string()),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} + {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} * {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} - {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} == {b}")),
            inner.clone().prop_map(|a| format!("({a})")),
            (ident_strategy(), inner).prop_map(|(f, a)| format!("{f}({a})")),
        ]
    })
}

fn unparse_expr(input: &str) -> Option<String> {
    let mut interner = Interner::new();
    let grammar = c_grammar(&mut interner);
    let mut arena = Arena::new();
    let value = {
        let mut parser = Parser::new(&grammar, input.as_bytes(), &mut arena, &mut interner);
        parser.parse("expr").ok()?
    };
    let mut out = Vec::new();
    let mut up = Unparser::new();
    up.unparse(&arena, &interner, value, &mut out);
    Some(String::from_utf8(out).unwrap())
}

fn squash_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

proptest! {
    #[test]
    fn prop_interning_is_canonical(a in "[ -~]{0,12}", b in "[ -~]{0,12}") {
        let mut interner = Interner::new();
        let na = interner.intern(&a);
        let nb = interner.intern(&b);
        prop_assert_eq!(na == nb, a == b);
        prop_assert_eq!(interner.resolve(na), a.as_str());
        prop_assert_eq!(interner.resolve(nb), b.as_str());
    }

    #[test]
    fn prop_reinterning_is_stable(strings in prop::collection::vec("[a-zA-Z0-9_]{1,10}", 1..32)) {
        let mut interner = Interner::new();
        let first: Vec<_> = strings.iter().map(|s| interner.intern(s)).collect();
        let second: Vec<_> = strings.iter().map(|s| interner.intern(s)).collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_expression_parse_is_deterministic(input in expr_strategy()) {
        let first = unparse_expr(&input);
        let second = unparse_expr(&input);
        prop_assert_eq!(&first, &second);
        prop_assert!(first.is_some(), "generated expression should parse: {}", input);
    }

    #[test]
    fn prop_unparse_preserves_expression_text(input in expr_strategy()) {
        // Generated expressions are already in the printer's spacing, so
        // modulo whitespace the text survives the round trip.
        if let Some(printed) = unparse_expr(&input) {
            let reparsed = unparse_expr(&printed)
                .expect("printed expression should parse again");
            prop_assert_eq!(squash_spaces(&printed), squash_spaces(&reparsed));
        }
    }

    #[test]
    fn prop_text_buffer_walks_whole_input(input in "[ -~\t\n]{0,80}") {
        let mut buf = tcposc::TextBuffer::new(input.as_bytes());
        let mut steps = 0;
        while !buf.at_end() {
            buf.next();
            steps += 1;
        }
        prop_assert_eq!(steps, input.len());
        prop_assert!(buf.pos().line >= 1);
        prop_assert!(buf.pos().column >= 1);
    }
}
