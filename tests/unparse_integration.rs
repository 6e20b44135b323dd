//! Unparsing is a left inverse of parsing modulo whitespace: for accepted
//! input, printing the tree back yields the same token stream (comments
//! excepted, they are discarded by the parser).

use tcposc::c_grammar::c_grammar;
use tcposc::{Arena, Interner, Parser, Unparser};

/// A crude C tokenizer, good enough to compare token streams: identifiers
/// and numbers as maximal runs, quoted literals verbatim, every other
/// printable byte as itself. Whitespace and comments separate tokens.
fn tokens(src: &str) -> Vec<String> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let ch = bytes[i];
        if ch.is_ascii_whitespace() {
            i += 1;
        } else if ch == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
        } else if ch == b'/' && bytes.get(i + 1) == Some(&b'*') {
            i += 2;
            while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            i = (i + 2).min(bytes.len());
        } else if ch.is_ascii_alphanumeric() || ch == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            out.push(src[start..i].to_string());
        } else if ch == b'"' || ch == b'\'' {
            let quote = ch;
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i] != quote {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(bytes.len());
            out.push(src[start..i].to_string());
        } else {
            out.push((ch as char).to_string());
            i += 1;
        }
    }
    out
}

fn roundtrip(start: &str, input: &str) -> String {
    let mut interner = Interner::new();
    let grammar = c_grammar(&mut interner);
    let mut arena = Arena::new();
    let value = {
        let mut parser = Parser::new(&grammar, input.as_bytes(), &mut arena, &mut interner);
        parser
            .parse(start)
            .unwrap_or_else(|e| panic!("{start} should parse {input:?}: {e}"))
    };
    let mut out = Vec::new();
    let mut up = Unparser::new();
    up.unparse(&arena, &interner, value, &mut out);
    String::from_utf8(out).unwrap()
}

fn assert_same_tokens(start: &str, input: &str) {
    let printed = roundtrip(start, input);
    assert_eq!(
        tokens(input),
        tokens(&printed),
        "token stream changed for {input:?}; printed as {printed:?}"
    );
}

#[test]
fn test_expression_roundtrip() {
    for input in [
        "a*b+c",
        "f(a, b, c)",
        "x = y = z + 1",
        "a ? b : c",
        "p->next.value[3]++",
        "-x * ~y / !z",
        "a << 2 & mask",
        "sizeof(unsigned int)",
        "(float) half",
    ] {
        assert_same_tokens("expr", input);
    }
}

#[test]
fn test_statement_roundtrip() {
    for input in [
        "x = 1;",
        "{ x = 1; y = 2; }",
        "if (a > b) max = a; else max = b;",
        "while (n) n = n - 1;",
        "do n = n - 1; while (n);",
        "for (i = 0; i < 10; i = i + 1) sum = sum + i;",
        "switch (c) { case 1: x = 1; break; default: x = 0; break; }",
        "goto done;",
        "return x + 1;",
        "lbl: x = 1;",
        "queue for input x = 1;",
        "timer t;",
        "every (100) start tick;",
        "poll check(); at most (10) fail();",
    ] {
        assert_same_tokens("statement", input);
    }
}

#[test]
fn test_declaration_roundtrip() {
    for input in [
        "int x;",
        "int x = 5;",
        "static char *name = \"none\";",
        "int f(void) { return 0; }",
        "int add(int a, int b) { return a + b; }",
        "struct point { int x; int y; };",
        "enum color { red, green = 3 };",
        "unsigned long big = 65536;",
        "int a[8];",
        "task int worker(void) { return 1; }",
    ] {
        assert_same_tokens("root", input);
    }
}

#[test]
fn test_comments_are_dropped_but_tokens_survive() {
    let with_comments = "int /* width */ x = 5; // trailing\n";
    let printed = roundtrip("root", with_comments);
    assert_eq!(tokens("int x = 5;"), tokens(&printed));
}

#[test]
fn test_whole_program_roundtrip() {
    let program = "\
int limit = 10;

int twice(int n)
{
    return n + n;
}

int main(void)
{
    int i;
    for (i = 0; i < limit; i = i + 1)
        emit(twice(i));
    return 0;
}
";
    assert_same_tokens("root", program);
}
