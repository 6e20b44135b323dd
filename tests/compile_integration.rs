//! End-to-end compilation: parse a TinyCoPoOS program, run the task
//! transformation, and check the emitted C.

use tcposc::c_grammar::c_grammar;
use tcposc::{compile, Arena, FixedSink, Interner, Parser, Sink};

fn compile_to_string(source: &str) -> (String, Vec<String>) {
    let mut interner = Interner::new();
    let grammar = c_grammar(&mut interner);
    let mut arena = Arena::for_input(source.len());
    let root = {
        let mut parser = Parser::new(&grammar, source.as_bytes(), &mut arena, &mut interner);
        parser
            .parse("root")
            .unwrap_or_else(|e| panic!("program should parse: {e}"))
    };
    let mut out = Vec::new();
    let diagnostics = compile(&mut arena, &mut interner, root, &mut out);
    (String::from_utf8(out).unwrap(), diagnostics)
}

const PRODUCER_CONSUMER: &str = "\
task int producer(void)
{
    int item = 1;
    return item;
}

task void consumer(void)
{
    int got = producer();
    use_item(got);
}

int main(void)
{
    run_all();
    return 0;
}
";

#[test]
fn test_promoted_globals_come_first() {
    let (output, _) = compile_to_string(PRODUCER_CONSUMER);
    let result_var = output.find("int producer_result;").expect("result variable emitted");
    let local = output.find("int consumer_var1_got;").expect("promoted local emitted");
    let first_code = output.find("void producer(void)").expect("entry function emitted");
    assert!(result_var < first_code, "output:\n{output}");
    assert!(local < first_code, "output:\n{output}");
}

#[test]
fn test_scheduler_call_at_declaration_site() {
    let (output, _) = compile_to_string(PRODUCER_CONSUMER);
    // producer is task 1, consumer is task 2; the continuation is the
    // first step of consumer.
    assert!(
        output.contains("os_call_task(1, 2, consumer_step1);"),
        "output:\n{output}"
    );
    assert!(output.contains("void consumer_step1(void);"), "output:\n{output}");
}

#[test]
fn test_continuation_receives_following_statements() {
    let (output, _) = compile_to_string(PRODUCER_CONSUMER);
    let step = output.find("void consumer_step1(void)\n").expect("step body emitted");
    let use_site = output[step..].find("use_item").expect("continuation keeps the call");
    let _ = use_site;
}

#[test]
fn test_result_assignment_in_producer() {
    let (output, _) = compile_to_string(PRODUCER_CONSUMER);
    // The local declaration became an assignment, the return goes through
    // the result variable.
    assert!(output.contains("producer_var1_item = 1;"), "output:\n{output}");
    assert!(output.contains("producer_result = producer_var1_item;"), "output:\n{output}");
}

#[test]
fn test_untouched_code_survives() {
    let (output, diagnostics) = compile_to_string(PRODUCER_CONSUMER);
    assert!(output.contains("int main(void)"), "output:\n{output}");
    assert!(output.contains("run_all();"), "output:\n{output}");
    assert!(diagnostics.is_empty(), "diagnostics: {diagnostics:?}");
}

#[test]
fn test_compiled_output_is_plain_c() {
    // The emitted program must contain none of the dialect keywords and
    // must parse again under the same grammar.
    let (output, _) = compile_to_string(PRODUCER_CONSUMER);
    assert!(!output.contains("task "), "output:\n{output}");

    let mut interner = Interner::new();
    let grammar = c_grammar(&mut interner);
    let mut arena = Arena::for_input(output.len());
    let mut parser = Parser::new(&grammar, output.as_bytes(), &mut arena, &mut interner);
    parser
        .parse("root")
        .unwrap_or_else(|e| panic!("compiled output should be valid C:\n{output}\n{e}"));
}

#[test]
fn test_program_without_tasks_is_unchanged_in_tokens() {
    let source = "int x = 1;\n\nint main(void)\n{\n    return x;\n}\n";
    let (output, diagnostics) = compile_to_string(source);
    assert!(diagnostics.is_empty());
    let squash = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
    assert_eq!(squash(source), squash(&output));
}

#[test]
fn test_fixed_sink_truncates_long_output() {
    let mut interner = Interner::new();
    let grammar = c_grammar(&mut interner);
    let mut arena = Arena::new();
    let root = {
        let mut parser = Parser::new(
            &grammar,
            PRODUCER_CONSUMER.as_bytes(),
            &mut arena,
            &mut interner,
        );
        parser.parse("root").unwrap()
    };
    let mut out = FixedSink::with_capacity(16);
    out.put_str("");
    compile(&mut arena, &mut interner, root, &mut out);
    assert!(out.truncated());
    assert_eq!(out.as_bytes().len(), 16);
}

#[test]
fn test_parse_failure_exit_path() {
    let mut interner = Interner::new();
    let grammar = c_grammar(&mut interner);
    let mut arena = Arena::new();
    let mut parser = Parser::new(&grammar, b"int x = ;", &mut arena, &mut interner);
    let err = parser.parse("root").unwrap_err();
    let report = err.to_string();
    assert!(report.contains("Expect at"), "report:\n{report}");
}
