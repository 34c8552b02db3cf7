use cmel::runtime::vm::{InterpretError, Vm};

fn run(source: &str) -> String {
    let mut vm = Vm::new();
    vm.capture_output();
    match vm.interpret(source) {
        Ok(()) => vm.take_output(),
        Err(InterpretError::Compile(diags)) => panic!("compile failed: {:?}", diags),
        Err(InterpretError::Runtime(message)) => panic!("runtime failed: {}", message),
    }
}

fn run_error(source: &str) -> String {
    let mut vm = Vm::new();
    vm.capture_output();
    match vm.interpret(source) {
        Err(InterpretError::Runtime(message)) => message,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

// ---- string methods ----

#[test]
fn string_length_counts_bytes() {
    assert_eq!(run("print \"hello\".length();"), "5\n");
    assert_eq!(run("print \"\".length();"), "0\n");
}

#[test]
fn string_split_on_separator() {
    assert_eq!(run("print \"a,b,c\".split(\",\");"), "[a, b, c]\n");
    assert_eq!(run("print \"a,\".split(\",\");"), "[a, ]\n");
    assert_eq!(run("print \"no-sep\".split(\",\");"), "[no-sep]\n");
}

#[test]
fn string_split_empty_separator_gives_bytes() {
    assert_eq!(run("print \"abc\".split(\"\");"), "[a, b, c]\n");
}

#[test]
fn string_split_requires_string_separator() {
    let message = run_error("\"abc\".split(1);");
    assert!(message.starts_with("Can only split using a string.\n"));
}

#[test]
fn string_char_at_supports_negative_indices() {
    assert_eq!(run("print \"abc\".charAt(0);"), "a\n");
    assert_eq!(run("print \"abc\".charAt(-1);"), "c\n");
    let message = run_error("\"abc\".charAt(3);");
    assert!(message.starts_with("Index out of bounds.\n"));
}

#[test]
fn string_slice_clamps() {
    assert_eq!(run("print \"hello\".slice(1);"), "ello\n");
    assert_eq!(run("print \"hello\".slice(1, 3);"), "el\n");
    assert_eq!(run("print \"hello\".slice(-3);"), "llo\n");
    assert_eq!(run("print \"hello\".slice(0, -1);"), "hell\n");
    assert_eq!(run("print \"hello\".slice(2, 100);"), "llo\n");
    assert_eq!(run("print \"hello\".slice(4, 2);"), "\n");
}

#[test]
fn strings_bind_methods_as_values() {
    assert_eq!(run("var m = \"hello\".length; print m();"), "5\n");
}

// ---- number methods and conversion ----

#[test]
fn number_add_method() {
    assert_eq!(run("print number(1).add(2);"), "3\n");
    assert_eq!(run("print 1.5.add(2.5);"), "4\n");
}

#[test]
fn number_conversion() {
    assert_eq!(run("print number(\"3.5\");"), "3.5\n");
    assert_eq!(run("print number(\" 42 \");"), "42\n");
    assert_eq!(run("print number(\"junk\");"), "0\n");
    assert_eq!(run("print number(true);"), "1\n");
    assert_eq!(run("print number(false);"), "0\n");
    assert_eq!(run("print number(7);"), "7\n");
    let message = run_error("number(nil);");
    assert!(message.starts_with("Given type cannot be converted to a number.\n"));
}

#[test]
fn number_parses_a_leading_prefix() {
    // Trailing garbage after a valid prefix is ignored, like strtof.
    assert_eq!(run("print number(\"42abc\");"), "42\n");
    assert_eq!(run("print number(\"3.5x\");"), "3.5\n");
    assert_eq!(run("print number(\"-2e2 left\");"), "-200\n");
    assert_eq!(run("print number(\"1.2.3\");"), "1.2\n");
}

// ---- list methods ----

#[test]
fn list_add_remove_length() {
    assert_eq!(
        run("var xs = [1, 2]; xs.add(3); print xs; print xs.length();"),
        "[1, 2, 3]\n3\n"
    );
    assert_eq!(run("var xs = [1, 2, 3]; xs.remove(1); print xs;"), "[1, 3]\n");
    let message = run_error("[1].remove(5);");
    assert!(message.starts_with("Index out of bounds.\n"));
}

#[test]
fn fractional_indices_truncate() {
    assert_eq!(run("var xs = [10, 20, 30]; print xs[1.7];"), "20\n");
    assert_eq!(
        run("var xs = [10, 20, 30]; xs[0.5] = 99; print xs;"),
        "[99, 20, 30]\n"
    );
    assert_eq!(
        run("var xs = [10, 20, 30]; xs.remove(1.9); print xs;"),
        "[10, 30]\n"
    );
}

#[test]
fn list_map_filter_find() {
    assert_eq!(
        run("print [1, 2, 3].map(fun(x) { return x * 10; });"),
        "[10, 20, 30]\n"
    );
    assert_eq!(
        run("print [1, 2, 3, 4].filter(fun(x) { return x % 2 == 0; });"),
        "[2, 4]\n"
    );
    assert_eq!(
        run("print [1, 2, 3].find(fun(x) { return x > 1; });"),
        "2\n"
    );
    assert_eq!(
        run("print [1, 2, 3].find(fun(x) { return x > 9; });"),
        "nil\n"
    );
}

#[test]
fn list_contains_reverse_sum() {
    assert_eq!(run("print [1, 2, 3].contains(2);"), "true\n");
    assert_eq!(run("print [1, 2, 3].contains(9);"), "false\n");
    assert_eq!(run("print [\"a\", \"b\"].contains(\"a\");"), "true\n");
    assert_eq!(run("print [1, 2, 3].reverse();"), "[3, 2, 1]\n");
    assert_eq!(run("print [1, 2, 3, 4].sum();"), "10\n");
    let message = run_error("[1, \"x\"].sum();");
    assert!(message.starts_with("Can only sum a list of numbers.\n"));
}

#[test]
fn list_map_with_closure_callback() {
    assert_eq!(
        run(
            "var offset = 100;\n\
             print [1, 2].map(fun(x) { return x + offset; });"
        ),
        "[101, 102]\n"
    );
}

// ---- map methods ----

#[test]
fn map_keys_values_length() {
    let output = run(
        "var m = {\"a\": 1, \"b\": 2};\n\
         print m.length();\n\
         print m.keys().length();\n\
         print m.values().sum();",
    );
    assert_eq!(output, "2\n2\n3\n");
}

#[test]
fn map_remove_and_has() {
    let output = run(
        "var m = {\"a\": 1};\n\
         print m.has(\"a\");\n\
         m.remove(\"a\");\n\
         print m.has(\"a\");\n\
         print m.length();",
    );
    assert_eq!(output, "true\nfalse\n0\n");
}

#[test]
fn map_overwrite_keeps_one_entry() {
    let output = run(
        "var m = {\"k\": 1};\n\
         m[\"k\"] = 2;\n\
         print m[\"k\"];\n\
         print m.length();",
    );
    assert_eq!(output, "2\n1\n");
}

// ---- assertions and misc ----

#[test]
fn assert_passes_silently() {
    assert_eq!(run("assert(true); assert(1 == 1, \"unused\"); print \"ok\";"), "ok\n");
}

#[test]
fn assert_equal_compares_strings_by_content() {
    assert_eq!(
        run("assertEqual(\"ab\", \"a\" + \"b\"); print \"ok\";"),
        "ok\n"
    );
}

#[test]
fn clock_returns_a_number() {
    assert_eq!(run("print clock() > 0;"), "true\n");
}
