//! End-to-end tests driving source text through the scanner, compiler, and
//! VM, asserting on captured output.

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
        Ok(()) => panic!("expected a runtime error"),
        Err(InterpretError::Compile(diags)) => panic!("compile failed: {:?}", diags),
    }
}

#[test]
fn closures_capture_upvalues() {
    let output = run(
        "fun outer() { var x = \"outer\"; fun inner() { print x; } return inner; }\n\
         outer()();",
    );
    assert_eq!(output, "outer\n");
}

#[test]
fn break_leaves_only_the_loop() {
    let output = run(
        "for (var i = 0; i < 5; i = i + 1) { if (i == 3) break; print i; } print \"end\";",
    );
    assert_eq!(output, "0\n1\n2\nend\n");
}

#[test]
fn runtime_errors_carry_a_stack_trace() {
    let message = run_error(
        "fun c() {\n  return c(1);\n}\nfun b() { c(); }\nfun a() { b(); }\na();",
    );
    assert_eq!(
        message,
        "Expected 0 arguments but got 1.\n\
         [line 2] in c\n\
         [line 4] in b\n\
         [line 5] in a\n\
         [line 6] in script\n"
    );
}

#[test]
fn string_plus_number_concatenates() {
    assert_eq!(run("print \"Answer: \" + 42;"), "Answer: 42\n");
    assert_eq!(run("print 42 + \"!\";"), "42!\n");
    assert_eq!(run("print \"v: \" + true;"), "v: true\n");
    assert_eq!(run("print \"v: \" + nil;"), "v: nil\n");
}

#[test]
fn map_operations() {
    let output = run(
        "var m = {\"a\": 1, \"b\": 2};\n\
         m[\"c\"] = 3;\n\
         print m.has(\"b\");\n\
         print m[\"z\"];",
    );
    assert_eq!(output, "true\nnil\n");
}

#[test]
fn printed_whole_numbers_round_trip_through_number() {
    let output = run(
        "print number(\"42\") == 42;\n\
         print number(\"9007199254740992\") == 9007199254740992;\n\
         print number(\"-9007199254740992\") == -9007199254740992;",
    );
    assert_eq!(output, "true\ntrue\ntrue\n");
}

#[test]
fn concatenation_matches_stringification_for_any_value() {
    let output = run(
        "print \"x\" + 1.5;\n\
         print \"x\" + false;\n\
         print \"x\" + nil;\n\
         print \"x\" + [1, \"two\", nil];",
    );
    assert_eq!(output, "x1.5\nxfalse\nxnil\nx[1, two, nil]\n");
}

#[test]
fn reverse_twice_is_identity() {
    let output = run(
        "var xs = [1, 2, 3, 4];\n\
         var back = xs.reverse().reverse();\n\
         for (var i = 0; i < xs.length(); i = i + 1) {\n\
           assert(xs[i] == back[i]);\n\
         }\n\
         print \"ok\";",
    );
    assert_eq!(output, "ok\n");
}

#[test]
fn map_has_agrees_with_keys_contains() {
    let output = run(
        "var m = {\"a\": 1, \"b\": 2};\n\
         print m.has(\"a\") == m.keys().contains(\"a\");\n\
         print m.has(\"z\") == m.keys().contains(\"z\");",
    );
    assert_eq!(output, "true\ntrue\n");
}

#[test]
fn nested_scopes_shadow_and_restore() {
    let output = run(
        "var a = \"global\";\n\
         {\n\
           var a = \"block\";\n\
           {\n\
             print a;\n\
           }\n\
         }\n\
         print a;",
    );
    assert_eq!(output, "block\nglobal\n");
}

#[test]
fn break_inside_nested_loop_only_exits_inner() {
    let output = run(
        "for (var i = 0; i < 2; i = i + 1) {\n\
           for (var j = 0; j < 5; j = j + 1) {\n\
             if (j == 1) break;\n\
             print i + \",\" + j;\n\
           }\n\
         }",
    );
    assert_eq!(output, "0,0\n1,0\n");
}

#[test]
fn while_with_break_and_locals() {
    let output = run(
        "var n = 0;\n\
         while (true) {\n\
           var step = 2;\n\
           n = n + step;\n\
           if (n >= 6) break;\n\
         }\n\
         print n;",
    );
    assert_eq!(output, "6\n");
}

#[test]
fn subscript_assignment_on_lists() {
    let output = run(
        "var xs = [1, 2, 3];\n\
         xs[1] = 20;\n\
         print xs;\n\
         print xs[1] + xs[2];",
    );
    assert_eq!(output, "[1, 20, 3]\n23\n");
}

#[test]
fn list_index_out_of_range_is_an_error() {
    let message = run_error("var xs = [1]; print xs[1];");
    assert!(message.starts_with("Index out of range.\n"));
}

#[test]
fn map_key_must_be_string() {
    let message = run_error("var m = {}; m[1] = 2;");
    assert!(message.starts_with("Map key must be a string.\n"));
}
