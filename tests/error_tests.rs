//! Diagnostics rendering, pinned with inline snapshots.

use cmel::bytecode::compiler::compile;
use cmel::frontend::diagnostics::render_diagnostics;
use cmel::runtime::gc::Heap;
use cmel::runtime::vm::{InterpretError, Vm};

fn compile_report(source: &str) -> String {
    let mut heap = Heap::new();
    match compile(source, &mut heap) {
        Ok(_) => panic!("expected compilation to fail"),
        Err(diagnostics) => render_diagnostics(&diagnostics),
    }
}

fn runtime_report(source: &str) -> String {
    let mut vm = Vm::new();
    vm.capture_output();
    match vm.interpret(source) {
        Err(InterpretError::Runtime(message)) => message,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

#[test]
fn missing_semicolon() {
    insta::assert_snapshot!(
        compile_report("print 1"),
        @"[line 1] Error at end: Expect ';' after value."
    );
}

#[test]
fn unterminated_string() {
    insta::assert_snapshot!(
        compile_report("var s = \"abc"),
        @"[line 1] Error: Unterminated string."
    );
}

#[test]
fn stray_character() {
    insta::assert_snapshot!(
        compile_report("var a = 1 @ 2;"),
        @"[line 1] Error: Unexpected character '@'."
    );
}

#[test]
fn invalid_escape() {
    insta::assert_snapshot!(
        compile_report("var s = \"\\q\";"),
        @"[line 1] Error: Invalid escape character 'q'."
    );
}

#[test]
fn invalid_assignment_target() {
    insta::assert_snapshot!(
        compile_report("a + b = c;"),
        @"[line 1] Error at '=': Invalid assignment target."
    );
}

#[test]
fn several_errors_reported_across_statements() {
    let report = compile_report("var = 1;\nbreak;\nprint this;");
    insta::assert_snapshot!(report, @r"
    [line 1] Error at '=': Expect variable name.
    [line 2] Error at ';': Can't use 'break' outside of a loop.
    [line 3] Error at 'this': Can't use 'this' outside of a class.
    ");
}

#[test]
fn runtime_error_trace_reaches_script_frame() {
    let report = runtime_report("fun inner() { missing(); }\nfun outer() { inner(); }\nouter();");
    assert_eq!(
        report,
        "Undefined variable 'missing'.\n\
         [line 1] in inner\n\
         [line 2] in outer\n\
         [line 3] in script\n"
    );
}

#[test]
fn type_errors_name_the_operation() {
    assert!(runtime_report("1 - \"x\";").starts_with("Operands must be numbers.\n"));
    assert!(runtime_report("-\"x\";").starts_with("Operand must be a number.\n"));
    assert!(runtime_report("1 + nil;")
        .starts_with("Operands must be two numbers or two strings.\n"));
    assert!(runtime_report("nil < 1;").starts_with("Operands must be numbers.\n"));
}
