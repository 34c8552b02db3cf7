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

#[test]
fn sibling_closures_share_one_upvalue() {
    let output = run(
        "fun make() {\n\
           var count = 0;\n\
           fun bump() { count = count + 1; return count; }\n\
           fun read() { return count; }\n\
           return [bump, read];\n\
         }\n\
         var pair = make();\n\
         pair[0]();\n\
         pair[0]();\n\
         print pair[1]();",
    );
    assert_eq!(output, "2\n");
}

#[test]
fn closures_capture_variables_not_values() {
    let output = run(
        "var global = fun() {};\n\
         {\n\
           var x = \"before\";\n\
           fun get() { print x; }\n\
           x = \"after\";\n\
           global = get;\n\
         }\n\
         global();",
    );
    assert_eq!(output, "after\n");
}

#[test]
fn upvalues_close_when_scope_ends() {
    let output = run(
        "var hold = fun() {};\n\
         {\n\
           var text = \"captured\";\n\
           fun get() { return text; }\n\
           hold = get;\n\
         }\n\
         print hold();",
    );
    assert_eq!(output, "captured\n");
}

#[test]
fn each_call_gets_fresh_locals() {
    let output = run(
        "fun counter() {\n\
           var n = 0;\n\
           return fun() { n = n + 1; return n; };\n\
         }\n\
         var a = counter();\n\
         var b = counter();\n\
         a();\n\
         a();\n\
         print a() + \"/\" + b();",
    );
    assert_eq!(output, "3/1\n");
}

#[test]
fn loop_variable_capture_sees_final_value() {
    // A single loop variable means every closure shares the same upvalue.
    let output = run(
        "var fns = [];\n\
         for (var i = 0; i < 3; i = i + 1) {\n\
           fns.add(fun() { return i; });\n\
         }\n\
         print fns[0]() + fns[1]() + fns[2]();",
    );
    assert_eq!(output, "9\n");
}

#[test]
fn assignment_through_upvalue_is_visible_to_outer_reads() {
    let output = run(
        "fun outer() {\n\
           var state = \"start\";\n\
           fun set() { state = \"changed\"; }\n\
           set();\n\
           return state;\n\
         }\n\
         print outer();",
    );
    assert_eq!(output, "changed\n");
}

#[test]
fn deeply_nested_transitive_capture() {
    let output = run(
        "fun a() {\n\
           var x = \"x\";\n\
           fun b() {\n\
             fun c() {\n\
               fun d() { return x; }\n\
               return d;\n\
             }\n\
             return c;\n\
           }\n\
           return b;\n\
         }\n\
         print a()()()();",
    );
    assert_eq!(output, "x\n");
}
