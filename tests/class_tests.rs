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

#[test]
fn instances_store_fields() {
    let output = run(
        "class Box {}\n\
         var box = Box();\n\
         box.value = 42;\n\
         print box.value;\n\
         print box;",
    );
    assert_eq!(output, "42\nBox instance\n");
}

#[test]
fn methods_bind_this() {
    let output = run(
        "class Counter {\n\
           init() { this.count = 0; }\n\
           bump() { this.count = this.count + 1; return this.count; }\n\
         }\n\
         var c = Counter();\n\
         c.bump();\n\
         print c.bump();",
    );
    assert_eq!(output, "2\n");
}

#[test]
fn initializer_receives_arguments_and_returns_instance() {
    let output = run(
        "class Point {\n\
           init(x, y) { this.x = x; this.y = y; }\n\
         }\n\
         var p = Point(3, 4);\n\
         print p.x + p.y;",
    );
    assert_eq!(output, "7\n");
}

#[test]
fn class_call_without_init_requires_zero_args() {
    let message = run_error("class Empty {} Empty(1);");
    assert!(message.starts_with("Expected 0 arguments but got 1.\n"));
}

#[test]
fn bound_methods_keep_their_receiver() {
    let output = run(
        "class Speaker {\n\
           init(name) { this.name = name; }\n\
           speak() { print this.name; }\n\
         }\n\
         var method = Speaker(\"alice\").speak;\n\
         method();",
    );
    assert_eq!(output, "alice\n");
}

#[test]
fn fields_shadow_methods_on_invoke() {
    let output = run(
        "class Widget {\n\
           action() { print \"method\"; }\n\
         }\n\
         var w = Widget();\n\
         w.action = fun() { print \"field\"; };\n\
         w.action();",
    );
    assert_eq!(output, "field\n");
}

#[test]
fn inheritance_copies_methods_down() {
    let output = run(
        "class Animal {\n\
           speak() { print \"...\"; }\n\
           kind() { print \"animal\"; }\n\
         }\n\
         class Dog < Animal {\n\
           speak() { print \"woof\"; }\n\
         }\n\
         var d = Dog();\n\
         d.speak();\n\
         d.kind();",
    );
    assert_eq!(output, "woof\nanimal\n");
}

#[test]
fn super_calls_the_parent_method() {
    let output = run(
        "class A {\n\
           greet() { print \"A\"; }\n\
         }\n\
         class B < A {\n\
           greet() { super.greet(); print \"B\"; }\n\
         }\n\
         B().greet();",
    );
    assert_eq!(output, "A\nB\n");
}

#[test]
fn super_works_through_closures() {
    let output = run(
        "class A {\n\
           greet() { return \"A\"; }\n\
         }\n\
         class B < A {\n\
           greet() {\n\
             var parent = super.greet;\n\
             return parent() + \"B\";\n\
           }\n\
         }\n\
         print B().greet();",
    );
    assert_eq!(output, "AB\n");
}

#[test]
fn subclass_init_chains_through_super() {
    let output = run(
        "class A {\n\
           init() { this.base = 1; }\n\
         }\n\
         class B < A {\n\
           init() { super.init(); this.extra = 2; }\n\
         }\n\
         var b = B();\n\
         print b.base + b.extra;",
    );
    assert_eq!(output, "3\n");
}

#[test]
fn superclass_must_be_a_class() {
    let message = run_error("var NotAClass = 1; class Sub < NotAClass {}");
    assert!(message.starts_with("Superclass must be a class.\n"));
}

#[test]
fn undefined_property_is_an_error() {
    let message = run_error("class Empty {} Empty().missing;");
    assert!(message.starts_with("Undefined property 'missing'.\n"));
}

#[test]
fn only_instances_have_fields() {
    let message = run_error("var x = 1; x.field = 2;");
    assert!(message.starts_with("Only instances have fields\n"));
}

#[test]
fn property_assignment_evaluates_to_the_value() {
    let output = run("class Box {} var b = Box(); print b.v = 9;");
    assert_eq!(output, "9\n");
}
