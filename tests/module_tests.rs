use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use cmel::runtime::vm::{InterpretError, Vm};

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// Writes module sources into a unique temp directory and returns the
/// extensionless import prefix for it.
fn module_dir(files: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "cmel_modules_{}_{}",
        std::process::id(),
        NEXT_DIR.fetch_add(1, Ordering::SeqCst)
    ));
    fs::create_dir_all(&dir).expect("create module dir");
    for (name, contents) in files {
        fs::write(dir.join(format!("{}.cmel", name)), contents).expect("write module");
    }
    dir
}

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
fn import_from_pulls_only_the_named_export() {
    let dir = module_dir(&[(
        "lib",
        "export var V = 1;\nfun hidden() { return V; }\n",
    )]);
    let prefix = dir.join("lib");
    let output = run(&format!(
        "import V from \"{}\";\nprint V;",
        prefix.display()
    ));
    assert_eq!(output, "1\n");

    // The module's non-exported globals stay out of the importer.
    let message = run_error(&format!(
        "import V from \"{}\";\nhidden();",
        prefix.display()
    ));
    assert!(message.starts_with("Undefined variable 'hidden'.\n"));
}

#[test]
fn import_all_copies_every_export() {
    let dir = module_dir(&[(
        "pair",
        "export var A = 1;\nexport var B = 2;\nvar private = 3;\n",
    )]);
    let prefix = dir.join("pair");
    let output = run(&format!(
        "import \"{}\";\nprint A + B;",
        prefix.display()
    ));
    assert_eq!(output, "3\n");

    let message = run_error(&format!(
        "import \"{}\";\nprint private;",
        prefix.display()
    ));
    assert!(message.starts_with("Undefined variable 'private'.\n"));
}

#[test]
fn module_body_runs_exactly_once() {
    let dir = module_dir(&[("once", "print \"loaded\";\nexport var X = 1;\n")]);
    let prefix = dir.join("once");
    let output = run(&format!(
        "import \"{}\";\nimport \"{}\";\nimport X from \"{}\";\nprint X;",
        prefix.display(),
        prefix.display(),
        prefix.display()
    ));
    assert_eq!(output, "loaded\n1\n");
}

#[test]
fn missing_export_names_the_module() {
    let dir = module_dir(&[("lib", "export var V = 1;\n")]);
    let prefix = dir.join("lib");
    let message = run_error(&format!(
        "import missing from \"{}\";",
        prefix.display()
    ));
    assert!(message.contains("does not export 'missing'"));
}

#[test]
fn missing_module_is_an_error() {
    let message = run_error("import \"no/such/module\";");
    assert!(message.starts_with("Could not open module 'no/such/module.cmel'.\n"));
}

#[test]
fn circular_imports_are_detected() {
    let dir = module_dir(&[("a", ""), ("b", "")]);
    let a = dir.join("a");
    let b = dir.join("b");
    fs::write(
        dir.join("a.cmel"),
        format!("import \"{}\";\nexport var A = 1;\n", b.display()),
    )
    .unwrap();
    fs::write(
        dir.join("b.cmel"),
        format!("import \"{}\";\nexport var B = 1;\n", a.display()),
    )
    .unwrap();

    let message = run_error(&format!("import \"{}\";", a.display()));
    assert!(message.contains("Circular import of module"));
}

#[test]
fn functions_defined_in_a_module_read_module_globals() {
    let dir = module_dir(&[(
        "counter",
        "var count = 0;\n\
         export fun bump() { count = count + 1; return count; }\n",
    )]);
    let prefix = dir.join("counter");
    let output = run(&format!(
        "import bump from \"{}\";\nbump();\nprint bump();",
        prefix.display()
    ));
    assert_eq!(output, "2\n");
}

#[test]
fn export_reads_the_global_at_export_time() {
    // Reassigning after the export declaration does not change what was
    // exported.
    let dir = module_dir(&[("v", "export var V = 1;\nV = 2;\n")]);
    let prefix = dir.join("v");
    let output = run(&format!(
        "import V from \"{}\";\nprint V;",
        prefix.display()
    ));
    assert_eq!(output, "1\n");
}

#[test]
fn module_namespaces_are_isolated_from_the_importer() {
    // The importer's globals must not leak into the module body: `shared`
    // exists in the script, and the module still cannot see it.
    let dir = module_dir(&[("leaky", "export fun probe() { return shared; }\n")]);
    let prefix = dir.join("leaky");
    let message = run_error(&format!(
        "var shared = 1;\nimport probe from \"{}\";\nprobe();",
        prefix.display()
    ));
    assert!(message.starts_with("Undefined variable 'shared'.\n"));
}

#[test]
fn embedded_stdlib_modules_load_without_files() {
    let output = run(
        "import abs, clamp from \"std/math\";\n\
         print abs(-5);\n\
         print clamp(12, 0, 10);",
    );
    assert_eq!(output, "5\n10\n");
}

#[test]
fn embedded_test_framework_runs() {
    let output = run(
        "import test, run from \"std/test\";\n\
         test(\"passes\", fun() { assertEqual(4, 2 + 2); });\n\
         test(\"fails\", fun() { assertEqual(5, 2 + 2); });\n\
         run();",
    );
    assert_eq!(
        output,
        "PASS passes\n\
         FAIL fails: Assertion failed: expected 5 but got 4.\n\
         1 passed, 1 failed\n"
    );
}

#[test]
fn export_outside_module_is_a_runtime_error() {
    let message = run_error("export var V = 1;");
    assert!(message.starts_with("Can't export outside of a module.\n"));
}
