//! Native functions and primitive-class methods.
//!
//! Natives receive the VM and their argument count; bound natives get the
//! receiver as the trailing argument. Registration happens three times
//! over the same tables: into the VM globals at startup, into each
//! module's fresh globals at load time, and into the four primitive
//! classes.

mod assert_ops;
mod helpers;
mod io_ops;
mod list_ops;
mod map_ops;
mod numeric_ops;
mod string_ops;
mod test_ops;

use crate::runtime::gc::{GcHandle, Heap};
use crate::runtime::object::{Class, HeapObject, NativeFunction};
use crate::runtime::table::Table;
use crate::runtime::value::Value;
use crate::runtime::vm::Vm;

pub const NATIVES: &[NativeFunction] = &[
    NativeFunction {
        name: "clock",
        arity: 0,
        func: io_ops::clock,
    },
    NativeFunction {
        name: "input",
        arity: 0,
        func: io_ops::input,
    },
    NativeFunction {
        name: "readFile",
        arity: 1,
        func: io_ops::read_file,
    },
    NativeFunction {
        name: "number",
        arity: 1,
        func: numeric_ops::number,
    },
    NativeFunction {
        name: "assert",
        arity: -1,
        func: assert_ops::assert,
    },
    NativeFunction {
        name: "assertEqual",
        arity: 2,
        func: assert_ops::assert_equal,
    },
    NativeFunction {
        name: "__enterTestMode",
        arity: 0,
        func: test_ops::enter_test_mode,
    },
    NativeFunction {
        name: "__exitTestMode",
        arity: 0,
        func: test_ops::exit_test_mode,
    },
    NativeFunction {
        name: "__setCurrentTest",
        arity: 1,
        func: test_ops::set_current_test,
    },
    NativeFunction {
        name: "__testFailed",
        arity: 0,
        func: test_ops::test_failed,
    },
    NativeFunction {
        name: "__getLastFailure",
        arity: 0,
        func: test_ops::get_last_failure,
    },
    NativeFunction {
        name: "__clearLastFailure",
        arity: 0,
        func: test_ops::clear_last_failure,
    },
];

// Primitive-method arities count the receiver, which arrives last.
pub const STRING_METHODS: &[NativeFunction] = &[
    NativeFunction {
        name: "length",
        arity: 1,
        func: string_ops::length,
    },
    NativeFunction {
        name: "split",
        arity: 2,
        func: string_ops::split,
    },
    NativeFunction {
        name: "charAt",
        arity: 2,
        func: string_ops::char_at,
    },
    NativeFunction {
        name: "slice",
        arity: -2,
        func: string_ops::slice,
    },
];

pub const NUMBER_METHODS: &[NativeFunction] = &[NativeFunction {
    name: "add",
    arity: 2,
    func: numeric_ops::add,
}];

pub const LIST_METHODS: &[NativeFunction] = &[
    NativeFunction {
        name: "add",
        arity: 2,
        func: list_ops::add,
    },
    NativeFunction {
        name: "remove",
        arity: 2,
        func: list_ops::remove,
    },
    NativeFunction {
        name: "length",
        arity: 1,
        func: list_ops::length,
    },
    NativeFunction {
        name: "map",
        arity: 2,
        func: list_ops::map,
    },
    NativeFunction {
        name: "filter",
        arity: 2,
        func: list_ops::filter,
    },
    NativeFunction {
        name: "find",
        arity: 2,
        func: list_ops::find,
    },
    NativeFunction {
        name: "contains",
        arity: 2,
        func: list_ops::contains,
    },
    NativeFunction {
        name: "reverse",
        arity: 1,
        func: list_ops::reverse,
    },
    NativeFunction {
        name: "sum",
        arity: 1,
        func: list_ops::sum,
    },
];

pub const MAP_METHODS: &[NativeFunction] = &[
    NativeFunction {
        name: "keys",
        arity: 1,
        func: map_ops::keys,
    },
    NativeFunction {
        name: "values",
        arity: 1,
        func: map_ops::values,
    },
    NativeFunction {
        name: "has",
        arity: 2,
        func: map_ops::has,
    },
    NativeFunction {
        name: "remove",
        arity: 2,
        func: map_ops::remove,
    },
    NativeFunction {
        name: "length",
        arity: 1,
        func: map_ops::length,
    },
];

/// Installs the global natives into a table at VM startup (the VM is not
/// running yet, so plain heap allocation is safe).
pub fn define_natives(heap: &mut Heap, globals: &mut Table) {
    for native in NATIVES {
        let name = heap.intern_str(native.name);
        let hash = heap.string_hash(name);
        let handle = heap.alloc(HeapObject::Native(*native));
        globals.set(name, hash, Value::Obj(handle));
    }
}

/// Builds one of the primitive method-table classes (String, Number, List,
/// Map).
pub fn primitive_class(heap: &mut Heap, name: &str, methods: &[NativeFunction]) -> GcHandle {
    let class_name = heap.intern_str(name);
    let mut table = Table::new();
    for native in methods {
        let method_name = heap.intern_str(native.name);
        let hash = heap.string_hash(method_name);
        let handle = heap.alloc(HeapObject::Native(*native));
        table.set(method_name, hash, Value::Obj(handle));
    }
    heap.alloc(HeapObject::Class(Class {
        name: class_name,
        methods: table,
    }))
}

/// Preloads a fresh module's globals with the native bindings. Runs while
/// the VM is live, so allocation goes through the GC-aware paths; the
/// caller keeps `module` rooted.
pub fn define_natives_into_module(vm: &mut Vm, module: GcHandle) {
    for native in NATIVES {
        let name = vm.intern(native.name.as_bytes());
        let hash = vm.heap.string_hash(name);
        let handle = vm.gc_alloc(HeapObject::Native(*native));
        vm.heap
            .module_mut(module)
            .globals
            .set(name, hash, Value::Obj(handle));
    }
}
