use crate::bytecode::compiler::compile;
use crate::frontend::diagnostics::render_diagnostics;
use crate::runtime::gc::GcHandle;
use crate::runtime::object::{Closure, HeapObject, Module};
use crate::runtime::stdlib;
use crate::runtime::table::Table;
use crate::runtime::value::Value;

use super::Vm;

impl Vm {
    /// `import "path";` copies every export into the importing namespace.
    pub(super) fn import_all(&mut self, path: GcHandle) -> Result<(), String> {
        let module = self.load_module(path)?;
        let exports: Vec<(GcHandle, Value)> = self.heap.module(module).exports.iter().collect();
        for (name, value) in exports {
            self.set_current_global(name, value);
        }
        Ok(())
    }

    /// `import name from "path";` copies a single export, or fails naming
    /// the module when the export is missing.
    pub(super) fn import_from(&mut self, path: GcHandle, name: GcHandle) -> Result<(), String> {
        let module = self.load_module(path)?;
        let hash = self.heap.string_hash(name);
        match self.heap.module(module).exports.get(name, hash) {
            Some(value) => {
                self.set_current_global(name, value);
                Ok(())
            }
            None => Err(format!(
                "Module '{}' does not export '{}'.",
                self.heap.string_lossy(self.heap.module(module).name),
                self.heap.string_lossy(name)
            )),
        }
    }

    /// `export name` runs right after the declaration binds its value; the
    /// value is re-read from the module globals by name, so it is whatever
    /// the global holds at this moment.
    pub(super) fn export_name(&mut self, name: GcHandle) -> Result<(), String> {
        let module = match self.current_module() {
            Some(module) => module,
            None => return Err("Can't export outside of a module.".to_string()),
        };
        let hash = self.heap.string_hash(name);
        let value = match self.heap.module(module).globals.get(name, hash) {
            Some(value) => value,
            None => {
                return Err(format!(
                    "Undefined variable '{}'.",
                    self.heap.string_lossy(name)
                ));
            }
        };
        self.heap
            .module_mut(module)
            .exports
            .set(name, hash, value);
        Ok(())
    }

    /// Loads a module exactly once per VM: canonicalizes the path, consults
    /// the cache, reads the file (or the embedded stdlib), compiles, and
    /// runs the body synchronously under the module's own globals.
    pub(super) fn load_module(&mut self, path: GcHandle) -> Result<GcHandle, String> {
        let path_text = self.heap.string_lossy(path).into_owned();
        let canonical = if path_text.ends_with(".cmel") {
            path_text.clone()
        } else {
            format!("{}.cmel", path_text)
        };
        let key = self.intern(canonical.as_bytes());
        let key_hash = self.heap.string_hash(key);

        if let Some(Value::Obj(module)) = self.modules.get(key, key_hash) {
            return Ok(module);
        }
        if self.loading.contains(&key) {
            return Err(format!("Circular import of module '{}'.", canonical));
        }

        let source = match std::fs::read_to_string(&canonical) {
            Ok(source) => source,
            Err(_) => match stdlib::lookup(&path_text) {
                Some(source) => source.to_string(),
                None => return Err(format!("Could not open module '{}'.", canonical)),
            },
        };

        let function = compile(&source, &mut self.heap).map_err(|diagnostics| {
            format!(
                "Could not compile module '{}'.\n{}",
                canonical,
                render_diagnostics(&diagnostics)
            )
        })?;

        // The fresh function and module are invisible to the collector until
        // something rooted points at them.
        self.heap.push_temp_root(Value::Obj(function));
        let module = self.gc_alloc(HeapObject::Module(Module {
            name: key,
            globals: Table::new(),
            exports: Table::new(),
        }));
        self.heap.push_temp_root(Value::Obj(module));

        // Module globals start with just the native bindings; nothing from
        // the importer's namespace leaks in.
        crate::runtime::builtins::define_natives_into_module(self, module);

        let closure = self.gc_alloc(HeapObject::Closure(Closure {
            function,
            upvalues: Vec::new(),
            module: Some(module),
        }));
        self.push(Value::Obj(closure))?;
        self.heap.pop_temp_root();
        self.heap.pop_temp_root();

        self.loading.push(key);
        self.call_closure(closure, 0)?;
        self.run(self.frames.len())?;
        // Discard the module body's return value.
        self.pop();
        self.loading.pop();

        self.modules.set(key, key_hash, Value::Obj(module));
        Ok(module)
    }
}
