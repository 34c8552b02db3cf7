//! The embedded standard library: `.cmel` sources baked into the binary.
//!
//! The module loader falls back to this table when no file exists at the
//! import path, so `import "std/test";` works anywhere without an install
//! step.

pub struct EmbeddedModule {
    pub name: &'static str,
    pub source: &'static str,
}

pub const EMBEDDED_STDLIB: &[EmbeddedModule] = &[
    EmbeddedModule {
        name: "std/math",
        source: include_str!("../../stdlib/math.cmel"),
    },
    EmbeddedModule {
        name: "std/test",
        source: include_str!("../../stdlib/test.cmel"),
    },
];

/// Looks up an embedded module by its logical (extensionless) import path.
pub fn lookup(name: &str) -> Option<&'static str> {
    EMBEDDED_STDLIB
        .iter()
        .find(|module| module.name == name)
        .map(|module| module.source)
}
