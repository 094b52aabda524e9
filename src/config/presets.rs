/// Toolchain presets
///
/// Every external program the pipeline drives is described by a `LaunchSpec`
/// so that installations with unusual layouts (or tests with fake tools) can
/// swap programs without touching stage logic.
use serde::{Deserialize, Serialize};

/// One way of launching an external program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Executable name (resolved via `PATH`) or absolute path
    pub program: String,
    /// Arguments placed before the stage's own arguments
    #[serde(default)]
    pub leading_args: Vec<String>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Full argv for this spec followed by `args`
    pub fn argv<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = Vec::with_capacity(1 + self.leading_args.len());
        argv.push(self.program.clone());
        argv.extend(self.leading_args.iter().cloned());
        argv.extend(args.into_iter().map(Into::into));
        argv
    }
}

/// Programs used by the compile stage and the three views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchain {
    /// Source-to-classfile compiler
    pub compiler: LaunchSpec,
    /// Classfile printer
    pub bytecode_printer: LaunchSpec,
    /// JVM used for the JIT view
    pub runtime: LaunchSpec,
    /// Ahead-of-time native compiler
    pub native_compiler: LaunchSpec,
    /// Binary disassemblers, tried in order until one yields output
    pub disassembler_candidates: Vec<LaunchSpec>,
    /// Extension of the written source file (without dot)
    pub source_extension: String,
    /// Extension of the compiled artifact (without dot)
    pub artifact_extension: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            compiler: LaunchSpec::new("javac"),
            bytecode_printer: LaunchSpec::new("javap"),
            runtime: LaunchSpec::new("java"),
            native_compiler: LaunchSpec::new("native-image"),
            disassembler_candidates: default_disassembler_candidates(),
            source_extension: "java".to_string(),
            artifact_extension: "class".to_string(),
        }
    }
}

/// objdump is installed under different names depending on platform and
/// package manager (binutils on macOS installs `gobjdump` or a keg-only path).
pub fn default_disassembler_candidates() -> Vec<LaunchSpec> {
    vec![
        LaunchSpec::new("objdump"),
        LaunchSpec::new("/usr/bin/objdump"),
        LaunchSpec::new("gobjdump"),
        LaunchSpec::new("/usr/local/opt/binutils/bin/objdump"),
    ]
}

impl Toolchain {
    /// Tools with the argument that makes each print its version
    pub fn version_checks(&self) -> Vec<(&'static str, &LaunchSpec, &'static str)> {
        let mut checks = vec![
            ("compiler", &self.compiler, "-version"),
            ("bytecode printer", &self.bytecode_printer, "-version"),
            ("runtime", &self.runtime, "-version"),
            ("native compiler", &self.native_compiler, "--version"),
        ];
        for candidate in &self.disassembler_candidates {
            checks.push(("disassembler", candidate, "--version"));
        }
        checks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toolchain_uses_path_lookups() {
        let toolchain = Toolchain::default();
        assert_eq!(toolchain.compiler.program, "javac");
        assert_eq!(toolchain.bytecode_printer.program, "javap");
        assert_eq!(toolchain.runtime.program, "java");
        assert_eq!(toolchain.native_compiler.program, "native-image");
        assert_eq!(toolchain.source_extension, "java");
    }

    #[test]
    fn disassembler_candidates_are_ordered() {
        let names: Vec<String> = default_disassembler_candidates()
            .into_iter()
            .map(|c| c.program)
            .collect();
        assert_eq!(
            names,
            vec![
                "objdump",
                "/usr/bin/objdump",
                "gobjdump",
                "/usr/local/opt/binutils/bin/objdump"
            ]
        );
    }

    #[test]
    fn argv_puts_leading_args_first() {
        let spec = LaunchSpec::new("/bin/sh").with_leading_args(["fake-javac.sh"]);
        assert_eq!(
            spec.argv(["Test.java"]),
            vec!["/bin/sh", "fake-javac.sh", "Test.java"]
        );
    }

    #[test]
    fn partial_toolchain_json_keeps_defaults() {
        let toolchain: Toolchain =
            serde_json::from_str(r#"{"compiler": {"program": "/opt/jdk/bin/javac"}}"#).unwrap();
        assert_eq!(toolchain.compiler.program, "/opt/jdk/bin/javac");
        assert!(toolchain.compiler.leading_args.is_empty());
        assert_eq!(toolchain.runtime.program, "java");
        assert_eq!(toolchain.disassembler_candidates.len(), 4);
    }
}
