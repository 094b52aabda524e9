//! Fake toolchain shared by the pipeline integration tests.
//!
//! Each tool is a small shell script run as `/bin/sh <script>`, so tests
//! exercise orchestration, cleanup and error mapping without a JDK.

#![allow(dead_code)]

use jvmscope::config::presets::{LaunchSpec, Toolchain};
use jvmscope::exec::runner::StageRunner;
use jvmscope::{Pipeline, PipelineConfig};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Compiles anything except sources containing "invalid code"
pub const FAKE_JAVAC: &str = r#"
src="$1"
if grep -q 'invalid code' "$src"; then
  echo "$src:1: error: class, interface, enum, or record expected" 1>&2
  exit 1
fi
cp "$src" "${src%.java}.class"
"#;

/// Prints a bytecode-looking header followed by the "class file"
pub const FAKE_JAVAP: &str = r#"
for last; do :; done
echo "Classfile $last.class"
echo "  0: getstatic     #7  // Field java/lang/System.out:Ljava/io/PrintStream;"
echo "  3: invokevirtual #15 // Method java/io/PrintStream.println:(Ljava/lang/String;)V"
cat "$last.class"
"#;

/// JVM without hsdis: only the PrintAssembly warning
pub const FAKE_JAVA_NO_HSDIS: &str = r#"
echo "OpenJDK 64-Bit Server VM warning: PrintAssembly is enabled; \
turning on DebugNonSafepoints to gain additional output"
echo "Hello"
"#;

/// JVM with hsdis: a compiled method section
pub const FAKE_JAVA_WITH_HSDIS: &str = r#"
echo "OpenJDK 64-Bit Server VM warning: PrintAssembly is enabled; \
turning on DebugNonSafepoints to gain additional output"
echo "Compiled method (c1) 50 1 3 TestClass::main (9 bytes)"
echo "[Disassembly]"
echo "<nmethod compile_id='1' compiler='c1'>"
echo "  0x00007f3c: mov DWORD PTR [rsp-0x14000],eax"
"#;

/// Writes the file named by `-o`
pub const FAKE_NATIVE_IMAGE: &str = r#"
out=""
prev=""
for arg; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
done
echo "[1/8] Initializing..."
printf 'ELF' > "$out"
"#;

pub const FAILING_NATIVE_IMAGE: &str = r#"
echo "Error: Main entry point class 'TestClass' neither found on the classpath \
nor in the module path."
exit 1
"#;

/// Prints a canned listing for the binary given last
pub const FAKE_OBJDUMP: &str = r#"
for last; do :; done
[ -x "$last" ] || { echo "objdump: $last: not executable" 1>&2; exit 1; }
printf '\n%s:     file format elf64-x86-64\n\n' "$last"
printf 'Disassembly of section .text:\n\n'
printf '0000000000401000 <TestClass_main_8f3a>:\n'
printf '  401000:\tpush   rbp\n'
printf '  401001:\tmov    rbp,rsp\n'
printf '0000000000401010 <java.lang.Object_hashCode>:\n'
printf '  401010:\tmov    eax,DWORD PTR [rdi+0xc]\n'
printf '0000000000402000 <.debug_info>:\n'
"#;

/// Isolated temp root plus a directory of fake tool scripts
pub struct FakeEnv {
    pub root: PathBuf,
    pub tools: PathBuf,
    pub temp_root: PathBuf,
}

impl FakeEnv {
    pub fn new(name: &str) -> Self {
        let root =
            std::env::temp_dir().join(format!("jvmscope_it_{}_{}", name, uuid::Uuid::new_v4()));
        let tools = root.join("tools");
        let temp_root = root.join("workspaces");
        std::fs::create_dir_all(&tools).unwrap();
        std::fs::create_dir_all(&temp_root).unwrap();
        Self {
            root,
            tools,
            temp_root,
        }
    }

    /// Write `body` as a script and return a spec launching it through sh
    pub fn tool(&self, name: &str, body: &str) -> LaunchSpec {
        let path = self.tools.join(format!("{}.sh", name));
        std::fs::write(&path, body).unwrap();
        LaunchSpec::new("/bin/sh").with_leading_args([path.to_string_lossy().into_owned()])
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain {
            compiler: self.tool("javac", FAKE_JAVAC),
            bytecode_printer: self.tool("javap", FAKE_JAVAP),
            runtime: self.tool("java", FAKE_JAVA_NO_HSDIS),
            native_compiler: self.tool("native-image", FAKE_NATIVE_IMAGE),
            disassembler_candidates: vec![
                LaunchSpec::new("jvmscope-no-such-objdump"),
                self.tool("objdump", FAKE_OBJDUMP),
            ],
            ..Toolchain::default()
        }
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            temp_root: self.temp_root.clone(),
            stage_timeout_ms: 5_000,
            native_build_timeout_ms: 5_000,
            toolchain: self.toolchain(),
            ..PipelineConfig::default()
        }
    }

    pub fn pipeline(&self, config: PipelineConfig) -> Pipeline {
        Pipeline::new(config).unwrap().with_runner(quiet_runner())
    }

    /// Entries left under the workspace temp root
    pub fn leftovers(&self) -> Vec<PathBuf> {
        entries(&self.temp_root)
    }
}

impl Drop for FakeEnv {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Runner that ignores the process-wide interrupt flag
pub fn quiet_runner() -> StageRunner {
    StageRunner::new(1024 * 1024)
        .with_interrupt_flag(Arc::new(AtomicBool::new(false)))
        .with_term_grace(Duration::from_millis(100))
}

pub fn entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}

pub fn hello_source(class_name: &str, marker: &str) -> String {
    format!(
        concat!(
            "public class {} {{\n",
            "    public static void main(String[] args) {{\n",
            "        System.out.println(\"{}\");\n",
            "    }}\n",
            "}}\n",
        ),
        class_name, marker
    )
}
