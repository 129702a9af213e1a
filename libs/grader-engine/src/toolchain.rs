//! Compiler/runtime seam.
//!
//! The engine only knows how to run a `CommandSpec`; which executables
//! those are, and how the submitted source must be shaped for them, is the
//! toolchain's business.

use crate::workspace::Workspace;
use grader_common::config::EngineConfig;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::path::PathBuf;

/// Standard interactive I/O imports prepended to submissions
pub const JAVA_PREAMBLE: &str = "import java.util.*;\nimport java.io.*;\n\n";

lazy_static! {
    static ref PUBLIC_CLASS: Regex = Regex::new(
        r"\bpublic\s+((?:(?:final|abstract|strictfp)\s+)*)class\s+[A-Za-z_$][A-Za-z0-9_$]*"
    )
    .expect("public class pattern is valid");
    static ref PACKAGE_DECL: Regex =
        Regex::new(r"(?m)^\s*package\s+[A-Za-z_$][A-Za-z0-9_$.]*\s*;")
            .expect("package pattern is valid");
}

/// Program, arguments and working directory of a child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("no public class declaration found")]
    MissingPublicClass,
}

pub trait Toolchain: Send + Sync {
    /// File name the prepared source is written to inside the workspace
    fn source_file_name(&self, workspace: &Workspace) -> String;

    /// Reshape submitted source so its artifact is unique to `workspace`
    fn prepare_source(&self, source: &str, workspace: &Workspace) -> Result<String, SourceError>;

    fn compile_command(&self, workspace: &Workspace) -> CommandSpec;

    fn run_command(&self, workspace: &Workspace) -> CommandSpec;
}

/// `javac` / `java` toolchain.
///
/// The public entry-point class is renamed to the workspace class name so
/// class files from concurrent runs can never shadow each other.
#[derive(Debug, Clone)]
pub struct JavaToolchain {
    compiler: String,
    runtime: String,
    inject_preamble: bool,
}

impl JavaToolchain {
    pub fn new(compiler: impl Into<String>, runtime: impl Into<String>, inject_preamble: bool) -> Self {
        Self {
            compiler: compiler.into(),
            runtime: runtime.into(),
            inject_preamble,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.compiler, &config.runtime, config.inject_preamble)
    }
}

/// Rename the first public top-level class to `class_name` and drop any
/// `package` declaration (the artifact is loaded from the default package).
pub fn rewrite_entry_point(source: &str, class_name: &str) -> Result<String, SourceError> {
    if !PUBLIC_CLASS.is_match(source) {
        return Err(SourceError::MissingPublicClass);
    }

    let renamed = PUBLIC_CLASS.replacen(source, 1, |caps: &Captures| {
        format!("public {}class {}", &caps[1], class_name)
    });

    Ok(PACKAGE_DECL.replace_all(&renamed, "").into_owned())
}

impl Toolchain for JavaToolchain {
    fn source_file_name(&self, workspace: &Workspace) -> String {
        format!("{}.java", workspace.class_name())
    }

    fn prepare_source(&self, source: &str, workspace: &Workspace) -> Result<String, SourceError> {
        let rewritten = rewrite_entry_point(source, &workspace.class_name())?;
        if self.inject_preamble {
            Ok(format!("{}{}", JAVA_PREAMBLE, rewritten))
        } else {
            Ok(rewritten)
        }
    }

    fn compile_command(&self, workspace: &Workspace) -> CommandSpec {
        let dir = workspace.dir().to_string_lossy().into_owned();
        let source = workspace
            .path(&self.source_file_name(workspace))
            .to_string_lossy()
            .into_owned();

        CommandSpec::new(&self.compiler, workspace.dir())
            .arg("-encoding")
            .arg("UTF-8")
            .arg("-d")
            .arg(dir)
            .arg(source)
    }

    fn run_command(&self, workspace: &Workspace) -> CommandSpec {
        let dir = workspace.dir().to_string_lossy().into_owned();

        CommandSpec::new(&self.runtime, workspace.dir())
            .arg("-cp")
            .arg(dir)
            .arg(workspace.class_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_renames_public_class() {
        let source = "public class Main {\n    public static void main(String[] a) {}\n}\n";
        let out = rewrite_entry_point(source, "Main_abc123").unwrap();
        assert!(out.starts_with("public class Main_abc123 {"));
        assert!(out.contains("public static void main"));
    }

    #[test]
    fn test_rewrite_keeps_modifiers() {
        let out = rewrite_entry_point("public final class Solver {}", "Main_x").unwrap();
        assert_eq!(out, "public final class Main_x {}");
    }

    #[test]
    fn test_rewrite_only_first_public_class() {
        let source = "class Helper {}\npublic class Main {}\npublic class Other {}";
        let out = rewrite_entry_point(source, "Main_t").unwrap();
        assert!(out.contains("class Helper {}"));
        assert!(out.contains("public class Main_t {}"));
        assert!(out.contains("public class Other {}"));
    }

    #[test]
    fn test_rewrite_ignores_nested_static_classes() {
        let source = "public class Main {\n  public static class Node {}\n}";
        let out = rewrite_entry_point(source, "Main_t").unwrap();
        assert!(out.contains("public class Main_t {"));
        assert!(out.contains("public static class Node {}"));
    }

    #[test]
    fn test_rewrite_strips_package() {
        let source = "package com.example.hw;\n\npublic class Main {}";
        let out = rewrite_entry_point(source, "Main_t").unwrap();
        assert!(!out.contains("package"));
        assert!(out.contains("public class Main_t {}"));
    }

    #[test]
    fn test_rewrite_requires_public_class() {
        assert_eq!(
            rewrite_entry_point("class Main {}", "Main_t"),
            Err(SourceError::MissingPublicClass)
        );
    }

    #[test]
    fn test_java_commands() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path()).unwrap();
        let toolchain = JavaToolchain::new("javac", "java", true);

        let compile = toolchain.compile_command(&ws);
        assert_eq!(compile.program, "javac");
        assert_eq!(compile.cwd, ws.dir());
        assert!(compile.args.last().unwrap().ends_with(&format!("{}.java", ws.class_name())));

        let run = toolchain.run_command(&ws);
        assert_eq!(run.program, "java");
        assert_eq!(run.args.last().unwrap(), &ws.class_name());
    }

    #[test]
    fn test_preamble_injection() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path()).unwrap();

        let with = JavaToolchain::new("javac", "java", true)
            .prepare_source("public class Main {}", &ws)
            .unwrap();
        assert!(with.starts_with("import java.util.*;"));

        let without = JavaToolchain::new("javac", "java", false)
            .prepare_source("public class Main {}", &ws)
            .unwrap();
        assert!(without.starts_with("public class Main_"));
    }
}
