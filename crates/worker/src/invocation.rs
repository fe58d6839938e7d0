//! Fully resolved description of one tool run

use crate::env_overlay::EnvOverlay;
use apkforge_core::{ProcessingOptions, Toolchain, NESTED_HEAP_VAR};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Program, arguments, working directory and environment for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl ToolInvocation {
    /// Program name as shown in diagnostics
    pub fn program_display(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Assembles [`ToolInvocation`]s for one toolchain and heap settings
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    toolchain: Toolchain,
    heap_limit: String,
    nested_heap_limit: String,
}

impl InvocationBuilder {
    pub fn new(
        toolchain: Toolchain,
        heap_limit: impl Into<String>,
        nested_heap_limit: impl Into<String>,
    ) -> Self {
        Self {
            toolchain,
            heap_limit: heap_limit.into(),
            nested_heap_limit: nested_heap_limit.into(),
        }
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Runtime arguments followed by the tool's own flags.
    ///
    /// Option flags appear only for options that are present and non-empty.
    pub fn args(&self, input: &Path, output: &Path, options: &ProcessingOptions) -> Vec<String> {
        let mut args = vec![
            format!("-Xmx{}", self.heap_limit),
            "-jar".to_string(),
            lossy(&self.toolchain.tool),
            "-a".to_string(),
            lossy(input),
            "-o".to_string(),
            lossy(output),
        ];

        if let Some(id) = options.target_identifier() {
            args.push("-p".to_string());
            args.push(id.to_string());
        }
        if let Some(name) = options.display_name() {
            args.push("-n".to_string());
            args.push(name.to_string());
        }
        if let Some(icon) = options.icon_path() {
            args.push("-i".to_string());
            args.push(lossy(icon));
        }
        if options.deep {
            args.push("-d".to_string());
        }

        args
    }

    /// Overlay for the tool environment: runtime first on `PATH` and a
    /// heap ceiling for processes the tool itself launches
    pub fn overlay(&self) -> EnvOverlay {
        let mut overlay = EnvOverlay::new();
        if let Some(dir) = self.toolchain.runtime_dir() {
            overlay = overlay.prepend_to_path(dir);
        }
        overlay.set(NESTED_HEAP_VAR, format!("-Xmx{}", self.nested_heap_limit))
    }

    /// Complete invocation over `base_env`
    pub fn build(
        &self,
        input: &Path,
        output: &Path,
        options: &ProcessingOptions,
        base_env: &HashMap<String, String>,
    ) -> ToolInvocation {
        ToolInvocation {
            program: self.toolchain.runtime.clone(),
            args: self.args(input, output, options),
            working_dir: self.toolchain.tool_dir().map(Path::to_path_buf),
            env: self.overlay().apply(base_env),
        }
    }
}

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> InvocationBuilder {
        InvocationBuilder::new(
            Toolchain::new("/opt/jre/bin/java", "/opt/lib/ApkRenamer/renamer.jar"),
            "256m",
            "512m",
        )
    }

    #[test]
    fn test_minimal_args() {
        let args = builder().args(
            Path::new("/in/app.apk"),
            Path::new("/cache/.x.partial.apk"),
            &ProcessingOptions::new(),
        );
        assert_eq!(
            args,
            vec![
                "-Xmx256m",
                "-jar",
                "/opt/lib/ApkRenamer/renamer.jar",
                "-a",
                "/in/app.apk",
                "-o",
                "/cache/.x.partial.apk",
            ]
        );
    }

    #[test]
    fn test_all_option_flags_in_order() {
        let options = ProcessingOptions::new()
            .with_target_identifier("com.example.renamed")
            .with_display_name("Renamed App")
            .with_icon("/in/icon.png")
            .with_deep(true);
        let args = builder().args(Path::new("/in/a.apk"), Path::new("/out.apk"), &options);

        assert_eq!(
            &args[7..],
            &[
                "-p",
                "com.example.renamed",
                "-n",
                "Renamed App",
                "-i",
                "/in/icon.png",
                "-d"
            ]
        );
    }

    #[test]
    fn test_empty_options_emit_no_flags() {
        let options = ProcessingOptions::new()
            .with_target_identifier("")
            .with_display_name("");
        let args = builder().args(Path::new("/a.apk"), Path::new("/o.apk"), &options);
        assert_eq!(args.len(), 7);
    }

    #[test]
    fn test_build_sets_working_dir_and_env() {
        let mut base = HashMap::new();
        base.insert("PATH".to_string(), "/usr/bin".to_string());

        let invocation = builder().build(
            Path::new("/a.apk"),
            Path::new("/o.apk"),
            &ProcessingOptions::new(),
            &base,
        );

        assert_eq!(invocation.program, PathBuf::from("/opt/jre/bin/java"));
        assert_eq!(
            invocation.working_dir,
            Some(PathBuf::from("/opt/lib/ApkRenamer"))
        );
        assert_eq!(
            invocation.env.get(NESTED_HEAP_VAR).map(String::as_str),
            Some("-Xmx512m")
        );
        let path = invocation.env.get("PATH").cloned().unwrap_or_default();
        assert!(path.starts_with("/opt/jre/bin"));
        assert!(path.ends_with("/usr/bin"));
    }

    #[test]
    fn test_runtime_on_path_skips_prepend() {
        let builder = InvocationBuilder::new(Toolchain::new("java", "/lib/r.jar"), "1g", "1g");
        let overlay = builder.overlay();
        assert_eq!(overlay.ops().len(), 1);
    }
}
