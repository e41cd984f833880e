//! JVM command construction and child-process launch.

use jgo_core::context::{JavaSource, RunContext};
use jgo_env::builder::BuiltEnvironment;
use jgo_util::errors::JgoError;
use jgo_util::process::CommandBuilder;

use crate::discovery::{self, Jvm};
use crate::provision;

/// Cap for the auto-sized max heap.
const MAX_AUTO_HEAP_MB: u64 = 8 * 1024;

/// JVM tuning options threaded in from the CLI.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// `-Xms` value, e.g. `512m`.
    pub min_heap: Option<String>,
    /// `-Xmx` value; auto-sized from physical RAM when unset.
    pub max_heap: Option<String>,
    /// Garbage collector name (`g1`, `zgc`, `parallel`, `serial`).
    pub gc: Option<String>,
    /// `-Dkey=value` system properties.
    pub system_properties: Vec<(String, String)>,
    /// Raw pass-through JVM arguments.
    pub jvm_args: Vec<String>,
}

/// Locate a JVM satisfying the environment's minimum release.
///
/// SYSTEM mode only probes `JAVA_HOME`/`PATH` and fails on incompatibility.
/// AUTO mode prefers a managed JDK, provisions one on demand, and falls
/// back to the system when provisioning is unavailable.
pub fn locate_jvm(ctx: &RunContext, min_java: u32) -> miette::Result<Jvm> {
    let required = match ctx.java.version {
        Some(preferred) if preferred < min_java => {
            tracing::warn!(
                "requested Java {preferred} is older than the environment's minimum \
                 {min_java}; using {min_java}"
            );
            min_java
        }
        Some(preferred) => preferred,
        None => min_java,
    };

    match ctx.java.source {
        JavaSource::System => discovery::locate_system(required),
        JavaSource::Auto => {
            if let Some(jvm) = discovery::discover_managed(&ctx.jdks_dir(), required) {
                return Ok(jvm);
            }
            match provision::get(&ctx.jdks_dir(), required, ctx.java.vendor.as_deref()) {
                Ok(jvm) => Ok(jvm),
                Err(e) => {
                    tracing::warn!("JDK provisioning failed ({e}); trying system Java");
                    discovery::locate_system(required)
                }
            }
        }
    }
}

/// Construct the full `java` invocation for an environment.
///
/// Argument order: heap, GC, system properties, pass-through JVM args,
/// module path, class path, then the main class (as `--module name/class`
/// when it lives in a known module) and application arguments.
pub fn build_command(
    env: &BuiltEnvironment,
    jvm: &Jvm,
    main_class: &str,
    opts: &LaunchOptions,
    add_classpath: &[String],
    app_args: &[String],
) -> CommandBuilder {
    let mut cmd = CommandBuilder::new(jvm.java_bin.to_string_lossy().to_string());

    if let Some(ref min) = opts.min_heap {
        cmd = cmd.arg(format!("-Xms{min}"));
    }
    let max_heap = opts
        .max_heap
        .clone()
        .unwrap_or_else(|| format!("{}m", auto_max_heap_mb()));
    cmd = cmd.arg(format!("-Xmx{max_heap}"));

    if let Some(ref gc) = opts.gc {
        if let Some(flag) = gc_flag(gc) {
            cmd = cmd.arg(flag);
        }
    }
    for (key, value) in &opts.system_properties {
        cmd = cmd.arg(format!("-D{key}={value}"));
    }
    cmd = cmd.args(opts.jvm_args.iter().cloned());

    if !env.module_path_jars.is_empty() {
        cmd = cmd
            .arg("--module-path")
            .arg(env.workspace.modules_dir().to_string_lossy().to_string())
            .arg("--add-modules")
            .arg("ALL-MODULE-PATH");
    }

    if !env.class_path_jars.is_empty() || !add_classpath.is_empty() {
        let mut entries: Vec<String> = Vec::new();
        if !env.class_path_jars.is_empty() {
            // The JVM expands the wildcard itself; quoting keeps the shell
            // out of it and the argv short.
            entries.push(format!("{}/*", env.workspace.jars_dir().to_string_lossy()));
        }
        entries.extend(add_classpath.iter().cloned());
        cmd = cmd.arg("-cp").arg(entries.join(classpath_separator()));
    }

    match env.module_of_class(main_class) {
        Some(module) => {
            cmd = cmd.arg("--module").arg(format!("{module}/{main_class}"));
        }
        None => {
            cmd = cmd.arg(main_class);
        }
    }

    cmd.args(app_args.iter().cloned())
}

/// Run the assembled command with inherited stdio; the child's exit code
/// propagates to the caller.
pub fn launch(cmd: &CommandBuilder, verbose: bool) -> miette::Result<i32> {
    if verbose {
        eprintln!("+ {}", cmd.render());
    }
    let status = cmd.run_inherited().map_err(|e| JgoError::Launch {
        message: format!("{e} (command: {})", cmd.render()),
    })?;
    Ok(status.code().unwrap_or(1))
}

/// OS-appropriate class path separator.
pub fn classpath_separator() -> &'static str {
    if cfg!(windows) {
        ";"
    } else {
        ":"
    }
}

/// Auto-sized max heap: half of physical RAM, capped at 8 GiB.
fn auto_max_heap_mb() -> u64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    max_heap_mb_for(system.total_memory())
}

fn max_heap_mb_for(total_bytes: u64) -> u64 {
    let half_mb = total_bytes / 2 / (1024 * 1024);
    half_mb.clamp(256, MAX_AUTO_HEAP_MB)
}

fn gc_flag(gc: &str) -> Option<String> {
    match gc.to_ascii_lowercase().as_str() {
        "g1" => Some("-XX:+UseG1GC".to_string()),
        "zgc" | "z" => Some("-XX:+UseZGC".to_string()),
        "parallel" => Some("-XX:+UseParallelGC".to_string()),
        "serial" => Some("-XX:+UseSerialGC".to_string()),
        other => {
            tracing::warn!("unknown GC '{other}'; ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jgo_core::lockfile::Lockfile;
    use jgo_env::workspace::Workspace;
    use std::path::PathBuf;

    fn fake_env(class_path: bool, module_path: bool) -> BuiltEnvironment {
        let workspace = Workspace {
            dir: PathBuf::from("/envs/demo"),
            spec_hash: None,
        };
        BuiltEnvironment {
            workspace,
            lockfile: Lockfile::default(),
            class_path_jars: if class_path {
                vec![PathBuf::from("/envs/demo/jars/a.jar")]
            } else {
                vec![]
            },
            module_path_jars: if module_path {
                vec![(
                    PathBuf::from("/envs/demo/modules/m.jar"),
                    Some("org.m".to_string()),
                )]
            } else {
                vec![]
            },
        }
    }

    fn jvm() -> Jvm {
        Jvm {
            java_bin: PathBuf::from("/jdk/bin/java"),
            version: 17,
        }
    }

    #[test]
    fn classpath_only_command_shape() {
        let env = fake_env(true, false);
        let cmd = build_command(
            &env,
            &jvm(),
            "org.example.Main",
            &LaunchOptions::default(),
            &[],
            &["--app-flag".to_string()],
        );
        let rendered = cmd.render();
        assert!(rendered.starts_with("/jdk/bin/java"));
        assert!(rendered.contains("-Xmx"));
        assert!(rendered.contains("-cp /envs/demo/jars/*"));
        assert!(!rendered.contains("--module-path"));
        assert!(rendered.contains("org.example.Main --app-flag"));
    }

    #[test]
    fn module_path_flags_appear_when_modules_exist() {
        let env = fake_env(true, true);
        let cmd = build_command(
            &env,
            &jvm(),
            "org.example.Main",
            &LaunchOptions::default(),
            &[],
            &[],
        );
        let rendered = cmd.render();
        assert!(rendered.contains("--module-path /envs/demo/modules"));
        assert!(rendered.contains("--add-modules ALL-MODULE-PATH"));
        assert!(rendered.contains("-cp"));
    }

    #[test]
    fn explicit_heap_and_properties() {
        let env = fake_env(true, false);
        let opts = LaunchOptions {
            min_heap: Some("512m".to_string()),
            max_heap: Some("4g".to_string()),
            gc: Some("g1".to_string()),
            system_properties: vec![("user.language".to_string(), "en".to_string())],
            jvm_args: vec!["-ea".to_string()],
        };
        let rendered = build_command(&env, &jvm(), "Main", &opts, &[], &[]).render();
        assert!(rendered.contains("-Xms512m"));
        assert!(rendered.contains("-Xmx4g"));
        assert!(rendered.contains("-XX:+UseG1GC"));
        assert!(rendered.contains("-Duser.language=en"));
        assert!(rendered.contains("-ea"));
        // JVM config precedes the classpath and main class.
        assert!(rendered.find("-Xmx4g").unwrap() < rendered.find("-cp").unwrap());
    }

    #[test]
    fn extra_classpath_entries_joined_with_separator() {
        let env = fake_env(true, false);
        let extra = vec!["/opt/extra.jar".to_string()];
        let rendered =
            build_command(&env, &jvm(), "Main", &LaunchOptions::default(), &extra, &[]).render();
        let expected = format!("/envs/demo/jars/*{}/opt/extra.jar", classpath_separator());
        assert!(rendered.contains(&expected));
    }

    #[test]
    fn auto_heap_is_half_ram_capped() {
        assert_eq!(max_heap_mb_for(4 * 1024 * 1024 * 1024), 2 * 1024);
        assert_eq!(max_heap_mb_for(64 * 1024 * 1024 * 1024), 8 * 1024);
        assert_eq!(max_heap_mb_for(256 * 1024 * 1024), 256);
    }
}
