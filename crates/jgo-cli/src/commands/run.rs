//! Handler for `jgo run`.

use jgo_jvm::launch::LaunchOptions;
use jgo_ops::ops_run::{self, RunOptions};

use crate::cli::SharedFlags;

/// JVM-facing flags collected from the command line.
pub struct JvmFlags {
    pub main_class: Option<String>,
    pub entrypoint: Option<String>,
    pub min_heap: Option<String>,
    pub max_heap: Option<String>,
    pub gc: Option<String>,
    pub properties: Vec<String>,
    pub jvm_args: Vec<String>,
}

pub async fn exec(
    endpoint: Option<&str>,
    shared: &SharedFlags,
    jvm: JvmFlags,
    app_args: Vec<String>,
    verbose: bool,
) -> miette::Result<i32> {
    let (ctx, shortcuts) = super::build_context(shared)?;

    let mut system_properties = Vec::new();
    for spec in &jvm.properties {
        system_properties.push(super::parse_property(spec)?);
    }

    let opts = RunOptions {
        main_class: jvm.main_class,
        entrypoint: jvm.entrypoint,
        launch: LaunchOptions {
            min_heap: jvm.min_heap,
            max_heap: jvm.max_heap,
            gc: jvm.gc,
            system_properties,
            jvm_args: jvm.jvm_args,
        },
        app_args,
        verbose,
    };

    ops_run::exec(endpoint, &shortcuts, ctx, opts).await
}
