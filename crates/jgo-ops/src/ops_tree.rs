//! Operation: print the resolved dependency tree.

use std::collections::HashMap;

use jgo_core::context::RunContext;

use crate::ops_env;

/// `jgo tree`: resolve the endpoint and render its dependency graph.
pub async fn exec(
    endpoint_arg: Option<&str>,
    shortcuts: &HashMap<String, String>,
    mut ctx: RunContext,
    max_depth: Option<usize>,
) -> miette::Result<()> {
    let client = jgo_maven::download::build_client()?;
    let request = ops_env::prepare_request(endpoint_arg, shortcuts, &mut ctx)?;
    let resolution = ops_env::resolve(&request, &ctx, &client).await?;

    print!("{}", resolution.graph.print_tree(max_depth));
    Ok(())
}
