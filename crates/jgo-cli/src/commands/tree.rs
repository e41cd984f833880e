//! Handler for `jgo tree`.

use crate::cli::SharedFlags;

pub async fn exec(
    endpoint: Option<&str>,
    shared: &SharedFlags,
    depth: Option<usize>,
) -> miette::Result<i32> {
    let (ctx, shortcuts) = super::build_context(shared)?;
    jgo_ops::ops_tree::exec(endpoint, &shortcuts, ctx, depth).await?;
    Ok(0)
}
