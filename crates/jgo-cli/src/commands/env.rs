//! Handler for `jgo env`.

use crate::cli::SharedFlags;

pub async fn exec(endpoint: Option<&str>, shared: &SharedFlags) -> miette::Result<i32> {
    let (ctx, shortcuts) = super::build_context(shared)?;
    jgo_ops::ops_env::exec(endpoint, &shortcuts, ctx).await?;
    Ok(0)
}
