//! Handler for `jgo cache`.

use crate::cli::SharedFlags;

pub fn clean(shared: &SharedFlags, jdks: bool) -> miette::Result<i32> {
    let (ctx, _) = super::build_context(shared)?;
    jgo_ops::ops_cache::clean(&ctx, jdks)?;
    Ok(0)
}
