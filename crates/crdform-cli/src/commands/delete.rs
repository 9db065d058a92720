//! Delete command - delete an object by ID or from a state file

use std::path::Path;

use crate::commands::Context;
use crate::display;
use crate::error::{CliError, Result};
use crate::util;

pub async fn run(ctx: &Context, type_name: &str, id: Option<&str>, state: Option<&Path>) -> Result<()> {
    let provider = ctx.connected_provider().await?;

    let tracked = match (id, state) {
        (Some(id), _) => provider.import_state(type_name, id)?,
        (None, Some(path)) => util::read_state(path)?.ok_or_else(|| {
            CliError::input(format!("state file {} does not exist", path.display()))
        })?,
        (None, None) => return Err(CliError::input("either an ID or --state is required")),
    };

    let description = display::describe(&tracked);
    display::step(&format!("Deleting {description}"));
    provider.delete(type_name, tracked).await?;

    if let Some(path) = state.filter(|p| p.exists()) {
        std::fs::remove_file(path)?;
    }
    display::success(&format!("Deleted {description}"));
    Ok(())
}
