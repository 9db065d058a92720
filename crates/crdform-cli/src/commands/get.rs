//! Get command - show the live state of an object by ID

use crate::commands::Context;
use crate::display;
use crate::error::{CliError, Result};

pub async fn run(ctx: &Context, type_name: &str, id: &str) -> Result<()> {
    let provider = ctx.connected_provider().await?;
    let skeleton = provider.import_state(type_name, id)?;

    match provider.read(type_name, skeleton).await? {
        Some(state) => display::print_json(&state),
        None => Err(CliError::NotFound {
            message: format!("{type_name} '{id}' not found"),
        }),
    }
}
