//! Import command - adopt an existing object into a state file

use std::path::Path;

use crate::commands::Context;
use crate::display;
use crate::error::{CliError, Result};
use crate::util;

pub async fn run(ctx: &Context, type_name: &str, id: &str, state: Option<&Path>) -> Result<()> {
    let provider = ctx.connected_provider().await?;
    let skeleton = provider.import_state(type_name, id)?;

    let imported = provider
        .read(type_name, skeleton)
        .await?
        .ok_or_else(|| CliError::NotFound {
            message: format!("cannot import {type_name} '{id}': object not found"),
        })?;

    if let Some(path) = state {
        if path.exists() {
            display::warning(&format!("Overwriting {}", path.display()));
        }
        util::write_state(path, &imported)?;
    }
    display::success(&format!("Imported {}", display::describe(&imported)));
    display::print_json(&imported)
}
