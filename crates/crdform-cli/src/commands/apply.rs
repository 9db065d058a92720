//! Apply command - create or update an object with server-side apply
//!
//! With `--state`, an existing state file makes this an update of that
//! object; otherwise the object is created. The resulting state is written
//! back to the file.

use std::path::Path;

use crate::commands::Context;
use crate::display;
use crate::error::Result;
use crate::util;

pub async fn run(ctx: &Context, type_name: &str, file: &Path, state: Option<&Path>) -> Result<()> {
    let provider = ctx.connected_provider().await?;
    let desired = util::read_document(file)?;

    let prior = match state {
        Some(path) => util::read_state(path)?,
        None => None,
    };

    let result = match prior {
        Some(prior) => {
            display::step(&format!("Updating {}", display::describe(&prior)));
            provider.update(type_name, prior, desired).await?
        }
        None => {
            display::step(&format!("Creating {type_name}"));
            provider.create(type_name, desired).await?
        }
    };

    if let Some(path) = state {
        util::write_state(path, &result)?;
    }
    display::success(&format!("Applied {}", display::describe(&result)));
    display::print_json(&result)
}
