//! Schema command - export the provider schema as JSON

use crate::commands::Context;
use crate::display;
use crate::error::{CliError, Result};

pub fn run(ctx: &Context, type_name: Option<&str>) -> Result<()> {
    let provider = ctx.provider()?;
    let schema = provider.schema();

    let value = match type_name {
        None => serde_json::to_value(&schema)?,
        Some(name) => {
            let attribute = schema
                .resources
                .get(name)
                .or_else(|| schema.data_sources.get(name))
                .ok_or_else(|| CliError::configuration(format!("unknown type '{name}'")))?;
            serde_json::to_value(attribute)?
        }
    };

    display::print_json(&value)
}
