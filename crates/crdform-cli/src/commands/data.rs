//! Data command - read an object through its data source

use serde_json::json;

use crate::commands::Context;
use crate::display;
use crate::error::Result;

pub async fn run(ctx: &Context, type_name: &str, name: &str, namespace: Option<&str>) -> Result<()> {
    let provider = ctx.connected_provider().await?;

    let mut metadata = json!({"name": name});
    if let Some(ns) = namespace {
        metadata["namespace"] = json!(ns);
    }

    let object = provider
        .read_data_source(type_name, json!({"metadata": metadata}))
        .await?;
    display::print_json(&object)
}
