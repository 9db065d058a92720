//! Render command - render a manifest type to YAML without a cluster

use crdform_kube::MANIFEST_SUFFIX;
use std::path::Path;

use crate::commands::Context;
use crate::display;
use crate::error::{CliError, Result};
use crate::util;

pub fn run(ctx: &Context, type_name: &str, file: &Path, output: Option<&Path>) -> Result<()> {
    let provider = ctx.provider()?;
    let manifest_type = manifest_type_name(type_name);

    let input = util::read_document(file)?;
    let rendered = provider.render_manifest(&manifest_type, input)?;
    let yaml = rendered["yaml"]
        .as_str()
        .ok_or_else(|| CliError::Other {
            message: "renderer returned no yaml".to_string(),
        })?;

    match output {
        Some(path) => {
            std::fs::write(path, yaml)?;
            display::success(&format!("Wrote {}", path.display()));
        }
        None => print!("{yaml}"),
    }
    Ok(())
}

/// Accept both `<type>` and `<type>_manifest`
fn manifest_type_name(type_name: &str) -> String {
    if type_name.ends_with(MANIFEST_SUFFIX) {
        type_name.to_string()
    } else {
        format!("{type_name}{MANIFEST_SUFFIX}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_type_name() {
        assert_eq!(manifest_type_name("example_com_widget_v1"), "example_com_widget_v1_manifest");
        assert_eq!(
            manifest_type_name("example_com_widget_v1_manifest"),
            "example_com_widget_v1_manifest"
        );
    }
}
