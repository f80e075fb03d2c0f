// SPDX-License-Identifier: MIT OR Apache-2.0
//! Resolves the `--format`/`--out` precedence rule this CLI documents:
//! when `--out` names a file with a recognized extension, that
//! extension wins over an explicit `--format`. This lives entirely in
//! the CLI layer — it is not core compiler logic.

use nomos_serialize::Target;
use std::path::Path;

/// Pick the effective output [`Target`]: `out`'s file extension when
/// recognized, else `format`, else [`Target::Json`].
#[must_use]
pub fn resolve_target(format: Option<Target>, out: Option<&Path>) -> Target {
    if let Some(target) = out.and_then(target_from_extension) {
        return target;
    }
    format.unwrap_or(Target::Json)
}

fn target_from_extension(path: &Path) -> Option<Target> {
    let ext = path.extension()?.to_str()?;
    match ext.to_ascii_lowercase().as_str() {
        "json" => Some(Target::Json),
        "yaml" | "yml" => Some(Target::Yaml),
        "tfvars" => Some(Target::Tfvars),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_extension_wins_over_an_explicit_conflicting_format() {
        let out = Path::new("config.yaml");
        assert_eq!(resolve_target(Some(Target::Json), Some(out)), Target::Yaml);
    }

    #[test]
    fn unrecognized_out_extension_falls_back_to_format() {
        let out = Path::new("config.txt");
        assert_eq!(resolve_target(Some(Target::Tfvars), Some(out)), Target::Tfvars);
    }

    #[test]
    fn no_out_and_no_format_defaults_to_json() {
        assert_eq!(resolve_target(None, None), Target::Json);
    }

    #[test]
    fn yml_extension_maps_to_yaml() {
        let out = Path::new("config.yml");
        assert_eq!(resolve_target(None, Some(out)), Target::Yaml);
    }
}
