//! Environment assembly for resolved dependencies
//!
//! Expands the unexpanded `${VAR}` templates carried on each
//! `ExtractedDependency` and folds them, in dependency-first order, into a
//! variable map plus an executable search path prefix. While an entry's own
//! templates expand, `DIR` is bound to that entry's extracted directory.

use crate::resolver::ExtractedDependency;
use std::collections::BTreeMap;
use tracing::warn;

/// The assembled process environment: exported variables and the PATH
/// entries to prepend, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub vars: BTreeMap<String, String>,
    pub path_entries: Vec<String>,
}

/// Substitute `${NAME}` and `$NAME` references in `template` with values
/// from `vars`. Unknown variables expand to the empty string with a
/// warning; exports commonly reference variables that only exist on some
/// platforms, so this is not an error.
pub fn expand(template: &str, vars: &BTreeMap<String, String>) -> String {
    let pattern = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("Invalid regex");

    pattern
        .replace_all(template, |caps: &regex::Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match vars.get(name) {
                Some(value) => value.clone(),
                None => {
                    warn!("undefined variable '{name}' in '{template}'");
                    String::new()
                }
            }
        })
        .into_owned()
}

/// Fold an ordered dependency list into an `Environment`.
///
/// Exports accumulate in order, so a later dependency's templates can
/// reference an earlier dependency's exports. The PATH prefix keeps entry
/// order: dependency-first, matching the resolution output.
pub fn assemble(deps: &[ExtractedDependency]) -> Environment {
    let mut vars: BTreeMap<String, String> = BTreeMap::new();

    for dep in deps {
        vars.insert("DIR".to_string(), dep.dir.display().to_string());
        for (name, template) in &dep.exports {
            let value = expand(template, &vars);
            vars.insert(name.clone(), value);
        }
        vars.remove("DIR");
    }

    let mut path_entries = Vec::with_capacity(deps.len());
    for dep in deps {
        vars.insert("DIR".to_string(), dep.dir.display().to_string());
        path_entries.push(expand(&dep.bin_dir, &vars));
        vars.remove("DIR");
    }

    Environment { vars, path_entries }
}
