// Path normalization: public request path -> source file path

use crate::Error;
use regex::Regex;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// User-supplied path rewriting function
pub type NormalizeFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// How a matched request path maps to the source path to open.
///
/// `Template` substitutes capture groups from the match pattern (`$1.styl`
/// turns `/app.css` matched by `(.+)\.css` into `/app.styl`). `Function`
/// hands the matched path to arbitrary caller logic. With `Passthrough` the
/// source path equals the request path.
#[derive(Clone, Default)]
pub enum NormalizeRule {
    #[default]
    Passthrough,
    Template(String),
    Function(NormalizeFn),
}

impl NormalizeRule {
    pub fn template(template: impl Into<String>) -> Self {
        NormalizeRule::Template(template.into())
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        NormalizeRule::Function(Arc::new(f))
    }

    /// Apply the rule to a matched path. Deterministic: the same path and
    /// pattern always produce the same output.
    pub fn apply(&self, pattern: &Regex, path: &str) -> String {
        match self {
            NormalizeRule::Passthrough => path.to_string(),
            NormalizeRule::Template(template) => {
                pattern.replace(path, template.as_str()).into_owned()
            }
            NormalizeRule::Function(f) => f(path),
        }
    }
}

impl fmt::Debug for NormalizeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeRule::Passthrough => write!(f, "Passthrough"),
            NormalizeRule::Template(t) => f.debug_tuple("Template").field(t).finish(),
            NormalizeRule::Function(_) => write!(f, "Function(..)"),
        }
    }
}

/// Join a normalized path against the root directory.
///
/// The walk is lexical so that paths for files that do not exist yet still
/// resolve (the stat step decides existence). Any traversal that would land
/// outside the root is rejected: a normalize rule is caller-supplied code
/// and must not become a read primitive for the rest of the filesystem.
pub fn resolve(root: &Path, normalized: &str) -> Result<PathBuf, Error> {
    let relative = normalized.trim_start_matches('/');

    let mut clean = PathBuf::new();
    let mut depth: usize = 0;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                clean.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(Error::Forbidden(format!(
                        "path escapes root: {normalized}"
                    )));
                }
                clean.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::Forbidden(format!(
                    "absolute source path rejected: {normalized}"
                )));
            }
        }
    }

    Ok(root.join(clean))
}
