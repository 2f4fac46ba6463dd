//! Build environment and placeholder substitution

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

// `${NAME}` (dots allowed, as in build parameters) or bare `$NAME`
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("placeholder pattern is valid")
});

/// Variables visible to one build
#[derive(Debug, Clone, Default)]
pub struct EnvContext {
    vars: HashMap<String, String>,
}

impl EnvContext {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    /// Overlay build variables; they win over existing entries
    pub fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        self.vars
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Substitute `${VAR}` and `$VAR` placeholders.
    ///
    /// Unknown variables are left verbatim. There is no escaping and no
    /// shell default syntax: `$$A` expands the `$A` part, `${A:-x}` is kept.
    pub fn expand(&self, input: &str) -> String {
        PLACEHOLDER
            .replace_all(input, |caps: &Captures| {
                let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
                match self.vars.get(name) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
