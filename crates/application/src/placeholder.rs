//! `{{variable}}` placeholder resolution for credential fields.
//!
//! Credential fields may embed `{{name}}` tokens that are substituted
//! from the request's environment variables before the credential is
//! applied. A [`PlaceholderResolver`] resolves any number of fields and
//! collects every unresolved name, so the final error reports all of
//! them at once.

use std::collections::HashMap;

use waypoint_domain::AuthError;

/// Resolves `{{variable}}` tokens across several fields, collecting
/// unresolved names.
#[derive(Debug)]
pub struct PlaceholderResolver<'a> {
    env: &'a HashMap<String, String>,
    unresolved: Vec<String>,
}

impl<'a> PlaceholderResolver<'a> {
    /// Creates a resolver over the given environment.
    #[must_use]
    pub const fn new(env: &'a HashMap<String, String>) -> Self {
        Self {
            env,
            unresolved: Vec::new(),
        }
    }

    /// Substitutes every resolvable token in `input`. Unresolved tokens
    /// are kept verbatim and their names recorded for [`Self::finish`].
    pub fn resolve(&mut self, input: &str) -> String {
        let mut output = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("{{") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                // Unterminated token, keep the tail as-is.
                output.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let token = &rest[start..start + 2 + end + 2];
            let name = after[..end].trim();
            if name.is_empty() {
                output.push_str(token);
            } else if let Some(value) = self.env.get(name) {
                output.push_str(value);
            } else {
                if !self.unresolved.iter().any(|n| n == name) {
                    self.unresolved.push(name.to_string());
                }
                output.push_str(token);
            }
            rest = &after[end + 2..];
        }
        output.push_str(rest);
        output
    }

    /// Resolves an optional field.
    pub fn resolve_opt(&mut self, input: Option<&str>) -> Option<String> {
        input.map(|value| self.resolve(value))
    }

    /// Fails with [`AuthError::UnresolvedPlaceholder`] if any resolved
    /// field contained an unknown variable.
    pub fn finish(self) -> Result<(), AuthError> {
        if self.unresolved.is_empty() {
            Ok(())
        } else {
            Err(AuthError::UnresolvedPlaceholder {
                names: self.unresolved,
            })
        }
    }
}

/// Resolves a single string against the environment.
pub fn resolve_placeholders(
    input: &str,
    env: &HashMap<String, String>,
) -> Result<String, AuthError> {
    let mut resolver = PlaceholderResolver::new(env);
    let resolved = resolver.resolve(input);
    resolver.finish()?;
    Ok(resolved)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_substitutes_known_variables() {
        let env = env(&[("token", "abc123"), ("host", "api.example.com")]);
        let resolved = resolve_placeholders("Bearer {{token}} @ {{host}}", &env).unwrap();
        assert_eq!(resolved, "Bearer abc123 @ api.example.com");
    }

    #[test]
    fn test_reports_every_unresolved_name() {
        let env = env(&[("known", "x")]);
        let mut resolver = PlaceholderResolver::new(&env);
        resolver.resolve("{{missing_a}}-{{known}}");
        resolver.resolve("{{missing_b}} and {{missing_a}} again");
        let error = resolver.finish().unwrap_err();
        match error {
            AuthError::UnresolvedPlaceholder { names } => {
                assert_eq!(names, vec!["missing_a", "missing_b"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_tokens_stay_verbatim() {
        let env = env(&[]);
        let mut resolver = PlaceholderResolver::new(&env);
        assert_eq!(resolver.resolve("x-{{gone}}-y"), "x-{{gone}}-y");
    }

    #[test]
    fn test_name_whitespace_is_trimmed() {
        let env = env(&[("token", "t")]);
        let resolved = resolve_placeholders("{{ token }}", &env).unwrap();
        assert_eq!(resolved, "t");
    }

    #[test]
    fn test_empty_and_unterminated_tokens_pass_through() {
        let env = env(&[]);
        let mut resolver = PlaceholderResolver::new(&env);
        assert_eq!(resolver.resolve("a{{}}b"), "a{{}}b");
        assert_eq!(resolver.resolve("a{{open"), "a{{open");
        assert!(resolver.finish().is_ok());
    }

    #[test]
    fn test_plain_text_is_untouched() {
        let env = env(&[]);
        let resolved = resolve_placeholders("no tokens here", &env).unwrap();
        assert_eq!(resolved, "no tokens here");
    }
}
