use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::RESOURCE_PREFIX;

static DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.").unwrap());

/// Substitute dashes for dots so a hostname can be embedded in an identifier.
/// Idempotent on strings already free of dots.
pub fn sanitize(input: &str) -> String {
    DOTS.replace_all(input, "-").into_owned()
}

/// Reduce a host to its parent domain (the last two dot-separated labels).
/// Hosts with two or fewer labels are returned unchanged.
pub fn parent_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host.to_string();
    }
    labels[labels.len() - 2..].join(".")
}

/// Builds the deterministic `{prefix}-{stage}-{kind}` identifiers every
/// provisioned resource is named with.
#[derive(Debug, Clone)]
pub struct Namer {
    prefix: String,
    stage: String,
}

impl Namer {
    pub fn new(stage: &str) -> Self {
        Self {
            prefix: RESOURCE_PREFIX.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Physical name for a resource kind, e.g. `fortunasbet-testing-site`
    pub fn name(&self, kind: &str) -> String {
        format!("{}-{}-{}", self.prefix, self.stage, kind)
    }

    /// Human-readable descriptor used for distribution comments and the like
    pub fn comment(&self, what: &str) -> String {
        format!("{} {} {}", self.prefix, self.stage, what)
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_dots_with_dashes() {
        assert_eq!(sanitize("testing.fortunasbet.com"), "testing-fortunasbet-com");
    }

    #[test]
    fn test_sanitize_is_idempotent_on_dash_only_input() {
        let once = sanitize("testing.fortunasbet.com");
        assert_eq!(sanitize(&once), once);
        assert_eq!(sanitize("already-clean"), "already-clean");
    }

    #[test]
    fn test_parent_domain_of_subdomain() {
        assert_eq!(parent_domain("testing.fortunasbet.com"), "fortunasbet.com");
    }

    #[test]
    fn test_parent_domain_of_apex_is_unchanged() {
        assert_eq!(parent_domain("fortunasbet.com"), "fortunasbet.com");
    }

    #[test]
    fn test_parent_domain_of_single_label_is_unchanged() {
        assert_eq!(parent_domain("localhost"), "localhost");
    }

    #[test]
    fn test_namer_builds_prefix_stage_kind() {
        let namer = Namer::new("testing");
        assert_eq!(namer.name("site"), "fortunasbet-testing-site");
        assert_eq!(namer.name("api"), "fortunasbet-testing-api");
    }
}
