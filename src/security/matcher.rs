//! Ant-style path patterns for requests that bypass authentication.

/// A request path pattern.
///
/// `"/auth/**"` matches `/auth` and everything below it; `"/**"` matches
/// every path. Any other pattern matches exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    pub fn new(pattern: &str) -> Self {
        match pattern.strip_suffix("/**") {
            Some(prefix) => Self::Prefix(prefix.trim_end_matches('/').to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    /// True for `/**`, which matches every request path.
    pub fn matches_all(&self) -> bool {
        matches!(self, Self::Prefix(prefix) if prefix.is_empty())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Prefix(prefix) if prefix.is_empty() => true,
            Self::Prefix(prefix) => {
                path.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            }
        }
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(exact) => f.write_str(exact),
            Self::Prefix(prefix) => write!(f, "{prefix}/**"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/auth/**", "/auth", true)]
    #[case("/auth/**", "/auth/", true)]
    #[case("/auth/**", "/auth/realms/webmvc/protocol/saml", true)]
    #[case("/auth/**", "/authx", false)]
    #[case("/auth/**", "/", false)]
    #[case("/auth//**", "/auth/admin", true)]
    #[case("/**", "/anything/at/all", true)]
    #[case("/health", "/health", true)]
    #[case("/health", "/health/live", false)]
    fn test_matches(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
        assert_eq!(PathPattern::new(pattern).matches(path), expected);
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(PathPattern::new("/auth/**").to_string(), "/auth/**");
        assert_eq!(PathPattern::new("/health").to_string(), "/health");
    }

    #[rstest]
    #[case("/**", true)]
    #[case("//**", true)]
    #[case("/auth/**", false)]
    #[case("/", false)]
    fn test_matches_all(#[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(PathPattern::new(pattern).matches_all(), expected);
    }
}
