//! Slash-normalizing path joins for URLs and filesystem-style paths.

const SEPARATOR: char = '/';

/// Join path segments so that every boundary carries exactly one `/`.
///
/// For each adjacent pair, trailing separators are stripped from the left
/// operand and leading separators from the right operand before a single
/// separator is inserted between them. Segment content is not validated.
///
/// ```
/// use keycloak_saml_plugin::utils::join_path;
///
/// assert_eq!(join_path("/base/", &["/path/", "file.txt"]), "/base/path/file.txt");
/// assert_eq!(join_path("http://localhost:8080", &["/auth", "/realms/webmvc"]),
///            "http://localhost:8080/auth/realms/webmvc");
/// ```
pub fn join_path<S: AsRef<str>>(base: &str, segments: &[S]) -> String {
    let mut joined = base.to_string();

    for segment in segments {
        let trimmed_len = joined.trim_end_matches(SEPARATOR).len();
        joined.truncate(trimmed_len);
        joined.push(SEPARATOR);
        joined.push_str(segment.as_ref().trim_start_matches(SEPARATOR));
    }

    joined
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::single("a", &[], "a")]
    #[case::slashes_on_both_sides("/a/", &["/b/", "c"], "/a/b/c")]
    #[case::empty_middle_segment("a", &["", "b"], "a/b")]
    #[case::repeated_slashes("a///", &["///b"], "a/b")]
    #[case::trailing_empty_segment("a", &[""], "a/")]
    #[case::url_base("http://localhost:8080", &["/auth", "/realms/webmvc/protocol/saml"], "http://localhost:8080/auth/realms/webmvc/protocol/saml")]
    #[case::empty_context_path("https://sso.example.com/", &["", "/realms/test"], "https://sso.example.com/realms/test")]
    #[case::relative_dirs("./resources", &["..", "src", "com/acme"], "./resources/../src/com/acme")]
    fn test_join_path(#[case] base: &str, #[case] segments: &[&str], #[case] expected: &str) {
        assert_eq!(join_path(base, segments), expected);
    }

    #[test]
    fn test_join_path_accepts_owned_segments() {
        let realm = String::from("webmvc");
        let segments = vec!["/auth".to_string(), format!("/realms/{realm}")];
        assert_eq!(join_path("", &segments), "/auth/realms/webmvc");
    }

    #[test]
    fn test_glob_suffix_keeps_single_separator() {
        assert_eq!(join_path("/auth/", &["/**"]), "/auth/**");
        assert_eq!(join_path("", &["/**"]), "/**");
    }
}
