/// Input sanitization for request fields and log output

/// Keep only characters valid in a class name used as a file stem and argv
/// element: ASCII alphanumerics, `.`, `$` and `_`.
pub fn sanitize_class_name(class_name: &str) -> String {
    class_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '$' | '_'))
        .collect()
}

/// Strip NUL characters and surrounding whitespace from submitted source
pub fn sanitize_source_code(source: &str) -> String {
    source.replace('\0', "").trim().to_string()
}

/// Escape control characters so attacker-supplied text stays on one log line
pub fn sanitize_for_log(input: &str) -> String {
    input.escape_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_name_drops_path_and_shell_characters() {
        assert_eq!(sanitize_class_name("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize_class_name("Test; rm -rf /"), "Testrmrf");
        assert_eq!(sanitize_class_name("Outer$Inner_1"), "Outer$Inner_1");
        assert_eq!(sanitize_class_name("com.example.Main"), "com.example.Main");
        assert_eq!(sanitize_class_name("Tëst"), "Tst");
    }

    #[test]
    fn source_loses_nuls_and_outer_whitespace() {
        assert_eq!(
            sanitize_source_code("\n  class A {}\0 \n"),
            "class A {}"
        );
        assert_eq!(sanitize_source_code("a\0b"), "ab");
    }

    #[test]
    fn log_sanitizing_escapes_newlines() {
        assert_eq!(sanitize_for_log("line1\nline2"), "line1\\nline2");
        assert_eq!(sanitize_for_log("plain"), "plain");
    }
}
