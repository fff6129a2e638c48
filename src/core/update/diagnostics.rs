/// Substrings treated as non-fatal noise on the installer's error stream.
/// npm prints deprecation warnings there, and Node prints its debugger
/// banner there when an inspector is attached.
const DEFAULT_BENIGN_PATTERNS: &[&str] = &["debugger", "npm warn"];

/// Classifies installer stderr lines, ignoring known-benign noise
#[derive(Clone, Debug)]
pub struct DiagnosticFilter {
    benign: Vec<String>,
}

impl Default for DiagnosticFilter {
    fn default() -> Self {
        Self::with_patterns(DEFAULT_BENIGN_PATTERNS.iter().copied())
    }
}

impl DiagnosticFilter {
    /// Builds a filter from custom benign substrings (matched case-insensitively)
    pub fn with_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            benign: patterns
                .into_iter()
                .map(|pattern| pattern.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Returns the first line that signals a real failure, if any.
    /// Scanning stops at the first hit; later lines are never inspected.
    pub fn first_fatal_line<'a>(&self, stderr: &'a str) -> Option<&'a str> {
        stderr
            .lines()
            .map(str::trim)
            .find(|line| !self.is_benign(line))
    }

    /// Whether a single trimmed line is blank or known noise
    fn is_benign(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        lower.is_empty() || self.benign.iter().any(|pattern| lower.contains(pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stream_has_no_fatal_line() {
        let filter = DiagnosticFilter::default();
        assert_eq!(filter.first_fatal_line(""), None);
        assert_eq!(filter.first_fatal_line("\n\n  \n"), None);
    }

    #[test]
    fn test_npm_warnings_are_benign() {
        let filter = DiagnosticFilter::default();
        let stderr = "npm WARN deprecated foo@1.0.0\nnpm warn using --force\n";
        assert_eq!(filter.first_fatal_line(stderr), None);
    }

    #[test]
    fn test_debugger_banner_is_benign() {
        let filter = DiagnosticFilter::default();
        let stderr = "Debugger attached.\nWaiting for the debugger to disconnect...\n";
        assert_eq!(filter.first_fatal_line(stderr), None);
    }

    #[test]
    fn test_real_error_is_fatal() {
        let filter = DiagnosticFilter::default();
        let stderr = "ENOENT: permission denied";
        assert_eq!(
            filter.first_fatal_line(stderr),
            Some("ENOENT: permission denied")
        );
    }

    #[test]
    fn test_first_fatal_line_wins_over_later_ones() {
        let filter = DiagnosticFilter::default();
        let stderr = "npm WARN deprecated foo@1.0.0\nnpm ERR! code EACCES\nnpm ERR! syscall mkdir\n";
        assert_eq!(filter.first_fatal_line(stderr), Some("npm ERR! code EACCES"));
    }

    #[test]
    fn test_custom_patterns_replace_defaults() {
        let filter = DiagnosticFilter::with_patterns(["yarn warning"]);
        assert_eq!(filter.first_fatal_line("yarn warning Ignored scripts"), None);
        // The defaults are gone, so npm noise now counts as fatal
        assert_eq!(
            filter.first_fatal_line("npm WARN deprecated foo@1.0.0"),
            Some("npm WARN deprecated foo@1.0.0")
        );
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let filter = DiagnosticFilter::with_patterns(["Npm WaRn"]);
        assert_eq!(filter.first_fatal_line("NPM WARN something"), None);
    }
}
