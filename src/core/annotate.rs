use once_cell::sync::Lazy;
use regex::Regex;

static HUNK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@ -\d+(?:,\d+)? \+(\d+)(?:,\d+)? @@").unwrap());

/// Width of the marker put in front of removed lines, matching `[L<n>] ` for small n.
const REMOVED_MARKER: &str = "     ";

pub const DEFAULT_MAX_DIFF_CHARS: usize = 30_000;
pub const TRUNCATION_NOTICE: &str = "\n\n... (diff truncated due to size)";

/// Prefixes every line that exists in the new file with `[L<n>]`, where `n`
/// is its line number after the change. Output has exactly as many lines as
/// the input.
///
/// Classification is by first character only, so the `---` / `+++` file
/// headers land in the removal / addition branches. A `+++` header before
/// the first hunk is therefore tagged `[L0]`; the counter it bumps is reset
/// by the next hunk header anyway.
pub fn annotate_diff(raw_diff: &str) -> String {
    let mut annotated = Vec::new();
    let mut new_line: u64 = 0;

    for line in raw_diff.split('\n') {
        if let Some(caps) = HUNK_HEADER.captures(line) {
            new_line = caps[1].parse().unwrap_or(new_line);
            annotated.push(line.to_string());
        } else if line.starts_with('-') {
            annotated.push(format!("{}{}", REMOVED_MARKER, line));
        } else if line.starts_with('+') || line.starts_with(' ') || line.is_empty() {
            annotated.push(format!("[L{}] {}", new_line, line));
            new_line += 1;
        } else {
            annotated.push(line.to_string());
        }
    }

    annotated.join("\n")
}

/// Caps an annotated diff at `max_chars` characters, appending a notice when cut.
pub fn truncate_diff(annotated: &str, max_chars: usize) -> String {
    match annotated.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &annotated[..cut], TRUNCATION_NOTICE),
        None => annotated.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(diff: &[&str]) -> Vec<String> {
        annotate_diff(&diff.join("\n"))
            .split('\n')
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn annotates_file_with_headers() {
        let out = lines(&[
            "diff --git a/file.js b/file.js",
            "index abc..def 100644",
            "--- a/file.js",
            "+++ b/file.js",
            "@@ -1,3 +1,4 @@",
            " line1",
            "+added",
            " line2",
            " line3",
        ]);

        assert_eq!(out[0], "diff --git a/file.js b/file.js");
        assert_eq!(out[1], "index abc..def 100644");
        assert_eq!(out[2], "     --- a/file.js");
        assert_eq!(out[3], "[L0] +++ b/file.js");
        assert_eq!(out[4], "@@ -1,3 +1,4 @@");
        assert_eq!(out[5], "[L1]  line1");
        assert_eq!(out[6], "[L2] +added");
        assert_eq!(out[7], "[L3]  line2");
        assert_eq!(out[8], "[L4]  line3");
    }

    #[test]
    fn single_hunk_scenario() {
        let out = annotate_diff("@@ -1,3 +1,4 @@\n line1\n+added\n line2\n line3");
        assert!(out.contains("[L1]  line1"));
        assert!(out.contains("[L2] +added"));
        assert!(out.contains("[L3]  line2"));
        assert!(out.contains("[L4]  line3"));
    }

    #[test]
    fn removed_lines_do_not_advance_counter() {
        let out = lines(&["@@ -1,4 +1,2 @@", " line1", "-gone", "-also gone", " line2"]);
        assert_eq!(out[1], "[L1]  line1");
        assert_eq!(out[2], "     -gone");
        assert_eq!(out[3], "     -also gone");
        assert_eq!(out[4], "[L2]  line2");
    }

    #[test]
    fn each_hunk_resets_counter() {
        let out = lines(&["@@ -1,2 +1,2 @@", " a", "+b", "@@ -10,2 +10,2 @@", " c", "+d"]);
        assert_eq!(out[1], "[L1]  a");
        assert_eq!(out[2], "[L2] +b");
        assert_eq!(out[4], "[L10]  c");
        assert_eq!(out[5], "[L11] +d");
    }

    #[test]
    fn hunk_header_without_counts() {
        let out = lines(&["@@ -3 +7 @@ fn main() {", "+x"]);
        assert_eq!(out[0], "@@ -3 +7 @@ fn main() {");
        assert_eq!(out[1], "[L7] +x");
    }

    #[test]
    fn empty_diff_is_one_blank_line() {
        assert_eq!(annotate_diff(""), "[L0] ");
    }

    #[test]
    fn blank_lines_are_numbered() {
        let out = lines(&["@@ -1,2 +5,3 @@", " a", "", "+b"]);
        assert_eq!(out[2], "[L6] ");
        assert_eq!(out[3], "[L7] +b");
    }

    #[test]
    fn multi_file_diff() {
        let out = lines(&[
            "diff --git a/a.js b/a.js",
            "--- a/a.js",
            "+++ b/a.js",
            "@@ -1,1 +1,2 @@",
            " old",
            "+new",
            "diff --git a/b.js b/b.js",
            "--- a/b.js",
            "+++ b/b.js",
            "@@ -5,1 +5,1 @@",
            "-removed",
            "+added",
        ]);

        assert_eq!(out[2], "[L0] +++ b/a.js");
        assert_eq!(out[4], "[L1]  old");
        assert_eq!(out[5], "[L2] +new");
        assert_eq!(out[6], "diff --git a/b.js b/b.js");
        assert_eq!(out[7], "     --- a/b.js");
        // The counter carries over from the previous file until the next hunk.
        assert_eq!(out[8], "[L3] +++ b/b.js");
        assert_eq!(out[10], "     -removed");
        assert_eq!(out[11], "[L5] +added");
    }

    #[test]
    fn preserves_line_count() {
        let diff = "diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1,2 +1,2 @@\n-a\n+b\n c\n\\ No newline at end of file\n";
        assert_eq!(
            annotate_diff(diff).split('\n').count(),
            diff.split('\n').count()
        );
    }

    #[test]
    fn numbering_matches_new_start_plus_kept_lines() {
        let out = lines(&["@@ -50,3 +100,4 @@", " ctx", "-old", "+added", " ctx2"]);
        assert_eq!(out[1], "[L100]  ctx");
        assert_eq!(out[3], "[L101] +added");
        assert_eq!(out[4], "[L102]  ctx2");
    }

    #[test]
    fn truncate_leaves_short_text_alone() {
        assert_eq!(truncate_diff("short", 10), "short");
        assert_eq!(truncate_diff("exact", 5), "exact");
    }

    #[test]
    fn truncate_cuts_and_appends_notice() {
        let out = truncate_diff("abcdefgh", 3);
        assert_eq!(out, format!("abc{}", TRUNCATION_NOTICE));
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let out = truncate_diff("ééééé", 2);
        assert!(out.starts_with("éé\n\n..."));
    }
}
