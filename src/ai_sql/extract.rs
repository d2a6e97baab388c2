//! Statement extraction from raw model output
//!
//! Model completions arrive as free text: commentary, SQL comments, markdown
//! remnants and, somewhere inside, the statement we asked for. These helpers
//! isolate executable statements from that noise. They never fail — a prompt
//! that produced no usable SQL yields an empty result the caller must check.

/// Which occurrence of the anchor keyword marks the statement start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorMode {
    /// First occurrence. Matches models that lead with the statement.
    First,
    /// Last occurrence. Tolerates commentary that mentions the keyword
    /// before the real statement is emitted.
    Last,
}

/// Drop SQL comment lines and collapse the rest onto one line of
/// single-spaced text.
fn collapse(raw: &str) -> String {
    raw.lines()
        .filter(|line| {
            let t = line.trim_start();
            !(t.starts_with("--") || t.starts_with("/*") || t.starts_with('*'))
        })
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn with_terminator(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.ends_with(';') {
        trimmed.to_string()
    } else {
        format!("{trimmed};")
    }
}

/// Extract the statement anchored at `keyword` from raw model output.
///
/// Returns zero statements for empty or comment-only input, otherwise exactly
/// one: the text from the anchor up to and including the next `;`. When the
/// output carries no terminator one is appended; when the keyword never
/// appears the whole collapsed text is returned as a best-effort statement.
pub fn extract(raw: &str, keyword: &str, mode: AnchorMode) -> Vec<String> {
    let collapsed = collapse(raw);
    if collapsed.is_empty() {
        return Vec::new();
    }

    let haystack = collapsed.to_ascii_lowercase();
    let needle = keyword.to_ascii_lowercase();
    let anchor = match mode {
        AnchorMode::First => haystack.find(&needle),
        AnchorMode::Last => haystack.rfind(&needle),
    };

    let statement = match anchor {
        Some(idx) => {
            let tail = &collapsed[idx..];
            match tail.find(';') {
                Some(semi) => tail[..=semi].trim().to_string(),
                None => with_terminator(tail),
            }
        }
        // Keyword never appeared: degrade to the whole collapsed text.
        None => with_terminator(&collapsed),
    };

    vec![statement]
}

/// Extract every `;`-separated segment that starts with `keyword`.
///
/// Used for INSERT batches where the model emits several statements in one
/// completion. Segments keep their original relative order and text (only
/// trimmed); each gets exactly one terminator back. Segments that start with
/// anything else — commentary, other statements — are dropped.
pub fn extract_all(raw: &str, keyword: &str) -> Vec<String> {
    let needle = keyword.to_ascii_lowercase();
    raw.split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter(|segment| segment.to_ascii_lowercase().starts_with(&needle))
        .map(|segment| format!("{segment};"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn last_mode_skips_leading_commentary() {
        let raw = "Sure! -- comment\nCREATE TABLE foo (id INT);\nextra";
        assert_eq!(
            extract(raw, "CREATE TABLE", AnchorMode::Last),
            vec!["CREATE TABLE foo (id INT);"]
        );
    }

    #[test]
    fn comment_lines_are_dropped_before_anchoring() {
        let raw = "-- the model explains itself here\n/* block */\nCREATE TABLE t (\n  id INT\n);";
        assert_eq!(
            extract(raw, "CREATE TABLE", AnchorMode::First),
            vec!["CREATE TABLE t ( id INT );"]
        );
    }

    #[test]
    fn first_and_last_differ_when_keyword_repeats() {
        let raw = "CREATE TABLE draft (x INT)\nCREATE TABLE final (y INT);";
        assert_eq!(
            extract(raw, "CREATE TABLE", AnchorMode::First),
            vec!["CREATE TABLE draft (x INT) CREATE TABLE final (y INT);"]
        );
        assert_eq!(
            extract(raw, "CREATE TABLE", AnchorMode::Last),
            vec!["CREATE TABLE final (y INT);"]
        );
    }

    #[test]
    fn missing_terminator_gets_exactly_one() {
        let out = extract("CREATE TABLE t (id INT)", "CREATE TABLE", AnchorMode::Last);
        assert_eq!(out, vec!["CREATE TABLE t (id INT);"]);

        // Idempotent: re-extracting the result must not stack terminators.
        let again = extract(&out[0], "CREATE TABLE", AnchorMode::Last);
        assert_eq!(again, out);
    }

    #[test]
    fn keyword_case_is_ignored() {
        let raw = "create Table t (id INT);";
        assert_eq!(
            extract(raw, "CREATE TABLE", AnchorMode::First),
            vec!["create Table t (id INT);"]
        );
    }

    #[test]
    fn missing_keyword_degrades_to_whole_text() {
        let raw = "ALTER TABLE  t ADD   c INT";
        assert_eq!(
            extract(raw, "CREATE TABLE", AnchorMode::Last),
            vec!["ALTER TABLE t ADD c INT;"]
        );
    }

    #[rstest]
    #[case("")]
    #[case("   \n\t  ")]
    #[case("-- only a comment\n-- and another")]
    fn empty_or_comment_only_input_yields_nothing(#[case] raw: &str) {
        assert!(extract(raw, "CREATE TABLE", AnchorMode::Last).is_empty());
    }

    #[test]
    fn repeated_spaces_collapse_to_one() {
        let raw = "CREATE TABLE   t    (id   INT);";
        assert_eq!(
            extract(raw, "CREATE TABLE", AnchorMode::First),
            vec!["CREATE TABLE t (id INT);"]
        );
    }

    #[test]
    fn extract_all_keeps_only_matching_segments_in_order() {
        let raw = "Here you go:;\nINSERT INTO t VALUES (1);\nSELECT 1;\ninsert into t values (2);\ntrailing words";
        assert_eq!(
            extract_all(raw, "INSERT"),
            vec![
                "INSERT INTO t VALUES (1);",
                "insert into t values (2);",
            ]
        );
    }

    #[test]
    fn extract_all_reappends_single_terminator() {
        let statements =
            extract_all("INSERT INTO t VALUES (1); INSERT INTO t VALUES (2)", "INSERT");
        assert_eq!(statements.len(), 2);
        for stmt in &statements {
            assert!(stmt.ends_with(';'));
            assert_eq!(stmt.matches(';').count(), 1);
        }
    }

    #[rstest]
    #[case("")]
    #[case("  \n ")]
    #[case("no statements here")]
    fn extract_all_empty_cases(#[case] raw: &str) {
        assert!(extract_all(raw, "INSERT").is_empty());
    }
}
