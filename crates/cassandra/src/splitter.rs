//! Statement splitting for migration file content.

/// Breaks migration content into individual statements
pub trait StatementSplitter: Send + Sync {
    /// Statements in file order, trimmed, without empty entries
    fn split<'a>(&self, content: &'a str) -> Vec<&'a str>;
}

/// Splits on every `;`.
///
/// Semicolons inside string literals or comments are not recognized and will
/// cut a statement in two.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemicolonSplitter;

impl StatementSplitter for SemicolonSplitter {
    fn split<'a>(&self, content: &'a str) -> Vec<&'a str> {
        content
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_blank_segments() {
        let statements = SemicolonSplitter.split("CREATE TABLE t (x int);  ; DROP TABLE t;");
        assert_eq!(statements, vec!["CREATE TABLE t (x int)", "DROP TABLE t"]);
    }

    #[test]
    fn test_trailing_statement_without_semicolon() {
        let statements = SemicolonSplitter.split("\n  ALTER TABLE t ADD y text;\nDROP INDEX i\n");
        assert_eq!(statements, vec!["ALTER TABLE t ADD y text", "DROP INDEX i"]);
    }

    #[test]
    fn test_empty_content() {
        assert!(SemicolonSplitter.split("").is_empty());
        assert!(SemicolonSplitter.split(" ;\n; ").is_empty());
    }

    #[test]
    fn test_semicolon_in_literal_is_not_special() {
        let statements = SemicolonSplitter.split("INSERT INTO t (s) VALUES ('a;b');");
        assert_eq!(statements.len(), 2);
    }
}
