/// Statement classification for batch execution and result shaping.
pub struct StatementClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Produces a rowset: SELECT, SHOW, DESCRIBE/DESC, EXPLAIN
    Read,
    /// Produces an affected-row count
    Write,
}

impl StatementClassifier {
    /// Classify a single statement by its leading keyword.
    #[inline]
    pub fn classify(statement: &str) -> StatementKind {
        match Self::leading_keyword(statement) {
            Some(kw)
                if kw.eq_ignore_ascii_case("SELECT")
                    || kw.eq_ignore_ascii_case("SHOW")
                    || kw.eq_ignore_ascii_case("DESCRIBE")
                    || kw.eq_ignore_ascii_case("DESC")
                    || kw.eq_ignore_ascii_case("EXPLAIN") =>
            {
                StatementKind::Read
            }
            _ => StatementKind::Write,
        }
    }

    #[inline]
    pub fn is_read(statement: &str) -> bool {
        Self::classify(statement) == StatementKind::Read
    }

    /// First whitespace-delimited token, skipping leading comments is not
    /// required here: statements arrive pre-trimmed from the splitter.
    fn leading_keyword(statement: &str) -> Option<&str> {
        statement.trim_start().split_whitespace().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_statements() {
        assert!(StatementClassifier::is_read("SELECT * FROM users"));
        assert!(StatementClassifier::is_read("select 1"));
        assert!(StatementClassifier::is_read("SHOW DATABASES"));
        assert!(StatementClassifier::is_read("DESCRIBE users"));
        assert!(StatementClassifier::is_read("desc users"));
        assert!(StatementClassifier::is_read("EXPLAIN SELECT 1"));
    }

    #[test]
    fn test_write_statements() {
        assert!(!StatementClassifier::is_read("INSERT INTO t VALUES (1)"));
        assert!(!StatementClassifier::is_read("UPDATE t SET x = 1"));
        assert!(!StatementClassifier::is_read("DELETE FROM t"));
        assert!(!StatementClassifier::is_read("CREATE TABLE t (id INT)"));
        assert!(!StatementClassifier::is_read("DROP TABLE t"));
        assert!(!StatementClassifier::is_read("TRUNCATE TABLE t"));
        assert!(!StatementClassifier::is_read(""));
    }
}
