//! Cross-session learned-pattern store.
//!
//! Every applied manual fix records a `(signature, replacement)` pair here.
//! Once the same signature has been fixed with a materially identical
//! replacement `threshold` times, the pattern is promoted: future chunks
//! matching the signature bypass the model router and apply the replacement
//! directly.
//!
//! Writes are serialized behind the store's single-writer lock — multiple
//! sessions can promote patterns concurrently. Readers see a
//! stale-but-consistent row.

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ferry_core::signature::replacements_match;

use crate::errors::Result;
use crate::Store;

/// A recorded (and possibly promoted) fix pattern.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearnedPattern {
    /// Signature of the original failing content.
    pub fingerprint: String,
    /// The accepted replacement.
    pub replacement: String,
    /// Consecutive materially-identical fixes recorded.
    pub count: u32,
    /// Fixes required before promotion.
    pub threshold: u32,
    /// Optional human note carried from the latest fix.
    pub hint: Option<String>,
    /// Times the pattern has been auto-applied.
    pub auto_attempts: u32,
    /// Auto-applications that stuck (not re-escalated).
    pub auto_successes: u32,
}

impl LearnedPattern {
    /// Whether the pattern has crossed its promotion threshold.
    #[must_use]
    pub fn is_promoted(&self) -> bool {
        self.count >= self.threshold
    }
}

impl Store {
    /// Record one applied manual fix.
    ///
    /// A replacement that diverges from the stored one resets the counter:
    /// promotion requires consecutive agreement, not just volume.
    pub fn record_fix(
        &self,
        fingerprint: &str,
        replacement: &str,
        threshold: u32,
        hint: Option<&str>,
    ) -> Result<LearnedPattern> {
        let _guard = self.pattern_write_guard();
        let conn = self.conn()?;
        let now = ferry_core::now_rfc3339();

        let existing = Self::get_pattern_on(&conn, fingerprint)?;
        let pattern = match existing {
            Some(mut pattern) => {
                if replacements_match(&pattern.replacement, replacement) {
                    pattern.count += 1;
                } else {
                    pattern.count = 1;
                    pattern.replacement = replacement.to_owned();
                }
                pattern.threshold = threshold;
                if let Some(hint) = hint {
                    pattern.hint = Some(hint.to_owned());
                }
                let _ = conn.execute(
                    "UPDATE learned_patterns
                     SET replacement = ?2, count = ?3, threshold = ?4, hint = ?5,
                         updated_at = ?6
                     WHERE fingerprint = ?1",
                    params![
                        fingerprint,
                        pattern.replacement,
                        pattern.count,
                        pattern.threshold,
                        pattern.hint,
                        now,
                    ],
                )?;
                pattern
            }
            None => {
                let pattern = LearnedPattern {
                    fingerprint: fingerprint.to_owned(),
                    replacement: replacement.to_owned(),
                    count: 1,
                    threshold,
                    hint: hint.map(ToOwned::to_owned),
                    auto_attempts: 0,
                    auto_successes: 0,
                };
                let _ = conn.execute(
                    "INSERT INTO learned_patterns
                         (fingerprint, replacement, count, threshold, hint,
                          auto_attempts, auto_successes, created_at, updated_at)
                     VALUES (?1, ?2, 1, ?3, ?4, 0, 0, ?5, ?5)",
                    params![fingerprint, replacement, threshold, pattern.hint, now],
                )?;
                pattern
            }
        };

        if pattern.is_promoted() {
            debug!(fingerprint, count = pattern.count, "pattern promoted");
        }
        Ok(pattern)
    }

    /// Look up a pattern regardless of promotion state.
    pub fn get_pattern(&self, fingerprint: &str) -> Result<Option<LearnedPattern>> {
        let conn = self.conn()?;
        Self::get_pattern_on(&conn, fingerprint)
    }

    /// Look up a promoted pattern for the given signature.
    pub fn promoted_pattern(&self, fingerprint: &str) -> Result<Option<LearnedPattern>> {
        Ok(self
            .get_pattern(fingerprint)?
            .filter(LearnedPattern::is_promoted))
    }

    /// Record an auto-application attempt and its outcome.
    pub fn record_auto_attempt(&self, fingerprint: &str, success: bool) -> Result<()> {
        let _guard = self.pattern_write_guard();
        let conn = self.conn()?;
        let _ = conn.execute(
            "UPDATE learned_patterns
             SET auto_attempts = auto_attempts + 1,
                 auto_successes = auto_successes + ?2,
                 updated_at = ?3
             WHERE fingerprint = ?1",
            params![fingerprint, i64::from(success), ferry_core::now_rfc3339()],
        )?;
        Ok(())
    }

    /// List every recorded pattern.
    pub fn list_patterns(&self) -> Result<Vec<LearnedPattern>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT fingerprint, replacement, count, threshold, hint,
                    auto_attempts, auto_successes
             FROM learned_patterns ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map([], pattern_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn get_pattern_on(
        conn: &rusqlite::Connection,
        fingerprint: &str,
    ) -> Result<Option<LearnedPattern>> {
        let pattern = conn
            .query_row(
                "SELECT fingerprint, replacement, count, threshold, hint,
                        auto_attempts, auto_successes
                 FROM learned_patterns WHERE fingerprint = ?1",
                params![fingerprint],
                pattern_from_row,
            )
            .optional()?;
        Ok(pattern)
    }
}

fn pattern_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LearnedPattern> {
    Ok(LearnedPattern {
        fingerprint: row.get(0)?,
        replacement: row.get(1)?,
        count: row.get(2)?,
        threshold: row.get(3)?,
        hint: row.get(4)?,
        auto_attempts: row.get(5)?,
        auto_successes: row.get(6)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::fingerprint;

    fn test_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("ferry.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn promotion_requires_threshold_fixes() {
        let (_dir, store) = test_store();
        let fp = fingerprint("NSView frame setNeedsDisplay");

        for i in 1..=2 {
            let pattern = store.record_fix(&fp, "Control.Invalidate()", 3, None).unwrap();
            assert_eq!(pattern.count, i);
            assert!(!pattern.is_promoted());
            assert!(store.promoted_pattern(&fp).unwrap().is_none());
        }

        let pattern = store.record_fix(&fp, "Control.Invalidate()", 3, None).unwrap();
        assert!(pattern.is_promoted());
        let promoted = store.promoted_pattern(&fp).unwrap().unwrap();
        assert_eq!(promoted.replacement, "Control.Invalidate()");
    }

    #[test]
    fn divergent_replacement_resets_count() {
        let (_dir, store) = test_store();
        let fp = fingerprint("some failing content");

        let _ = store.record_fix(&fp, "fix one", 3, None).unwrap();
        let _ = store.record_fix(&fp, "fix one", 3, None).unwrap();
        let pattern = store.record_fix(&fp, "a different fix", 3, None).unwrap();
        assert_eq!(pattern.count, 1);
        assert_eq!(pattern.replacement, "a different fix");
    }

    #[test]
    fn whitespace_variants_count_as_identical() {
        let (_dir, store) = test_store();
        let fp = fingerprint("content");

        let _ = store.record_fix(&fp, "let x = 1;", 2, None).unwrap();
        let pattern = store.record_fix(&fp, "let x  =  1;", 2, None).unwrap();
        assert_eq!(pattern.count, 2);
        assert!(pattern.is_promoted());
    }

    #[test]
    fn hint_carried_from_latest_fix() {
        let (_dir, store) = test_store();
        let fp = fingerprint("hinted");
        let _ = store.record_fix(&fp, "r", 3, Some("use Invalidate")).unwrap();
        let pattern = store.get_pattern(&fp).unwrap().unwrap();
        assert_eq!(pattern.hint.as_deref(), Some("use Invalidate"));
    }

    #[test]
    fn auto_attempt_counters() {
        let (_dir, store) = test_store();
        let fp = fingerprint("auto");
        let _ = store.record_fix(&fp, "r", 1, None).unwrap();
        store.record_auto_attempt(&fp, true).unwrap();
        store.record_auto_attempt(&fp, false).unwrap();
        let pattern = store.get_pattern(&fp).unwrap().unwrap();
        assert_eq!(pattern.auto_attempts, 2);
        assert_eq!(pattern.auto_successes, 1);
    }

    #[test]
    fn patterns_are_shared_across_sessions() {
        // Same store handle, distinct "sessions" writing the same signature.
        let (_dir, store) = test_store();
        let fp = fingerprint("shared content");
        let _ = store.record_fix(&fp, "the fix", 2, None).unwrap();
        let _ = store.record_fix(&fp, "the fix", 2, None).unwrap();
        assert!(store.promoted_pattern(&fp).unwrap().is_some());
        assert_eq!(store.list_patterns().unwrap().len(), 1);
    }
}
