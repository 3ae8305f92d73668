use chrono::TimeDelta;
use std::collections::HashSet;

/// Age threshold plus the ids that are never deleted.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    max_age: TimeDelta,
    allowlist: HashSet<String>,
}

impl RetentionPolicy {
    pub fn new(max_age: TimeDelta, allowlist: HashSet<String>) -> Self {
        Self { max_age, allowlist }
    }

    pub fn max_age(&self) -> TimeDelta {
        self.max_age
    }

    pub fn allowlist(&self) -> &HashSet<String> {
        &self.allowlist
    }

    /// Membership is an exact match on the decimal form of the id, so `123`
    /// matches `"123"` but not `"0123"`.
    pub fn is_allowlisted(&self, post_id: u64) -> bool {
        self.allowlist.contains(&post_id.to_string())
    }

    /// A post goes once it is strictly older than the threshold and is not
    /// allowlisted.
    pub fn should_delete(&self, post_id: u64, age: TimeDelta) -> bool {
        age > self.max_age && !self.is_allowlisted(post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy(hours: i64, allowlist: &[&str]) -> RetentionPolicy {
        RetentionPolicy::new(
            TimeDelta::hours(hours),
            allowlist.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn deletes_only_posts_older_than_threshold() {
        let policy = policy(24, &[]);
        assert!(policy.should_delete(1, TimeDelta::hours(25)));
        assert!(!policy.should_delete(1, TimeDelta::hours(23)));
        assert!(!policy.should_delete(1, TimeDelta::hours(24)));
    }

    #[test]
    fn allowlisted_posts_are_kept() {
        let policy = policy(24, &["123", "0456"]);
        assert!(!policy.should_delete(123, TimeDelta::days(400)));
        assert!(policy.is_allowlisted(123));
        // "0456" is not the decimal form of 456
        assert!(!policy.is_allowlisted(456));
        assert!(policy.should_delete(456, TimeDelta::days(400)));
    }

    proptest! {
        #[test]
        fn should_delete_iff_old_and_not_allowlisted(
            id in any::<u64>(),
            age_secs in -1_000_000i64..10_000_000,
            threshold_secs in 0i64..5_000_000,
            listed in any::<bool>(),
        ) {
            let allowlist = if listed { vec![id.to_string()] } else { vec![] };
            let policy = RetentionPolicy::new(
                TimeDelta::seconds(threshold_secs),
                allowlist.into_iter().collect(),
            );
            let age = TimeDelta::seconds(age_secs);

            prop_assert_eq!(
                policy.should_delete(id, age),
                age_secs > threshold_secs && !listed
            );
        }
    }
}
