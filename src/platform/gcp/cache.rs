use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use yacls_gcloud::GroupMembership;

/// Expanded group members, shared by every GCP run of one invocation.
///
/// Cloning yields another handle to the same entries. Keys are the raw
/// principal references from the IAM bindings.
#[derive(Debug, Clone, Default)]
pub struct GcpMemberCache {
    inner: Arc<Mutex<BTreeMap<String, Vec<GroupMembership>>>>,
}

impl GcpMemberCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reference: &str) -> Option<Vec<GroupMembership>> {
        let entries = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(reference).cloned()
    }

    pub fn insert(&self, reference: &str, members: Vec<GroupMembership>) {
        let mut entries = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(reference.to_string(), members);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_entries() {
        let cache = GcpMemberCache::new();
        let other = cache.clone();
        other.insert("group:eng@example.com", vec![GroupMembership::new("a@example.com", &[])]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("group:eng@example.com").unwrap()[0].member.id, "a@example.com");
        assert!(cache.get("group:ops@example.com").is_none());
    }
}
