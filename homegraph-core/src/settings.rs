use std::collections::{BTreeMap, HashMap};

/// Configuration key holding the Home Graph agent user id.
pub const AGENT_USER_ID: &str = "googleHomeGraph:agentUserId";

/// Key/value configuration handed to components that need settings at call time.
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// The value for `key`, or an empty string when unset.
    fn get_or_default(&self, key: &str) -> String {
        self.get(key).unwrap_or_default()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}
