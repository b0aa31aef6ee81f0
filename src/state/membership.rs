//! Usernames presented as active in the current room.

#[cfg(test)]
#[path = "membership_test.rs"]
mod membership_test;

/// Set of usernames keyed by name, iterated in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct RoomMembership {
    members: Vec<String>,
}

impl RoomMembership {
    /// Add `username` if absent. Returns `true` when the set changed.
    pub fn insert(&mut self, username: &str) -> bool {
        if self.contains(username) {
            return false;
        }
        self.members.push(username.to_owned());
        true
    }

    /// Remove `username` if present. Returns `true` when the set changed.
    pub fn remove(&mut self, username: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != username);
        self.members.len() != before
    }

    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.members.iter().any(|m| m == username)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }
}
