use super::Principal;

/// Minting or revoking a token for `username` is allowed for that user
/// themself and for admins. Anonymous callers may do neither.
pub fn can_manage_tokens_for(caller: &Principal, username: &str) -> bool {
    if caller.is_anonymous() {
        return false;
    }
    caller.is_admin() || caller.user_id == username
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_and_admin_only() {
        let alice = Principal::new("alice");
        assert!(can_manage_tokens_for(&alice, "alice"));
        assert!(!can_manage_tokens_for(&alice, "bob"));
        let root = Principal::new("root").with_role("admin");
        assert!(can_manage_tokens_for(&root, "bob"));
        assert!(!can_manage_tokens_for(&Principal::anonymous(), "anonymous"));
    }
}
