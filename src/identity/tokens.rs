use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use base64::Engine;
use parking_lot::Mutex;

use super::{can_manage_tokens_for, Principal, ADMIN_ROLE};
use crate::tprintln;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevokeError {
    #[error("no such token")]
    Unknown,
    #[error("{caller} may not revoke a token belonging to {owner}")]
    Forbidden { caller: String, owner: String },
}

#[derive(Debug, Default)]
struct Inner {
    by_token: HashMap<String, String>,
    by_user: HashMap<String, HashSet<String>>,
}

impl Inner {
    fn insert(&mut self, username: &str, token: String) {
        self.by_user.entry(username.to_string()).or_default().insert(token.clone());
        self.by_token.insert(token, username.to_string());
    }

    fn remove(&mut self, token: &str) -> Option<String> {
        let owner = self.by_token.remove(token)?;
        if let Some(set) = self.by_user.get_mut(&owner) {
            set.remove(token);
            if set.is_empty() {
                self.by_user.remove(&owner);
            }
        }
        Some(owner)
    }
}

fn gen_token() -> Result<String, getrandom::Error> { gen_token_with(getrandom::getrandom) }

fn gen_token_with(fill: impl FnOnce(&mut [u8]) -> Result<(), getrandom::Error>) -> Result<String, getrandom::Error> {
    // 256-bit random token base64url without padding
    let mut buf = [0u8; 32];
    fill(&mut buf)?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// The single authoritative token store. Both indexes sit behind one lock,
/// so a mint and a revoke of the same token are totally ordered.
#[derive(Debug, Clone)]
pub struct TokenStore {
    inner: Arc<Mutex<Inner>>,
    admins: Arc<HashSet<String>>,
}

impl TokenStore {
    pub fn new<I, S>(admin_users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { inner: Arc::new(Mutex::new(Inner::default())), admins: Arc::new(admin_users.into_iter().map(Into::into).collect()) }
    }

    /// The principal a user acts as, with the admin role when configured.
    pub fn principal_for(&self, username: &str) -> Principal {
        let p = Principal::new(username);
        if self.admins.contains(username) { p.with_role(ADMIN_ROLE) } else { p }
    }

    /// Mint a fresh token for `username`. Fails only when the system RNG
    /// does, in which case nothing is stored.
    pub fn issue(&self, username: &str) -> Result<String, getrandom::Error> {
        self.issue_with(username, gen_token)
    }

    fn issue_with(&self, username: &str, mint: impl FnOnce() -> Result<String, getrandom::Error>) -> Result<String, getrandom::Error> {
        let token = mint()?;
        self.inner.lock().insert(username, token.clone());
        tprintln!("tokens.issue user={}", username);
        Ok(token)
    }

    /// Register a known token, e.g. one seeded from configuration.
    pub fn insert(&self, username: &str, token: &str) { self.inner.lock().insert(username, token.to_string()); }

    pub fn validate(&self, token: &str) -> Option<Principal> {
        let owner = self.inner.lock().by_token.get(token).cloned()?;
        Some(self.principal_for(&owner))
    }

    pub fn owner(&self, token: &str) -> Option<String> { self.inner.lock().by_token.get(token).cloned() }

    pub fn count_for(&self, username: &str) -> usize { self.inner.lock().by_user.get(username).map_or(0, HashSet::len) }

    /// Look up the owner, check `caller` may act for them, and remove the
    /// token, all under one lock acquisition.
    pub fn revoke_authorized(&self, caller: &Principal, token: &str) -> Result<String, RevokeError> {
        let mut inner = self.inner.lock();
        let owner = inner.by_token.get(token).cloned().ok_or(RevokeError::Unknown)?;
        if !can_manage_tokens_for(caller, &owner) {
            return Err(RevokeError::Forbidden { caller: caller.user_id.clone(), owner });
        }
        inner.remove(token);
        tprintln!("tokens.revoke owner={} by={}", owner, caller.user_id);
        Ok(owner)
    }
}
