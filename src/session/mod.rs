mod filter;

pub use filter::filter;

use crate::directory::DirectoryClient;
use crate::error::ConsoleError;
use crate::provider::{IdentityProvider, UserRecord};

/// In-memory copy of the directory for one console session.
///
/// `filtered_users` is always derived from `all_users` and replaced wholesale.
#[derive(Debug, Default)]
pub struct SessionStore {
    all_users: Vec<UserRecord>,
    filtered_users: Vec<UserRecord>,
    query: Option<String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cache with a fresh listing. On failure the cache is
    /// emptied rather than left stale.
    pub fn load<P: IdentityProvider>(
        &mut self,
        directory: &DirectoryClient<P>,
    ) -> Result<usize, ConsoleError> {
        self.query = None;
        match directory.fetch_all_users() {
            Ok(users) => {
                self.filtered_users = users.clone();
                self.all_users = users;
                Ok(self.all_users.len())
            }
            Err(err) => {
                self.all_users.clear();
                self.filtered_users.clear();
                Err(err)
            }
        }
    }

    /// Full reload after a write that changes something on screen.
    pub fn refresh_after_mutation<P: IdentityProvider>(
        &mut self,
        directory: &DirectoryClient<P>,
    ) -> Result<usize, ConsoleError> {
        self.load(directory)
    }

    pub fn search(&mut self, query: &str) -> &[UserRecord] {
        self.filtered_users = filter(query, &self.all_users);
        self.query = Some(query.to_string()).filter(|q| !q.trim().is_empty());
        &self.filtered_users
    }

    pub fn show_all(&mut self) -> &[UserRecord] {
        self.search("")
    }

    pub fn all_users(&self) -> &[UserRecord] {
        &self.all_users
    }

    pub fn filtered_users(&self) -> &[UserRecord] {
        &self.filtered_users
    }

    /// The query behind the current filtered view, if any.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn find(&self, uid: &str) -> Option<&UserRecord> {
        self.all_users.iter().find(|u| u.uid == uid)
    }
}
