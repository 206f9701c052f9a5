//! The interactive session: a menu loop over the cached directory plus the
//! multi-step workflows in [`workflow`].

pub mod output;
pub mod password;
mod prompt;
mod workflow;

pub use output::Output;
pub use prompt::{InquirePrompter, Interrupted, Prompter};
pub use workflow::Outcome;

use anyhow::Result;
use tracing::debug;

use crate::directory::DirectoryClient;
use crate::error::ConsoleError;
use crate::provider::{IdentityProvider, UserRecord};
use crate::session::SessionStore;
use crate::token::TokenIssuer;

pub const DEFAULT_CANCEL_KEYWORD: &str = "back";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Search,
    Refresh,
    View,
    UpdatePassword,
    UpdateName,
    ShowAll,
    GenerateToken,
    SignIn,
    Exit,
}

impl MenuItem {
    const ALL: [MenuItem; 9] = [
        MenuItem::Search,
        MenuItem::Refresh,
        MenuItem::View,
        MenuItem::UpdatePassword,
        MenuItem::UpdateName,
        MenuItem::ShowAll,
        MenuItem::GenerateToken,
        MenuItem::SignIn,
        MenuItem::Exit,
    ];

    fn label(self) -> &'static str {
        match self {
            MenuItem::Search => "Search users",
            MenuItem::Refresh => "Refresh users",
            MenuItem::View => "View user details",
            MenuItem::UpdatePassword => "Update user password",
            MenuItem::UpdateName => "Update user display name",
            MenuItem::ShowAll => "Show all users",
            MenuItem::GenerateToken => "Generate custom token",
            MenuItem::SignIn => "Sign in with email and password",
            MenuItem::Exit => "Exit",
        }
    }
}

/// One operator session. Owns the cached directory and everything needed to
/// act on it; nothing here is shared across threads.
pub struct Console<P, R> {
    directory: DirectoryClient<P>,
    issuer: TokenIssuer,
    session: SessionStore,
    prompter: R,
    out: Output,
    cancel_keyword: String,
    api_key: Option<String>,
}

impl<P: IdentityProvider, R: Prompter> Console<P, R> {
    pub fn new(directory: DirectoryClient<P>, issuer: TokenIssuer, prompter: R) -> Self {
        Self {
            directory,
            issuer,
            session: SessionStore::new(),
            prompter,
            out: Output::new(),
            cancel_keyword: DEFAULT_CANCEL_KEYWORD.to_string(),
            api_key: None,
        }
    }

    pub fn with_cancel_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.cancel_keyword = keyword.into();
        self
    }

    /// Web API key for the REST sign-in paths. Without one the operator is
    /// asked when a sign-in needs it.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn directory(&self) -> &DirectoryClient<P> {
        &self.directory
    }

    pub fn prompter(&self) -> &R {
        &self.prompter
    }

    /// Loads the directory, then serves the menu until the operator exits or
    /// presses Ctrl-C. Session errors are reported and never end the loop.
    pub fn run(&mut self) -> Result<()> {
        self.out.header(format!(
            "User console: {} provider",
            self.directory.provider().name()
        ));
        self.reload();
        self.show_users("Users");

        loop {
            match self.menu() {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) if err.is::<Interrupted>() => {
                    self.out.newline();
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        self.out.success("Goodbye!");
        Ok(())
    }

    /// One menu round. `Ok(false)` means exit.
    fn menu(&mut self) -> Result<bool> {
        self.out.newline();
        self.out.dim(format!(
            "Type '{}' at any prompt to return to this menu",
            self.cancel_keyword
        ));
        let labels: Vec<String> = MenuItem::ALL.iter().map(|i| i.label().to_string()).collect();
        let Some(index) = self.prompter.select("Select an option", &labels)? else {
            return Ok(true);
        };
        let item = MenuItem::ALL[index];
        debug!(?item, "menu selection");

        match item {
            MenuItem::Search => self.search()?,
            MenuItem::Refresh => {
                if self.reload() {
                    self.show_users("Users");
                }
            }
            MenuItem::View => self.view()?,
            MenuItem::UpdatePassword => {
                self.update_password()?;
            }
            MenuItem::UpdateName => {
                self.update_name()?;
            }
            MenuItem::ShowAll => {
                self.session.show_all();
                self.show_users("Users");
            }
            MenuItem::GenerateToken => {
                self.generate_token()?;
            }
            MenuItem::SignIn => {
                self.sign_in()?;
            }
            MenuItem::Exit => return Ok(false),
        }
        Ok(true)
    }

    fn is_cancel(&self, input: &str) -> bool {
        input.trim().eq_ignore_ascii_case(&self.cancel_keyword)
    }

    /// Replaces the cache; failures are reported and leave it empty.
    fn reload(&mut self) -> bool {
        self.out.info("Loading users...");
        match self.session.load(&self.directory) {
            Ok(count) => {
                self.out.success(format!("Loaded {count} users"));
                true
            }
            Err(err) => {
                self.out.error(format!("Error loading users: {err}"));
                false
            }
        }
    }

    fn show_users(&self, title: &str) {
        self.out.users_table(self.session.filtered_users(), title);
    }

    fn search(&mut self) -> Result<()> {
        let query = self.prompter.text("Enter search query (name or email)")?;
        if self.is_cancel(&query) {
            return Ok(());
        }
        self.session.search(&query);
        let title = match self.session.query() {
            Some(q) => format!("Search results for: '{q}'"),
            None => "Users".to_string(),
        };
        self.show_users(&title);
        Ok(())
    }

    fn view(&mut self) -> Result<()> {
        let uid = self.ask_uid()?;
        if self.is_cancel(&uid) {
            return Ok(());
        }
        match self.resolve_target(&uid) {
            Ok(user) => self.out.user_details(&user),
            Err(err) => self.out.error(err),
        }
        Ok(())
    }

    fn ask_uid(&mut self) -> Result<String> {
        let message = format!(
            "Enter user UID (or '{}' to return to menu)",
            self.cancel_keyword
        );
        Ok(self.prompter.text(&message)?.trim().to_string())
    }

    /// The session cache answers first; anything it does not hold is looked up
    /// directly.
    fn resolve_target(&self, uid: &str) -> Result<UserRecord, ConsoleError> {
        if let Some(user) = self.session.find(uid) {
            return Ok(user.clone());
        }
        self.directory.find_by_uid(uid)
    }
}
