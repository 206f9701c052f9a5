//! Multi-step operations, each an explicit state machine. The cancel keyword
//! ends any of them before another provider call is made, and every failed
//! call asks the operator whether to try again.

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::password::{validate_new_password, PasswordStrength};
use super::{Console, Prompter};
use crate::error::ConsoleError;
use crate::provider::{IdentityProvider, UserRecord};

/// How a workflow ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Committed,
    Cancelled,
}

enum Target {
    Found(UserRecord),
    Retry,
    Abandon,
}

enum PasswordStep {
    AwaitTarget,
    AwaitConfirmation(UserRecord),
    AwaitInput(UserRecord),
    Validating {
        user: UserRecord,
        password: String,
        confirmation: String,
    },
    Commit {
        user: UserRecord,
        password: String,
    },
    Done(Outcome),
}

enum NameStep {
    AwaitTarget,
    AwaitConfirmation(UserRecord),
    AwaitInput(UserRecord),
    Commit { user: UserRecord, name: String },
    Done(Outcome),
}

enum TokenStep {
    AwaitTarget,
    AwaitClaims(UserRecord),
    Mint {
        user: UserRecord,
        claims: Option<Map<String, Value>>,
    },
    OfferExchange(String),
    Exchange {
        custom_token: String,
        api_key: String,
    },
    Done(Outcome),
}

enum SignInStep {
    AwaitEmail,
    AwaitPassword(String),
    AwaitApiKey {
        email: String,
        password: String,
    },
    SignIn {
        email: String,
        password: String,
        api_key: String,
    },
    Done(Outcome),
}

impl<P: IdentityProvider, R: Prompter> Console<P, R> {
    /// Unknown uids ask again; a provider failure abandons the workflow.
    fn await_target(&mut self) -> Result<Target> {
        let uid = self.ask_uid()?;
        if self.is_cancel(&uid) {
            return Ok(Target::Abandon);
        }
        if uid.is_empty() {
            return Ok(Target::Retry);
        }
        match self.resolve_target(&uid) {
            Ok(user) => Ok(Target::Found(user)),
            Err(ConsoleError::UserNotFound(_)) => {
                self.out.error("User not found!");
                Ok(Target::Retry)
            }
            Err(err) => {
                self.out.error(err);
                Ok(Target::Abandon)
            }
        }
    }

    fn try_again(&mut self) -> Result<bool> {
        self.prompter.confirm("Do you want to try again?", true)
    }

    /// The configured key, or one typed by the operator. `None` when they
    /// back out.
    fn api_key(&mut self) -> Result<Option<String>> {
        if let Some(key) = &self.api_key {
            return Ok(Some(key.clone()));
        }
        loop {
            let key = self.prompter.secret("Enter the project's web API key")?;
            if self.is_cancel(&key) {
                return Ok(None);
            }
            let key = key.trim();
            if !key.is_empty() {
                return Ok(Some(key.to_string()));
            }
            self.out.warning("The API key cannot be empty");
        }
    }

    /// Keeps a typed key for the rest of the session once it has worked.
    fn remember_api_key(&mut self, key: String) {
        if self.api_key.is_none() {
            info!("web API key kept for this session");
            self.api_key = Some(key);
        }
    }

    /// Drops a key the server refused, so the next attempt asks for another.
    fn forget_rejected_api_key(&mut self, err: &ConsoleError) {
        if names_api_key(err) && self.api_key.take().is_some() {
            warn!("web API key rejected, dropped for this session");
            self.out.warning("The web API key was rejected; you will be asked for another");
        }
    }

    pub(super) fn update_password(&mut self) -> Result<Outcome> {
        let mut step = PasswordStep::AwaitTarget;
        loop {
            step = match step {
                PasswordStep::AwaitTarget => match self.await_target()? {
                    Target::Found(user) => {
                        self.out.user_details(&user);
                        PasswordStep::AwaitConfirmation(user)
                    }
                    Target::Retry => PasswordStep::AwaitTarget,
                    Target::Abandon => PasswordStep::Done(Outcome::Cancelled),
                },
                PasswordStep::AwaitConfirmation(user) => {
                    if self
                        .prompter
                        .confirm("Do you want to update this user's password?", false)?
                    {
                        PasswordStep::AwaitInput(user)
                    } else {
                        PasswordStep::Done(Outcome::Cancelled)
                    }
                }
                PasswordStep::AwaitInput(user) => {
                    self.out.password_requirements(&self.cancel_keyword);
                    let password = self.prompter.secret("Enter new password")?;
                    if self.is_cancel(&password) {
                        PasswordStep::Done(Outcome::Cancelled)
                    } else if password.is_empty() {
                        self.out.warning("Password cannot be empty");
                        PasswordStep::AwaitInput(user)
                    } else {
                        self.out.password_strength(&PasswordStrength::assess(&password));
                        let confirmation = self.prompter.secret("Confirm new password")?;
                        if self.is_cancel(&confirmation) {
                            PasswordStep::Done(Outcome::Cancelled)
                        } else if confirmation.is_empty() {
                            self.out.warning("Confirmation cannot be empty");
                            PasswordStep::AwaitInput(user)
                        } else {
                            PasswordStep::Validating {
                                user,
                                password,
                                confirmation,
                            }
                        }
                    }
                }
                PasswordStep::Validating {
                    user,
                    password,
                    confirmation,
                } => match validate_new_password(&password, &confirmation) {
                    Ok(()) => PasswordStep::Commit { user, password },
                    Err(err) => {
                        self.out.error(err);
                        if self.try_again()? {
                            PasswordStep::AwaitInput(user)
                        } else {
                            PasswordStep::Done(Outcome::Cancelled)
                        }
                    }
                },
                // The password is not displayed, so the cache stays as it is.
                PasswordStep::Commit { user, password } => {
                    match self.directory.set_password(&user.uid, &password) {
                        Ok(()) => {
                            self.out.success("Password updated successfully!");
                            PasswordStep::Done(Outcome::Committed)
                        }
                        Err(err) => {
                            self.out.error(format!("Failed to update password: {err}"));
                            if self.try_again()? {
                                PasswordStep::AwaitInput(user)
                            } else {
                                PasswordStep::Done(Outcome::Cancelled)
                            }
                        }
                    }
                }
                PasswordStep::Done(outcome) => {
                    debug!(?outcome, "password workflow finished");
                    return Ok(outcome);
                }
            };
        }
    }

    pub(super) fn update_name(&mut self) -> Result<Outcome> {
        let mut step = NameStep::AwaitTarget;
        loop {
            step = match step {
                NameStep::AwaitTarget => match self.await_target()? {
                    Target::Found(user) => {
                        self.out.user_details(&user);
                        NameStep::AwaitConfirmation(user)
                    }
                    Target::Retry => NameStep::AwaitTarget,
                    Target::Abandon => NameStep::Done(Outcome::Cancelled),
                },
                NameStep::AwaitConfirmation(user) => {
                    if self
                        .prompter
                        .confirm("Do you want to update this user's display name?", false)?
                    {
                        NameStep::AwaitInput(user)
                    } else {
                        NameStep::Done(Outcome::Cancelled)
                    }
                }
                NameStep::AwaitInput(user) => {
                    let message = format!(
                        "Enter new display name (or '{}' to return)",
                        self.cancel_keyword
                    );
                    let name = self.prompter.text(&message)?;
                    if self.is_cancel(&name) {
                        NameStep::Done(Outcome::Cancelled)
                    } else if name.trim().is_empty() {
                        self.out.warning("Display name cannot be empty");
                        NameStep::AwaitInput(user)
                    } else {
                        NameStep::Commit { user, name }
                    }
                }
                NameStep::Commit { user, name } => {
                    match self.directory.set_display_name(&user.uid, &name) {
                        Ok(()) => {
                            self.out.success("Display name updated successfully!");
                            match self.session.refresh_after_mutation(&self.directory) {
                                Ok(_) => self.show_users("Users"),
                                Err(err) => self.out.error(format!("Error reloading users: {err}")),
                            }
                            NameStep::Done(Outcome::Committed)
                        }
                        Err(err) => {
                            self.out.error(format!("Failed to update display name: {err}"));
                            if self.try_again()? {
                                NameStep::AwaitInput(user)
                            } else {
                                NameStep::Done(Outcome::Cancelled)
                            }
                        }
                    }
                }
                NameStep::Done(outcome) => {
                    debug!(?outcome, "display name workflow finished");
                    return Ok(outcome);
                }
            };
        }
    }

    /// Mints a custom token and optionally trades it for an ID token.
    pub(super) fn generate_token(&mut self) -> Result<Outcome> {
        let mut step = TokenStep::AwaitTarget;
        loop {
            step = match step {
                TokenStep::AwaitTarget => match self.await_target()? {
                    Target::Found(user) => TokenStep::AwaitClaims(user),
                    Target::Retry => TokenStep::AwaitTarget,
                    Target::Abandon => TokenStep::Done(Outcome::Cancelled),
                },
                TokenStep::AwaitClaims(user) => {
                    let raw = self
                        .prompter
                        .text("Additional claims as a JSON object (leave empty for none)")?;
                    if self.is_cancel(&raw) {
                        TokenStep::Done(Outcome::Cancelled)
                    } else if raw.trim().is_empty() {
                        TokenStep::Mint { user, claims: None }
                    } else {
                        match serde_json::from_str::<Value>(&raw) {
                            Ok(Value::Object(claims)) => TokenStep::Mint {
                                user,
                                claims: Some(claims),
                            },
                            Ok(_) => {
                                self.out.error("Claims must be a JSON object");
                                TokenStep::AwaitClaims(user)
                            }
                            Err(err) => {
                                self.out.error(format!("Invalid JSON: {err}"));
                                TokenStep::AwaitClaims(user)
                            }
                        }
                    }
                }
                TokenStep::Mint { user, claims } => {
                    let result = self
                        .issuer
                        .mint_custom_token(&self.directory, &user.uid, claims.as_ref());
                    self.out.token_result(&result);
                    match result.outcome {
                        Ok(token) => TokenStep::OfferExchange(token.value),
                        Err(ConsoleError::UserNotFound(_)) => TokenStep::AwaitTarget,
                        Err(_) => {
                            if self.try_again()? {
                                TokenStep::Mint { user, claims }
                            } else {
                                TokenStep::Done(Outcome::Cancelled)
                            }
                        }
                    }
                }
                TokenStep::OfferExchange(custom_token) => {
                    if !self
                        .prompter
                        .confirm("Exchange it for an ID token?", false)?
                    {
                        TokenStep::Done(Outcome::Committed)
                    } else {
                        match self.api_key()? {
                            Some(api_key) => TokenStep::Exchange {
                                custom_token,
                                api_key,
                            },
                            None => TokenStep::Done(Outcome::Committed),
                        }
                    }
                }
                // The custom token already stands on its own; a failed
                // exchange is reported but does not undo it.
                TokenStep::Exchange {
                    custom_token,
                    api_key,
                } => {
                    let result = self.issuer.exchange_custom_token(&custom_token, &api_key);
                    self.out.token_result(&result);
                    match result.error() {
                        None => self.remember_api_key(api_key),
                        Some(err) => self.forget_rejected_api_key(err),
                    }
                    TokenStep::Done(Outcome::Committed)
                }
                TokenStep::Done(outcome) => {
                    debug!(?outcome, "token workflow finished");
                    return Ok(outcome);
                }
            };
        }
    }

    pub(super) fn sign_in(&mut self) -> Result<Outcome> {
        let mut step = SignInStep::AwaitEmail;
        loop {
            step = match step {
                SignInStep::AwaitEmail => {
                    let message = format!(
                        "Enter user email (or '{}' to return to menu)",
                        self.cancel_keyword
                    );
                    let email = self.prompter.text(&message)?.trim().to_string();
                    if self.is_cancel(&email) {
                        SignInStep::Done(Outcome::Cancelled)
                    } else if email.is_empty() {
                        SignInStep::AwaitEmail
                    } else {
                        SignInStep::AwaitPassword(email)
                    }
                }
                SignInStep::AwaitPassword(email) => {
                    let password = self.prompter.secret("Enter password")?;
                    if self.is_cancel(&password) {
                        SignInStep::Done(Outcome::Cancelled)
                    } else if password.is_empty() {
                        self.out.warning("Password cannot be empty");
                        SignInStep::AwaitPassword(email)
                    } else {
                        SignInStep::AwaitApiKey { email, password }
                    }
                }
                SignInStep::AwaitApiKey { email, password } => match self.api_key()? {
                    Some(api_key) => SignInStep::SignIn {
                        email,
                        password,
                        api_key,
                    },
                    None => SignInStep::Done(Outcome::Cancelled),
                },
                SignInStep::SignIn {
                    email,
                    password,
                    api_key,
                } => {
                    let result = self.issuer.sign_in_with_password(&email, &password, &api_key);
                    self.out.token_result(&result);
                    if let Some(err) = result.error() {
                        self.forget_rejected_api_key(err);
                    }
                    if result.outcome.is_ok() {
                        self.remember_api_key(api_key);
                        SignInStep::Done(Outcome::Committed)
                    } else if self.try_again()? {
                        SignInStep::AwaitPassword(email)
                    } else {
                        SignInStep::Done(Outcome::Cancelled)
                    }
                }
                SignInStep::Done(outcome) => {
                    debug!(?outcome, "sign-in workflow finished");
                    return Ok(outcome);
                }
            };
        }
    }
}

/// Sign-in rejections that blame the key rather than the credentials, such as
/// "API key not valid" or "API_KEY_INVALID".
fn names_api_key(err: &ConsoleError) -> bool {
    match err {
        ConsoleError::TokenIssuanceFailed(message) => {
            message.to_ascii_uppercase().contains("API_KEY")
                || message.to_ascii_lowercase().contains("api key")
        }
        _ => false,
    }
}
