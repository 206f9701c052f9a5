//! Styled terminal output for the console and the one-shot commands.

use std::fmt::Display;

use console::{style, Term};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::console::password::{PasswordStrength, StrengthLevel, MIN_PASSWORD_LEN};
use crate::provider::UserRecord;
use crate::token::{claims, TokenResult};

const EMAIL_WIDTH: usize = 35;
const NAME_WIDTH: usize = 25;

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "UID")]
    uid: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Display Name")]
    name: String,
    #[tabled(rename = "Verified")]
    verified: &'static str,
    #[tabled(rename = "Status")]
    status: &'static str,
}

impl From<&UserRecord> for UserRow {
    fn from(user: &UserRecord) -> Self {
        Self {
            uid: user.uid.clone(),
            email: truncate(user.email_label(), EMAIL_WIDTH),
            name: truncate(user.name_label(), NAME_WIDTH),
            verified: yes_no(user.email_verified),
            status: account_status(user.disabled),
        }
    }
}

/// Keeps the first `max` characters and marks the cut with "...".
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max).collect();
        format!("{kept}...")
    } else {
        s.to_owned()
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn account_status(disabled: bool) -> &'static str {
    if disabled {
        "Disabled"
    } else {
        "Active"
    }
}

/// Renders the user table. UIDs are never truncated.
pub fn render_users_table(users: &[UserRecord]) -> String {
    let rows: Vec<UserRow> = users.iter().map(UserRow::from).collect();
    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.to_string()
}

/// "***" plus the last four characters.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("***{tail}")
}

/// Terminal output helper for consistent styled output.
pub struct Output {
    term: Term,
    /// Everything written, without styling, for assertions.
    #[cfg(test)]
    lines: std::cell::RefCell<Vec<String>>,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            #[cfg(test)]
            lines: std::cell::RefCell::default(),
        }
    }

    fn line(&self, text: &str) {
        #[cfg(test)]
        self.lines
            .borrow_mut()
            .push(console::strip_ansi_codes(text).into_owned());
        drop(self.term.write_line(text));
    }

    #[cfg(test)]
    pub fn printed(&self) -> String {
        self.lines.borrow().join("\n")
    }

    pub fn success(&self, message: impl Display) {
        self.line(&format!("{} {}", style("✓").green().bold(), message));
    }

    pub fn error(&self, message: impl Display) {
        self.line(&format!("{} {}", style("✗").red().bold(), message));
    }

    pub fn warning(&self, message: impl Display) {
        self.line(&format!("{} {}", style("⚠").yellow().bold(), message));
    }

    pub fn info(&self, message: impl Display) {
        self.line(&format!("{} {}", style("ℹ").blue().bold(), message));
    }

    pub fn print(&self, message: impl Display) {
        self.line(&message.to_string());
    }

    pub fn newline(&self) {
        self.line("");
    }

    pub fn header(&self, message: impl Display) {
        self.line(&style(message).bold().cyan().to_string());
    }

    pub fn dim(&self, message: impl Display) {
        self.line(&style(message).dim().to_string());
    }

    pub fn labeled(&self, label: impl Display, value: impl Display) {
        self.line(&format!("  {}: {}", style(label).bold(), value));
    }

    pub fn users_table(&self, users: &[UserRecord], title: &str) {
        if users.is_empty() {
            self.warning("No users found.");
            return;
        }
        self.newline();
        self.header(title);
        self.print(render_users_table(users));
        self.dim(format!("Total users: {}", users.len()));
    }

    pub fn user_details(&self, user: &UserRecord) {
        self.newline();
        self.header("User Details");
        self.labeled("UID", style(&user.uid).cyan().bold());
        self.labeled("Email", user.email_label());
        self.labeled("Display Name", user.name_label());
        self.labeled("Email Verified", yes_no(user.email_verified));
        self.labeled("Account Status", account_status(user.disabled));
        self.labeled("Created", user.created_label());
        self.labeled("Last Sign In", user.last_sign_in_label());
    }

    pub fn password_requirements(&self, cancel_keyword: &str) {
        self.newline();
        self.header("Password Requirements");
        self.dim(format!("  • At least {MIN_PASSWORD_LEN} characters long"));
        self.dim("  • Mix of uppercase, lowercase, numbers, and special characters");
        self.dim(format!("  • Type '{cancel_keyword}' at any time to return to menu"));
    }

    pub fn password_strength(&self, strength: &PasswordStrength) {
        let level = strength.level();
        let filled = strength.bar_segments();
        let bar: String = (0..3)
            .map(|i| {
                if i < filled {
                    segment_style(i).apply_to("●").to_string()
                } else {
                    style("○").dim().to_string()
                }
            })
            .collect();

        let label = format!("Password Strength: {level}");
        let label = match level {
            StrengthLevel::Weak => style(label).red().bold(),
            StrengthLevel::Medium => style(label).yellow().bold(),
            StrengthLevel::Strong => style(label).green().bold(),
        };

        self.newline();
        self.line(&format!("{label} {bar}"));
        self.dim(format!("  Length: {} characters", strength.length));
        self.dim(format!(
            "  Uppercase: {} Lowercase: {}",
            check(strength.has_upper),
            check(strength.has_lower)
        ));
        self.dim(format!(
            "  Numbers: {} Special chars: {}",
            check(strength.has_digit),
            check(strength.has_special)
        ));
    }

    /// Prints the token or the failure. Token payloads are decoded for display
    /// only.
    pub fn token_result(&self, result: &TokenResult) {
        match &result.outcome {
            Ok(token) => {
                self.success(format!("{} issued", result.kind));
                if let Some(peeked) = claims::peek(&token.value) {
                    if let Some(subject) = peeked.subject() {
                        self.labeled("Subject", subject);
                    }
                    if let Some(expires) = peeked.expires_at() {
                        self.labeled("Expires", expires.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                } else if let Some(seconds) = token.expires_in {
                    self.labeled("Expires in", format!("{seconds}s"));
                }
                self.newline();
                self.print(&token.value);
            }
            Err(err) => self.error(format!("{} not issued: {}", result.kind, err)),
        }
    }
}

fn segment_style(index: usize) -> console::Style {
    match index {
        0 => console::Style::new().red(),
        1 => console::Style::new().yellow(),
        _ => console::Style::new().green(),
    }
}

fn check(flag: bool) -> &'static str {
    if flag {
        "✓"
    } else {
        "✗"
    }
}
