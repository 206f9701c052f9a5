use anyhow::{Context, Result};
use serde_json::{Map, Value};

use super::context::AppContext;
use crate::console::output::mask_secret;
use crate::console::{Console, InquirePrompter, Output, Prompter};
use crate::session::SessionStore;
use crate::storage::ConfigStore;

pub fn cmd_console(ctx: AppContext) -> Result<()> {
    let keyword = ctx.config.effective_cancel_keyword().to_string();
    let prompter = InquirePrompter::new(keyword.clone());
    let mut console = Console::new(ctx.directory, ctx.issuer, prompter)
        .with_cancel_keyword(keyword)
        .with_api_key(ctx.api_key);
    console.run()
}

pub fn cmd_list(ctx: &AppContext, query: Option<&str>) -> Result<()> {
    list_users(ctx, query, &Output::new())
}

fn list_users(ctx: &AppContext, query: Option<&str>, out: &Output) -> Result<()> {
    let mut session = SessionStore::new();
    session
        .load(&ctx.directory)
        .context("Failed to load users")?;

    let title = match query {
        Some(q) if !q.trim().is_empty() => {
            session.search(q);
            format!("Search results for: '{}'", q)
        }
        _ => "Users".to_string(),
    };
    out.users_table(session.filtered_users(), &title);
    Ok(())
}

pub fn cmd_view(ctx: &AppContext, uid: &str) -> Result<()> {
    view_user(ctx, uid, &Output::new())
}

fn view_user(ctx: &AppContext, uid: &str, out: &Output) -> Result<()> {
    let user = ctx.directory.find_by_uid(uid)?;
    out.user_details(&user);
    Ok(())
}

pub fn cmd_mint_token(
    ctx: &AppContext,
    uid: &str,
    claims: Option<&str>,
    exchange: bool,
) -> Result<()> {
    mint_token(ctx, uid, claims, exchange, &Output::new())
}

fn mint_token(
    ctx: &AppContext,
    uid: &str,
    claims: Option<&str>,
    exchange: bool,
    out: &Output,
) -> Result<()> {
    let claims = claims.map(parse_claims).transpose()?;

    let minted = ctx
        .issuer
        .mint_custom_token(&ctx.directory, uid, claims.as_ref());
    let custom_token = match &minted.outcome {
        Ok(token) => token.value.clone(),
        Err(e) => anyhow::bail!("{} not issued: {}", minted.kind, e),
    };
    out.token_result(&minted);

    if exchange {
        let api_key = ctx.api_key.as_deref().context(
            "--exchange needs a web API key (--api-key, FIREBASE_API_KEY or `fbadmin config --set-api-key`)",
        )?;
        let exchanged = ctx.issuer.exchange_custom_token(&custom_token, api_key);
        if let Some(e) = exchanged.error() {
            anyhow::bail!("{} not issued: {}", exchanged.kind, e);
        }
        out.newline();
        out.token_result(&exchanged);
    }
    Ok(())
}

pub fn cmd_sign_in(ctx: &AppContext, email: &str) -> Result<()> {
    let mut prompter = InquirePrompter::new(ctx.config.effective_cancel_keyword());
    sign_in(ctx, email, &mut prompter, &Output::new())
}

/// A blank answer or the cancel keyword at either prompt ends the command
/// before anything is sent.
fn sign_in<R: Prompter>(
    ctx: &AppContext,
    email: &str,
    prompter: &mut R,
    out: &Output,
) -> Result<()> {
    let keyword = ctx.config.effective_cancel_keyword();
    let backed_out = |answer: &str| {
        let answer = answer.trim();
        answer.is_empty() || answer.eq_ignore_ascii_case(keyword)
    };

    let password = prompter.secret("Password:")?;
    if backed_out(&password) {
        out.dim("Sign-in cancelled");
        return Ok(());
    }

    let api_key = match &ctx.api_key {
        Some(key) => key.clone(),
        None => {
            let key = prompter.secret("Web API key:")?;
            if backed_out(&key) {
                out.dim("Sign-in cancelled");
                return Ok(());
            }
            key.trim().to_string()
        }
    };

    let result = ctx.issuer.sign_in_with_password(email, &password, &api_key);
    if let Some(e) = result.error() {
        anyhow::bail!("{} not issued: {}", result.kind, e);
    }
    out.token_result(&result);
    Ok(())
}

pub fn cmd_config(
    store: &ConfigStore,
    set_api_key: Option<&str>,
    set_page_size: Option<u32>,
) -> Result<()> {
    let out = Output::new();

    if let Some(key) = set_api_key {
        store.set_api_key(key)?;
        out.success("API key saved");
    }
    if let Some(page_size) = set_page_size {
        store.set_page_size(page_size)?;
        out.success(format!("Page size set to {}", page_size));
    }

    let config = store.load_config()?;
    out.header("Configuration");
    out.labeled("Config file", store.path().display());
    out.labeled(
        "API key",
        config
            .api_key()
            .map(mask_secret)
            .unwrap_or_else(|| "not set".to_string()),
    );
    out.labeled("Page size", config.effective_page_size());
    out.labeled("Cancel keyword", config.effective_cancel_keyword());
    out.labeled("Admin endpoint", &config.endpoints.admin);
    out.labeled("Sign-in endpoint", &config.endpoints.identity_toolkit);
    Ok(())
}

/// Extra custom-token claims, given as a JSON object.
fn parse_claims(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("Claims are not valid JSON")? {
        Value::Object(claims) => Ok(claims),
        _ => anyhow::bail!("Claims must be a JSON object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DirectoryClient;
    use crate::provider::FirebaseProvider;
    use crate::storage::Config;
    use crate::testing::{self, secret, FakeEndpoint, ScriptedPrompter};
    use crate::token::{IdentityToolkit, TokenIssuer};

    const ACCESS_TOKEN: &str = r#"{"access_token": "ya29.t", "expires_in": 3600}"#;

    /// Admin and sign-in calls both go to `endpoint`.
    fn context(endpoint: &FakeEndpoint, api_key: Option<&str>) -> AppContext {
        let key = testing::service_account_with_token_uri(&endpoint.url("/token"));
        AppContext {
            config: Config::default(),
            directory: DirectoryClient::new(FirebaseProvider::new(key, endpoint.url("/v1"), 1000)),
            issuer: TokenIssuer::new(IdentityToolkit::new(endpoint.url("/v1"))),
            api_key: api_key.map(str::to_string),
        }
    }

    /// Nothing listens behind this one; any request fails.
    fn offline_context(api_key: Option<&str>) -> AppContext {
        let key = testing::service_account_with_token_uri(&testing::closed_port_url());
        AppContext {
            config: Config::default(),
            directory: DirectoryClient::new(FirebaseProvider::new(
                key,
                testing::closed_port_url(),
                1000,
            )),
            issuer: TokenIssuer::new(IdentityToolkit::new(testing::closed_port_url())),
            api_key: api_key.map(str::to_string),
        }
    }

    fn lookup(uid: &str, email: &str) -> (u16, String) {
        (
            200,
            format!(r#"{{"users": [{{"localId": "{uid}", "email": "{email}"}}]}}"#),
        )
    }

    #[test]
    fn test_list_with_query_prints_matches_only() {
        let endpoint = FakeEndpoint::start(vec![
            (200, ACCESS_TOKEN.to_string()),
            (
                200,
                r#"{"users": [
                    {"localId": "u1", "email": "ann@x.com", "displayName": "Ann"},
                    {"localId": "u2", "email": "bob@y.org", "displayName": "Bob"}
                ]}"#
                .to_string(),
            ),
        ]);
        let ctx = context(&endpoint, None);
        let out = Output::new();

        list_users(&ctx, Some("BOB"), &out).unwrap();

        let printed = out.printed();
        assert!(printed.contains("Search results for: 'BOB'"));
        assert!(printed.contains("bob@y.org"));
        assert!(!printed.contains("ann@x.com"));
        assert!(printed.contains("Total users: 1"));

        let requests = endpoint.finish();
        assert_eq!(
            requests[1].url,
            "/v1/projects/demo-project/accounts:batchGet?maxResults=1000"
        );
    }

    #[test]
    fn test_list_without_matches() {
        let endpoint = FakeEndpoint::start(vec![
            (200, ACCESS_TOKEN.to_string()),
            (200, r#"{"users": [{"localId": "u1", "email": "ann@x.com"}]}"#.to_string()),
        ]);
        let ctx = context(&endpoint, None);
        let out = Output::new();

        list_users(&ctx, Some("zed"), &out).unwrap();
        assert!(out.printed().contains("No users found."));
        endpoint.finish();
    }

    #[test]
    fn test_list_fails_when_directory_unreachable() {
        let err = list_users(&offline_context(None), None, &Output::new()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load users"));
    }

    #[test]
    fn test_view_prints_details() {
        let endpoint = FakeEndpoint::start(vec![
            (200, ACCESS_TOKEN.to_string()),
            lookup("u1", "ann@x.com"),
        ]);
        let ctx = context(&endpoint, None);
        let out = Output::new();

        view_user(&ctx, "u1", &out).unwrap();
        assert!(out.printed().contains("User Details"));
        assert!(out.printed().contains("ann@x.com"));
        endpoint.finish();
    }

    #[test]
    fn test_view_unknown_uid_fails() {
        let endpoint = FakeEndpoint::start(vec![
            (200, ACCESS_TOKEN.to_string()),
            (200, "{}".to_string()),
        ]);
        let ctx = context(&endpoint, None);
        let out = Output::new();

        assert!(view_user(&ctx, "ghost", &out).is_err());
        assert!(out.printed().is_empty());
        endpoint.finish();
    }

    #[test]
    fn test_mint_for_unknown_user_prints_nothing() {
        let endpoint = FakeEndpoint::start(vec![
            (200, ACCESS_TOKEN.to_string()),
            (200, "{}".to_string()),
        ]);
        let ctx = context(&endpoint, Some("k"));
        let out = Output::new();

        let err = mint_token(&ctx, "ghost", None, true, &out).unwrap_err();
        assert!(err.to_string().contains("Custom token not issued"));
        assert!(out.printed().is_empty());
        // no exchange after a failed mint
        assert_eq!(endpoint.finish().len(), 2);
    }

    #[test]
    fn test_exchange_without_api_key_fails() {
        let endpoint = FakeEndpoint::start(vec![
            (200, ACCESS_TOKEN.to_string()),
            lookup("u1", "ann@x.com"),
        ]);
        let ctx = context(&endpoint, None);
        let out = Output::new();

        let err = mint_token(&ctx, "u1", None, true, &out).unwrap_err();
        assert!(err.to_string().contains("--exchange needs a web API key"));
        // the custom token itself was still printed
        assert!(out.printed().contains("Custom token issued"));
        assert_eq!(endpoint.finish().len(), 2);
    }

    #[test]
    fn test_mint_and_exchange() {
        let endpoint = FakeEndpoint::start(vec![
            (200, ACCESS_TOKEN.to_string()),
            lookup("u1", "ann@x.com"),
            (200, r#"{"idToken": "id.tok.en", "expiresIn": "3600"}"#.to_string()),
        ]);
        let ctx = context(&endpoint, Some("k"));
        let out = Output::new();

        mint_token(&ctx, "u1", Some(r#"{"role": "admin"}"#), true, &out).unwrap();
        let printed = out.printed();
        assert!(printed.contains("Custom token issued"));
        assert!(printed.contains("ID token issued"));
        assert!(printed.contains("id.tok.en"));

        let requests = endpoint.finish();
        assert_eq!(requests[2].url, "/v1/accounts:signInWithCustomToken?key=k");
    }

    #[test]
    fn test_mint_rejects_bad_claims_before_any_request() {
        let err = mint_token(&offline_context(None), "u1", Some("[1]"), false, &Output::new())
            .unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn test_sign_in_with_configured_key() {
        let endpoint = FakeEndpoint::start(vec![(
            200,
            r#"{"idToken": "id.tok.en", "expiresIn": "3600"}"#.to_string(),
        )]);
        let ctx = context(&endpoint, Some("k"));
        let mut prompter = ScriptedPrompter::new(vec![secret("pa55word!")]);
        let out = Output::new();

        sign_in(&ctx, "ann@x.com", &mut prompter, &out).unwrap();
        assert!(out.printed().contains("id.tok.en"));
        assert_eq!(prompter.remaining(), 0);

        let requests = endpoint.finish();
        assert_eq!(requests[0].url, "/v1/accounts:signInWithPassword?key=k");
    }

    #[test]
    fn test_sign_in_cancelled_at_api_key_prompt() {
        // an offline context turns any request into an error
        let ctx = offline_context(None);
        for answer in ["back", "BACK ", ""] {
            let mut prompter = ScriptedPrompter::new(vec![secret("pa55word!"), secret(answer)]);
            let out = Output::new();

            sign_in(&ctx, "ann@x.com", &mut prompter, &out).unwrap();
            assert!(out.printed().contains("Sign-in cancelled"));
            assert_eq!(prompter.asked, vec!["Password:", "Web API key:"]);
        }
    }

    #[test]
    fn test_sign_in_cancelled_at_password_prompt() {
        let ctx = offline_context(Some("k"));
        let mut prompter = ScriptedPrompter::new(vec![secret("back")]);
        let out = Output::new();

        sign_in(&ctx, "ann@x.com", &mut prompter, &out).unwrap();
        assert!(out.printed().contains("Sign-in cancelled"));
        assert_eq!(prompter.remaining(), 0);
    }

    #[test]
    fn test_rejected_sign_in_is_an_error() {
        let endpoint = FakeEndpoint::start(vec![(
            400,
            r#"{"error": {"message": "INVALID_LOGIN_CREDENTIALS"}}"#.to_string(),
        )]);
        let ctx = context(&endpoint, Some("k"));
        let mut prompter = ScriptedPrompter::new(vec![secret("wrong")]);

        let err = sign_in(&ctx, "ann@x.com", &mut prompter, &Output::new()).unwrap_err();
        assert!(err.to_string().contains("ID token not issued"));
        endpoint.finish();
    }

    #[test]
    fn test_parse_claims() {
        let claims = parse_claims(r#"{"role": "admin", "tier": 2}"#).unwrap();
        assert_eq!(claims["role"], "admin");
        assert_eq!(claims["tier"], 2);

        assert!(parse_claims("[1]").is_err());
        assert!(parse_claims("{oops").is_err());
    }

    #[test]
    fn test_config_command_updates_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path().join("config.toml"));

        cmd_config(&store, Some("AIza-secret"), Some(100)).unwrap();

        let config = store.load_config().unwrap();
        assert_eq!(config.api_key(), Some("AIza-secret"));
        assert_eq!(config.page_size, 100);
        assert_eq!(config.cancel_keyword, Config::default().cancel_keyword);
    }

    #[test]
    fn test_config_command_rejects_bad_page_size() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path().join("config.toml"));
        assert!(cmd_config(&store, None, Some(0)).is_err());
    }
}
