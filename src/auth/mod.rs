pub mod custom_token;
pub mod oauth;
pub mod service_account;

pub use custom_token::sign_custom_token;
pub use oauth::AccessTokenSource;
pub use service_account::ServiceAccountKey;
