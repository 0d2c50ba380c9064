//! Authentication

mod auto_refresh;
mod password;
mod token;

pub use auto_refresh::AuthFlow;
pub use auto_refresh::AutoRefreshTokenProvider;
pub use password::PasswordFlow;
pub use token::AccessToken;
pub use token::StaticTokenProvider;
pub use token::TokenProvider;
