use std::env;

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    /// When true, redeeming a magic link marks the request `used` and clears
    /// the token. Off by default: the service historically allowed re-use
    /// until expiry, and approval-path tokens are effectively permanent.
    pub single_use_magic_links: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");

        let single_use_magic_links = env::var("SINGLE_USE_MAGIC_LINKS")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Config {
            database_url,
            frontend_origin,
            single_use_magic_links,
        }
    }

    /// Login URL embedded in magic-link emails.
    pub fn magic_login_url(&self, token: &str) -> String {
        format!(
            "{}/magic-login?token={}",
            self.frontend_origin.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_login_url_encodes_token() {
        let config = Config {
            database_url: String::new(),
            frontend_origin: "http://localhost:3000/".into(),
            single_use_magic_links: false,
        };
        assert_eq!(
            config.magic_login_url("ab/cd"),
            "http://localhost:3000/magic-login?token=ab%2Fcd"
        );
    }
}
