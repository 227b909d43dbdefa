use rocket::http::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

pub const THEME_COOKIE: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Reads the preference cookie; anything unrecognised is light.
    pub fn from_cookies(cookies: &CookieJar<'_>) -> Self {
        match cookies.get(THEME_COOKIE).map(|c| c.value()) {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn store(self, cookies: &CookieJar<'_>) {
        cookies.add(
            Cookie::build((THEME_COOKIE, self.as_str()))
                .same_site(SameSite::Lax)
                .path("/"),
        );
    }
}
