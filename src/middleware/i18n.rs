// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

const DEFAULT_LANG: &str = "pt";

// Idioma preferido do cliente, lido do Accept-Language.
#[derive(Debug, Clone, PartialEq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    /// "pt-BR, en;q=0.8" -> "pt"
    pub fn from_header(header_str: &str) -> Self {
        accept_language::parse(header_str)
            .first()
            .map(|tag| tag.split('-').next().unwrap_or(tag.as_str()).to_lowercase())
            .filter(|lang| !lang.is_empty())
            .map(Locale)
            .unwrap_or_default()
    }

    pub fn is_english(&self) -> bool {
        self.0 == "en"
    }

    pub fn from_parts(parts: &Parts) -> Self {
        parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(Locale::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_primary_subtag_of_first_language() {
        assert_eq!(Locale::from_header("en-US,en;q=0.9,pt;q=0.5"), Locale("en".into()));
        assert_eq!(Locale::from_header("pt-BR"), Locale("pt".into()));
    }

    #[test]
    fn falls_back_to_portuguese() {
        assert_eq!(Locale::from_header(""), Locale::default());
        assert!(!Locale::default().is_english());
    }
}
