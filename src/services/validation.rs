// src/services/validation.rs
//
// Validação e normalização dos campos de produto que chegam pela API e pelas planilhas.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::common::error::AppError;

pub const EAN_LENGTH: usize = 13;
pub const GENERIC_PRODUCT_NAME: &str = "GENÉRICO";
pub const UNKNOWN_BRAND: &str = "Marca desconhecida";

// Datas seriais do Excel contam dias a partir de 30/12/1899.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
// Seriais aceitos: 01/01/2000 a 31/12/9999
const EXCEL_MIN_SERIAL: f64 = 36_526.0;
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

pub fn require_non_empty<'a>(field: &str, raw: &'a str) -> Result<&'a str, AppError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AppError::MissingField(field.to_string()));
    }
    Ok(value)
}

/// EAN com exatamente 13 dígitos numéricos.
pub fn normalize_ean(raw: &str) -> Result<String, AppError> {
    let ean = raw.trim();
    if ean.len() != EAN_LENGTH || !ean.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::InvalidEan(ean.to_string()));
    }
    Ok(ean.to_string())
}

/// Quantidade vinda como texto ("12", "12.0" de planilhas). Precisa ser > 0.
pub fn parse_quantity(raw: &str) -> Result<i32, AppError> {
    let text = raw.trim();
    let invalid = || AppError::InvalidQuantity(text.to_string());

    let quantity = match text.parse::<i64>() {
        Ok(q) => q,
        Err(_) => {
            let float = text.replace(',', ".").parse::<f64>().map_err(|_| invalid())?;
            if !float.is_finite() || float.fract() != 0.0 {
                return Err(invalid());
            }
            float as i64
        }
    };

    let quantity = i32::try_from(quantity).map_err(|_| invalid())?;
    ensure_positive(quantity)
}

pub fn ensure_positive(quantity: i32) -> Result<i32, AppError> {
    if quantity <= 0 {
        return Err(AppError::InvalidQuantity(quantity.to_string()));
    }
    Ok(quantity)
}

pub fn ensure_not_negative(quantity: i32) -> Result<i32, AppError> {
    if quantity < 0 {
        return Err(AppError::InvalidQuantity(quantity.to_string()));
    }
    Ok(quantity)
}

/// Aceita AAAA-MM-DD, DD/MM/AAAA e timestamp ISO. Números soltos são recusados.
pub fn parse_expiration(raw: &str) -> Result<NaiveDate, AppError> {
    let text = raw.trim();
    let invalid = || AppError::InvalidDate(text.to_string());

    if text.is_empty() {
        return Err(invalid());
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%d/%m/%Y") {
        return Ok(date);
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(text) {
        return Ok(ts.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(ts.date());
        }
    }

    Err(invalid())
}

/// Validade vinda de planilha: os formatos de `parse_expiration` ou a data serial do Excel.
pub fn parse_sheet_expiration(raw: &str) -> Result<NaiveDate, AppError> {
    parse_expiration(raw).or_else(|err| excel_serial_to_date(raw.trim()).ok_or(err))
}

fn excel_serial_to_date(text: &str) -> Option<NaiveDate> {
    let serial = text.parse::<f64>().ok()?;
    if !serial.is_finite() || !(EXCEL_MIN_SERIAL..=EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Nome exibido do produto: maiúsculas, "GENÉRICO" se vazio.
pub fn normalize_name(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_uppercase(),
        _ => GENERIC_PRODUCT_NAME.to_string(),
    }
}

pub fn normalize_brand(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(brand) if !brand.is_empty() => brand.to_string(),
        _ => UNKNOWN_BRAND.to_string(),
    }
}

/// "leite  INTEGRAL" -> "Leite Integral"
pub fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Texto opcional: vazio vira None.
pub fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ean_must_have_thirteen_digits() {
        assert_eq!(normalize_ean(" 7891000100103 ").unwrap(), "7891000100103");
        assert!(matches!(normalize_ean("789100010010"), Err(AppError::InvalidEan(_))));
        assert!(matches!(normalize_ean("789100010010A"), Err(AppError::InvalidEan(_))));
        assert!(matches!(normalize_ean(""), Err(AppError::InvalidEan(_))));
    }

    #[test]
    fn quantity_accepts_spreadsheet_floats() {
        assert_eq!(parse_quantity("12").unwrap(), 12);
        assert_eq!(parse_quantity(" 12.0 ").unwrap(), 12);
        assert_eq!(parse_quantity("7,0").unwrap(), 7);
    }

    #[test]
    fn quantity_rejects_zero_negative_and_fractions() {
        for raw in ["0", "-3", "2.5", "abc", "", "99999999999"] {
            assert!(
                matches!(parse_quantity(raw), Err(AppError::InvalidQuantity(_))),
                "{raw} deveria ser rejeitado"
            );
        }
    }

    #[test]
    fn expiration_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 15).unwrap();
        assert_eq!(parse_expiration("2025-08-15").unwrap(), expected);
        assert_eq!(parse_expiration("15/08/2025").unwrap(), expected);
        assert_eq!(parse_expiration("2025-08-15T00:00:00").unwrap(), expected);
        assert_eq!(parse_expiration("2025-08-15T10:30:00.000Z").unwrap(), expected);
        assert_eq!(parse_expiration("2025-08-15 00:00:00").unwrap(), expected);
    }

    #[test]
    fn expiration_from_excel_serial() {
        // 45884 = 15/08/2025 no Excel
        let expected = NaiveDate::from_ymd_opt(2025, 8, 15).unwrap();
        assert_eq!(parse_sheet_expiration("45884").unwrap(), expected);
        assert_eq!(parse_sheet_expiration("45884.0").unwrap(), expected);
        assert_eq!(parse_sheet_expiration("15/08/2025").unwrap(), expected);
    }

    #[test]
    fn bare_numbers_are_not_dates() {
        for raw in ["2025", "12", "45884", "0"] {
            assert!(
                matches!(parse_expiration(raw), Err(AppError::InvalidDate(_))),
                "{raw} não deveria virar data"
            );
        }
    }

    #[test]
    fn sheet_serials_before_2000_are_rejected() {
        for raw in ["2025", "12", "36525", "-1"] {
            assert!(
                matches!(parse_sheet_expiration(raw), Err(AppError::InvalidDate(_))),
                "{raw} não deveria virar data"
            );
        }
        assert_eq!(parse_sheet_expiration("36526").unwrap(), NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
    }

    #[test]
    fn expiration_rejects_garbage() {
        assert!(matches!(parse_expiration("amanhã"), Err(AppError::InvalidDate(_))));
        assert!(matches!(parse_expiration("31/02/2025"), Err(AppError::InvalidDate(_))));
        assert!(matches!(parse_expiration("  "), Err(AppError::InvalidDate(_))));
    }

    #[test]
    fn names_and_brands_have_fallbacks() {
        assert_eq!(normalize_name(Some("  leite integral ")), "LEITE INTEGRAL");
        assert_eq!(normalize_name(Some("   ")), GENERIC_PRODUCT_NAME);
        assert_eq!(normalize_name(None), GENERIC_PRODUCT_NAME);
        assert_eq!(normalize_brand(Some(" Itambé ")), "Itambé");
        assert_eq!(normalize_brand(None), UNKNOWN_BRAND);
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("  leite  INTEGRAL uht "), "Leite Integral Uht");
        assert_eq!(title_case("ÁGUA mineral"), "Água Mineral");
    }

    #[test]
    fn required_fields() {
        assert_eq!(require_non_empty("ean", " 1 ").unwrap(), "1");
        assert!(matches!(require_non_empty("validade", " "), Err(AppError::MissingField(f)) if f == "validade"));
    }
}
