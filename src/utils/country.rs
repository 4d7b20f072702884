use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, AppResult};

static COUNTRY_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]{2}$").unwrap());

/// 校验 ISO-3166 两位国家代码并统一为大写
pub fn normalize_country_code(raw: &str) -> AppResult<String> {
    let code = raw.trim();
    if !COUNTRY_CODE.is_match(code) {
        return Err(AppError::ValidationError(format!(
            "国家代码格式无效: {raw}，必须是两位字母代码"
        )));
    }
    Ok(code.to_ascii_uppercase())
}

/// Empty or missing input means "unknown country".
pub fn normalize_optional_country(raw: Option<&str>) -> AppResult<Option<String>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(code) => normalize_country_code(code).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_country_code() {
        assert_eq!(normalize_country_code("us").unwrap(), "US");
        assert_eq!(normalize_country_code(" In ").unwrap(), "IN");
        assert!(normalize_country_code("USA").is_err());
        assert!(normalize_country_code("1A").is_err());
        assert!(normalize_country_code("").is_err());
        assert!(normalize_country_code("U").is_err());
        assert_eq!(normalize_country_code("gb").unwrap(), "GB");
    }

    #[test]
    fn test_normalize_optional_country() {
        assert_eq!(normalize_optional_country(None).unwrap(), None);
        assert_eq!(normalize_optional_country(Some("  ")).unwrap(), None);
        assert_eq!(normalize_optional_country(Some("br")).unwrap(), Some("BR".into()));
        assert!(normalize_optional_country(Some("brazil")).is_err());
    }
}
