use super::middleware::ACCESS_TOKEN_COOKIE;

/// `Set-Cookie` value carrying the access token.
pub fn access_token_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{ACCESS_TOKEN_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age_secs}{secure}"
    )
}

/// `Set-Cookie` value that expires the access token cookie.
pub fn clear_access_token_cookie(secure: bool) -> String {
    access_token_cookie("", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_attributes() {
        let cookie = access_token_cookie("tok", 60, true);
        assert_eq!(
            cookie,
            "access_token=tok; HttpOnly; SameSite=Strict; Path=/; Max-Age=60; Secure"
        );
        assert!(!access_token_cookie("tok", 60, false).contains("Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        assert!(clear_access_token_cookie(false).starts_with("access_token=;"));
        assert!(clear_access_token_cookie(false).contains("Max-Age=0"));
    }
}
