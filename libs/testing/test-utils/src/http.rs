//! Request helpers for handler tests

use axum_helpers::{ADMIN_ROLE, JwtClaims};
use uuid::Uuid;

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// Claims as the auth middleware would insert them for a signed-in user.
/// Attach with `.layer(axum::Extension(claims))`.
pub fn user_claims(user_id: Uuid, email: &str, roles: &[&str]) -> JwtClaims {
    let now = chrono::Utc::now().timestamp();
    JwtClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        name: email.split('@').next().unwrap_or(email).to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        exp: now + 3600,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    }
}

pub fn customer_claims(user_id: Uuid, email: &str) -> JwtClaims {
    user_claims(user_id, email, &["customer"])
}

pub fn admin_claims(user_id: Uuid) -> JwtClaims {
    user_claims(user_id, "admin@example.com", &[ADMIN_ROLE])
}

/// One part of a `multipart/form-data` body.
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            data: value.as_bytes(),
        }
    }

    pub fn file(name: &'a str, file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            file_name: Some(file_name),
            data,
        }
    }
}

/// Encode parts as a multipart body. Returns the `content-type` header value
/// and the body bytes.
pub fn multipart_body(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_body_layout() {
        let (content_type, body) = multipart_body(&[
            Part::text("dry_run", "true"),
            Part::file("file", "a.csv", b"name,price\n"),
        ]);
        let body = String::from_utf8(body).unwrap();
        assert!(content_type.ends_with(BOUNDARY));
        assert!(body.contains("name=\"dry_run\"\r\n\r\ntrue\r\n"));
        assert!(body.contains("filename=\"a.csv\""));
        assert!(body.ends_with(&format!("--{BOUNDARY}--\r\n")));
    }

    #[test]
    fn test_admin_claims_carry_admin_role() {
        let claims = admin_claims(Uuid::nil());
        assert!(claims.roles.iter().any(|r| r == ADMIN_ROLE));
        assert!(claims.exp > claims.iat);
    }
}
