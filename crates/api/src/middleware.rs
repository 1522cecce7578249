use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use shopfloor_auth::Role;
use shopfloor_core::UserId;

use crate::context::PrincipalContext;

/// Header carrying the authenticated user's id (UUID).
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's role (`manager` | `worker`).
pub const USER_ROLE_HEADER: &str = "x-user-role";
/// Optional header carrying the user's display name.
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Read the gateway-forwarded identity and attach it to the request.
///
/// Missing or unparseable headers are rejected with 401.
pub async fn identity_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let principal = extract_principal(req.headers())?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

fn extract_principal(headers: &HeaderMap) -> Result<PrincipalContext, StatusCode> {
    let user_id: UserId = header_str(headers, USER_ID_HEADER)?
        .parse()
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let role: Role = header_str(headers, USER_ROLE_HEADER)?
        .parse()
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let principal = PrincipalContext::new(user_id, role);
    // Optional; an unreadable or blank name is ignored.
    let name = headers
        .get(USER_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|n| !n.is_empty());
    Ok(match name {
        Some(name) => principal.with_display_name(name),
        None => principal,
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, StatusCode> {
    let value = headers
        .get(name)
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_str()
        .map_err(|_| StatusCode::UNAUTHORIZED)?
        .trim();
    if value.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(id: Option<&str>, role: Option<&str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(id) = id {
            h.insert(USER_ID_HEADER, HeaderValue::from_str(id).unwrap());
        }
        if let Some(role) = role {
            h.insert(USER_ROLE_HEADER, HeaderValue::from_str(role).unwrap());
        }
        h
    }

    #[test]
    fn valid_headers_yield_a_principal() {
        let id = UserId::new();
        let p = extract_principal(&headers(Some(&id.to_string()), Some("Worker"))).unwrap();
        assert_eq!(p.user_id(), id);
        assert_eq!(p.role(), Role::Worker);
    }

    #[test]
    fn display_name_is_optional() {
        let id = UserId::new().to_string();
        let mut h = headers(Some(&id), Some("worker"));
        assert_eq!(extract_principal(&h).unwrap().display_name(), None);

        h.insert(USER_NAME_HEADER, HeaderValue::from_static("  Anna Petrova "));
        assert_eq!(extract_principal(&h).unwrap().display_name(), Some("Anna Petrova"));

        h.insert(USER_NAME_HEADER, HeaderValue::from_static("   "));
        assert_eq!(extract_principal(&h).unwrap().display_name(), None);
    }

    #[test]
    fn missing_or_bad_headers_are_unauthorized() {
        let id = UserId::new().to_string();
        for h in [
            headers(None, Some("manager")),
            headers(Some(&id), None),
            headers(Some("not-a-uuid"), Some("manager")),
            headers(Some(&id), Some("admin")),
            headers(Some(&id), Some("  ")),
        ] {
            assert_eq!(extract_principal(&h), Err(StatusCode::UNAUTHORIZED));
        }
    }
}
