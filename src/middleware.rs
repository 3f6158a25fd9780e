use axum::{
    Extension,
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_error::AppError;

/// Claims issued by the identity service. `sub` holds the user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// Verifies HS256 bearer tokens minted by the identity service.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|err| {
                tracing::debug!("Rejected bearer token: {}", err);
                AppError::Unauthorized
            })?;

        Uuid::parse_str(&token_data.claims.sub).map_err(|_| AppError::Unauthorized)
    }
}

/// Resolves the bearer token into the caller's user id and stores it as an
/// `Extension<Uuid>` for the handlers behind this layer.
pub async fn users_authorization(
    Extension(verifier): Extension<JwtVerifier>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let user_id = verifier.verify(token)?;
    req.extensions_mut().insert(user_id);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    fn token(secret: &str, sub: &str, exp: i64) -> String {
        encode(
            &Header::default(),
            &Claims {
                sub: sub.to_string(),
                exp,
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_one_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn accepts_token_signed_with_shared_secret() {
        let user_id = Uuid::new_v4();
        let verifier = JwtVerifier::new("secret");

        let resolved = verifier
            .verify(&token("secret", &user_id.to_string(), in_one_hour()))
            .unwrap();
        assert_eq!(resolved, user_id);
    }

    #[test]
    fn rejects_foreign_signature_and_bad_subjects() {
        let verifier = JwtVerifier::new("secret");

        let forged = token("other", &Uuid::new_v4().to_string(), in_one_hour());
        assert!(matches!(verifier.verify(&forged), Err(AppError::Unauthorized)));

        let not_a_uuid = token("secret", "alice", in_one_hour());
        assert!(matches!(verifier.verify(&not_a_uuid), Err(AppError::Unauthorized)));

        let expired = token("secret", &Uuid::new_v4().to_string(), 1_000);
        assert!(matches!(verifier.verify(&expired), Err(AppError::Unauthorized)));
    }
}
