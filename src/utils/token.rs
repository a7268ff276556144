use chrono::{ Duration, Utc };
use jsonwebtoken::{ decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation };
use serde::{ Deserialize, Serialize };
use uuid::Uuid;

use crate::errors::{ ErrorMessage, HttpError };

// Constants for token expiration
pub const ACCESS_TOKEN_EXPIRATION: i64 = 15; // 15 minutes

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
    #[serde(default, rename = "isSuperUser")]
    pub is_super_user: bool,
}

pub fn create_token(
    user_id: &str,
    is_super_user: bool,
    secret: &[u8],
    expires_in_minutes: i64
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::minutes(expires_in_minutes)).timestamp() as usize;

    let claims = TokenClaims {
        sub: user_id.to_string(),
        exp,
        iat,
        jti: Uuid::new_v4().to_string(),
        is_super_user,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<TokenClaims, HttpError> {
    decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256)
    )
        .map(|data| data.claims)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))
}
