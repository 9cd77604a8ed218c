// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, User},
    services::validation::normalize_email,
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    jwt_expiration_days: i64,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, jwt_expiration_days: i64) -> Self {
        Self { user_repo, jwt_secret, jwt_expiration_days }
    }

    /// Cadastra o usuário e devolve um token. O primeiro usuário do sistema vira administrador.
    pub async fn register_user(&self, name: &str, email: &str, password: &str) -> Result<String, AppError> {
        let email = normalize_email(email);
        let hashed_password = hash_password(password).await?;

        let mut tx = self.user_repo.pool().begin().await?;

        self.user_repo.lock_for_registration(&mut *tx).await?;
        let existing_users = self.user_repo.count_users(&mut *tx).await?;
        let new_user = self.user_repo
            .create_user(&mut *tx, name.trim(), &email, &hashed_password, existing_users == 0)
            .await?;

        tx.commit().await?;

        tracing::info!("👤 Usuário {} cadastrado (admin: {}).", new_user.email, new_user.is_admin);
        self.create_token(new_user.id)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self.user_repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    pub async fn change_password(&self, user: &User, current: &str, new_password: &str) -> Result<(), AppError> {
        if !verify_password(current, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let hashed = hash_password(new_password).await?;
        self.user_repo.update_password(user.id, &hashed).await?;

        tracing::info!("🔑 Senha alterada para {}.", user.email);
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.user_repo.list_users().await
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_claims(token)?;

        // Token de usuário removido não autentica mais
        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(self.jwt_expiration_days);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

// bcrypt é caro: roda fora do executor assíncrono
async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(valid)
}
