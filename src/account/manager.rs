/// Account manager implementation using runtime queries
use crate::{
    account::{EditProfileRequest, RegisterRequest, User},
    db::{format_timestamp, parse_date, parse_timestamp},
    error::{BookmarksError, BookmarksResult},
    validation::{from_validation_errors, validate_username},
};
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use validator::Validate;

const USER_COLUMNS: &str = r#"
    SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.is_active, u.date_joined,
           p.date_of_birth
    FROM users u
    LEFT JOIN profile p ON p.user_id = u.id
"#;

/// Access token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    jwt_secret: String,
    token_ttl: Duration,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, jwt_secret: String, token_ttl: Duration) -> Self {
        Self {
            db,
            jwt_secret,
            token_ttl,
        }
    }

    /// Register a new user together with an empty profile
    pub async fn register(&self, req: &RegisterRequest) -> BookmarksResult<User> {
        req.validate().map_err(from_validation_errors)?;
        validate_username(&req.username)?;

        if !req.passwords_match() {
            return Err(BookmarksError::Validation("Passwords don't match".to_string()));
        }

        if self.username_exists(&req.username).await? {
            return Err(BookmarksError::Conflict(format!(
                "Username {} already taken",
                req.username
            )));
        }

        if self.email_in_use(&req.email, None).await? {
            return Err(BookmarksError::Conflict("Email already in use.".to_string()));
        }

        let password_hash = hash_password(&req.password)?;
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        let user_id = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, password_hash, is_active, date_joined)
             VALUES (?1, ?2, ?3, '', ?4, 1, ?5)",
        )
        .bind(&req.username)
        .bind(&req.email)
        .bind(&req.first_name)
        .bind(&password_hash)
        .bind(format_timestamp(now))
        .execute(&mut *tx)
        .await
        .map_err(conflict_on_unique)?
        .last_insert_rowid();

        sqlx::query("INSERT INTO profile (user_id) VALUES (?1)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id, username = %req.username, "Registered new user");

        self.get_user(user_id)
            .await?
            .ok_or_else(|| BookmarksError::Internal("Registered user vanished".to_string()))
    }

    /// Authenticate by username or, failing that, by email address
    pub async fn authenticate(&self, identifier: &str, password: &str) -> BookmarksResult<User> {
        let mut row = sqlx::query("SELECT id, password_hash, is_active FROM users WHERE username = ?1")
            .bind(identifier)
            .fetch_optional(&self.db)
            .await?;

        if row.is_none() {
            // Email login only succeeds when the address is unambiguous
            let mut rows = sqlx::query("SELECT id, password_hash, is_active FROM users WHERE email = ?1")
                .bind(identifier)
                .fetch_all(&self.db)
                .await?;
            if rows.len() == 1 {
                row = rows.pop();
            }
        }

        let row = row.ok_or_else(|| BookmarksError::Authentication("Invalid login".to_string()))?;
        let user_id: i64 = row.try_get("id")?;
        let password_hash: String = row.try_get("password_hash")?;
        let is_active: bool = row.try_get("is_active")?;

        if !verify_password(password, &password_hash)? {
            return Err(BookmarksError::Authentication("Invalid login".to_string()));
        }

        if !is_active {
            return Err(BookmarksError::Authorization("Disabled account".to_string()));
        }

        self.get_user(user_id)
            .await?
            .ok_or_else(|| BookmarksError::Authentication("Invalid login".to_string()))
    }

    /// Issue a signed access token for a user
    pub fn issue_token(&self, user_id: i64) -> BookmarksResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// Validate an access token and return the user id it was issued for
    pub fn validate_token(&self, token: &str) -> BookmarksResult<i64> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        data.claims
            .sub
            .parse()
            .map_err(|_| BookmarksError::Authentication("Invalid token subject".to_string()))
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: i64) -> BookmarksResult<Option<User>> {
        let row = sqlx::query(&format!("{} WHERE u.id = ?1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Get an active user by username
    pub async fn get_active_by_username(&self, username: &str) -> BookmarksResult<Option<User>> {
        let row = sqlx::query(&format!(
            "{} WHERE u.username = ?1 AND u.is_active = 1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// List active users
    pub async fn list_active(&self) -> BookmarksResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "{} WHERE u.is_active = 1 ORDER BY u.username",
            USER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    /// Update name, email and date of birth
    pub async fn update_profile(&self, user_id: i64, req: &EditProfileRequest) -> BookmarksResult<User> {
        req.validate().map_err(from_validation_errors)?;

        if self.email_in_use(&req.email, Some(user_id)).await? {
            return Err(BookmarksError::Conflict("Email already in use".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            "UPDATE users SET first_name = ?1, last_name = ?2, email = ?3 WHERE id = ?4",
        )
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(&req.email)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(conflict_on_unique)?
        .rows_affected();

        if updated == 0 {
            return Err(BookmarksError::NotFound(format!("User {} not found", user_id)));
        }

        sqlx::query(
            "INSERT INTO profile (user_id, date_of_birth) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET date_of_birth = excluded.date_of_birth",
        )
        .bind(user_id)
        .bind(req.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_user(user_id)
            .await?
            .ok_or_else(|| BookmarksError::NotFound(format!("User {} not found", user_id)))
    }

    async fn username_exists(&self, username: &str) -> BookmarksResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1")
            .bind(username)
            .fetch_one(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn email_in_use(&self, email: &str, exclude_user: Option<i64>) -> BookmarksResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE email = ?1 AND (?2 IS NULL OR id != ?2)",
        )
        .bind(email)
        .bind(exclude_user)
        .fetch_one(&self.db)
        .await?;
        Ok(count > 0)
    }
}

/// Turn a `UNIQUE` failure on the users table into a conflict.
///
/// The pre-insert checks cannot see a concurrent registration; the constraint can.
fn conflict_on_unique(e: sqlx::Error) -> BookmarksError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            if db.message().contains("users.email") {
                BookmarksError::Conflict("Email already in use.".to_string())
            } else {
                BookmarksError::Conflict("Username already taken".to_string())
            }
        }
        _ => BookmarksError::from(e),
    }
}

fn user_from_row(row: &SqliteRow) -> BookmarksResult<User> {
    let date_of_birth: Option<String> = row.try_get("date_of_birth")?;

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        is_active: row.try_get("is_active")?,
        date_joined: parse_timestamp(&row.try_get::<String, _>("date_joined")?)?,
        date_of_birth: date_of_birth.as_deref().map(parse_date).transpose()?,
    })
}

/// Hash a password using Argon2id
fn hash_password(password: &str) -> BookmarksResult<String> {
    let salt = SaltString::generate(rand::thread_rng());

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BookmarksError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored hash
fn verify_password(password: &str, hash: &str) -> BookmarksResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| BookmarksError::Internal(format!("Invalid password hash format: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
