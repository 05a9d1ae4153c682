//! Persistence for users and accounts.
//!
//! Queries are plain SQL with bind parameters; every statement runs inside a
//! `db.query` span so request traces show the statements they executed.

use anyhow::{anyhow, Context, Result};
use sqlx::{postgres::PgRow, PgPool, Postgres, Row, Transaction};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::models::{Account, Role, User};

const USER_COLUMNS: &str = "id, email, firstname, lastname, card_number, phone, \
     role, secret_hash, confirmed, account_id";

/// Outcome of an account insert: the unique email constraint turns races into
/// a explicit duplicate signal instead of a generic error.
#[derive(Debug)]
pub enum CreateAccountOutcome {
    Created(Uuid),
    DuplicateEmail,
}

/// Users carry two unique columns (`email`, `card_number`); the violated
/// constraint name tells them apart so callers can report the right field.
#[derive(Debug)]
pub enum CreateUserOutcome {
    Created(Uuid),
    DuplicateEmail,
    DuplicateCardNumber,
}

/// Fields required to register a new directory entry.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub firstname: &'a str,
    pub lastname: &'a str,
    pub card_number: Option<&'a str>,
    pub phone: &'a str,
    pub role: Role,
    pub secret_hash: Option<&'a str>,
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.get("role");
    let role = Role::parse(&role).ok_or_else(|| anyhow!("unknown role in directory: {role}"))?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        firstname: row.get("firstname"),
        lastname: row.get("lastname"),
        card_number: row.get("card_number"),
        phone: row.get("phone"),
        role,
        secret_hash: row.get("secret_hash"),
        confirmed: row.get("confirmed"),
        account_id: row.get("account_id"),
    })
}

fn account_from_row(row: &PgRow) -> Account {
    Account {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        registered: row.get("registered"),
        reserved: row.get("reserved"),
        deleted: row.get("deleted"),
    }
}

/// Look up a user by email. Absence is `Ok(None)`, never an error.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    row.as_ref().map(user_from_row).transpose()
}

/// Flip the confirmation flag. Idempotent: confirming twice is a no-op.
pub async fn mark_confirmed(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = "UPDATE users SET confirmed = TRUE WHERE id = $1";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to mark user confirmed")?;

    Ok(())
}

pub async fn insert_user(pool: &PgPool, user: &NewUser<'_>) -> Result<CreateUserOutcome> {
    let query = r"
        INSERT INTO users (email, firstname, lastname, card_number, phone, role, secret_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user.email)
        .bind(user.firstname)
        .bind(user.lastname)
        .bind(user.card_number)
        .bind(user.phone)
        .bind(user.role.as_str())
        .bind(user.secret_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(CreateUserOutcome::Created(row.get("id"))),
        Err(err) if is_unique_violation(&err) => {
            if unique_constraint(&err) == Some("users_card_number_key") {
                Ok(CreateUserOutcome::DuplicateCardNumber)
            } else {
                Ok(CreateUserOutcome::DuplicateEmail)
            }
        }
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Store a freshly hashed personal secret for a user.
pub async fn set_user_secret(pool: &PgPool, user_id: Uuid, secret_hash: &str) -> Result<()> {
    let query = "UPDATE users SET secret_hash = $2 WHERE id = $1";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(secret_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update user secret")?;

    Ok(())
}

/// Insert a new account row inside the caller's transaction.
pub async fn insert_account(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
    password_hash: &str,
) -> Result<CreateAccountOutcome> {
    let query = r"
        INSERT INTO accounts (email, password_hash)
        VALUES ($1, $2)
        RETURNING id
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut **tx)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(CreateAccountOutcome::Created(row.get("id"))),
        Err(err) if is_unique_violation(&err) => Ok(CreateAccountOutcome::DuplicateEmail),
        Err(err) => Err(err).context("failed to insert account"),
    }
}

/// Link an account to a user, compare-and-swap style: only succeeds if the
/// user has no account yet. Returns false when a concurrent bind won.
pub async fn link_account(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    account_id: Uuid,
) -> Result<bool> {
    let query = "UPDATE users SET account_id = $2 WHERE id = $1 AND account_id IS NULL";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(account_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to link account to user")?;

    Ok(result.rows_affected() == 1)
}

pub async fn find_account_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Account>> {
    let query = r"
        SELECT id, email, password_hash, registered, reserved, deleted
        FROM accounts
        WHERE id = $1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by id")?;

    Ok(row.as_ref().map(account_from_row))
}

/// Overwrite the stored password hash on an existing account.
pub async fn update_account_password(
    pool: &PgPool,
    account_id: Uuid,
    password_hash: &str,
) -> Result<()> {
    let query = "UPDATE accounts SET password_hash = $2 WHERE id = $1";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update account password")?;

    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn unique_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}
