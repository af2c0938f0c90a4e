//! Code for creating the user table, fetching users and updating account settings.
//!
//! Authentication happens elsewhere: callers hand in the [Identity] the
//! identity provider vouched for and get back the matching [User] row.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, risk_profile::RiskProfile};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// An authenticated caller, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The provider's stable identifier for the account.
    pub uid: String,
    /// The account's email address.
    pub email: String,
    /// The name the user chose, if any.
    pub display_name: Option<String>,
}

impl Identity {
    /// Create an identity without a display name.
    pub fn new(uid: &str, email: &str) -> Self {
        Self {
            uid: uid.to_owned(),
            email: email.to_owned(),
            display_name: None,
        }
    }

    /// Set the display name.
    pub fn display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_owned());
        self
    }

    /// The display name, or the part of the email before the `@`.
    fn username(&self) -> &str {
        match &self.display_name {
            Some(name) if !name.trim().is_empty() => name.as_str(),
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The identity provider's ID for the user.
    pub uid: String,
    /// The user's email address.
    pub email: String,
    /// The name shown in the interface.
    pub username: String,
    /// The user's investment risk profile.
    pub risk_profile: RiskProfile,
    /// When the user was first seen.
    pub created_at: OffsetDateTime,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                uid TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL,
                risk_profile TEXT NOT NULL,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Get the user for `identity`, creating them on their first visit.
///
/// New users start with the default [RiskProfile].
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred, e.g. the
/// email already belongs to a different uid.
pub fn get_or_create_user(identity: &Identity, connection: &Connection) -> Result<User, Error> {
    match get_user_by_uid(&identity.uid, connection) {
        Err(Error::NotFound) => {}
        result => return result,
    }

    let user = connection
        .prepare(
            "INSERT INTO user (uid, email, username, risk_profile, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, uid, email, username, risk_profile, created_at",
        )?
        .query_row(
            (
                &identity.uid,
                &identity.email,
                identity.username(),
                RiskProfile::default(),
                OffsetDateTime::now_utc(),
            ),
            map_user_row,
        )?;

    tracing::info!("Created user {} for {}", user.id, user.email);

    Ok(user)
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, uid, email, username, risk_profile, created_at FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user with the identity provider ID `uid`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that uid, or [Error::SqlError]
/// if there was an error trying to access the store.
pub fn get_user_by_uid(uid: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, uid, email, username, risk_profile, created_at FROM user WHERE uid = :uid",
        )?
        .query_row(&[(":uid", &uid)], map_user_row)
        .map_err(|error| error.into())
}

/// Change the risk profile of `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist, or [Error::SqlError]
/// if an SQL related error occurred.
pub fn set_risk_profile(
    user_id: UserID,
    risk_profile: RiskProfile,
    connection: &Connection,
) -> Result<User, Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET risk_profile = ?1 WHERE id = ?2",
        (risk_profile, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::info!("User {user_id} changed their risk profile to {risk_profile}");

    get_user_by_id(user_id, connection)
}

/// Delete `user_id` together with their holdings and transaction history.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist, or [Error::SqlError]
/// if an SQL related error occurred.
pub fn delete_user(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM user WHERE id = ?1", (user_id.as_i64(),))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::info!("Deleted user {user_id}");

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: UserID::new(row.get(0)?),
        uid: row.get(1)?,
        email: row.get(2)?,
        username: row.get(3)?,
        risk_profile: row.get(4)?,
        created_at: row.get(5)?,
    })
}
