//! The catalog of (category, sub-category) pairs that holdings are recorded against.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::DatabaseId};

/// The categories in the order they are displayed in.
///
/// Categories not in this list are shown after these, in the order they are
/// first encountered.
pub const CATEGORY_DISPLAY_ORDER: [&str; 4] = ["Épargne", "Immobilier", "Actions", "Autres"];

/// The catalog a new database is seeded with.
pub const DEFAULT_CATEGORIES: [(&str, &str); 19] = [
    ("Épargne", "Espèces"),
    ("Épargne", "Livret A/LDDS"),
    ("Épargne", "LEP"),
    ("Épargne", "Livret Jeune"),
    ("Épargne", "PEL/CEL"),
    ("Épargne", "Assurance-Vie"),
    ("Épargne", "PER"),
    ("Épargne", "PEE/PERCO"),
    ("Épargne", "PEA"),
    ("Immobilier", "Immobilier de Jouissance"),
    ("Immobilier", "Immobilier Locatif"),
    ("Immobilier", "SCPI"),
    ("Immobilier", "Crowdfunding Immobilier"),
    ("Actions", "Obligations"),
    ("Actions", "Actions"),
    ("Actions", "Cryptomonnaies"),
    ("Autres", "Private Equity"),
    ("Autres", "Métaux/Métaux Précieux"),
    ("Autres", "Placements Exotiques"),
];

/// A category and sub-category, e.g. "Épargne" / "Livret A/LDDS".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryPair {
    /// The top level classification, e.g. "Épargne".
    pub category: String,
    /// The account or asset within the category, e.g. "LEP".
    pub sub_category: String,
}

impl CategoryPair {
    /// Create a new pair.
    pub fn new(category: &str, sub_category: &str) -> Self {
        Self {
            category: category.to_owned(),
            sub_category: sub_category.to_owned(),
        }
    }
}

impl Display for CategoryPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.category, self.sub_category)
    }
}

/// An entry in the category catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the catalog entry.
    pub id: DatabaseId,
    /// The category name, e.g. "Immobilier".
    pub name: String,
    /// The sub-category name, e.g. "SCPI".
    pub sub_category: String,
}

/// Rank of `category` in [CATEGORY_DISPLAY_ORDER], or `None` for other categories.
pub fn display_rank(category: &str) -> Option<usize> {
    CATEGORY_DISPLAY_ORDER
        .iter()
        .position(|&preferred| preferred == category)
}

/// Create the category table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                sub_category TEXT NOT NULL,
                UNIQUE(name, sub_category)
                )",
        (),
    )?;

    Ok(())
}

/// Insert [DEFAULT_CATEGORIES] if the category table is empty.
///
/// Returns the number of categories inserted.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn seed_default_categories(connection: &Connection) -> Result<usize, Error> {
    let count: i64 = connection.query_row("SELECT COUNT(id) FROM category", [], |row| row.get(0))?;

    if count > 0 {
        return Ok(0);
    }

    let mut statement =
        connection.prepare("INSERT INTO category (name, sub_category) VALUES (?1, ?2)")?;

    for (name, sub_category) in DEFAULT_CATEGORIES {
        statement.execute((name, sub_category))?;
    }

    tracing::info!("Seeded {} default categories", DEFAULT_CATEGORIES.len());

    Ok(DEFAULT_CATEGORIES.len())
}

/// Get every catalog entry, grouped by category in display order.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    let mut categories = connection
        .prepare("SELECT id, name, sub_category FROM category ORDER BY id")?
        .query_map([], map_category_row)?
        .collect::<Result<Vec<_>, _>>()?;

    // Stable sort keeps catalog order within a category.
    categories.sort_by_key(|category| display_rank(&category.name).unwrap_or(usize::MAX));

    Ok(categories)
}

/// Get the distinct category names, in display order.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn get_category_names(connection: &Connection) -> Result<Vec<String>, Error> {
    let mut names: Vec<String> = Vec::new();

    for category in get_all_categories(connection)? {
        if !names.contains(&category.name) {
            names.push(category.name);
        }
    }

    Ok(names)
}

/// Get the ID of the catalog entry for `pair`.
///
/// # Errors
/// This function will return a:
/// - [Error::UnknownCategory] if `pair` is not in the catalog,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_category_id(pair: &CategoryPair, connection: &Connection) -> Result<DatabaseId, Error> {
    connection
        .prepare("SELECT id FROM category WHERE name = ?1 AND sub_category = ?2")?
        .query_row((&pair.category, &pair.sub_category), |row| row.get(0))
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UnknownCategory(pair.clone()),
            error => error.into(),
        })
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        sub_category: row.get(2)?,
    })
}
