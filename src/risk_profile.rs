//! The investment risk profile a user picks in their account settings.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::Error;

/// How much risk a user is willing to take with their investments.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    /// Capital preservation first.
    Prudent,
    /// A balance between growth and safety. New users start here.
    #[default]
    #[serde(rename = "équilibré", alias = "equilibre")]
    Equilibre,
    /// Growth first, accepting larger swings in value.
    Dynamique,
}

impl RiskProfile {
    /// Every profile, from least to most risky.
    pub const ALL: [RiskProfile; 3] = [Self::Prudent, Self::Equilibre, Self::Dynamique];

    /// The name stored in the database and shown to users.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prudent => "prudent",
            Self::Equilibre => "équilibré",
            Self::Dynamique => "dynamique",
        }
    }
}

impl Display for RiskProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskProfile {
    type Err = Error;

    /// Parse a profile name, ignoring case and surrounding whitespace.
    /// "equilibre" is accepted for keyboards without accents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prudent" => Ok(Self::Prudent),
            "équilibré" | "equilibre" => Ok(Self::Equilibre),
            "dynamique" => Ok(Self::Dynamique),
            _ => Err(Error::InvalidRiskProfile(s.to_owned())),
        }
    }
}

impl ToSql for RiskProfile {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RiskProfile {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        text.parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::RiskProfile;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("PRUDENT".parse(), Ok(RiskProfile::Prudent));
        assert_eq!(" Dynamique ".parse(), Ok(RiskProfile::Dynamique));
        assert_eq!("Équilibré".parse(), Ok(RiskProfile::Equilibre));
    }

    #[test]
    fn accepts_name_without_accents() {
        assert_eq!("equilibre".parse(), Ok(RiskProfile::Equilibre));
    }

    #[test]
    fn rejects_unknown_name() {
        assert_eq!(
            "aggressive".parse::<RiskProfile>(),
            Err(Error::InvalidRiskProfile("aggressive".to_owned()))
        );
    }

    #[test]
    fn display_round_trips_through_parse() {
        for profile in RiskProfile::ALL {
            assert_eq!(profile.to_string().parse(), Ok(profile));
        }
    }

    #[test]
    fn default_is_balanced() {
        assert_eq!(RiskProfile::default(), RiskProfile::Equilibre);
    }

    #[test]
    fn serializes_as_stored_name() {
        let json = serde_json::to_string(&RiskProfile::Equilibre).unwrap();

        assert_eq!(json, "\"équilibré\"");
    }
}
