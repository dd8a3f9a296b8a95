//! # Account Sheets
//!
//! Bulk provisioning reads a CSV sheet with one account per row:
//!
//! ```text
//! Civilite,Nom,Prénom,Email,Copropriété(s),Rôle
//! Mme,Durand,Alice,alice@example.fr,[Les Tilleuls;Le Parc],Copropriétaire
//! ```
//!
//! The `Copropriété(s)` cell is a bracketed, `;`-separated list of syndicat
//! names. Validation stops at the first faulty row, like a human reading the
//! sheet top to bottom would.
//!
//! The export goes the other way: `;`-delimited, BOM-prefixed so spreadsheet
//! software opens it as UTF-8.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::domain::dates::format_export;
use crate::domain::entities::{Civilite, Role, User};
use crate::domain::errors::{ExtranetError, ExtranetResult};

/// Column labels, in sheet order.
pub const SHEET_COLUMNS: [&str; 6] = ["Civilite", "Nom", "Prénom", "Email", "Copropriété(s)", "Rôle"];

const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Civilite", default)]
    civilite: String,
    #[serde(rename = "Nom", default)]
    surname: String,
    #[serde(rename = "Prénom", default)]
    first_name: String,
    #[serde(rename = "Email", default)]
    email: String,
    #[serde(rename = "Copropriété(s)", default)]
    syndicats: String,
    #[serde(rename = "Rôle", default)]
    role: String,
}

impl RawRow {
    fn cells(&self) -> [&str; 6] {
        [
            &self.civilite,
            &self.surname,
            &self.first_name,
            &self.email,
            &self.syndicats,
            &self.role,
        ]
    }
}

/// A validated sheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    pub civilite: Option<Civilite>,
    pub surname: String,
    pub first_name: String,
    pub email: String,
    pub syndicats: Vec<String>,
    pub role: Role,
}

/// Splits a `[A;B]` cell into its syndicat names.
pub fn split_syndicat_cell(cell: &str) -> Vec<String> {
    let cell = cell.trim();
    let inner = cell.strip_prefix('[').unwrap_or(cell);
    let inner = inner.strip_suffix(']').unwrap_or(inner);

    inner
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses and validates an account sheet against the active syndicat names.
pub fn parse_account_sheet(
    bytes: &[u8],
    active_syndicats: &HashSet<String>,
) -> ExtranetResult<Vec<AccountRow>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| ExtranetError::validation("Le fichier doit être encodé en UTF-8."))?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<RawRow>().enumerate() {
        let line = index + 1;
        let raw = record?;

        for (cell, label) in raw.cells().iter().zip(SHEET_COLUMNS) {
            if cell.is_empty() {
                return Err(ExtranetError::validation(format!(
                    "La cellule est vide à la ligne {line} colonne {label}"
                )));
            }
        }

        if !raw.email.contains('@') {
            return Err(ExtranetError::validation(format!(
                "La cellule à la ligne {line} n'est pas une adresse mail valide"
            )));
        }

        let syndicats = split_syndicat_cell(&raw.syndicats);
        if let Some(unknown) = syndicats.iter().find(|s| !active_syndicats.contains(*s)) {
            return Err(ExtranetError::validation(format!(
                "La cellule à la ligne {line} contient des syndicats non référencés (vérifiez l'orthographe de {unknown})"
            )));
        }

        rows.push(AccountRow {
            civilite: raw.civilite.parse().ok(),
            surname: raw.surname,
            first_name: raw.first_name,
            email: raw.email,
            syndicats,
            role: Role::from_sheet_label(&raw.role),
        });
    }

    Ok(rows)
}

/// Emails that appear more than once in the sheet (case-insensitive), sorted.
pub fn duplicate_emails(rows: &[AccountRow]) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.email.trim().to_lowercase()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(email, _)| email)
        .collect()
}

/// Blank sheet offered to administrators.
pub fn template_csv() -> String {
    let mut out = SHEET_COLUMNS.join(",");
    out.push('\n');
    out.push_str("Mme,Durand,Alice,alice.durand@example.fr,[Résidence A;Résidence B],Copropriétaire\n");
    out
}

/// Export of every account, one line per user.
pub fn export_csv(users: &[(User, Vec<String>)]) -> ExtranetResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::from(UTF8_BOM.as_bytes()));

    writer.write_record([
        "user_id",
        "email",
        "first_login",
        "civilite",
        "surname",
        "first_name",
        "role",
        "last_logged_in",
        "login_counter",
        "update_date",
        "creation_date",
        "syndicats",
    ])?;

    for (user, syndicats) in users {
        writer.write_record([
            user.user_id.to_string(),
            user.email.clone(),
            user.first_login.to_string(),
            user.civilite.map(|c| c.as_str().to_string()).unwrap_or_default(),
            user.surname.clone(),
            user.first_name.clone(),
            user.role.as_str().to_string(),
            format_export(user.last_logged_in),
            user.login_counter.to_string(),
            format_export(Some(user.update_date)),
            format_export(Some(user.creation_date)),
            syndicats.join("; "),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExtranetError::Internal(format!("csv flush failed: {e}")))
}
