//! Path-segment rules for names that become folders or files on disk.

use crate::domain::errors::{ExtranetError, ExtranetResult};

/// Folder inside every category directory that holds archived documents.
pub const ARCHIVE_DIR: &str = "archive";

/// Longest name, in bytes, most filesystems accept for one path component.
pub const MAX_SEGMENT_BYTES: usize = 255;

/// Checks that `name` is a single usable path component.
pub fn validate_segment(name: &str, what: &str) -> ExtranetResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ExtranetError::validation(format!("Le nom {what} est vide.")));
    }
    if trimmed == "." || trimmed == ".." {
        return Err(ExtranetError::validation(format!(
            "Le nom {what} n'est pas valide."
        )));
    }
    if name.len() > MAX_SEGMENT_BYTES {
        return Err(ExtranetError::validation(format!(
            "Le nom {what} est trop long ({MAX_SEGMENT_BYTES} octets au plus)."
        )));
    }
    if name.chars().any(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(ExtranetError::validation(format!(
            "Le nom {what} ne doit pas contenir de séparateur de chemin."
        )));
    }
    Ok(())
}

/// Document names additionally may not shadow the archive folder.
pub fn validate_file_name(name: &str) -> ExtranetResult<()> {
    validate_segment(name, "du fichier")?;
    if name.trim().eq_ignore_ascii_case(ARCHIVE_DIR) {
        return Err(ExtranetError::validation(
            "Le nom du fichier n'est pas valide.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        assert!(validate_segment("Résidence Les Tilleuls", "du syndicat").is_ok());
        assert!(validate_file_name("PV AG 2024.pdf").is_ok());
    }

    #[test]
    fn test_rejects_traversal_and_separators() {
        assert!(validate_segment("..", "du syndicat").is_err());
        assert!(validate_segment("a/b", "du syndicat").is_err());
        assert!(validate_segment("a\\b", "du syndicat").is_err());
        assert!(validate_segment("   ", "du syndicat").is_err());
        assert!(validate_file_name("../../etc/passwd").is_err());
    }

    #[test]
    fn test_rejects_archive_file_name() {
        assert!(validate_file_name("Archive").is_err());
        assert!(validate_segment("archive", "de la catégorie").is_ok());
    }

    #[test]
    fn test_rejects_names_over_component_limit() {
        assert!(validate_file_name(&"x".repeat(MAX_SEGMENT_BYTES)).is_ok());
        assert!(matches!(
            validate_file_name(&"x".repeat(MAX_SEGMENT_BYTES + 1)),
            Err(ExtranetError::Validation(_))
        ));
        // 128 two-byte characters exceed the limit in bytes.
        assert!(validate_segment(&"é".repeat(128), "du syndicat").is_err());
    }
}
