//! Cleanup of rendered PDF and spreadsheet files kept on local disk

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::collaborators::DerivedFileCoordinator;
use crate::error::ArtefactError;
use crate::metadata::{ArtefactId, Language, ListType};

/// Removes `<id>.pdf`, `<id>_cy.pdf` and `<id>.xlsx` from a directory
#[derive(Debug, Clone)]
pub struct FileSystemDerivedFiles {
    directory: PathBuf,
}

impl FileSystemDerivedFiles {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File names rendered for an artefact of this list type and language
    pub fn file_names(id: ArtefactId, list_type: ListType, language: Language) -> Vec<String> {
        let mut names = Vec::with_capacity(3);
        match language {
            Language::English => names.push(format!("{}.pdf", id)),
            Language::Welsh => names.push(format!("{}_cy.pdf", id)),
            Language::Bilingual => {
                names.push(format!("{}.pdf", id));
                names.push(format!("{}_cy.pdf", id));
            }
        }
        if list_type.has_spreadsheet() {
            names.push(format!("{}.xlsx", id));
        }
        names
    }
}

impl DerivedFileCoordinator for FileSystemDerivedFiles {
    fn remove(&self, id: ArtefactId, list_type: ListType, language: Language) -> Result<(), ArtefactError> {
        let mut removed = 0;
        for name in Self::file_names(id, list_type, language) {
            let path = self.directory.join(&name);
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("Derived file {} already absent", path.display());
                }
                Err(e) => {
                    return Err(ArtefactError::Collaborator(format!(
                        "failed to remove derived file {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
        info!("Removed {} derived files for artefact {}", removed, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_names_follow_language_and_list_type() {
        let id = ArtefactId(7);
        assert_eq!(
            FileSystemDerivedFiles::file_names(id, ListType::CrownDailyList, Language::English),
            vec!["7.pdf"]
        );
        assert_eq!(
            FileSystemDerivedFiles::file_names(id, ListType::CrownDailyList, Language::Welsh),
            vec!["7_cy.pdf"]
        );
        assert_eq!(
            FileSystemDerivedFiles::file_names(id, ListType::SjpPressList, Language::Bilingual),
            vec!["7.pdf", "7_cy.pdf", "7.xlsx"]
        );
    }

    #[test]
    fn test_remove_deletes_existing_files_and_tolerates_missing_ones() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("3.pdf"), b"pdf").unwrap();
        fs::write(dir.path().join("3.xlsx"), b"xlsx").unwrap();
        fs::write(dir.path().join("4.pdf"), b"other").unwrap();

        let derived = FileSystemDerivedFiles::new(dir.path());
        derived
            .remove(ArtefactId(3), ListType::SjpPressList, Language::Bilingual)
            .unwrap();

        assert!(!dir.path().join("3.pdf").exists());
        assert!(!dir.path().join("3.xlsx").exists());
        assert!(dir.path().join("4.pdf").exists());

        // a second pass finds nothing left and still succeeds
        derived
            .remove(ArtefactId(3), ListType::SjpPressList, Language::Bilingual)
            .unwrap();
    }
}
