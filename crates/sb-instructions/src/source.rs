//! CSV-backed instruction source
//!
//! Reading never holds a cursor: each accessor reopens the file and hands back
//! a fresh iterator, so a batch can be replayed from the top at any time.
//! Writing happens only inside [`InstructionSource::write_session`], which
//! owns the file handle for the duration of the closure.

use crate::error::InstructionError;
use sb_models::{
    AddUserInstructionEntry, AssignAdminOwnerInstructionEntry, AssignPhotoInstructionEntry,
    ChangeUserEmailInstructionEntry, DeactivateRemoveUserInstructionEntry, InstructionEntry,
    InviteNewUserInstructionEntry, SingleEmailInstructionEntry,
};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Instruction file on disk
#[derive(Debug)]
pub struct InstructionSource {
    /// Path of the CSV file
    path: PathBuf,
    /// Data rows (lines minus header) counted at open time
    total_instructions: usize,
    /// Live writer, only inside a write session
    writer: Option<csv::Writer<File>>,
}

impl InstructionSource {
    /// Open an existing instruction file and count its rows
    ///
    /// # Errors
    /// - `InstructionError::Io` if the file cannot be opened or read
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, InstructionError> {
        let path = path.into();
        let total_instructions = count_data_rows(&path)?;
        tracing::debug!(
            path = %path.display(),
            total_instructions,
            "Opened instruction file"
        );

        Ok(Self {
            path,
            total_instructions,
            writer: None,
        })
    }

    /// Path of the backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows
    #[inline]
    #[must_use]
    pub fn total_instructions(&self) -> usize {
        self.total_instructions
    }

    /// Whether a write session is active
    #[inline]
    #[must_use]
    pub fn is_writing(&self) -> bool {
        self.writer.is_some()
    }

    /// Truncate the file, write the canonical header and run `f` with rows
    /// appendable through [`Self::add_entry`]
    ///
    /// The writer is flushed and released when `f` returns, whatever it
    /// returned. It is also released if `f` panics. The row count is refreshed afterwards.
    ///
    /// # Errors
    /// - `InstructionError::Io` if the file cannot be created or flushed
    /// - Any error returned by `f`
    pub fn write_session<T, F>(&mut self, f: F) -> Result<T, InstructionError>
    where
        F: FnOnce(&mut Self) -> Result<T, InstructionError>,
    {
        let file = File::create(&self.path)
            .map_err(|e| InstructionError::io_error(&self.path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(AddUserInstructionEntry::FIELDS)?;
        self.writer = Some(writer);

        let mut session = WriteSession { source: self };
        let result = f(&mut *session.source);
        let writer = session.source.writer.take();
        drop(session);

        let released = match writer {
            Some(mut writer) => writer
                .flush()
                .map_err(|e| InstructionError::io_error(&self.path, e)),
            None => Ok(()),
        };

        let value = result?;
        released?;
        self.total_instructions = count_data_rows(&self.path)?;
        Ok(value)
    }

    /// Append one row to the open session
    ///
    /// # Errors
    /// - `InstructionError::TypeMismatch` if `entry` is not the canonical shape
    /// - `InstructionError::NoFileOpened` outside of a write session
    pub fn add_entry<E: InstructionEntry>(&mut self, entry: &E) -> Result<(), InstructionError> {
        if E::KIND != AddUserInstructionEntry::KIND {
            return Err(InstructionError::TypeMismatch {
                expected: AddUserInstructionEntry::KIND,
                actual: E::KIND,
            });
        }
        let writer = self.writer.as_mut().ok_or(InstructionError::NoFileOpened)?;
        writer.serialize(entry)?;
        Ok(())
    }

    /// Fresh iterator over the file, decoded as `E`
    ///
    /// # Errors
    /// - `InstructionError::Io` if the file cannot be opened
    pub fn read_entries<E: InstructionEntry>(&self) -> Result<Entries<E>, InstructionError> {
        let file =
            File::open(&self.path).map_err(|e| InstructionError::io_error(&self.path, e))?;
        let records = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file)
            .into_deserialize::<E>();

        Ok(Entries {
            path: self.path.clone(),
            records,
            failed: false,
        })
    }

    /// Rows for adding users to channels
    ///
    /// # Errors
    /// - `InstructionError::Io` if the file cannot be opened
    pub fn add_to_channel_instructions(
        &self,
    ) -> Result<Entries<AddUserInstructionEntry>, InstructionError> {
        self.read_entries()
    }

    /// Rows for granting admin or owner
    ///
    /// # Errors
    /// - `InstructionError::Io` if the file cannot be opened
    pub fn assign_role_instructions(
        &self,
    ) -> Result<Entries<AssignAdminOwnerInstructionEntry>, InstructionError> {
        self.read_entries()
    }

    /// Rows for deactivating users
    ///
    /// # Errors
    /// - `InstructionError::Io` if the file cannot be opened
    pub fn deactivate_remove_instructions(
        &self,
    ) -> Result<Entries<DeactivateRemoveUserInstructionEntry>, InstructionError> {
        self.read_entries()
    }

    /// Rows for inviting new users
    ///
    /// # Errors
    /// - `InstructionError::Io` if the file cannot be opened
    pub fn invite_new_user_instructions(
        &self,
    ) -> Result<Entries<InviteNewUserInstructionEntry>, InstructionError> {
        self.read_entries()
    }

    /// Rows for changing emails
    ///
    /// # Errors
    /// - `InstructionError::Io` if the file cannot be opened
    pub fn change_email_instructions(
        &self,
    ) -> Result<Entries<ChangeUserEmailInstructionEntry>, InstructionError> {
        self.read_entries()
    }

    /// Rows carrying a single email
    ///
    /// # Errors
    /// - `InstructionError::Io` if the file cannot be opened
    pub fn single_email_instructions(
        &self,
    ) -> Result<Entries<SingleEmailInstructionEntry>, InstructionError> {
        self.read_entries()
    }

    /// Rows for updating photos
    ///
    /// # Errors
    /// - `InstructionError::Io` if the file cannot be opened
    pub fn assign_photo_instructions(
        &self,
    ) -> Result<Entries<AssignPhotoInstructionEntry>, InstructionError> {
        self.read_entries()
    }
}

/// Releases the writer if a session closure unwinds
struct WriteSession<'a> {
    source: &'a mut InstructionSource,
}

impl Drop for WriteSession<'_> {
    fn drop(&mut self) {
        if self.source.writer.take().is_some() {
            tracing::warn!(
                path = %self.source.path.display(),
                "Write session ended without release"
            );
        }
    }
}

/// Lazy sequence of typed rows
///
/// A malformed row is yielded as an error and ends the sequence.
pub struct Entries<E> {
    path: PathBuf,
    records: csv::DeserializeRecordsIntoIter<File, E>,
    failed: bool,
}

impl<E: InstructionEntry> Iterator for Entries<E> {
    type Item = Result<E, InstructionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.records.next()? {
            Ok(entry) => Some(Ok(entry)),
            Err(source) => {
                self.failed = true;
                let line = source.position().map_or(0, csv::Position::line);
                Some(Err(InstructionError::Row {
                    kind: E::KIND,
                    path: self.path.clone(),
                    line,
                    source,
                }))
            }
        }
    }
}

impl<E> std::fmt::Debug for Entries<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entries")
            .field("path", &self.path)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

fn count_data_rows(path: &Path) -> Result<usize, InstructionError> {
    let file = File::open(path).map_err(|e| InstructionError::io_error(path, e))?;
    let mut lines = 0usize;
    for line in BufReader::new(file).lines() {
        line.map_err(|e| InstructionError::io_error(path, e))?;
        lines += 1;
    }
    Ok(lines.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_with(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn counts_rows_minus_header() {
        let file = file_with("user_email,photo_url\na@x.io,u1\nb@x.io,u2\n");
        let source = InstructionSource::open(file.path()).unwrap();
        assert_eq!(source.total_instructions(), 2);
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = InstructionSource::open(dir.path().join("absent.csv"));
        assert!(matches!(result, Err(InstructionError::Io { .. })));
    }

    #[test]
    fn add_entry_outside_session_fails() {
        let file = file_with("");
        let mut source = InstructionSource::open(file.path()).unwrap();
        let entry = AddUserInstructionEntry {
            workspace_name: "HQ".into(),
            workspace_slack_id: "T1".into(),
            channel_name: "general".into(),
            channel_slack_id: "C1".into(),
            user_email: "a@x.io".into(),
            user_slack_id: "U1".into(),
        };
        assert!(matches!(
            source.add_entry(&entry),
            Err(InstructionError::NoFileOpened)
        ));
    }

    #[test]
    fn wrong_shape_is_rejected_even_in_session() {
        let file = file_with("");
        let mut source = InstructionSource::open(file.path()).unwrap();
        let photo = AssignPhotoInstructionEntry {
            user_email: "a@x.io".into(),
            photo_url: "https://img".into(),
        };

        let result = source.write_session(|s| s.add_entry(&photo));
        assert!(matches!(result, Err(InstructionError::TypeMismatch { .. })));
        assert!(!source.is_writing());
    }

    #[test]
    fn panicking_session_still_releases_writer() {
        let file = file_with("");
        let mut source = InstructionSource::open(file.path()).unwrap();

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = source.write_session(|_| -> Result<(), InstructionError> {
                panic!("row builder failed")
            });
        }));

        assert!(unwound.is_err());
        assert!(!source.is_writing());
    }

    #[test]
    fn empty_session_writes_header_only() {
        let file = file_with("stale,contents\n1,2\n");
        let mut source = InstructionSource::open(file.path()).unwrap();

        source.write_session(|s| {
            assert!(s.is_writing());
            Ok(())
        })
        .unwrap();

        assert!(!source.is_writing());
        assert_eq!(source.total_instructions(), 0);
        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written.trim_end(), AddUserInstructionEntry::FIELDS.join(","));
    }
}
