use std::{fs, io, path::PathBuf};

use error_stack::{Report, ResultExt};

use crate::{
    domain::credential::Credential,
    ports::credentials::{CredentialStore, CredentialStoreError},
};

/// JSON token cache on local disk. Each call opens and closes the file; there
/// is no locking between concurrent processes.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> error_stack::Result<Option<Credential>, CredentialStoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(Report::new(err).change_context(CredentialStoreError::Read))
                    .attach_printable_lazy(|| format!("Token cache: {}", self.path.display()))
            }
        };

        Credential::decode(&bytes)
            .change_context(CredentialStoreError::Read)
            .attach_printable_lazy(|| format!("Token cache: {}", self.path.display()))
            .map(Some)
    }

    fn save(&self, credential: &Credential) -> error_stack::Result<(), CredentialStoreError> {
        let bytes = credential
            .encode()
            .change_context(CredentialStoreError::Write)?;

        fs::write(&self.path, bytes)
            .change_context(CredentialStoreError::Write)
            .attach_printable_lazy(|| format!("Token cache: {}", self.path.display()))
    }
}
