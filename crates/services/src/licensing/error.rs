use thiserror::Error;

use crate::dao::DaoError;

#[derive(Debug, Error)]
pub enum LicensingError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Licence is not available")]
    LicenceUnavailable,
    #[error("Licence was offered to another email; revoke that invitation first")]
    InviteeMismatch,
    #[error("Reader already has an active membership")]
    AlreadyMember,
    #[error("Invitation has already been used or revoked")]
    AlreadyUsed,
    #[error("Invitation has expired")]
    Expired,
    #[error("Persistence failure: {0}")]
    Persistence(#[from] DaoError),
}

/// Coarse classification callers map onto their own responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Expired,
    PersistenceFailure,
}

impl LicensingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::LicenceUnavailable
            | Self::InviteeMismatch
            | Self::AlreadyMember
            | Self::AlreadyUsed => ErrorKind::Conflict,
            Self::Expired => ErrorKind::Expired,
            Self::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }

    /// A write conflict on a row another transaction holds means the
    /// licence is being changed underneath us.
    pub(crate) fn from_lock(e: DaoError) -> Self {
        match e {
            DaoError::Conflict(_) => Self::LicenceUnavailable,
            other => Self::Persistence(other),
        }
    }
}

pub type LicensingResult<T> = Result<T, LicensingError>;
