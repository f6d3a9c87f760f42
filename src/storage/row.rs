//! # Row Management
//!
//! A row is the one fixed record shape the table stores: an id plus two
//! zero-padded fixed-width string fields. The serialized form is exactly
//! [`ROW_SIZE`] bytes and doubles as the on-disk cell value.
use crate::errors::Error;
use std::borrow::Cow;
use std::fmt;

/// Size of the id field (4 bytes, little-endian u32).
pub const ID_SIZE: usize = std::mem::size_of::<u32>();

/// Fixed width of the username field.
pub const USERNAME_SIZE: usize = 32;

/// Fixed width of the email field.
pub const EMAIL_SIZE: usize = 255;

pub const ID_OFFSET: usize = 0;
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// Serialized size of a row: 4 + 32 + 255 = 291 bytes.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// A single table record with fixed-width fields.
///
/// Strings shorter than their field are zero-padded; the padding is part of
/// the on-disk format and is stripped again by the accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,                      // integer primary key
    pub username: [u8; USERNAME_SIZE], // varchar(32)
    pub email: [u8; EMAIL_SIZE],       // varchar(255)
}

impl Row {
    /// Builds a row from user input, rejecting over-long fields.
    ///
    /// # Errors
    /// Returns `Error::StringTooLong` if `username` exceeds 32 bytes or
    /// `email` exceeds 255 bytes.
    pub fn new(id: u32, username: &str, email: &str) -> Result<Self, Error> {
        if username.len() > USERNAME_SIZE || email.len() > EMAIL_SIZE {
            return Err(Error::StringTooLong);
        }
        Ok(Row {
            id,
            username: str_to_fixed_bytes(username),
            email: str_to_fixed_bytes(email),
        })
    }

    /// Username with the zero padding stripped.
    pub fn username(&self) -> Cow<'_, str> {
        trim_padding(&self.username)
    }

    /// Email with the zero padding stripped.
    pub fn email(&self) -> Cow<'_, str> {
        trim_padding(&self.email)
    }

    /// Writes the 291-byte serialized form into `dest`.
    ///
    /// # Errors
    /// Returns `Error::Storage` if `dest` is not exactly [`ROW_SIZE`] bytes.
    pub fn serialize(&self, dest: &mut [u8]) -> Result<(), Error> {
        if dest.len() != ROW_SIZE {
            return Err(err!(
                Storage,
                "row buffer size mismatch (expected={}, got={})",
                ROW_SIZE,
                dest.len()
            ));
        }
        dest[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        dest[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE].copy_from_slice(&self.username);
        dest[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE].copy_from_slice(&self.email);
        Ok(())
    }

    /// Reads a row back from its 291-byte serialized form.
    ///
    /// # Errors
    /// Returns `Error::Storage` if `source` is not exactly [`ROW_SIZE`] bytes.
    pub fn deserialize(source: &[u8]) -> Result<Self, Error> {
        if source.len() != ROW_SIZE {
            return Err(err!(
                Storage,
                "row buffer size mismatch (expected={}, got={})",
                ROW_SIZE,
                source.len()
            ));
        }
        let id_bytes: [u8; ID_SIZE] = source[ID_OFFSET..ID_OFFSET + ID_SIZE]
            .try_into()
            .map_err(|e| err!(Storage, "failed to decode row id: {:?}", e))?;

        let mut username = [0u8; USERNAME_SIZE];
        username.copy_from_slice(&source[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);
        let mut email = [0u8; EMAIL_SIZE];
        email.copy_from_slice(&source[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);

        Ok(Row {
            id: u32::from_le_bytes(id_bytes),
            username,
            email,
        })
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username(), self.email())
    }
}

/// Copies a string into a zero-padded fixed-width field, truncating at `N`.
pub fn str_to_fixed_bytes<const N: usize>(input: &str) -> [u8; N] {
    let mut buf = [0u8; N];
    let bytes = input.as_bytes();
    let len = bytes.len().min(N);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

/// The field is a NUL-terminated fixed-width slot; everything from the first
/// zero byte on is padding.
fn trim_padding(bytes: &[u8]) -> Cow<'_, str> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end])
}
