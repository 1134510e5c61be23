//! Decoded station fields

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A field decoded from RDS
///
/// Fields are named after their RDS abbreviations when parsed
/// or displayed.
///
/// ```
/// use rdsdecoder::Field;
///
/// assert_eq!("ps", Field::Name.to_string());
/// assert_eq!(Field::Country, "ecc".parse().unwrap());
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
pub enum Field {
    /// Programme identification (PI) code
    #[strum(serialize = "pi")]
    Identity,

    /// Extended country code (ECC)
    #[strum(serialize = "ecc")]
    Country,

    /// Programme service (PS) name
    #[strum(serialize = "ps")]
    Name,

    /// RadioText (RT)
    #[strum(serialize = "rt")]
    Text,
}

/// A newly-decoded field value
///
/// The block decoder emits a `FieldUpdate` whenever a block
/// yields a value for one of the station fields. Most updates
/// repeat the value already known. Listeners are notified
/// only of updates which change it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldUpdate {
    /// Programme identification code
    Identity(u16),

    /// Extended country code
    Country(u8),

    /// Programme service name, eight characters
    Name(String),

    /// RadioText message, up to 64 characters
    Text(String),
}

impl FieldUpdate {
    /// Which field is updated
    pub fn field(&self) -> Field {
        match self {
            FieldUpdate::Identity(_) => Field::Identity,
            FieldUpdate::Country(_) => Field::Country,
            FieldUpdate::Name(_) => Field::Name,
            FieldUpdate::Text(_) => Field::Text,
        }
    }

    /// Value in its display format
    ///
    /// Codes are printed in hexadecimal. Strings are printed
    /// verbatim.
    pub fn value_string(&self) -> String {
        match self {
            FieldUpdate::Identity(pi) => format_identity(*pi),
            FieldUpdate::Country(ecc) => format_country(*ecc),
            FieldUpdate::Name(s) | FieldUpdate::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for FieldUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = <&'static str>::from(self.field()).to_ascii_uppercase();
        match self {
            FieldUpdate::Identity(_) | FieldUpdate::Country(_) => {
                write!(f, "{} {}", tag, self.value_string())
            }
            FieldUpdate::Name(s) | FieldUpdate::Text(s) => write!(f, "{} \"{}\"", tag, s),
        }
    }
}

/// Format a programme identification code
///
/// ```
/// assert_eq!("C204", rdsdecoder::format_identity(0xc204));
/// ```
pub fn format_identity(pi: u16) -> String {
    format!("{:04X}", pi)
}

/// Format an extended country code
///
/// ```
/// assert_eq!("E1", rdsdecoder::format_country(0xe1));
/// ```
pub fn format_country(ecc: u8) -> String {
    format!("{:02X}", ecc)
}

/// Snapshot of all decoded fields
///
/// Every field is `None` until it is first decoded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DecodedFields {
    /// Programme identification code
    pub identity: Option<u16>,

    /// Extended country code
    pub country: Option<u8>,

    /// Programme service name
    pub service_name: Option<String>,

    /// RadioText message
    pub text: Option<String>,
}

/// Last-known value of each field
///
/// Each field has its own lock. Readers always see a
/// complete value for any one field, but the fields are not
/// updated together.
#[derive(Debug, Default)]
pub(crate) struct FieldStore {
    identity: RwLock<Option<u16>>,
    country: RwLock<Option<u8>>,
    service_name: RwLock<Option<String>>,
    text: RwLock<Option<String>>,
}

impl FieldStore {
    /// Store the `update` if it changes the field
    ///
    /// Returns the update if it was stored, or `None` if the
    /// field already had this exact value.
    pub fn apply(&self, update: FieldUpdate) -> Option<FieldUpdate> {
        let changed = match &update {
            FieldUpdate::Identity(pi) => replace(&self.identity, pi),
            FieldUpdate::Country(ecc) => replace(&self.country, ecc),
            FieldUpdate::Name(ps) => replace(&self.service_name, ps),
            FieldUpdate::Text(rt) => replace(&self.text, rt),
        };
        changed.then_some(update)
    }

    /// Forget all fields
    pub fn clear(&self) {
        *write(&self.identity) = None;
        *write(&self.country) = None;
        *write(&self.service_name) = None;
        *write(&self.text) = None;
    }

    pub fn identity(&self) -> Option<u16> {
        *read(&self.identity)
    }

    pub fn country(&self) -> Option<u8> {
        *read(&self.country)
    }

    pub fn service_name(&self) -> Option<String> {
        read(&self.service_name).clone()
    }

    pub fn text(&self) -> Option<String> {
        read(&self.text).clone()
    }

    pub fn snapshot(&self) -> DecodedFields {
        DecodedFields {
            identity: self.identity(),
            country: self.country(),
            service_name: self.service_name(),
            text: self.text(),
        }
    }
}

// store `value` in `slot` if different; true if stored
fn replace<T>(slot: &RwLock<Option<T>>, value: &T) -> bool
where
    T: PartialEq + Clone,
{
    let mut current = write(slot);
    if current.as_ref() == Some(value) {
        false
    } else {
        *current = Some(value.clone());
        true
    }
}

// a panicking reader or writer cannot leave a field half-written
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
