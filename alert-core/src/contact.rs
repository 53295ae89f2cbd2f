//! Emergency contact and wearer name registry.
//!
//! The registry holds the single current contact plus the wearer's display
//! name. Both are replaced as whole values so readers never observe a half
//! updated record, and both persist as independent blobs under fixed keys.

use core::fmt;

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::store::{KeyValueStore, StoreError, load_record, save_record};
use crate::wire::AlertEvent;

/// Maximum byte length of a contact or wearer name.
pub const MAX_NAME_LEN: usize = 64;

/// Maximum number of digits kept from a phone number.
pub const MAX_PHONE_DIGITS: usize = 24;

/// Persisted key for the current emergency contact.
pub const CONTACT_KEY: &str = "emergencyContact";

/// Persisted key for the wearer name.
pub const WEARER_KEY: &str = "wearerName";

/// Name substituted when the wearer has not configured one.
pub const DEFAULT_WEARER_NAME: &str = "the wearer";

const RECORD_SCRATCH: usize = MAX_NAME_LEN + MAX_PHONE_DIGITS + 8;

/// Bounded contact or wearer name.
pub type PersonName = String<MAX_NAME_LEN>;

/// Digits-only phone number.
pub type PhoneNumber = String<MAX_PHONE_DIGITS>;

/// Reasons user input was rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContactError {
    NameTooLong,
    PhoneTooLong,
}

impl fmt::Display for ContactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameTooLong => write!(f, "name exceeds {MAX_NAME_LEN} bytes"),
            Self::PhoneTooLong => write!(f, "phone number exceeds {MAX_PHONE_DIGITS} digits"),
        }
    }
}

/// Person notified when an alert is sent.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    name: PersonName,
    phone_number: PhoneNumber,
}

impl EmergencyContact {
    /// Builds a contact from raw input, trimming the name and keeping only phone digits.
    pub fn new(name: &str, phone: &str) -> Result<Self, ContactError> {
        let name = PersonName::try_from(name.trim()).map_err(|_| ContactError::NameTooLong)?;

        let mut phone_number = PhoneNumber::new();
        for digit in phone.chars().filter(char::is_ascii_digit) {
            phone_number
                .push(digit)
                .map_err(|_| ContactError::PhoneTooLong)?;
        }

        Ok(Self { name, phone_number })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    /// A contact is usable only when it carries a phone number.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.phone_number.trim().is_empty()
    }
}

/// Contact and wearer settings pushed to a screenless device in one record.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContactSettings {
    pub contact: EmergencyContact,
    pub wearer_name: Option<PersonName>,
}

/// Holds the current emergency contact and wearer name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContactRegistry {
    contact: Option<EmergencyContact>,
    wearer_name: Option<PersonName>,
}

impl ContactRegistry {
    /// Creates a registry with nothing configured.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            contact: None,
            wearer_name: None,
        }
    }

    /// Restores the registry from `store`; missing keys leave fields unset.
    pub fn load<S>(store: &S) -> Result<Self, StoreError>
    where
        S: KeyValueStore + ?Sized,
    {
        let mut scratch = [0u8; RECORD_SCRATCH];
        let contact = load_record(store, CONTACT_KEY, &mut scratch)?;
        let wearer_name = load_record(store, WEARER_KEY, &mut scratch)?;
        Ok(Self {
            contact,
            wearer_name,
        })
    }

    /// Writes both fields to `store`, removing keys for unset fields.
    pub fn persist<S>(&self, store: &mut S) -> Result<(), StoreError>
    where
        S: KeyValueStore + ?Sized,
    {
        let mut scratch = [0u8; RECORD_SCRATCH];
        match &self.contact {
            Some(contact) => save_record(store, CONTACT_KEY, contact, &mut scratch)?,
            None => store.remove(CONTACT_KEY)?,
        }
        match &self.wearer_name {
            Some(name) => save_record(store, WEARER_KEY, name, &mut scratch),
            None => store.remove(WEARER_KEY),
        }
    }

    pub fn contact(&self) -> Option<&EmergencyContact> {
        self.contact.as_ref()
    }

    /// Returns the contact only when it can receive an alert.
    pub fn valid_contact(&self) -> Option<&EmergencyContact> {
        self.contact.as_ref().filter(|contact| contact.is_valid())
    }

    pub fn has_valid_contact(&self) -> bool {
        self.valid_contact().is_some()
    }

    /// Replaces the current contact.
    pub fn set_contact(&mut self, contact: EmergencyContact) {
        self.contact = Some(contact);
    }

    pub fn clear_contact(&mut self) {
        self.contact = None;
    }

    /// Sets the wearer name; blank input clears it back to the default.
    pub fn set_wearer_name(&mut self, name: &str) -> Result<(), ContactError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            self.wearer_name = None;
            return Ok(());
        }

        let name = PersonName::try_from(trimmed).map_err(|_| ContactError::NameTooLong)?;
        self.wearer_name = Some(name);
        Ok(())
    }

    /// Returns the configured wearer name or [`DEFAULT_WEARER_NAME`].
    pub fn wearer_name(&self) -> &str {
        self.wearer_name
            .as_deref()
            .unwrap_or(DEFAULT_WEARER_NAME)
    }

    /// Returns `true` when a wearer name has been configured.
    pub fn has_wearer_name(&self) -> bool {
        self.wearer_name.is_some()
    }

    /// Applies a settings record received from the companion.
    pub fn apply(&mut self, settings: ContactSettings) {
        self.contact = Some(settings.contact);
        self.wearer_name = settings.wearer_name.filter(|name| !name.trim().is_empty());
    }

    /// Overwrites the contact from the fields embedded in a received alert.
    ///
    /// Returns `true` when the alert carried a valid contact and the registry
    /// was updated.
    pub fn sync_from(&mut self, event: &AlertEvent) -> bool {
        match EmergencyContact::new(event.contact_name(), event.contact_phone()) {
            Ok(contact) if contact.is_valid() => {
                self.contact = Some(contact);
                true
            }
            _ => false,
        }
    }
}
