//! [`User`] definitions.

pub mod session;

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use argon2::{
    password_hash::{self, rand_core::OsRng, SaltString},
    Argon2, PasswordHasher as _, PasswordVerifier as _,
};
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::firm;

pub use self::session::Session;

/// Platform user.
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`Name`] of this [`User`].
    pub name: Name,

    /// [`Email`] of this [`User`], used as a login.
    pub email: Email,

    /// [`PasswordHash`] of this [`User`].
    pub password_hash: PasswordHash,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// ID of the [`Firm`] this [`User`] administers, if any.
    ///
    /// [`Firm`]: crate::domain::Firm
    pub firm_id: Option<firm::Id>,

    /// Indicator whether this [`User`] is allowed to act on the platform.
    pub is_active: bool,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

common::define_kind! {
    #[doc = "Role of a [`User`] on the platform."]
    enum Role {
        #[doc = "Platform administrator."]
        Admin,

        #[doc = "Administrator of a single firm."]
        FirmAdmin,

        #[doc = "Independent adjuster handling claims."]
        Adjuster,
    }
}

/// Name of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 256
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Email address of a [`User`].
///
/// Always stored lower-cased, so lookups are case-insensitive.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into().to_lowercase();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex")
        });

        let address = address.as_ref();
        address.len() <= 320 && REGEX.is_match(address)
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Password of a [`User`].
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct Password(String);

impl Password {
    /// Creates a new [`Password`] if the given `password` is valid.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        Self::check(&password).then_some(Self(password))
    }

    /// Checks whether the given `password` is a valid [`Password`].
    fn check(password: impl AsRef<str>) -> bool {
        let password = password.as_ref();
        password.len() >= 8 && password.len() <= 128
    }
}

impl FromStr for Password {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Password`")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Argon2 digest of a [`User`]'s [`Password`] in the PHC string format.
///
/// Carries its own random salt and the hashing parameters.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Computes a new [`PasswordHash`] of the given [`Password`] with a
    /// freshly generated salt.
    ///
    /// # Errors
    ///
    /// If the hashing itself fails.
    pub fn new(password: &Password) -> Result<Self, password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.0.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
    }

    /// Checks whether this [`PasswordHash`] has been computed from the given
    /// [`Password`].
    ///
    /// Malformed hashes match no [`Password`].
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        password_hash::PasswordHash::new(&self.0).is_ok_and(|hash| {
            Argon2::default()
                .verify_password(password.0.as_bytes(), &hash)
                .is_ok()
        })
    }
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::{Email, Password, PasswordHash};

    #[test]
    fn normalizes_email() {
        let email = Email::new("John.Doe@Example.com").unwrap();
        assert_eq!(AsRef::<str>::as_ref(&email), "john.doe@example.com");
        assert!(Email::new("john.doe").is_none());
        assert!(Email::new("john doe@example.com").is_none());
    }

    #[test]
    fn salts_password_hash() {
        let password = Password::new("correct horse").unwrap();

        let hash = PasswordHash::new(&password).unwrap();
        assert!(hash.to_string().starts_with("$argon2id$"));
        assert!(hash.verify(&password));
        assert!(!hash.verify(&Password::new("battery staple").unwrap()));

        let other = PasswordHash::new(&password).unwrap();
        assert_ne!(hash, other);
        assert!(other.verify(&password));
    }

    #[test]
    fn rejects_malformed_password_hash() {
        let password = Password::new("correct horse").unwrap();

        assert!(!PasswordHash("deadbeef".into()).verify(&password));
    }

    #[test]
    fn rejects_short_password() {
        assert!(Password::new("short").is_none());
    }
}
