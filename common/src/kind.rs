//! Macros for defining kind enums.

/// Macro for defining a kind enum.
///
/// Variants are represented as `SCREAMING_SNAKE_CASE` strings everywhere:
/// in [`Display`], [`FromStr`], JSON and database columns. Ordering follows
/// the declaration order.
///
/// The calling crate must depend on [`serde`] and [`strum`] directly, and
/// may enable its own `postgres` feature to get [`postgres_types`]
/// implementations.
///
/// # Example
///
/// ```rust,ignore
/// common::define_kind! {
///     #[doc = "Shape kind."]
///     enum Kind {
///         #[doc = "A cube"]
///         Cube,
///
///         #[doc = "A sphere"]
///         Sphere,
///     }
/// }
/// ```
///
/// [`Display`]: std::fmt::Display
/// [`FromStr`]: std::str::FromStr
/// [`postgres_types`]: https://docs.rs/postgres-types
/// [`serde`]: https://docs.rs/serde
/// [`strum`]: https://docs.rs/strum
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            ::serde::Deserialize,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            ::serde::Serialize,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            $crate::private::strum::IntoStaticStr,
        )]
        #[doc = $doc]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $(
                 #[doc = $variant_doc]
                 $variant,
            )*
        }

        impl $name {
            /// All the variants in their declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Returns the string representation of this value.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                self.into()
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(TEXT, VARCHAR);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &'a [u8],
            ) -> Result<
                $name,
                Box<dyn ::std::error::Error
                    + ::core::marker::Sync
                    + ::core::marker::Send>,
            > {
                let s = <&str as $crate::private::postgres_types::FromSql>
                    ::from_sql(ty, raw)?;
                s.parse::<Self>().map_err(|_| ::std::format!(
                    "invalid `{}` value: {s}",
                    ::core::stringify!($name),
                ).into())
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(TEXT, VARCHAR);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                <&str as $crate::private::postgres_types::ToSql>::to_sql(
                    &self.as_str(),
                    ty,
                    w,
                )
            }
        }
    };
}
