//! Newtype IDs for type-safe entity references.
//!
//! Numeric entities (accounts, shops, suppliers, listings) use the
//! `define_id!` macro. Receipts and transactions carry string IDs because
//! clones and detached line items synthesize suffixed identifiers
//! (`<id>_omz<n>`, `<id>_<i>`) that live alongside the numeric originals.

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe ID wrapper around `i64`.
///
/// Creates a newtype with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i64 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i64 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <i64 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i64 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Define standard entity IDs
define_id!(AccountId);
define_id!(ShopId);
define_id!(SupplierId);
define_id!(ListingId);

/// Marker placed between an order's root ID and its clone counter.
pub const CLONE_MARKER: &str = "_omz";

/// Order (receipt) identifier.
///
/// Canonical orders have purely numeric IDs assigned by the marketplace.
/// Clones are keyed `<root>_omz<n>`, where `n` is found by probing for the
/// first unused counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(String);

impl ReceiptId {
    /// Wrap a raw ID string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a canonical (purely numeric) marketplace ID.
    ///
    /// Clones and other synthesized IDs are never canonical.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }

    /// The root ID with any clone suffix stripped.
    #[must_use]
    pub fn root(&self) -> &str {
        self.0.split(CLONE_MARKER).next().unwrap_or(&self.0)
    }

    /// Candidate ID for the `n`-th clone of this order's root.
    #[must_use]
    pub fn clone_candidate(&self, n: u32) -> Self {
        Self(format!("{}{CLONE_MARKER}{n}", self.root()))
    }
}

impl std::fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ReceiptId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ReceiptId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Transaction (line item) identifier.
///
/// Detaching a multi-quantity transaction produces unit siblings keyed
/// `<id>_<i>`; cloning synthesizes fresh suffixed IDs from the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wrap a raw ID string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The root ID with any synthesized suffix stripped.
    #[must_use]
    pub fn root(&self) -> &str {
        self.0.split('_').next().unwrap_or(&self.0)
    }

    /// ID of the `i`-th detached unit sibling.
    #[must_use]
    pub fn sibling(&self, i: u32) -> Self {
        Self(format!("{}_{i}", self.0))
    }

    /// Synthesized ID for a cloned transaction, built from the root and a
    /// caller-supplied suffix.
    #[must_use]
    pub fn cloned_with(&self, suffix: &str) -> Self {
        Self(format!("{}_{suffix}", self.root()))
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TransactionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

macro_rules! impl_string_id_pg {
    ($name:ident) => {
        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

impl_string_id_pg!(ReceiptId);
impl_string_id_pg!(TransactionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_ids_are_numeric() {
        assert!(ReceiptId::new("3141592653").is_canonical());
        assert!(!ReceiptId::new("3141592653_omz1").is_canonical());
        assert!(!ReceiptId::new("").is_canonical());
    }

    #[test]
    fn clone_candidate_builds_from_root() {
        let original = ReceiptId::new("123456");
        assert_eq!(original.clone_candidate(1).as_str(), "123456_omz1");

        // Cloning a clone still derives from the root
        let clone = ReceiptId::new("123456_omz2");
        assert_eq!(clone.root(), "123456");
        assert_eq!(clone.clone_candidate(3).as_str(), "123456_omz3");
    }

    #[test]
    fn transaction_siblings_are_suffixed() {
        let id = TransactionId::new("987654");
        assert_eq!(id.sibling(1).as_str(), "987654_1");
        assert_eq!(id.sibling(2).as_str(), "987654_2");
    }

    #[test]
    fn cloned_transaction_id_uses_root() {
        let id = TransactionId::new("987654_1");
        assert_eq!(id.root(), "987654");
        assert_eq!(id.cloned_with("ab12cd34").as_str(), "987654_ab12cd34");
    }
}
