use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Key of a document inside a search-index namespace.
pub type DocId = i64;

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(i32);

        impl $name {
            pub const fn new(value: i32) -> Self {
                Self(value)
            }

            pub fn into_inner(self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value.into_inner()
            }
        }

        impl From<$name> for DocId {
            fn from(value: $name) -> Self {
                DocId::from(value.0)
            }
        }

        impl TryFrom<DocId> for $name {
            type Error = std::num::TryFromIntError;

            fn try_from(value: DocId) -> Result<Self, Self::Error> {
                i32::try_from(value).map(Self)
            }
        }
    };
}

define_id_type!(UserId);
define_id_type!(ProblemId);
