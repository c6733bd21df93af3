pub use self::glob::GlobPattern;

pub mod glob {
    use std::ops::Deref;

    use ::glob::PatternError;
    use ::serde::{Deserialize, Serialize};

    /// `glob::Pattern` that (de)serializes as its source string.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(try_from = "String", into = "String")]
    pub struct GlobPattern(::glob::Pattern);

    impl GlobPattern {
        pub fn parse(pattern: &str) -> Result<Self, PatternError> {
            ::glob::Pattern::new(pattern).map(Self)
        }
    }

    impl Deref for GlobPattern {
        type Target = ::glob::Pattern;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl TryFrom<String> for GlobPattern {
        type Error = PatternError;

        fn try_from(s: String) -> Result<Self, Self::Error> {
            Self::parse(&s)
        }
    }

    impl From<GlobPattern> for String {
        fn from(p: GlobPattern) -> Self {
            p.0.as_str().to_owned()
        }
    }

}

/// `serialize_with` helpers for report types.
pub mod ser {
    use std::{fmt::Display, time::Duration};

    use nix::sys::signal::Signal;
    use serde::Serializer;

    pub fn duration_as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn signal_name<S: Serializer>(sig: &Signal, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(sig.as_str())
    }

    pub fn display<T: Display, S: Serializer>(v: &T, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(v)
    }
}
