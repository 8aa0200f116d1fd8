//! Keyword enums: closed sets of string tokens accepted by enumerated keys.

/// A string-valued enum with a fixed token table.
pub trait Keyword: Sized + Copy + 'static {
    const VARIANTS: &'static [(&'static str, Self)];

    fn parse(token: &str) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, v)| *v)
    }

    fn as_str(self) -> &'static str;

    /// Accepted tokens, for error messages: `"row", "column"`.
    fn expected() -> String {
        Self::VARIANTS
            .iter()
            .map(|(name, _)| format!("\"{}\"", name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $token:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $token)]
                $variant,
            )+
        }

        impl $crate::schema::keyword::Keyword for $name {
            const VARIANTS: &'static [(&'static str, Self)] = &[$(($token, $name::$variant)),+];

            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $token,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::schema::keyword::Keyword::as_str(*self))
            }
        }
    };
}

pub(crate) use keyword_enum;
