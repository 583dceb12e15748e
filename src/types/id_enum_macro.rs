/// Declares a string-backed identifier enum with a `Custom(String)` fallback.
///
/// Known variants serialize to their wire name; anything else round-trips
/// through `Custom`, so externally defined transformers can introduce new
/// identifiers without code changes.
#[macro_export]
macro_rules! define_id_enum {
    (
        $(#[$enum_meta:meta])*
        $enum_name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $wire_name:literal $( | $alias:literal )*
            ),* $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $enum_name {
            $(
                $(#[$variant_meta])*
                $variant,
            )*
            Custom(String),
        }

        impl serde::Serialize for $enum_name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $enum_name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from_name(&s))
            }
        }

        impl $enum_name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(
                        Self::$variant => $wire_name,
                    )*
                    Self::Custom(name) => name.as_str(),
                }
            }

            /// Resolves a wire name or alias, falling back to `Custom`.
            pub fn from_name(name: &str) -> Self {
                match name {
                    $(
                        $wire_name $(| $alias)* => Self::$variant,
                    )*
                    _ => Self::Custom(name.to_string()),
                }
            }

            pub fn is_custom(&self) -> bool {
                matches!(self, Self::Custom(_))
            }

            pub fn all_variants() -> &'static [Self] {
                &[
                    $(
                        Self::$variant,
                    )*
                ]
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<&str> for $enum_name {
            fn from(name: &str) -> Self {
                Self::from_name(name)
            }
        }
    };
}
