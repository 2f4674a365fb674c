use alloc::string::String;
use core::fmt;

/// A component in the path to a value inside a document.
///
/// Paths are sequences of keys or indices (for objects and arrays,
/// respectively). The last component names the slot an edit applies to; the
/// components before it name the container holding that slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathComponent {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathComponent::Key(k) => write!(f, ".{k}"),
            PathComponent::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl From<usize> for PathComponent {
    fn from(i: usize) -> Self {
        PathComponent::Index(i)
    }
}

impl From<&str> for PathComponent {
    fn from(s: &str) -> Self {
        Self::Key(s.into())
    }
}

impl From<String> for PathComponent {
    fn from(s: String) -> Self {
        Self::Key(s)
    }
}

#[doc(hidden)]
pub trait PathComponentFrom<T> {
    fn from_path_component(value: T) -> PathComponent;
}

// use macro_rules to implement for i8..i64, u8..u64, isize, usize
macro_rules! impl_integer_as_path_component {
    ($($t:ty),+) => {
        $(
            impl PathComponentFrom<$t> for PathComponent {
                fn from_path_component(value: $t) -> Self {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    PathComponent::Index(value as usize)
                }
            }
        )+
    };
}
impl_integer_as_path_component!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl PathComponentFrom<&str> for PathComponent {
    fn from_path_component(value: &str) -> Self {
        PathComponent::Key(value.into())
    }
}

impl PathComponentFrom<String> for PathComponent {
    fn from_path_component(value: String) -> Self {
        PathComponent::Key(value)
    }
}

/// Renders a path as `.key[0].other`, for diagnostics.
pub(crate) struct DisplayPath<'a>(pub(crate) &'a [PathComponent]);

impl fmt::Display for DisplayPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$");
        }
        self.0.iter().try_for_each(|c| write!(f, "{c}"))
    }
}
