use nutype::nutype;
use uuid::Uuid;

pub const MAX_STORAGE_PATH_LENGTH: usize = 512;

/// Logical location of a blob inside the binary store, e.g. `posts/<uuid>.webp`.
///
/// Always relative, `/`-separated, and free of `.`/`..` segments so that a
/// store can join it onto its root without escaping it.
#[nutype(
    sanitize(trim),
    validate(
        not_empty,
        len_char_max = MAX_STORAGE_PATH_LENGTH,
        predicate = |path| is_clean_relative(path),
    ),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        AsRef,
        Deref,
        TryFrom,
        Into,
        Hash,
        Display,
        Serialize,
        Deserialize,
    )
)]
pub struct StoragePath(String);

fn is_clean_relative(path: &str) -> bool {
    !path.starts_with('/')
        && !path.contains('\\')
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

impl StoragePath {
    /// Mints a fresh, unique path `{directory}/{uuid}.{extension}`.
    pub fn generate(directory: &str, extension: &str) -> Result<Self, StoragePathError> {
        let directory = directory.trim_matches('/');
        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        if directory.is_empty() {
            Self::try_new(file_name)
        } else {
            Self::try_new(format!("{directory}/{file_name}"))
        }
    }

    pub fn as_str(&self) -> &str {
        let inner: &String = self;
        inner.as_str()
    }

    /// The final path segment.
    pub fn file_name(&self) -> &str {
        self.as_str().rsplit('/').next().unwrap_or_default()
    }
}
