use nutype::nutype;
use redb::TypeName;
use std::cmp::Ordering;

/// Identifier of a stored photo. Allocated monotonically by the record store,
/// so comparing two ids compares their insertion order.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
))]
pub struct PhotoId(u64);

/// Identifier of the content record (post) that owns a set of photos.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
))]
pub struct ParentId(u64);

macro_rules! impl_redb_id {
    ($ty:ty, $name:literal) => {
        impl redb::Key for $ty {
            fn compare(data1: &[u8], data2: &[u8]) -> Ordering {
                <u64 as redb::Key>::compare(data1, data2)
            }
        }

        impl redb::Value for $ty {
            type SelfType<'a> = $ty;
            type AsBytes<'a> = [u8; 8];

            fn fixed_width() -> Option<usize> {
                Some(8)
            }

            fn from_bytes<'a>(data: &'a [u8]) -> Self::SelfType<'a>
            where
                Self: 'a,
            {
                let bytes: [u8; 8] = data.try_into().expect("id must be 8 bytes");
                <$ty>::new(u64::from_le_bytes(bytes))
            }

            fn as_bytes<'a, 'b: 'a>(value: &'a Self::SelfType<'b>) -> Self::AsBytes<'a>
            where
                Self: 'b,
            {
                (*value).into_inner().to_le_bytes()
            }

            fn type_name() -> TypeName {
                TypeName::new($name)
            }
        }
    };
}

impl_redb_id!(PhotoId, "gallery::PhotoId");
impl_redb_id!(ParentId, "gallery::ParentId");
