use redb::TypeName;
pub use v1 as latest_photo;

pub mod v1;

pub trait RecordVariant {
    const VERSION: u8;
}

#[derive(Debug, Clone)]
pub enum VersionedPhoto {
    V1(v1::PhotoRecord),
}

impl VersionedPhoto {
    pub fn into_latest(self) -> latest_photo::PhotoRecord {
        match self {
            VersionedPhoto::V1(v1) => v1,
        }
    }
}

impl redb::Value for VersionedPhoto {
    type SelfType<'a> = VersionedPhoto;
    type AsBytes<'a> = Vec<u8>;

    fn fixed_width() -> Option<usize> {
        None
    }

    fn from_bytes<'a>(data: &'a [u8]) -> Self::SelfType<'a>
    where
        Self: 'a,
    {
        let (version, data) = data.split_first().expect("photo row has no version byte");
        match *version {
            v1::PhotoRecord::VERSION => {
                let v1 = postcard::from_bytes::<v1::PhotoRecord>(data)
                    .expect("photo row payload does not decode");
                VersionedPhoto::V1(v1)
            }
            version => panic!("photo row has unknown version {}", version),
        }
    }

    fn as_bytes<'a, 'b: 'a>(value: &'a Self::SelfType<'b>) -> Self::AsBytes<'a>
    where
        Self: 'b,
    {
        match value {
            VersionedPhoto::V1(v1) => {
                postcard::to_extend(v1, vec![v1::PhotoRecord::VERSION]).unwrap()
            }
        }
    }

    fn type_name() -> TypeName {
        TypeName::new("gallery::Photo")
    }
}
