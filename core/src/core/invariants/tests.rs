use super::*;
use crate::types::StoragePath;

const PARENT: u64 = 42;

fn photo(id: u64, order: u32, is_cover: bool) -> Photo {
    Photo {
        id: PhotoId::new(id),
        parent_id: ParentId::new(PARENT),
        storage_path: StoragePath::try_from(format!("posts/{id}.webp").as_str()).unwrap(),
        is_cover,
        order,
    }
}

fn parent() -> ParentId {
    ParentId::new(PARENT)
}

#[test]
fn empty_set_holds() {
    assert!(holds(parent(), &[]));
}

#[test]
fn single_cover_holds() {
    let photos = [photo(1, 0, false), photo(2, 1, true), photo(3, 2, false)];
    check(parent(), &photos).unwrap();
}

#[test]
fn missing_cover_is_reported() {
    let photos = [photo(1, 0, false), photo(2, 1, false)];
    assert_eq!(
        check(parent(), &photos),
        Err(InvariantViolation::MissingCover { parent: parent() })
    );
}

#[test]
fn two_covers_are_reported() {
    let photos = [photo(1, 0, true), photo(2, 1, true)];
    assert_eq!(
        check(parent(), &photos),
        Err(InvariantViolation::MultipleCovers {
            parent: parent(),
            count: 2
        })
    );
}

#[test]
fn equal_orders_must_follow_insertion() {
    let in_sequence = [photo(1, 0, true), photo(2, 0, false)];
    assert!(holds(parent(), &in_sequence));

    let swapped = [photo(2, 0, true), photo(1, 0, false)];
    assert_eq!(
        check(parent(), &swapped),
        Err(InvariantViolation::OutOfOrder {
            parent: parent(),
            photo: PhotoId::new(1)
        })
    );
}

#[test]
fn gaps_in_order_are_allowed() {
    let photos = [photo(1, 0, true), photo(2, 4, false), photo(3, 9, false)];
    assert!(holds(parent(), &photos));
}

#[test]
fn foreign_photo_is_reported() {
    let mut stranger = photo(2, 1, false);
    stranger.parent_id = ParentId::new(7);
    let photos = [photo(1, 0, true), stranger];

    assert!(matches!(
        check(parent(), &photos),
        Err(InvariantViolation::ForeignPhoto { found, .. }) if found == ParentId::new(7)
    ));
}

#[test]
fn shared_storage_path_is_reported() {
    let mut copy = photo(2, 1, false);
    copy.storage_path = photo(1, 0, true).storage_path;
    let photos = [photo(1, 0, true), copy];

    assert!(matches!(
        check(parent(), &photos),
        Err(InvariantViolation::SharedStoragePath { .. })
    ));
}
