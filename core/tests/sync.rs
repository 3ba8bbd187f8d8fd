mod common;

use common::{cover_ids, open_gallery, orders, png, pngs, post};
use gallery_core::types::{DesiredState, PhotoId, Upload};
use gallery_core::{BinaryStore, GalleryError};

/// Verify removing the cover and adding a cover upload leaves the upload as the only cover.
#[test]
fn test_sync_remove_and_add_with_cover_upload() {
    let (gallery, _temp) = open_gallery();
    let added = gallery.attach_all(post(1), &pngs(2), 0).unwrap().added;
    let (p1, p2) = (added[0], added[1]);
    let p1_path = gallery.photo(p1).unwrap().unwrap().storage_path;

    let state = DesiredState::keep([p2]).with_upload(Upload::cover(png(8, 8, 9)));
    let outcome = gallery.sync(post(1), &state).unwrap();

    assert_eq!(outcome.removed, vec![p1]);
    assert!(outcome.orphaned.is_empty());
    assert!(!gallery.blobs().file_path(&p1_path).exists());

    let photos = gallery.photos(post(1)).unwrap();
    assert_eq!(photos[0].id, p2);
    assert_eq!(orders(&photos), vec![0, 1]);
    assert!(!photos[0].is_cover);
    assert_eq!(cover_ids(&photos), vec![outcome.added[0]]);
}

/// Verify an explicit cover id moves the cover to a kept photo.
#[test]
fn test_sync_switches_cover() {
    let (gallery, _temp) = open_gallery();
    let added = gallery.attach_all(post(1), &pngs(3), 0).unwrap().added;

    let state = DesiredState::keep(added.clone()).with_cover(added[2]);
    let outcome = gallery.sync(post(1), &state).unwrap();

    assert_eq!(outcome.cover, Some(added[2]));
    assert_eq!(cover_ids(&gallery.photos(post(1)).unwrap()), vec![added[2]]);
}

/// Verify the lowest-order survivor becomes cover when the cover is removed.
#[test]
fn test_sync_repairs_cover_after_removal() {
    let (gallery, _temp) = open_gallery();
    let added = gallery.attach_all(post(1), &pngs(3), 0).unwrap().added;

    gallery
        .sync(post(1), &DesiredState::keep([added[2], added[1]]))
        .unwrap();

    let photos = gallery.photos(post(1)).unwrap();
    assert_eq!(
        photos.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![added[1], added[2]]
    );
    assert_eq!(cover_ids(&photos), vec![added[1]]);
}

/// Verify applying the same state twice changes nothing the second time.
#[test]
fn test_sync_is_idempotent() {
    let (gallery, _temp) = open_gallery();
    let added = gallery.attach_all(post(1), &pngs(3), 2).unwrap().added;
    let state = DesiredState::keep([added[0], added[2]]);

    gallery.sync(post(1), &state).unwrap();
    let before = gallery.photos(post(1)).unwrap();
    gallery.sync(post(1), &state).unwrap();

    assert_eq!(gallery.photos(post(1)).unwrap(), before);
}

/// Verify an upload that fails to decode stops the sync after earlier steps applied.
#[test]
fn test_sync_partial_failure_keeps_applied_steps() {
    let (gallery, _temp) = open_gallery();
    let added = gallery.attach_all(post(1), &pngs(2), 0).unwrap().added;

    let state = DesiredState::keep([added[1]])
        .with_upload(Upload::new(png(8, 8, 5)))
        .with_upload(Upload::new(b"garbage".to_vec()));
    let err = gallery.sync(post(1), &state).unwrap_err();

    assert_eq!(err.upload_index(), Some(1));
    let photos = gallery.photos(post(1)).unwrap();
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0].id, added[1]);
    assert_eq!(orders(&photos), vec![0, 1]);
    assert_eq!(cover_ids(&photos), vec![added[1]]);
    assert!(gallery.photo(added[0]).unwrap().is_none());
}

/// Verify a cover id outside the kept set is rejected up front.
#[test]
fn test_sync_rejects_cover_not_kept() {
    let (gallery, _temp) = open_gallery();
    let added = gallery.attach_all(post(1), &pngs(2), 0).unwrap().added;

    let state = DesiredState::keep([added[0]]).with_cover(added[1]);
    let err = gallery.sync(post(1), &state).unwrap_err();

    assert!(matches!(err, GalleryError::Validation(_)));
    assert_eq!(gallery.photos(post(1)).unwrap().len(), 2);
}

/// Verify photos of other parents are untouched by a sync.
#[test]
fn test_sync_leaves_other_parents_alone() {
    let (gallery, _temp) = open_gallery();
    let mine = gallery.attach_all(post(1), &pngs(2), 0).unwrap().added;
    let theirs = gallery.attach_all(post(2), &pngs(2), 1).unwrap().added;

    gallery
        .sync(post(1), &DesiredState::keep([mine[1], theirs[0]]))
        .unwrap();

    let others = gallery.photos(post(2)).unwrap();
    assert_eq!(others.iter().map(|p| p.id).collect::<Vec<PhotoId>>(), theirs);
    assert_eq!(cover_ids(&others), vec![theirs[1]]);
}

/// Verify a sweep removes blobs no photo references and keeps the rest.
#[test]
fn test_sweep_orphans_removes_unreferenced_blobs() {
    let (gallery, _temp) = open_gallery();
    gallery.attach_all(post(1), &pngs(2), 0).unwrap();
    let stray = gallery_core::types::StoragePath::try_from("posts/stray.webp").unwrap();
    gallery.blobs().put(b"leftover", &stray).unwrap();

    let outcome = gallery.sweep_orphans().unwrap();

    assert_eq!(outcome.orphaned_files_removed, 1);
    assert!(outcome.failed.is_empty());
    assert_eq!(gallery.blobs().list("posts").unwrap().len(), 2);
}
