use super::*;

fn limits() -> UploadLimits {
    UploadLimits {
        max_photos: 3,
        max_upload_bytes: 8,
    }
}

fn id(raw: u64) -> PhotoId {
    PhotoId::new(raw)
}

mod desired_state {
    use super::*;

    #[test]
    fn builder_collects_keep_ids_cover_and_uploads() {
        let state = DesiredState::keep([id(2), id(1), id(2)])
            .with_cover(id(1))
            .with_upload(Upload::new(b"a".to_vec()))
            .with_upload(Upload::cover(b"b".to_vec()));

        assert_eq!(state.keep_ids.len(), 2);
        assert_eq!(state.new_cover_id, Some(id(1)));
        assert_eq!(state.incoming.len(), 2);
        assert!(!state.incoming[0].is_cover);
        assert!(state.incoming[1].is_cover);
    }

    #[test]
    fn empty_state_is_valid() {
        DesiredState::default().validate(&limits()).unwrap();
    }

    #[test]
    fn rejects_cover_outside_keep_ids() {
        let state = DesiredState::keep([id(1)]).with_cover(id(9));
        assert_eq!(
            state.validate(&limits()),
            Err(ValidationError::CoverNotKept(id(9)))
        );
    }

    #[test]
    fn rejects_two_uploads_marked_cover() {
        let state = DesiredState::default()
            .with_upload(Upload::cover(b"a".to_vec()))
            .with_upload(Upload::new(b"b".to_vec()))
            .with_upload(Upload::cover(b"c".to_vec()));
        assert_eq!(
            state.validate(&limits()),
            Err(ValidationError::MultipleCoverUploads {
                first: 0,
                second: 2
            })
        );
    }

    #[test]
    fn rejects_too_many_uploads() {
        let mut state = DesiredState::default();
        for _ in 0..4 {
            state = state.with_upload(Upload::new(b"x".to_vec()));
        }
        assert_eq!(
            state.validate(&limits()),
            Err(ValidationError::TooManyUploads { count: 4, max: 3 })
        );
    }

    #[test]
    fn rejects_oversized_upload_with_its_index() {
        let state = DesiredState::default()
            .with_upload(Upload::new(b"ok".to_vec()))
            .with_upload(Upload::new(vec![0u8; 9]));
        assert_eq!(
            state.validate(&limits()),
            Err(ValidationError::UploadTooLarge {
                index: 1,
                size: 9,
                max: 8
            })
        );
    }
}

mod uploads {
    use super::*;

    #[test]
    fn accepts_cover_index_in_range() {
        let uploads = [b"a".to_vec(), b"b".to_vec()];
        validate_uploads(&uploads, 1, &limits()).unwrap();
    }

    #[test]
    fn rejects_cover_index_out_of_range() {
        let uploads = [b"a".to_vec(), b"b".to_vec()];
        assert_eq!(
            validate_uploads(&uploads, 2, &limits()),
            Err(ValidationError::CoverIndexOutOfRange { index: 2, count: 2 })
        );
    }

    #[test]
    fn empty_list_ignores_cover_index() {
        let uploads: [Vec<u8>; 0] = [];
        validate_uploads(&uploads, 5, &limits()).unwrap();
    }

    #[test]
    fn rejects_empty_upload() {
        let uploads = [b"a".to_vec(), Vec::new()];
        assert_eq!(
            validate_uploads(&uploads, 0, &limits()),
            Err(ValidationError::EmptyUpload { index: 1 })
        );
    }
}
