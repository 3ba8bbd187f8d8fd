#![allow(dead_code)]

use gallery_core::GalleryCore;
use gallery_core::types::{AppConfig, Config, ParentId, Photo};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use tempfile::TempDir;

pub fn open_gallery() -> (GalleryCore, TempDir) {
    open_gallery_with(&AppConfig::default())
}

pub fn open_gallery_with(app: &AppConfig) -> (GalleryCore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        base_path: temp_dir.path().to_path_buf(),
    };
    let gallery = GalleryCore::open(config, app).unwrap();
    (gallery, temp_dir)
}

/// Encodes a solid-color PNG; `seed` varies the color so uploads differ.
pub fn png(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([seed, (x % 256) as u8, (y % 256) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn pngs(count: u8) -> Vec<Vec<u8>> {
    (0..count).map(|seed| png(8, 8, seed)).collect()
}

pub fn cover_ids(photos: &[Photo]) -> Vec<gallery_core::types::PhotoId> {
    photos.iter().filter(|p| p.is_cover).map(|p| p.id).collect()
}

pub fn orders(photos: &[Photo]) -> Vec<u32> {
    photos.iter().map(|p| p.order).collect()
}

pub fn post(raw: u64) -> ParentId {
    ParentId::new(raw)
}
