use super::*;
use image::{Rgb, RgbImage};

fn cropped(w: u32, h: u32, px: Rgb<u8>) -> CroppedImage {
    CroppedImage {
        image: RgbImage::from_pixel(w, h, px),
        rect: PixelRect {
            x: 0,
            y: 0,
            width: w,
            height: h,
        },
    }
}

fn plain(scale: f64, bg_opacity: f64) -> StyleParams {
    StyleParams {
        scale,
        bg_opacity,
        contrast: 1.0,
        text_mode: TextMode::Original,
        panel: PanelMode::FullFrame,
    }
}

#[test]
fn square_region_is_fit_and_centered_in_portrait_frame() {
    let region = cropped(800, 800, Rgb([200, 10, 10]));
    let target = Resolution::new(1080, 1920).unwrap();
    let ov = stylize(&region, &plain(0.8, 0.8), target).unwrap();

    assert_eq!(
        ov.content_rect,
        PixelRect {
            x: 108,
            y: 528,
            width: 864,
            height: 864
        }
    );
    assert_eq!(ov.image.dimensions(), (target.width, target.height));
}

#[test]
fn full_frame_panel_alpha_layout() {
    let region = cropped(40, 20, Rgb([255, 255, 255]));
    let target = Resolution::new(100, 200).unwrap();
    let ov = stylize(&region, &plain(0.5, 0.8), target).unwrap();

    let r = ov.content_rect;
    assert_eq!((r.width, r.height), (50, 25));

    // Backdrop everywhere outside the content.
    assert_eq!(*ov.image.get_pixel(0, 0), Rgba([0, 0, 0, 204]));
    assert_eq!(*ov.image.get_pixel(99, 199), Rgba([0, 0, 0, 204]));
    // Content is fully opaque.
    for y in r.y..r.bottom() {
        for x in r.x..r.right() {
            assert_eq!(ov.image.get_pixel(x, y)[3], 255);
        }
    }
}

#[test]
fn padded_panel_leaves_the_rest_transparent() {
    let region = cropped(10, 10, Rgb([255, 255, 255]));
    let target = Resolution::new(100, 100).unwrap();
    let params = StyleParams {
        panel: PanelMode::Padded { padding: 5 },
        ..plain(0.2, 0.5)
    };
    let ov = stylize(&region, &params, target).unwrap();
    let r = ov.content_rect;
    assert_eq!(r, PixelRect { x: 40, y: 40, width: 20, height: 20 });

    assert_eq!(ov.image.get_pixel(0, 0)[3], 0);
    assert_eq!(ov.image.get_pixel(34, 50)[3], 0);
    assert_eq!(*ov.image.get_pixel(35, 50), Rgba([0, 0, 0, 128]));
    assert_eq!(*ov.image.get_pixel(64, 64), Rgba([0, 0, 0, 128]));
    assert_eq!(ov.image.get_pixel(65, 65)[3], 0);
    assert_eq!(ov.image.get_pixel(50, 50)[3], 255);
}

#[test]
fn padding_is_clamped_to_the_canvas() {
    let region = cropped(10, 10, Rgb([1, 2, 3]));
    let target = Resolution::new(20, 20).unwrap();
    let params = StyleParams {
        panel: PanelMode::Padded { padding: 500 },
        ..plain(0.5, 1.0)
    };
    let ov = stylize(&region, &params, target).unwrap();
    assert!(ov.image.pixels().all(|p| p[3] == 255));
}

#[test]
fn empty_region_is_rejected() {
    let region = cropped(0, 10, Rgb([0, 0, 0]));
    let err = stylize(&region, &plain(0.5, 0.5), Resolution::default()).unwrap_err();
    assert!(matches!(err, ReelError::EmptyRegion(_)));
}

#[test]
fn out_of_range_params_are_rejected() {
    let region = cropped(10, 10, Rgb([0, 0, 0]));
    let target = Resolution::new(20, 20).unwrap();
    for params in [
        plain(0.0, 0.5),
        plain(1.5, 0.5),
        plain(0.5, -0.1),
        plain(0.5, 1.1),
        StyleParams {
            contrast: -1.0,
            ..plain(0.5, 0.5)
        },
    ] {
        assert!(matches!(
            stylize(&region, &params, target),
            Err(ReelError::Validation(_))
        ));
    }
}

#[test]
fn stylize_is_deterministic() {
    let img = RgbImage::from_fn(33, 47, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, 99]));
    let region = CroppedImage {
        image: img,
        rect: PixelRect {
            x: 0,
            y: 0,
            width: 33,
            height: 47,
        },
    };
    let target = Resolution::new(64, 96).unwrap();
    let params = StyleParams::default();
    let a = stylize(&region, &params, target).unwrap();
    let b = stylize(&region, &params, target).unwrap();
    assert_eq!(a.image.as_raw(), b.image.as_raw());
}

#[test]
fn downscaled_text_edges_keep_their_color() {
    // Black ink on white paper; with no backdrop the paper becomes fully transparent.
    let img = RgbImage::from_fn(40, 40, |x, _| {
        if x % 5 < 2 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let region = CroppedImage {
        image: img,
        rect: PixelRect {
            x: 0,
            y: 0,
            width: 40,
            height: 40,
        },
    };
    let params = StyleParams {
        scale: 0.37,
        bg_opacity: 0.0,
        contrast: 1.0,
        text_mode: TextMode::Inverted,
        panel: PanelMode::FullFrame,
    };
    let ov = stylize(&region, &params, Resolution::new(100, 100).unwrap()).unwrap();
    let r = ov.content_rect;
    assert_eq!((r.width, r.height), (37, 37));

    let mut edges = 0;
    for y in r.y..r.bottom() {
        for x in r.x..r.right() {
            let p = ov.image.get_pixel(x, y);
            if p[3] > 0 {
                assert_eq!([p[0], p[1], p[2]], [255, 255, 255], "({x}, {y}) {p:?}");
            }
            if p[3] > 0 && p[3] < 255 {
                edges += 1;
            }
        }
    }
    assert!(edges > 0);
}
