use super::*;

fn gradient_page(w: u32, h: u32) -> PageImage {
    let img = RgbImage::from_fn(w, h, |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 7]));
    PageImage::new(img, 300)
}

#[test]
fn ten_percent_margins_on_square_page() {
    let rect = crop_rect(1000, 1000, &MarginSpec::uniform(0.1)).unwrap();
    assert_eq!(
        rect,
        PixelRect {
            x: 100,
            y: 100,
            width: 800,
            height: 800
        }
    );
}

#[test]
fn zero_margins_return_original_image() {
    let page = gradient_page(37, 53);
    let cropped = extract(&page, &MarginSpec::none()).unwrap();
    assert_eq!(cropped.image, page.image);
    assert_eq!(cropped.rect.x, 0);
    assert_eq!(cropped.rect.y, 0);
}

#[test]
fn crop_takes_pixels_from_the_right_place() {
    let page = gradient_page(100, 200);
    let margins = MarginSpec {
        top: 0.25,
        bottom: 0.0,
        left: 0.1,
        right: 0.3,
    };
    let cropped = extract(&page, &margins).unwrap();
    assert_eq!((cropped.width(), cropped.height()), (60, 150));
    assert_eq!(cropped.image.get_pixel(0, 0), page.image.get_pixel(10, 50));
    assert_eq!(
        cropped.image.get_pixel(59, 149),
        page.image.get_pixel(69, 199)
    );
}

#[test]
fn valid_margins_stay_inside_page_bounds() {
    let sizes = [(1u32, 1u32), (3, 7), (612, 792), (2550, 3300)];
    let fractions = [0.0, 0.05, 0.1, 0.33, 0.49];
    for (w, h) in sizes {
        for &a in &fractions {
            for &b in &fractions {
                let m = MarginSpec {
                    top: a,
                    bottom: b,
                    left: b,
                    right: a,
                };
                match crop_rect(w, h, &m) {
                    Ok(r) => {
                        assert!(r.width > 0 && r.height > 0);
                        assert!(r.right() <= w && r.bottom() <= h);
                    }
                    // Tiny pages can round away to nothing; that must be reported, not cropped.
                    Err(e) => assert!(matches!(e, ReelError::InvalidMargin(_))),
                }
            }
        }
    }
}

#[test]
fn overlapping_margins_are_rejected() {
    let m = MarginSpec {
        top: 0.6,
        bottom: 0.4,
        left: 0.0,
        right: 0.0,
    };
    assert!(matches!(m.validate(), Err(ReelError::InvalidMargin(_))));

    let m = MarginSpec {
        top: 0.0,
        bottom: 0.0,
        left: 0.7,
        right: 0.5,
    };
    assert!(matches!(
        crop_rect(100, 100, &m),
        Err(ReelError::InvalidMargin(_))
    ));
}

#[test]
fn out_of_range_fractions_are_rejected() {
    for bad in [-0.1, 1.0, f64::NAN] {
        let m = MarginSpec {
            top: bad,
            ..MarginSpec::none()
        };
        assert!(matches!(m.validate(), Err(ReelError::InvalidMargin(_))));
    }
}

#[test]
fn rounding_to_empty_rect_is_invalid_margin() {
    // 2px wide page: left rounds to 1, right rounds to 1.
    let m = MarginSpec {
        top: 0.0,
        bottom: 0.0,
        left: 0.45,
        right: 0.45,
    };
    assert!(matches!(
        crop_rect(2, 10, &m),
        Err(ReelError::InvalidMargin(_))
    ));
}
