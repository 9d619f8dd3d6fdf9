use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::invalid_margin("x")
            .to_string()
            .contains("invalid margin:")
    );
    assert!(
        ReelError::empty_region("x")
            .to_string()
            .contains("empty region:")
    );
    assert!(
        ReelError::empty_background("x")
            .to_string()
            .contains("empty background:")
    );
    assert!(
        ReelError::page_render(7, "x")
            .to_string()
            .contains("page render error (page 7):")
    );
    assert!(
        ReelError::unreadable_video("x")
            .to_string()
            .contains("unreadable video:")
    );
    assert!(ReelError::encode("x").to_string().contains("encode error:"));
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn only_background_errors_are_fatal() {
    assert!(ReelError::unreadable_video("x").is_fatal());
    assert!(ReelError::empty_background("x").is_fatal());

    assert!(!ReelError::invalid_margin("x").is_fatal());
    assert!(!ReelError::empty_region("x").is_fatal());
    assert!(!ReelError::page_render(1, "x").is_fatal());
    assert!(!ReelError::encode("x").is_fatal());
    assert!(!ReelError::Cancelled.is_fatal());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
