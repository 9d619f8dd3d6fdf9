use super::*;
use crate::style::overlay::PanelMode;
use crate::style::filter::TextMode;

#[test]
fn defaults_validate() {
    let cfg = PipelineConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.margins, MarginSpec::uniform(0.1));
    assert_eq!(cfg.style.scale, 0.9);
    assert_eq!(cfg.style.bg_opacity, 0.8);
    assert_eq!(cfg.style.contrast, 2.0);
    assert_eq!(cfg.duration_sec, 5.0);
    assert_eq!(cfg.resolution, Resolution::new(1080, 1920).unwrap());
    assert_eq!(cfg.dpi, 300);
    assert!(cfg.workers >= 1);
    assert_eq!(cfg.max_background_bytes(), 4096 << 20);
}

#[test]
fn partial_json_keeps_defaults() {
    let cfg: PipelineConfig = serde_json::from_str(
        r#"{
            "duration_sec": 12.5,
            "margins": { "top": 0.2 },
            "style": { "text_mode": "original", "panel": { "padded": { "padding": 40 } } },
            "resolution": { "width": 720, "height": 1280 }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.duration_sec, 12.5);
    assert_eq!(cfg.margins.top, 0.2);
    assert_eq!(cfg.margins.bottom, 0.1);
    assert_eq!(cfg.style.text_mode, TextMode::Original);
    assert_eq!(cfg.style.panel, PanelMode::Padded { padding: 40 });
    assert_eq!(cfg.style.scale, 0.9);
    assert_eq!(cfg.resolution.width, 720);
    cfg.validate().unwrap();
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(serde_json::from_str::<PipelineConfig>(r#"{ "duraton_sec": 3 }"#).is_err());
    assert!(serde_json::from_str::<PipelineConfig>(r#"{ "style": { "opacity": 1 } }"#).is_err());
}

#[test]
fn from_path_reads_json_file() {
    let dir = std::env::temp_dir().join(format!("pagereel_cfg_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("cfg.json");
    std::fs::write(&path, r#"{ "workers": 2, "chunk_size": 8 }"#).unwrap();
    let cfg = PipelineConfig::from_path(&path).unwrap();
    assert_eq!((cfg.workers, cfg.chunk_size), (2, 8));

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        PipelineConfig::from_path(&path),
        Err(ReelError::Validation(_))
    ));
    assert!(PipelineConfig::from_path(&dir.join("missing.json")).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn validate_rejects_bad_values() {
    let bad = [
        PipelineConfig {
            duration_sec: 0.0,
            ..Default::default()
        },
        PipelineConfig {
            duration_sec: f64::INFINITY,
            ..Default::default()
        },
        PipelineConfig {
            resolution: Resolution {
                width: 1081,
                height: 1920,
            },
            ..Default::default()
        },
        PipelineConfig {
            dpi: 0,
            ..Default::default()
        },
        PipelineConfig {
            workers: 0,
            ..Default::default()
        },
        PipelineConfig {
            chunk_size: 0,
            ..Default::default()
        },
        PipelineConfig {
            max_background_mb: 0,
            ..Default::default()
        },
        PipelineConfig {
            duration_sec: 0.001,
            ..Default::default()
        },
    ];
    for cfg in bad {
        assert!(
            matches!(cfg.validate(), Err(ReelError::Validation(_))),
            "{cfg:?}"
        );
    }

    let margins = PipelineConfig {
        margins: MarginSpec {
            top: 0.6,
            bottom: 0.5,
            left: 0.0,
            right: 0.0,
        },
        ..Default::default()
    };
    assert!(matches!(
        margins.validate(),
        Err(ReelError::InvalidMargin(_))
    ));
}

#[test]
fn odd_resolution_is_fine_for_screenshots_only() {
    let cfg = PipelineConfig {
        resolution: Resolution {
            width: 1081,
            height: 1921,
        },
        screenshots_only: true,
        ..Default::default()
    };
    cfg.validate().unwrap();
    assert_eq!(
        cfg.effective_screenshots_dir(),
        Some(PathBuf::from("screenshots"))
    );
    assert_eq!(PipelineConfig::default().effective_screenshots_dir(), None);
}
