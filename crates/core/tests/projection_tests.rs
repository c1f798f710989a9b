use crate::core::projection::{failure_label, FailureContext, Locale, ShotBoard};
use crate::core::scheduler::TaskEvent;
use crate::core::SdkError;
use crate::types::image::DataUri;
use crate::types::shot::{
    AspectRatio, GenerationMode, GenerationTask, QualityLevel, Shot, ShotId, ShotSpec,
};
use std::sync::Arc;

fn board(n: usize) -> ShotBoard {
    ShotBoard::new(
        (0..n)
            .map(|i| {
                Shot::planned(
                    ShotSpec {
                        description: format!("shot {i}"),
                        visual_style: "Noir".into(),
                        shot_type: "Close-up".into(),
                    },
                    AspectRatio::default(),
                )
            })
            .collect(),
    )
}

fn image(tag: &str) -> DataUri {
    DataUri::from_bytes("image/png", tag.as_bytes())
}

fn event(shot: &Shot, mode: GenerationMode, outcome: Result<DataUri, SdkError>) -> TaskEvent<GenerationTask, DataUri> {
    TaskEvent {
        task: shot.task(QualityLevel::Standard, mode, Arc::from(Vec::new())),
        outcome,
    }
}

fn rate_limited() -> SdkError {
    SdkError::RateLimited {
        retry_after_ms: Some(1000),
        source: None,
    }
}

#[test]
fn labels_distinguish_quota_from_generic_failures() {
    let other = SdkError::other("boom");
    assert_eq!(failure_label(&rate_limited(), FailureContext::Generate, Locale::En), "Quota limited (retry later)");
    assert_eq!(failure_label(&other, FailureContext::Generate, Locale::En), "Generation failed");
    assert_eq!(failure_label(&other, FailureContext::Regenerate, Locale::En), "Retry failed");
    assert_eq!(failure_label(&other, FailureContext::Edit, Locale::En), "Edit failed");
    assert_eq!(failure_label(&rate_limited(), FailureContext::Edit, Locale::ZhCn), "配额受限 (稍后重试)");
    assert_eq!(failure_label(&other, FailureContext::Generate, Locale::ZhCn), "生成失败");
}

#[test]
fn out_of_order_events_resolve_every_shot() {
    let mut board = board(3);
    let shots = board.shots().to_vec();
    assert_eq!(board.pending(), 3);

    assert!(board.apply(&event(&shots[2], GenerationMode::Fresh, Ok(image("c")))));
    assert!(board.apply(&event(&shots[0], GenerationMode::Fresh, Err(rate_limited()))));
    assert!(board.apply(&event(&shots[1], GenerationMode::Fresh, Ok(image("b")))));

    assert_eq!(board.pending(), 0);
    let first = board.get(shots[0].id).unwrap();
    assert_eq!(first.error.as_deref(), Some("Quota limited (retry later)"));
    assert!(first.image_url.is_none());
    let last = board.get(shots[2].id).unwrap();
    assert_eq!(last.image_url, Some(image("c")));
    assert!(last.error.is_none());

    let order: Vec<String> = board.completed_images().map(|(s, _)| s.spec.description.clone()).collect();
    assert_eq!(order, vec!["shot 1".to_string(), "shot 2".to_string()]);
}

#[test]
fn duplicate_and_unknown_events_are_ignored() {
    let mut board = board(1);
    let shot = board.shots()[0].clone();
    assert!(board.apply(&event(&shot, GenerationMode::Fresh, Ok(image("a")))));
    assert!(!board.apply(&event(&shot, GenerationMode::Fresh, Err(SdkError::other("late")))));
    assert_eq!(board.get(shot.id).unwrap().image_url, Some(image("a")));
    assert!(board.get(shot.id).unwrap().error.is_none());

    let stranger = Shot {
        id: ShotId::new(),
        ..shot.clone()
    };
    assert!(!board.apply(&event(&stranger, GenerationMode::Fresh, Ok(image("x")))));
    assert_eq!(board.shots().len(), 1);
}

#[test]
fn failed_regeneration_keeps_previous_image() {
    let mut board = board(1).with_locale(Locale::ZhCn);
    let shot = board.shots()[0].clone();
    board.apply(&event(&shot, GenerationMode::Fresh, Ok(image("v1"))));

    assert!(board.begin(shot.id));
    assert_eq!(board.pending(), 1);
    assert!(board.apply(&event(&shot, GenerationMode::Variation, Err(SdkError::other("x")))));
    let after = board.get(shot.id).unwrap();
    assert_eq!(after.image_url, Some(image("v1")));
    assert_eq!(after.error.as_deref(), Some("重试失败"));

    assert!(board.begin(shot.id));
    assert!(board.get(shot.id).unwrap().error.is_none());
    assert!(board.apply(&event(&shot, GenerationMode::Variation, Ok(image("v2")))));
    assert_eq!(board.get(shot.id).unwrap().image_url, Some(image("v2")));
}

#[test]
fn edit_failure_uses_edit_label() {
    let mut board = board(1);
    let id = board.shots()[0].id;
    assert!(board.resolve(id, &Err(SdkError::malformed("no image payload")), FailureContext::Edit));
    assert_eq!(board.get(id).unwrap().error.as_deref(), Some("Edit failed"));
}

#[test]
fn spec_updates_and_removal() {
    let mut board = board(2);
    let id = board.shots()[0].id;
    let spec = ShotSpec {
        description: "rewritten".into(),
        visual_style: "Pastel".into(),
        shot_type: "Wide Shot".into(),
    };
    assert!(board.update_spec(id, spec.clone()));
    assert_eq!(board.get(id).unwrap().spec, spec);
    assert!(!board.update_spec(ShotId::new(), spec));

    let removed = board.remove(id).unwrap();
    assert_eq!(removed.id, id);
    assert_eq!(board.shots().len(), 1);
    assert!(board.remove(id).is_none());
}
