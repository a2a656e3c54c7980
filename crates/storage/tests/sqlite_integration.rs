use chrono::Duration;
use lesson_core::model::{
    Challenge, ChallengeId, ChallengeKind, ChallengeOption, ContentError, LearnerProfile, Lesson,
    LessonCompletion, LessonId, MAX_HEARTS, OptionId, UserId,
};
use lesson_core::time::fixed_now;
use storage::repository::{
    LessonRecord, LessonRepository, ProfileRepository, ProgressRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

fn sample_lesson(id: u64) -> Lesson {
    Lesson::new(
        LessonId::new(id),
        "Greetings",
        vec![
            Challenge::new(ChallengeId::new(1), ChallengeKind::Select, "Hello?").with_options(
                vec![
                    ChallengeOption::new(OptionId::new(1), "Dumêla", true),
                    ChallengeOption::new(OptionId::new(2), "Tsamaya", false),
                ],
            ),
            Challenge::new(ChallengeId::new(2), ChallengeKind::Match, "Match").with_options(vec![
                ChallengeOption::new(OptionId::new(3), "Man", true).with_image("rra"),
                ChallengeOption::new(OptionId::new(4), "Woman", true).with_image("mma"),
            ]),
            Challenge::new(ChallengeId::new(3), ChallengeKind::ListenType, "Type it")
                .with_audio("/audio/x.mp3")
                .with_correct_text("Ke lapile"),
        ],
    )
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrips_lesson_content() {
    let repo = connect("memdb_lesson_roundtrip").await;
    let lesson = sample_lesson(1);
    repo.upsert_lesson(&LessonRecord::from_lesson(&lesson))
        .await
        .unwrap();

    let fetched = repo
        .get_lesson(UserId::new(1), LessonId::new(1))
        .await
        .expect("fetch")
        .into_lesson()
        .expect("valid content");
    assert_eq!(fetched, lesson);

    // Re-upserting replaces challenges instead of duplicating them.
    let mut shorter = lesson.clone();
    shorter.challenges.truncate(1);
    repo.upsert_lesson(&LessonRecord::from_lesson(&shorter))
        .await
        .unwrap();
    let fetched = repo
        .get_lesson(UserId::new(1), LessonId::new(1))
        .await
        .unwrap();
    assert_eq!(fetched.challenges.len(), 1);
}

#[tokio::test]
async fn sqlite_keeps_unknown_kind_until_conversion() {
    let repo = connect("memdb_unknown_kind").await;
    let mut record = LessonRecord::from_lesson(&sample_lesson(2));
    record.challenges[0].kind = "DRAG_DROP".into();
    repo.upsert_lesson(&record).await.unwrap();

    let fetched = repo
        .get_lesson(UserId::new(1), LessonId::new(2))
        .await
        .unwrap();
    let err = fetched.into_lesson().unwrap_err();
    assert!(matches!(err, ContentError::UnsupportedChallengeType { .. }));
}

#[tokio::test]
async fn sqlite_missing_lesson_is_not_found() {
    let repo = connect("memdb_missing_lesson").await;
    let err = repo
        .get_lesson(UserId::new(1), LessonId::new(404))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_completion_updates_progress_profile_and_streak() {
    let repo = connect("memdb_completion").await;
    let user = UserId::new(9);
    repo.upsert_lesson(&LessonRecord::from_lesson(&sample_lesson(3)))
        .await
        .unwrap();
    repo.upsert_profile(&LearnerProfile::new(user)).await.unwrap();

    let completion = LessonCompletion {
        lesson_id: LessonId::new(3),
        hearts_used: 2,
        points_earned: 10,
    };
    let progress = repo
        .complete_lesson(user, &completion, fixed_now())
        .await
        .expect("complete");
    assert!(progress.is_completed());

    let stored = repo
        .lesson_progress(user, LessonId::new(3))
        .await
        .unwrap()
        .expect("progress row");
    assert_eq!(stored.hearts_used(), 2);
    assert_eq!(stored.points_earned(), 10);

    // Next-day replay: metrics overwritten, rewards accumulate, streak grows.
    let replay = LessonCompletion {
        hearts_used: 0,
        ..completion
    };
    repo.complete_lesson(user, &replay, fixed_now() + Duration::days(1))
        .await
        .unwrap();

    let profile = repo.get_profile(user).await.unwrap();
    assert_eq!(profile.xp, 20);
    assert_eq!(profile.points, 20);
    assert_eq!(profile.streak.count, 2);
    assert_eq!(profile.streak.longest, 2);
    assert_eq!(profile.hearts, 3);

    let stored = repo
        .lesson_progress(user, LessonId::new(3))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.hearts_used(), 0);

    let lesson = repo.get_lesson(user, LessonId::new(3)).await.unwrap();
    assert!(lesson.challenges.iter().all(|c| c.completed));
}

#[tokio::test]
async fn sqlite_completion_for_unknown_learner_fails() {
    let repo = connect("memdb_unknown_learner").await;
    let completion = LessonCompletion {
        lesson_id: LessonId::new(1),
        hearts_used: 0,
        points_earned: 10,
    };
    let err = repo
        .complete_lesson(UserId::new(77), &completion, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_refills_hearts() {
    let repo = connect("memdb_refill").await;
    let mut profile = LearnerProfile::new(UserId::new(4));
    profile.hearts = 0;
    profile.subscription_active = true;
    repo.upsert_profile(&profile).await.unwrap();

    let refilled = repo.refill_hearts(UserId::new(4)).await.unwrap();
    assert_eq!(refilled.hearts, MAX_HEARTS);
    assert!(refilled.subscription_active);

    let err = repo.refill_hearts(UserId::new(5)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}
