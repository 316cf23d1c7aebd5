use std::collections::HashMap;

use sat_core::model::{
    AnswerKind, Category, CategoryId, QuestionId, RatingGroup, Response, Role, RoleId, User,
    UserId, WeightSpec,
};
use sat_core::time::fixed_today;
use storage::repository::{
    CatalogRepository, NewAnswerSet, NewQuestion, ProgressRepository, ResponseRepository,
    StorageError, SurveyRepository, UserRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn seed_catalog(repo: &SqliteRepository) -> (RoleId, RoleId, QuestionId) {
    let ceo = RoleId::new("CEO");
    let ciso = RoleId::new("CISO");
    repo.upsert_role(&Role::new(ceo.clone(), "Chief Executive Officer").unwrap())
        .await
        .unwrap();
    repo.upsert_role(&Role::new(ciso.clone(), "Chief Information Security Officer").unwrap())
        .await
        .unwrap();

    repo.upsert_category(
        &Category::new(
            CategoryId::new("STA"),
            "Security Trust and Assurance",
            "",
            RatingGroup::Attitude,
            3,
        )
        .unwrap(),
    )
    .await
    .unwrap();

    let answers = repo
        .insert_answer_set(NewAnswerSet {
            choices_text: "Strongly Agree;Agree;Neutral;Disagree;Strongly Disagree".into(),
            kind: AnswerKind::Single,
        })
        .await
        .unwrap();

    let question = repo
        .insert_question(NewQuestion {
            category_id: CategoryId::new("STA"),
            answer_set_id: answers,
            text: "Security is a high priority for our organisation".into(),
            rationale: Some("Baseline attitude signal".into()),
            roles: vec![ceo.clone(), ciso.clone()],
            weights: WeightSpec::parse("5,4,3,2,1").unwrap(),
            wording_overrides: HashMap::from([(
                ciso.clone(),
                "Security is a high priority for your team".to_owned(),
            )]),
        })
        .await
        .unwrap();

    (ceo, ciso, question)
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_question_links() {
    let repo = connect("memdb_catalog").await;
    let (ceo, ciso, question_id) = seed_catalog(&repo).await;

    let question = repo
        .get_question(question_id)
        .await
        .expect("fetch")
        .expect("question exists");
    assert_eq!(
        question.text(),
        "Security is a high priority for our organisation"
    );
    assert_eq!(question.weights(), &WeightSpec::Scored(vec![5, 4, 3, 2, 1]));
    assert!(question.applies_to(&ceo));
    assert_eq!(
        question.text_for_role(&ciso),
        "Security is a high priority for your team"
    );
    assert_eq!(
        question.text_for_role(&ceo),
        "Security is a high priority for our organisation"
    );

    // questions_for_role filters out roles without a link
    let for_cfo = repo
        .questions_for_role(&RoleId::new("CFO"))
        .await
        .unwrap();
    assert!(for_cfo.is_empty());

    let for_ciso = repo.questions_for_role(&ciso).await.unwrap();
    assert_eq!(for_ciso.len(), 1);
}

#[tokio::test]
async fn sqlite_rejects_duplicate_question_text() {
    let repo = connect("memdb_dup_question").await;
    let (ceo, _, _) = seed_catalog(&repo).await;

    let answers = repo.list_answer_sets().await.unwrap()[0].id();
    let err = repo
        .insert_question(NewQuestion {
            category_id: CategoryId::new("STA"),
            answer_set_id: answers,
            text: "Security is a high priority for our organisation".into(),
            rationale: None,
            roles: vec![ceo],
            weights: WeightSpec::Unscored,
            wording_overrides: HashMap::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_duplicate_invite_is_a_conflict() {
    let repo = connect("memdb_invite").await;
    let (ceo, _, _) = seed_catalog(&repo).await;

    let user = User::new(UserId::new("test.ceo"), ceo, "hash", false).unwrap();
    repo.insert_user(&user).await.unwrap();
    let survey = repo.create_survey(fixed_today()).await.unwrap();

    repo.invite(user.id(), survey).await.unwrap();
    let err = repo.invite(user.id(), survey).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_outstanding_surveys_track_completion() {
    let repo = connect("memdb_progress").await;
    let (ceo, _, _) = seed_catalog(&repo).await;

    let user = User::new(UserId::new("test.ceo"), ceo, "hash", false).unwrap();
    repo.insert_user(&user).await.unwrap();

    let first = repo.create_survey(fixed_today()).await.unwrap();
    let second = repo.create_survey(fixed_today()).await.unwrap();
    repo.invite(user.id(), first).await.unwrap();
    repo.invite(user.id(), second).await.unwrap();

    let outstanding = repo.outstanding_surveys(user.id()).await.unwrap();
    assert_eq!(outstanding.len(), 2);
    assert_eq!(outstanding[0].id(), first);

    repo.mark_complete(user.id(), first).await.unwrap();
    let outstanding = repo.outstanding_surveys(user.id()).await.unwrap();
    assert_eq!(outstanding.len(), 1);
    assert_eq!(outstanding[0].id(), second);

    let progress = repo
        .get_progress(user.id(), first)
        .await
        .unwrap()
        .expect("progress row");
    assert!(progress.is_finished());

    // completing again is a no-op
    repo.mark_complete(user.id(), first).await.unwrap();
}

#[tokio::test]
async fn sqlite_password_change_clears_session_token() {
    let repo = connect("memdb_sessions").await;
    let (ceo, _, _) = seed_catalog(&repo).await;

    let user = User::new(UserId::new("test.ceo"), ceo, "hash-v1", false).unwrap();
    repo.insert_user(&user).await.unwrap();

    repo.set_session_token(user.id(), Some("deadbeef")).await.unwrap();
    let found = repo
        .find_user_by_token("deadbeef")
        .await
        .unwrap()
        .expect("token lookup");
    assert_eq!(found.id(), user.id());

    repo.set_password_hash(user.id(), "hash-v2").await.unwrap();
    let reloaded = repo.get_user(user.id()).await.unwrap().expect("user");
    assert_eq!(reloaded.password_hash(), "hash-v2");
    assert_eq!(reloaded.session_token(), None);
    assert!(repo.find_user_by_token("deadbeef").await.unwrap().is_none());

    let err = repo
        .set_session_token(&UserId::new("nobody"), Some("aa"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_appends_responses_in_one_batch() {
    let repo = connect("memdb_responses").await;
    let (ceo, _, question_id) = seed_catalog(&repo).await;

    let user = User::new(UserId::new("test.ceo"), ceo, "hash", false).unwrap();
    repo.insert_user(&user).await.unwrap();
    let survey = repo.create_survey(fixed_today()).await.unwrap();
    repo.invite(user.id(), survey).await.unwrap();

    let batch = vec![
        Response::new(question_id, user.id().clone(), survey, "Agree"),
        Response::new(question_id, user.id().clone(), survey, "Neutral"),
    ];
    repo.append_responses(&batch).await.unwrap();

    let stored = repo.responses_for_survey(survey).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].choice(), "Agree");
    assert_eq!(stored[1].choice(), "Neutral");
}
