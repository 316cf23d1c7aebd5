//! End-to-end survey round over in-memory storage:
//! accounts, login, invites, staged drafts, submission, scoring.

use std::collections::HashMap;
use std::path::PathBuf;

use rand::Rng;
use sat_core::model::{
    AnswerKind, Category, CategoryId, QuestionId, RatingGroup, Role, RoleId, UserId, WeightSpec,
};
use sat_core::time::fixed_clock;
use services::AppServices;
use storage::repository::{NewAnswerSet, NewQuestion, Storage};

const PASSWORD: &str = "Correct-horse1";

fn temp_draft_dir() -> PathBuf {
    let tag: u64 = rand::rng().random();
    std::env::temp_dir().join(format!("sat-flow-{tag:016x}"))
}

async fn seed_catalog(storage: &Storage) -> (QuestionId, QuestionId) {
    for (code, description) in [
        (RoleId::UNIVERSAL, "Administrator"),
        ("CEO", "Chief Executive Officer"),
        ("CISO", "Chief Information Security Officer"),
    ] {
        storage
            .catalog
            .upsert_role(&Role::new(RoleId::new(code), description).unwrap())
            .await
            .unwrap();
    }

    storage
        .catalog
        .upsert_category(
            &Category::new(
                CategoryId::new("STA"),
                "Security Trust and Assurance",
                "",
                RatingGroup::Attitude,
                0,
            )
            .unwrap(),
        )
        .await
        .unwrap();

    let likert = storage
        .catalog
        .insert_answer_set(NewAnswerSet {
            choices_text: "Strongly Agree;Agree;Neutral;Disagree;Strongly Disagree".into(),
            kind: AnswerKind::Single,
        })
        .await
        .unwrap();
    let channels = storage
        .catalog
        .insert_answer_set(NewAnswerSet {
            choices_text: "Email;Phone;In person".into(),
            kind: AnswerKind::Multiple,
        })
        .await
        .unwrap();

    let scored = storage
        .catalog
        .insert_question(NewQuestion {
            category_id: CategoryId::new("STA"),
            answer_set_id: likert,
            text: "Security is a high priority for our organisation".into(),
            rationale: None,
            roles: vec![RoleId::new("CEO"), RoleId::new("CISO")],
            weights: WeightSpec::parse("5,4,3,2,1").unwrap(),
            wording_overrides: HashMap::new(),
        })
        .await
        .unwrap();

    let unscored = storage
        .catalog
        .insert_question(NewQuestion {
            category_id: CategoryId::new("STA"),
            answer_set_id: channels,
            text: "How would you prefer to report a security concern?".into(),
            rationale: None,
            roles: vec![RoleId::new("CEO")],
            weights: WeightSpec::Unscored,
            wording_overrides: HashMap::new(),
        })
        .await
        .unwrap();

    (scored, unscored)
}

#[tokio::test]
async fn full_survey_round() {
    let storage = Storage::in_memory();
    let (scored, unscored) = seed_catalog(&storage).await;
    let draft_dir = temp_draft_dir();
    let app = AppServices::with_storage(&storage, fixed_clock(), &draft_dir).unwrap();

    // accounts
    app.auth()
        .create_account("admin", PASSWORD, RoleId::universal(), false)
        .await
        .unwrap();
    app.auth()
        .create_account("test.ceo", PASSWORD, RoleId::new("CEO"), false)
        .await
        .unwrap();
    app.auth()
        .create_account("test.ciso", PASSWORD, RoleId::new("CISO"), true)
        .await
        .unwrap();

    // a new round invites both stakeholders but not the admin
    let survey = app.surveys().create_survey().await.unwrap();
    let ceo = UserId::new("test.ceo");
    let ciso = UserId::new("test.ciso");
    assert_eq!(app.progress().outstanding_surveys(&ceo).await.unwrap().len(), 1);
    assert!(app
        .progress()
        .outstanding_surveys(&UserId::new("admin"))
        .await
        .unwrap()
        .is_empty());

    // the CEO logs in and sees both questions; the CISO only the scored one
    let token = app.auth().open_session("test.ceo", PASSWORD).await.unwrap();
    let me = app.auth().current_user(&token).await.unwrap().unwrap();
    assert_eq!(me.id(), &ceo);

    let ceo_questions = app.surveys().questions_for_user(&ceo).await.unwrap();
    assert_eq!(ceo_questions.len(), 2);
    assert_eq!(app.surveys().questions_for_user(&ciso).await.unwrap().len(), 1);

    // answers are staged one at a time and survive partial completion
    app.drafts()
        .stage(&ceo, survey, scored, vec!["Agree".into()])
        .unwrap();
    assert_eq!(app.drafts().answered_count(&ceo, survey).unwrap(), 1);
    app.drafts()
        .stage(&ceo, survey, unscored, vec!["Email".into(), "Phone".into()])
        .unwrap();

    let written = app.drafts().commit_and_clear(&ceo, survey).await.unwrap();
    assert_eq!(written, 3);
    assert!(app.progress().outstanding_surveys(&ceo).await.unwrap().is_empty());

    // the CISO answers their single question directly
    app.drafts()
        .stage(&ciso, survey, scored, vec!["Strongly Disagree".into()])
        .unwrap();
    app.drafts().commit_and_clear(&ciso, survey).await.unwrap();

    // scoring: CEO 4, CISO 1; the unscored question contributes nothing
    let sta = CategoryId::new("STA");
    let all = app.scoring().score_survey(survey).await.unwrap();
    assert_eq!(all.category_score(&sta), Some(2.5));
    assert_eq!(all.attitude, 2.5);

    let business = app
        .scoring()
        .score_survey_by_technicality(survey, false)
        .await
        .unwrap();
    assert_eq!(business.category_score(&sta), Some(4.0));

    let technical = app
        .scoring()
        .score_survey_by_technicality(survey, true)
        .await
        .unwrap();
    assert_eq!(technical.category_score(&sta), Some(1.0));

    app.auth().close_session(&token).await.unwrap();
    assert!(app.auth().current_user(&token).await.unwrap().is_none());

    let _ = std::fs::remove_dir_all(&draft_dir);
}
