use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use sat_core::Clock;
use sat_core::model::{AnswerKind, AnswerSetId, Category, CategoryId, RatingGroup, Role, RoleId};
use services::auth_service::AuthService;
use services::draft_service::DraftCollector;
use services::error::AuthError;
use services::survey_service::SurveyService;
use storage::repository::{NewAnswerSet, NewQuestion, Storage, StorageError};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    admin_password: String,
    demo: bool,
    demo_password: String,
    open_survey: bool,
    draft_dir: PathBuf,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("SAT_DB_URL").unwrap_or_else(|_| "sqlite:sat.sqlite3".into());
        let mut admin_password =
            std::env::var("SAT_ADMIN_PASSWORD").unwrap_or_else(|_| "Admin-pass1".into());
        let mut demo = false;
        let mut demo_password =
            std::env::var("SAT_DEMO_PASSWORD").unwrap_or_else(|_| "Stakeh0lder-1".into());
        let mut open_survey = false;
        let mut draft_dir =
            PathBuf::from(std::env::var("SAT_DRAFT_DIR").unwrap_or_else(|_| "drafts".into()));

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--admin-password" => {
                    admin_password = require_value(&mut args, "--admin-password")?;
                }
                "--demo" => {
                    demo = true;
                }
                "--demo-password" => {
                    demo_password = require_value(&mut args, "--demo-password")?;
                }
                "--survey" => {
                    open_survey = true;
                }
                "--draft-dir" => {
                    draft_dir = PathBuf::from(require_value(&mut args, "--draft-dir")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            admin_password,
            demo,
            demo_password,
            open_survey,
            draft_dir,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p services --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:sat.sqlite3)");
    eprintln!("  --admin-password <pw>     Password for the admin account");
    eprintln!("  --demo                    Also create one demo account per role");
    eprintln!("  --demo-password <pw>      Password for the demo accounts");
    eprintln!("  --survey                  Open a survey round after seeding");
    eprintln!("  --draft-dir <path>        Directory for staged drafts (default: drafts)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  SAT_DB_URL, SAT_ADMIN_PASSWORD, SAT_DEMO_PASSWORD, SAT_DRAFT_DIR");
}

const ROLES: [(&str, &str); 7] = [
    (RoleId::UNIVERSAL, "Administrator"),
    ("CEO", "Chief Executive Officer"),
    ("CFO", "Chief Financial Officer"),
    ("CPO", "Chief People Officer"),
    ("CISO", "Chief Information Security Officer"),
    ("CIO", "Chief Information Officer"),
    ("CTO", "Chief Technology Officer"),
];

const CATEGORIES: [(&str, &str, RatingGroup, u32); 5] = [
    (
        "TDU",
        "Technology and Data Usage",
        RatingGroup::Need,
        0,
    ),
    (
        "IAB",
        "Information Assets and Business",
        RatingGroup::Need,
        1,
    ),
    (
        "SPI",
        "Security Practices and Incidents",
        RatingGroup::Attitude,
        2,
    ),
    (
        "STA",
        "Security Trust and Assurance",
        RatingGroup::Attitude,
        3,
    ),
    (
        "DSA",
        "Digital Security by Design Awareness",
        RatingGroup::Awareness,
        4,
    ),
];

const LIKERT: &str = "Strongly Agree;Agree;Neutral;Disagree;Strongly Disagree";
const FREQUENCY: &str = "Always;Often;Sometimes;Rarely;Never";
const YES_NO: &str = "Yes;No;Unsure";

struct Catalog {
    likert: AnswerSetId,
    frequency: AnswerSetId,
    yes_no: AnswerSetId,
}

async fn seed_catalog(storage: &Storage) -> Result<Catalog, Box<dyn std::error::Error>> {
    for (code, description) in ROLES {
        storage
            .catalog
            .upsert_role(&Role::new(RoleId::new(code), description)?)
            .await?;
    }

    for (code, name, rating, position) in CATEGORIES {
        storage
            .catalog
            .upsert_category(&Category::new(CategoryId::new(code), name, "", rating, position)?)
            .await?;
    }

    let set_for = |choices: &str, kind: AnswerKind| NewAnswerSet {
        choices_text: choices.to_owned(),
        kind,
    };

    let existing = storage.catalog.list_answer_sets().await?;
    let find = |choices: &str| {
        existing
            .iter()
            .find(|s| s.joined_text() == choices)
            .map(sat_core::model::AnswerSet::id)
    };

    let likert = match find(LIKERT) {
        Some(id) => id,
        None => {
            storage
                .catalog
                .insert_answer_set(set_for(LIKERT, AnswerKind::Single))
                .await?
        }
    };
    let frequency = match find(FREQUENCY) {
        Some(id) => id,
        None => {
            storage
                .catalog
                .insert_answer_set(set_for(FREQUENCY, AnswerKind::Single))
                .await?
        }
    };
    let yes_no = match find(YES_NO) {
        Some(id) => id,
        None => {
            storage
                .catalog
                .insert_answer_set(set_for(YES_NO, AnswerKind::Single))
                .await?
        }
    };

    Ok(Catalog {
        likert,
        frequency,
        yes_no,
    })
}

fn stakeholders() -> Vec<RoleId> {
    ROLES
        .iter()
        .filter(|(code, _)| *code != RoleId::UNIVERSAL)
        .map(|(code, _)| RoleId::new(*code))
        .collect()
}

fn technical_roles() -> Vec<RoleId> {
    ["CISO", "CIO", "CTO"].map(RoleId::new).to_vec()
}

async fn seed_questions(
    storage: &Storage,
    catalog: &Catalog,
) -> Result<u32, Box<dyn std::error::Error>> {
    let questions = [
        NewQuestion {
            category_id: CategoryId::new("TDU"),
            answer_set_id: catalog.likert,
            text: "Our day-to-day operations depend on connected devices and software".into(),
            rationale: Some("Establishes how exposed the organisation is to device compromise".into()),
            roles: stakeholders(),
            weights: sat_core::model::WeightSpec::parse("5,4,3,2,1")?,
            wording_overrides: HashMap::new(),
        },
        NewQuestion {
            category_id: CategoryId::new("TDU"),
            answer_set_id: catalog.yes_no,
            text: "Does your organisation process personal data about customers or staff?".into(),
            rationale: None,
            roles: stakeholders(),
            weights: sat_core::model::WeightSpec::Unscored,
            wording_overrides: HashMap::new(),
        },
        NewQuestion {
            category_id: CategoryId::new("IAB"),
            answer_set_id: catalog.likert,
            text: "A multi-day IT outage would materially damage the business".into(),
            rationale: Some("Gauges perceived business impact of losing information assets".into()),
            roles: stakeholders(),
            weights: sat_core::model::WeightSpec::parse("5,4,3,2,1")?,
            wording_overrides: HashMap::new(),
        },
        NewQuestion {
            category_id: CategoryId::new("SPI"),
            answer_set_id: catalog.frequency,
            text: "Security incidents are reported and reviewed when they happen".into(),
            rationale: None,
            roles: stakeholders(),
            weights: sat_core::model::WeightSpec::parse("5,4,3,2,1")?,
            wording_overrides: HashMap::new(),
        },
        NewQuestion {
            category_id: CategoryId::new("SPI"),
            answer_set_id: catalog.frequency,
            text: "Software and devices receive security updates promptly".into(),
            rationale: None,
            roles: technical_roles(),
            weights: sat_core::model::WeightSpec::parse("5,4,3,2,1")?,
            wording_overrides: HashMap::new(),
        },
        NewQuestion {
            category_id: CategoryId::new("STA"),
            answer_set_id: catalog.likert,
            text: "Security is a high priority for our organisation".into(),
            rationale: None,
            roles: stakeholders(),
            weights: sat_core::model::WeightSpec::parse("5,4,3,2,1")?,
            wording_overrides: HashMap::from([(
                RoleId::new("CISO"),
                "Security is a high priority for your team".to_owned(),
            )]),
        },
        NewQuestion {
            category_id: CategoryId::new("STA"),
            answer_set_id: catalog.likert,
            text: "Current security measures get in the way of doing our work".into(),
            rationale: Some("Reverse-scored: friction lowers the trust rating".into()),
            roles: stakeholders(),
            weights: sat_core::model::WeightSpec::parse("1,2,3,4,5")?,
            wording_overrides: HashMap::new(),
        },
        NewQuestion {
            category_id: CategoryId::new("DSA"),
            answer_set_id: catalog.yes_no,
            text: "Have you heard of hardware-level memory safety technologies such as CHERI?".into(),
            rationale: None,
            roles: stakeholders(),
            weights: sat_core::model::WeightSpec::parse("5,1,2")?,
            wording_overrides: HashMap::new(),
        },
    ];

    let mut inserted = 0;
    for question in questions {
        match storage.catalog.insert_question(question).await {
            Ok(_) => inserted += 1,
            // already seeded on a previous run
            Err(StorageError::Conflict) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(inserted)
}

async fn seed_accounts(
    auth: &AuthService,
    args: &Args,
) -> Result<u32, Box<dyn std::error::Error>> {
    let mut accounts = vec![(
        "admin".to_owned(),
        RoleId::universal(),
        false,
        args.admin_password.clone(),
    )];
    if args.demo {
        for role in stakeholders() {
            let name = format!("test.{}", role.as_str().to_lowercase());
            let technical = technical_roles().contains(&role);
            accounts.push((name, role, technical, args.demo_password.clone()));
        }
    }

    let mut created = 0;
    for (name, role, technical, password) in accounts {
        match auth.create_account(&name, &password, role, technical).await {
            Ok(()) => created += 1,
            Err(AuthError::UsernameTaken) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(created)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    // a misconfigured drafts path fails at seed time, not at first login
    DraftCollector::new(
        &args.draft_dir,
        Arc::clone(&storage.responses),
        Arc::clone(&storage.progress),
    )?;

    let catalog = seed_catalog(&storage).await?;
    let questions = seed_questions(&storage, &catalog).await?;

    let auth = AuthService::new(Arc::clone(&storage.users));
    let accounts = seed_accounts(&auth, &args).await?;

    let mut survey_note = String::new();
    if args.open_survey {
        let surveys = SurveyService::new(
            Clock::default(),
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.users),
            Arc::clone(&storage.surveys),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.responses),
        );
        let survey = surveys.create_survey().await?;
        survey_note = format!(", opened survey {survey}");
    }

    println!(
        "Seeded {} roles, {} categories, {questions} new questions, {accounts} new accounts into {} (drafts under {}){survey_note}",
        ROLES.len(),
        CATEGORIES.len(),
        args.db_url,
        args.draft_dir.display(),
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
