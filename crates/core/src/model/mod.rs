pub mod answer;
pub mod category;
pub mod ids;
pub mod question;
pub mod response;
pub mod role;
pub mod survey;
pub mod user;

pub use answer::{AnswerError, AnswerKind, AnswerSet};
pub use category::{Category, CategoryError, RatingGroup};
pub use ids::{AnswerSetId, CategoryId, QuestionId, RoleId, SurveyId, UserId};
pub use question::{Question, QuestionError, WeightError, WeightSpec};
pub use response::Response;
pub use role::{Role, RoleError};
pub use survey::{Survey, UserProgress};
pub use user::{User, UserError};
