pub use super::ad_evaluations::Entity as AdEvaluations;
pub use super::ads::Entity as Ads;
pub use super::companies::Entity as Companies;
pub use super::users::Entity as Users;
