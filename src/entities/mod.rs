pub mod prelude;

pub mod ad_evaluations;
pub mod ads;
pub mod companies;
pub mod users;
