pub mod ai;
pub mod auth;
pub mod calendar;
pub mod comment;
pub mod project;
pub mod submission;
pub mod user;
