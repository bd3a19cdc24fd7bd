mod ai;
mod calendar;
mod comment;
mod project;
mod reconcile;
mod submission;
mod user;
