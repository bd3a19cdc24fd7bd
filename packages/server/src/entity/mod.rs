pub mod academic_calendar;
pub mod ai_task;
pub mod ai_task_item;
pub mod comment;
pub mod conversation;
pub mod conversation_message;
pub mod grading;
pub mod project;
pub mod project_application;
pub mod submission;
pub mod upload_intent;
pub mod user;
