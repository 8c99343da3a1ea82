pub mod backend;
pub mod countdown;
pub mod essay_grading;
pub mod exam_session;
pub mod grading;
pub mod submission;
pub mod topic_practice;
