pub mod attempt;
pub mod essay;
pub mod paper;
pub mod question;
pub mod results;
pub mod session;
