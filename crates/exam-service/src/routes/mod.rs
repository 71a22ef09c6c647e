pub mod attempts;
pub mod exams;
pub mod live;
pub mod results;
