pub mod history;
pub mod poll;
pub mod question;

pub use history::HistoryLog;
pub use poll::PollKeeper;
pub use question::QuestionKeeper;
