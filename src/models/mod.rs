pub mod decision_board;
pub mod document;
pub mod meeting_item;
pub mod template;
pub mod user;
