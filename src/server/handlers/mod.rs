pub mod documents;
pub mod health;
pub mod logs;
pub mod root;
pub mod search;
