pub mod completion;
pub mod harvest;
pub mod links;
pub mod parse;
