pub mod extraction;
pub mod fields;
pub mod conditions;
pub mod labs;
pub mod summarize;
pub mod render;
pub mod processor;
