pub mod keyword;
pub mod link;
pub mod llm;
pub mod quota;
pub mod site;
pub mod utils;
