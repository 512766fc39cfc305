//! migr8-rules: migration rule sets.
//!
//! Rule documents are JSON, one per source package, identified by file
//! stem. [`load_rules_dir`] reads a directory of them into a [`RuleBook`];
//! the engine looks rules up by package and imported component name.

pub mod condition;
pub mod error;
pub mod load;
pub mod scaffold;
pub mod types;

pub use condition::{Condition, Literal};
pub use error::RuleError;
pub use load::{
    load_rule_file, load_rules_dir, parse_rule_set, rule_files, RuleBook, INCOMPLETE_MARKER,
};
pub use scaffold::scaffold_rule_set;
pub use types::*;
