//! Regular-expression matching by enumerating repetition counts.
//!
//! A pattern is parsed into a [`regex::Tree`] whose nodes carry their group,
//! quantifier and link classification (invalid syntax included), annotated
//! against one input, and then searched for every assignment of repetition
//! counts that rebuilds the input exactly.
//!
//! ```
//! use recount::regex::{match_all, parse, prepare_for_matching};
//!
//! let mut tree = parse("(ab){2,3}");
//! prepare_for_matching(&mut tree, "ababab");
//! let found = match_all(&tree, "ababab").unwrap();
//! assert_eq!(found[0].counts(), vec![3]);
//! ```

pub mod diophantine;
pub mod equations;
pub mod error;
pub mod regex;
pub mod solver;

pub use error::{EquationError, MatchError, ParseError, SolverError};
