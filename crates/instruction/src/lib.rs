//! # Scribe Instruction
//!
//! Turns loosely structured instruction documents into metadata, ordered
//! steps and free-form text.
//!
//! ## Document shape
//!
//! ```text
//! file: calc.py                 <- metadata (only before any step opens)
//! dependencies: math, os
//! step1: add two numbers        <- opens a step
//!     input: a, b               <- detail of step1, even though it looks like metadata
//! task2: print the result       <- closes step1, opens task2
//! ```
//!
//! Anything that is neither metadata nor a step marker, appearing before the
//! first step, is kept as a free-form segment with its 1-based line number.
//!
//! The [`intent`] module is a separate, best-effort keyword classifier for
//! free-form English. It is a heuristic, not a grammar.
//!
//! ## Example
//!
//! ```rust
//! use scribe_instruction::InstructionParser;
//!
//! let doc = InstructionParser::default().parse("file: calc.py\nstep1: add numbers\n");
//! assert_eq!(doc.metadata.file.as_deref(), Some("calc.py"));
//! assert_eq!(doc.steps.len(), 1);
//! ```

pub mod detect;
pub mod intent;
mod parser;
mod types;

pub use intent::{extract_intent, Action, Intent, Operation};
pub use parser::InstructionParser;
pub use types::{FreeFormSegment, InstructionDocument, InstructionMetadata, ParseWarning, Step};
