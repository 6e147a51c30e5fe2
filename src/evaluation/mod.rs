//! Independent consistency checks of tours and solutions.

mod checker;

pub use checker::SolutionChecker;
