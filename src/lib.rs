pub mod action;
pub mod check;
pub mod cli;
pub mod config;
pub mod controller;
pub mod document;
pub mod extract;
pub mod scheduler;
pub mod tags;

pub use action::{Action, ActionMode, Choice, DismissReason};
pub use check::{Check, Trigger};
pub use config::{CheckConfig, Config};
pub use controller::Controller;
pub use document::{Document, Fragment, Range};
pub use scheduler::{Classifier, HttpClassifier, Scheduler};
pub use tags::{Tag, TagStore};
