//! Groups host windows under a shared tab bar.
//!
//! The [`actor::tab_manager::TabManager`] consumes window, pointer and
//! renderer events from the host and answers with window requests and tab
//! bar commands. Everything runs on a single thread; timers are driven by
//! an injected [`sys::timer::Clock`].

pub mod actor;
pub mod common;
pub mod model;
pub mod sys;
pub mod ui;
