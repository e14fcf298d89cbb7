pub mod command;
pub mod drag;
pub mod tab_bar;
pub mod window;
