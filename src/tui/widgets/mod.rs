// Widget rendering functions, one module per console zone or overlay.

pub mod committees;
pub mod draws;
pub mod form;
pub mod login;
pub mod members;
pub mod paid_rows;
pub mod quit_confirm;
pub mod reveal;
pub mod status_bar;
pub mod timer_card;
