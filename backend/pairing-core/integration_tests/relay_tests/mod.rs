pub mod helpers;

mod origin;
mod target;
