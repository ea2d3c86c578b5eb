pub mod command_palette;
pub mod countdown;

pub use command_palette::{PaletteSession, PaletteView, Phase};
pub use countdown::CountdownState;
