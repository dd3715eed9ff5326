mod content;
mod interaction;
mod user;

pub use content::{Content, ContentPage, ContentType};
pub use interaction::{Interaction, InteractionType, NewInteraction};
pub use user::{Role, User};
