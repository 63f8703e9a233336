mod game;

pub use game::{distance, BilinearGame};
