pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod sequencer;
pub mod platform {
    pub mod power;
}
pub mod render {
    pub mod video;
    pub mod window;
}
pub mod tasks {
    pub mod driver;
}
