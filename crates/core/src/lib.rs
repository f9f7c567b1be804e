// crates/core/src/lib.rs
//! Domain logic for newsdeck: AI service clients, carousel generation and
//! the voice pipeline. Has no HTTP-server concerns.

pub mod ai;
pub mod article;
pub mod carousel;
pub mod text;
pub mod voice;

pub use article::ArticleContext;
pub use carousel::{Carousel, CarouselError, CarouselGenerator, CarouselRequest, ProgressSink, Slide};
pub use voice::{Stage, VoiceError, VoicePipeline, VoiceReply};
