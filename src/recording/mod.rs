pub mod accumulator;
pub mod encoder;
pub mod saver;

pub use accumulator::{FrameAccumulator, PendingChunk};
pub use encoder::{
    encode_chunk, encode_with_strategies, validate_format, ChunkFormat, EncoderStrategy,
    MP3_REQUIRED_CHANNELS, MP3_REQUIRED_SAMPLE_RATE,
};
pub use saver::{ChunkSaver, SaverConfig};
