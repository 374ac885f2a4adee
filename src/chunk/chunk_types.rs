//! Chunk type tags a Standard MIDI File decoder understands

/// Declares a chunk type tag from its four ASCII characters
macro_rules! chunk_type {
    ($(#[$doc:meta])* $const_name:ident = $tag:literal) => {
        $(#[$doc])*
        pub const $const_name: [char; 4] = {
            let tag: &[u8; 4] = $tag;
            [tag[0] as char, tag[1] as char, tag[2] as char, tag[3] as char]
        };
    };
}

chunk_type!(
    /// The `MThd` header chunk, always first in a file
    HEADER_CHUNK = b"MThd"
);
chunk_type!(
    /// An `MTrk` chunk holding one track's events
    TRACK_DATA_CHUNK = b"MTrk"
);
