use slotmap::new_key_type;

new_key_type! {
    /// Identity of a track inside its owning aggregator.
    pub struct TrackKey;
}

/// Opaque material reference handed through to the rendering pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MaterialRef(pub u32);
