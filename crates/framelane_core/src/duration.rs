use crate::types::*;

/// Composition length in frames: the latest overlay end, floored at 1 so an
/// empty timeline still has a valid length.
pub fn total_duration(overlays: &[Overlay]) -> Frame {
    overlays
        .iter()
        .map(Overlay::end)
        .max()
        .unwrap_or(0)
        .max(1)
}
